use csv::{ReaderBuilder, Trim};
use moneyleaks_core::Row;
use thiserror::Error;

/// Delimiters tried when sniffing, in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

#[derive(Debug, Clone, Default)]
pub struct DelimitedOptions {
    /// Fixed delimiter; sniffed from the header line when `None`.
    pub delimiter: Option<u8>,
}

#[derive(Error, Debug)]
pub enum DelimitedError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Split delimited statement text into rows keyed by the header line.
///
/// Blank lines are ignored and the first remaining line is the header. Fields
/// are matched to headers by position. Quoting is not interpreted, so a field
/// containing the delimiter shifts every later column in its row.
pub fn extract_rows(text: &str, options: &DelimitedOptions) -> Result<Vec<Row>, DelimitedError> {
    let text = text.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let Some(header_line) = lines.first() else {
        return Ok(Vec::new());
    };

    let delimiter = options
        .delimiter
        .unwrap_or_else(|| sniff_delimiter(header_line));
    let body = lines.join("\n");

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .quoting(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        if row.is_blank() {
            continue;
        }
        rows.push(row);
    }

    tracing::debug!(
        delimiter = %char::from(delimiter).escape_default(),
        columns = headers.len(),
        rows = rows.len(),
        "extracted delimited rows"
    );

    Ok(rows)
}

/// Pick the candidate delimiter that occurs most often in `header_line`.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    CANDIDATE_DELIMITERS
        .iter()
        .copied()
        .map(|d| (d, header_line.bytes().filter(|&b| b == d).count()))
        .filter(|&(_, n)| n > 0)
        .fold(None::<(u8, usize)>, |best, (d, n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((d, n)),
        })
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(text: &str) -> Vec<Row> {
        extract_rows(text, &DelimitedOptions::default()).unwrap()
    }

    // ── sniff_delimiter ───────────────────────────────────────────────────────

    #[test]
    fn sniff_prefers_most_frequent() {
        assert_eq!(sniff_delimiter("Date;Description;Amount"), b';');
        assert_eq!(sniff_delimiter("Date\tNarration\tAmount"), b'\t');
        assert_eq!(sniff_delimiter("Date|Narration|Amount"), b'|');
    }

    #[test]
    fn sniff_defaults_to_comma() {
        assert_eq!(sniff_delimiter("Date,Description,Amount"), b',');
        assert_eq!(sniff_delimiter("Header"), b',');
    }

    #[test]
    fn sniff_tie_goes_to_comma() {
        assert_eq!(sniff_delimiter("a,b;c"), b',');
    }

    // ── extract_rows ──────────────────────────────────────────────────────────

    #[test]
    fn header_defines_keys() {
        let out = rows("Date,Description,Amount,Type\n01-10-2025,SWIGGY ORDER,450,Debit\n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("Date"), Some("01-10-2025"));
        assert_eq!(out[0].get("Description"), Some("SWIGGY ORDER"));
        assert_eq!(out[0].get("Amount"), Some("450"));
        assert_eq!(out[0].get("Type"), Some("Debit"));
    }

    #[test]
    fn skips_blank_lines_and_trims() {
        let out = rows("\n\n  Date , Description , Amount  \n\n 01-10-2025 , RENT , 15000 \n   \n");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("Description"), Some("RENT"));
        assert_eq!(out[0].get("Amount"), Some("15000"));
    }

    #[test]
    fn header_only_yields_no_rows() {
        assert!(rows("Date,Description,Amount\n").is_empty());
        assert!(rows("").is_empty());
        assert!(rows("   \n\n").is_empty());
    }

    #[test]
    fn delimiter_inside_field_misaligns_columns() {
        let out = rows("Date,Description,Amount\n01-10-2025,\"AMAZON, INC\",999\n");
        assert_eq!(out[0].get("Description"), Some("\"AMAZON"));
        assert_eq!(out[0].get("Amount"), Some("INC\""));
    }

    #[test]
    fn short_lines_keep_leading_columns() {
        let out = rows("Date,Description,Amount\n01-10-2025,ATM\n");
        assert_eq!(out[0].len(), 2);
        assert_eq!(out[0].get("Amount"), None);
    }

    #[test]
    fn all_blank_values_are_skipped() {
        let out = rows("Date,Description,Amount\n,,\n01-10-2025,X,1\n");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn semicolon_file_is_sniffed() {
        let out = rows("Date;Narration;Withdrawal Amt.\n02/10/2025;ZOMATO;1,250.00\n");
        assert_eq!(out[0].get("Withdrawal Amt."), Some("1,250.00"));
    }

    #[test]
    fn explicit_delimiter_overrides_sniffing() {
        let opts = DelimitedOptions { delimiter: Some(b'|') };
        let out = extract_rows("Date|Note,Extra|Amount\n01-10-2025|a,b|5\n", &opts).unwrap();
        assert_eq!(out[0].get("Note,Extra"), Some("a,b"));
    }

    #[test]
    fn strips_byte_order_mark() {
        let out = rows("\u{feff}Date,Description,Amount\n01-10-2025,X,1\n");
        assert_eq!(out[0].get("Date"), Some("01-10-2025"));
    }
}
