use std::sync::Arc;

use moneyleaks_core::{Summary, Transaction};
use moneyleaks_import::delimited::{self, DelimitedError, DelimitedOptions};
use moneyleaks_import::mapper::{map_rows, MapContext};
use moneyleaks_import::merchant::name_counterparty;
use moneyleaks_import::pdf_text;
use moneyleaks_import::rules::CategoryRuleEngine;
use serde::Serialize;
use thiserror::Error;

use crate::aggregate::Aggregator;
use crate::extractor::{ExtractError, TextExtractor};
use crate::format::UploadFormat;
use crate::hash;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    UnreadableUpload(String),
    #[error("No transactions detected in the uploaded file")]
    NoRowsExtracted,
    #[error("No valid transactions found ({rejected} rows rejected)")]
    NoValidTransactions { rejected: usize },
    #[error("Could not read text from the PDF: {0}")]
    ExternalExtractionFailure(#[from] ExtractError),
    #[error("Could not parse the statement: {0}")]
    Delimited(#[from] DelimitedError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// One uploaded statement file.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn format(&self) -> UploadFormat {
        UploadFormat::detect(self.filename.as_deref(), self.content_type.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub rows_extracted: usize,
    pub rows_rejected: usize,
    pub transactions: usize,
}

/// The result of analysing one statement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// SHA-256 hex digest of the uploaded bytes.
    pub statement_id: String,
    pub transactions: Vec<Transaction>,
    pub summary: Summary,
    pub diagnostics: Diagnostics,
}

/// Orchestrates: hash → text → rows → map → categorise → name → aggregate.
pub struct StatementPipeline<E: TextExtractor + ?Sized> {
    extractor: Arc<E>,
    rules: Arc<CategoryRuleEngine>,
    delimited: DelimitedOptions,
}

impl<E: TextExtractor + ?Sized> Clone for StatementPipeline<E> {
    fn clone(&self) -> Self {
        Self {
            extractor: Arc::clone(&self.extractor),
            rules: Arc::clone(&self.rules),
            delimited: self.delimited.clone(),
        }
    }
}

impl<E: TextExtractor + ?Sized + 'static> StatementPipeline<E> {
    pub fn new(extractor: Arc<E>) -> Self {
        Self {
            extractor,
            rules: Arc::new(CategoryRuleEngine::builtin()),
            delimited: DelimitedOptions::default(),
        }
    }

    pub fn with_rules(mut self, rules: CategoryRuleEngine) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    pub fn with_delimited_options(mut self, options: DelimitedOptions) -> Self {
        self.delimited = options;
        self
    }

    /// Analyse an uploaded file. PDF text extraction runs on the blocking pool.
    pub async fn analyze(&self, upload: Upload, ctx: &MapContext) -> Result<Analysis, AnalysisError> {
        let statement_id = hash::statement_id(&upload.bytes);
        tracing::Span::current().record("statement_id", statement_id.as_str());

        let format = upload.format();
        let text = match format {
            UploadFormat::Delimited => String::from_utf8_lossy(&upload.bytes).into_owned(),
            UploadFormat::PdfText => {
                let extractor = Arc::clone(&self.extractor);
                let bytes = upload.bytes;
                tokio::task::spawn_blocking(move || extractor.extract_text(&bytes))
                    .await
                    .map_err(|e| AnalysisError::Internal(format!("extraction task failed: {e}")))?
                    .inspect_err(|e| tracing::warn!(error = %e, "pdf text extraction failed"))?
            }
        };

        self.analyze_text(statement_id, &text, format, ctx)
    }

    /// Analyse statement text that is already in memory.
    pub fn analyze_text(
        &self,
        statement_id: String,
        text: &str,
        format: UploadFormat,
        ctx: &MapContext,
    ) -> Result<Analysis, AnalysisError> {
        let rows = match format {
            UploadFormat::Delimited => delimited::extract_rows(text, &self.delimited)?,
            UploadFormat::PdfText => pdf_text::extract_rows(text),
        };
        if rows.is_empty() {
            tracing::warn!(?format, "no rows extracted");
            return Err(AnalysisError::NoRowsExtracted);
        }
        let rows_extracted = rows.len();

        let outcome = map_rows(rows, ctx);
        if outcome.rejected > 0 {
            tracing::warn!(rejected = outcome.rejected, "rows rejected during mapping");
        }
        if outcome.transactions.is_empty() {
            return Err(AnalysisError::NoValidTransactions { rejected: outcome.rejected });
        }

        let mut aggregator = Aggregator::new();
        let transactions: Vec<Transaction> = outcome
            .transactions
            .into_iter()
            .map(|tx| name_counterparty(self.rules.categorize(tx)))
            .inspect(|tx| aggregator.push(tx))
            .collect();
        let summary = aggregator.finish();

        let diagnostics = Diagnostics {
            rows_extracted,
            rows_rejected: outcome.rejected,
            transactions: transactions.len(),
        };
        tracing::info!(
            %statement_id,
            ?format,
            rows = diagnostics.rows_extracted,
            rejected = diagnostics.rows_rejected,
            transactions = diagnostics.transactions,
            "statement analysed"
        );

        Ok(Analysis { statement_id, transactions, summary, diagnostics })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::MockExtractor;
    use chrono::NaiveDate;
    use moneyleaks_core::{Category, Money, MonthKey, TransactionType, ALL_CATEGORIES};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const SCENARIO_B_LINE: &str =
        "01 Oct, 2025 UPI/DEVRAJ VERMA/29xxxx/Sent using Paytm UPI-527431570952 -135.00 20,127.38";

    fn ctx() -> MapContext {
        MapContext::new(NaiveDate::from_ymd_opt(2025, 11, 2).unwrap())
    }

    fn pipeline(pdf_text: &str) -> StatementPipeline<MockExtractor> {
        StatementPipeline::new(Arc::new(MockExtractor::new(pdf_text)))
    }

    fn csv_upload(body: &str) -> Upload {
        Upload {
            filename: Some("statement.csv".into()),
            content_type: Some("text/csv".into()),
            bytes: body.as_bytes().to_vec(),
        }
    }

    fn pdf_upload() -> Upload {
        Upload {
            filename: Some("statement.pdf".into()),
            content_type: Some("application/pdf".into()),
            bytes: b"%PDF-1.4 fake".to_vec(),
        }
    }

    // ── scenarios ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn delimited_single_food_order() {
        let upload = csv_upload("Date,Description,Amount,Type\n01-10-2025,SWIGGY ORDER,450,Debit\n");
        let a = pipeline("").analyze(upload, &ctx()).await.unwrap();

        assert_eq!(a.transactions.len(), 1);
        let tx = &a.transactions[0];
        assert_eq!(tx.category, Category::FoodDelivery);
        assert_eq!(tx.amount, Money::from(450));
        assert_eq!(a.summary.by_category[&Category::FoodDelivery], Money::from(450));
        assert_eq!(a.summary.leaks.food_delivery, Money::from(450));
    }

    #[tokio::test]
    async fn pdf_upi_line_is_named_debit() {
        let a = pipeline(SCENARIO_B_LINE).analyze(pdf_upload(), &ctx()).await.unwrap();

        assert_eq!(a.transactions.len(), 1);
        let tx = &a.transactions[0];
        assert!(tx.description.contains("DEVRAJ VERMA"));
        assert_eq!(tx.amount.as_decimal(), Decimal::from_str("135.00").unwrap());
        assert_eq!(tx.tx_type, TransactionType::Debit);
        assert_eq!(tx.merchant.as_deref(), Some("DEVRAJ VERMA"));
        assert_eq!(tx.category, Category::Transfer);
        // Transfers never rank as merchants.
        assert!(a.summary.top_merchants.is_empty());
    }

    #[tokio::test]
    async fn zero_amount_row_is_dropped() {
        let upload = csv_upload(
            "Date,Description,Amount,Type\n\
             01-10-2025,SWIGGY ORDER,450,Debit\n\
             02-10-2025,REVERSAL,0.00,Debit\n\
             03-10-2025,NETFLIX,649,Debit\n",
        );
        let a = pipeline("").analyze(upload, &ctx()).await.unwrap();
        assert_eq!(a.transactions.len(), 2);
        assert_eq!(
            a.diagnostics,
            Diagnostics { rows_extracted: 3, rows_rejected: 1, transactions: 2 }
        );
    }

    #[tokio::test]
    async fn two_months_are_partitioned() {
        let upload = csv_upload(
            "Date,Description,Amount,Type\n\
             28-09-2025,SALARY,50000,Credit\n\
             29-09-2025,HOUSE RENT,15000,Debit\n\
             02-10-2025,SWIGGY,400,Debit\n",
        );
        let a = pipeline("").analyze(upload, &ctx()).await.unwrap();
        let monthly: Vec<(String, Money, Money)> = a
            .summary
            .monthly
            .iter()
            .map(|(k, v)| (k.to_string(), v.income, v.spending))
            .collect();
        assert_eq!(
            monthly,
            [
                ("2025-09".to_string(), Money::from(50_000), Money::from(15_000)),
                ("2025-10".to_string(), Money::zero(), Money::from(400)),
            ]
        );
    }

    #[tokio::test]
    async fn empty_file_is_no_rows() {
        let err = pipeline("").analyze(csv_upload("\n\n  \n"), &ctx()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NoRowsExtracted));

        let err = pipeline("Page 1 of 1\nThank you for banking with us")
            .analyze(pdf_upload(), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NoRowsExtracted));
    }

    #[tokio::test]
    async fn all_rows_rejected_is_an_error() {
        let upload = csv_upload("Date,Description,Amount\n01-10-2025,X,abc\n02-10-2025,Y,0\n");
        let err = pipeline("").analyze(upload, &ctx()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NoValidTransactions { rejected: 2 }));
    }

    #[tokio::test]
    async fn extractor_failure_is_reported() {
        struct Broken;
        impl TextExtractor for Broken {
            fn extract_text(&self, _: &[u8]) -> Result<String, ExtractError> {
                Err(ExtractError::Failed("Syntax Error: Couldn't find trailer dictionary".into()))
            }
        }
        let p = StatementPipeline::new(Arc::new(Broken));
        let err = p.analyze(pdf_upload(), &ctx()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::ExternalExtractionFailure(_)));
    }

    // ── invariants ────────────────────────────────────────────────────────────

    const MIXED: &str = "\
Txn Date;Narration;Withdrawal Amt.;Cr/Dr
01/10/2025;SALARY ACME;80,000.00;CR
02/10/2025;UPI/RAVI/123456/rent;12,000.00;DR
03/10/2025;ZOMATO ORDER;-350.50;DR
04/10/2025;NETFLIX.COM;649.00;DR
05/10/2025;SMS CHARGES;15.00;DR
06/10/2025;REFUND SWIGGY;120.00;CR
07/11/2025;AMAZON PAY;2,499.00;DR
08/11/2025;NEFT-STAR WINE PEACE-ABC123;1,200.00;DR
";

    #[tokio::test]
    async fn pipeline_invariants_hold() {
        let a = pipeline("").analyze(csv_upload(MIXED), &ctx()).await.unwrap();
        let s = &a.summary;

        assert_eq!(a.transactions.len(), 8);
        for tx in &a.transactions {
            assert!(!tx.amount.is_negative());
            assert!(ALL_CATEGORIES.contains(&tx.category));
            if tx.is_credit() {
                assert_eq!(tx.category, Category::Income);
            }
        }

        let by_category: Money = s.by_category.values().copied().sum();
        assert_eq!(by_category, s.total_income + s.total_spending);
        assert_eq!(s.net, s.total_income - s.total_spending);
        assert_eq!(s.by_category.len(), ALL_CATEGORIES.len());

        assert!(s.top_merchants.len() <= 10);
        assert!(s.top_merchants.windows(2).all(|w| w[0].amount >= w[1].amount));
        for m in &s.top_merchants {
            let contributors: Vec<_> = a
                .transactions
                .iter()
                .filter(|t| t.merchant.as_deref() == Some(m.merchant.as_str()))
                .collect();
            assert!(contributors.iter().any(|t| t.is_debit() && t.category != Category::Transfer));
        }
    }

    #[tokio::test]
    async fn same_bytes_same_summary() {
        let p = pipeline("");
        let first = p.analyze(csv_upload(MIXED), &ctx()).await.unwrap();
        let second = p.analyze(csv_upload(MIXED), &ctx()).await.unwrap();
        assert_eq!(first.statement_id, second.statement_id);
        assert_eq!(
            serde_json::to_string(&first.summary).unwrap(),
            serde_json::to_string(&second.summary).unwrap()
        );
    }

    #[test]
    fn missing_date_uses_processing_date() {
        let a = pipeline("")
            .analyze_text(
                "id".into(),
                "Description,Amount\nCHAI POINT,80\n",
                UploadFormat::Delimited,
                &ctx(),
            )
            .unwrap();
        assert_eq!(a.transactions[0].date, "2025-11-02");
        assert!(a.summary.monthly.contains_key(&"2025-11".parse::<MonthKey>().unwrap()));
    }

    #[test]
    fn custom_rules_apply() {
        let rules = CategoryRuleEngine::from_toml(
            "[[rules]]\nname = \"tea\"\npattern = \"chai\"\ncategory = \"FOOD_DELIVERY\"\n",
        )
        .unwrap();
        let a = pipeline("")
            .with_rules(rules)
            .analyze_text(
                "id".into(),
                "Date,Description,Amount\n01-10-2025,CHAI POINT,80\n",
                UploadFormat::Delimited,
                &ctx(),
            )
            .unwrap();
        assert_eq!(a.transactions[0].category, Category::FoodDelivery);
    }

    #[test]
    fn fixed_delimiter_beats_sniffing() {
        // Two commas tie two pipes in the header, so sniffing would pick ','.
        let text = "Date|Payee, Notes, Ref|Value\n01-10-2025|SWIGGY, BLR, 1|450\n";
        let sniffed = pipeline("")
            .analyze_text("id".into(), text, UploadFormat::Delimited, &ctx())
            .unwrap();
        assert_eq!(sniffed.transactions[0].description, "BLR");

        let a = pipeline("")
            .with_delimited_options(DelimitedOptions { delimiter: Some(b'|') })
            .analyze_text("id".into(), text, UploadFormat::Delimited, &ctx())
            .unwrap();
        assert_eq!(a.transactions[0].amount, Money::from(450));
        assert_eq!(a.transactions[0].category, Category::FoodDelivery);
    }

    #[test]
    fn analysis_serialises_camel_case() {
        let a = pipeline("")
            .analyze_text(
                "abc".into(),
                "Date,Description,Amount,Type\n01-10-2025,SWIGGY ORDER,450,Debit\n",
                UploadFormat::Delimited,
                &ctx(),
            )
            .unwrap();
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["statementId"], "abc");
        assert_eq!(json["diagnostics"]["rowsExtracted"], 1);
        assert_eq!(json["transactions"][0]["type"], "DEBIT");
        assert_eq!(json["transactions"][0]["category"], "FOOD_DELIVERY");
        assert_eq!(json["summary"]["byCategory"]["FOOD_DELIVERY"], 450.0);
    }
}
