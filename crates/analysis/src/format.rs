use std::path::Path;

/// How an uploaded file is turned into rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Delimited,
    PdfText,
}

impl UploadFormat {
    /// `.pdf` files and PDF content types go through text extraction;
    /// everything else is treated as delimited text.
    pub fn detect(filename: Option<&str>, content_type: Option<&str>) -> Self {
        let pdf_extension = filename
            .and_then(|f| Path::new(f).extension())
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        let pdf_content_type = content_type
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"));

        if pdf_extension || pdf_content_type {
            UploadFormat::PdfText
        } else {
            UploadFormat::Delimited
        }
    }
}
