use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF text extractor not available: {0}")]
    NotAvailable(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("PDF text extraction failed: {0}")]
    Failed(String),
}

/// Abstraction over a PDF-to-text collaborator.
/// Implementations accept raw PDF bytes and return plain text with one
/// statement line per text line. Calls may block.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractError>;
}

// ── Mock extractor (always available, used for tests) ─────────────────────────

/// Returns a pre-set string regardless of input.
pub struct MockExtractor {
    pub text: String,
}

impl MockExtractor {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TextExtractor for MockExtractor {
    fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<String, ExtractError> {
        Ok(self.text.clone())
    }
}

/// Stands in when no extraction binary could be found; every call fails.
pub struct UnavailableExtractor {
    reason: String,
}

impl UnavailableExtractor {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl TextExtractor for UnavailableExtractor {
    fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<String, ExtractError> {
        Err(ExtractError::NotAvailable(self.reason.clone()))
    }
}

// ── pdftotext (poppler-utils) ─────────────────────────────────────────────────

const PDFTOTEXT: &str = "pdftotext";

/// Runs `pdftotext -layout - -`, feeding the PDF on stdin.
pub struct PdftotextExtractor {
    program: PathBuf,
}

impl PdftotextExtractor {
    /// Use an explicit binary, or find `pdftotext` on `PATH`.
    pub fn new(program: Option<PathBuf>) -> Result<Self, ExtractError> {
        let program = match program {
            Some(path) => path,
            None => which::which(PDFTOTEXT).map_err(|_| {
                ExtractError::NotAvailable(format!("{PDFTOTEXT} not installed (poppler-utils)"))
            })?,
        };
        Ok(Self { program })
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

impl TextExtractor for PdftotextExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractError> {
        let mut child = Command::new(&self.program)
            .args(["-layout", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    ExtractError::NotAvailable(self.program.display().to_string())
                }
                _ => ExtractError::Io(e),
            })?;

        // Write from a separate thread so a full stdout pipe cannot deadlock us.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExtractError::Failed("stdin not captured".to_string()))?;
        let input = pdf_bytes.to_vec();
        let writer = std::thread::spawn(move || stdin.write_all(&input));

        let output = child.wait_with_output()?;
        let written = writer.join();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Failed(format!(
                "{} exited with {}: {}",
                PDFTOTEXT,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        check_stdin_write(written)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// A clean exit after a failed stdin write means the tool read a truncated
/// PDF. A broken pipe only says it stopped reading early, which is fine.
fn check_stdin_write(written: std::thread::Result<io::Result<()>>) -> Result<(), ExtractError> {
    match written {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Ok(Err(e)) => Err(ExtractError::Io(e)),
        Err(_) => Err(ExtractError::Failed("stdin writer thread panicked".to_string())),
    }
}
