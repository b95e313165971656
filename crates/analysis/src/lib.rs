pub mod advice;
pub mod aggregate;
pub mod extractor;
pub mod format;
pub mod hash;
pub mod pipeline;

pub use advice::{build_prompt, local_advice};
pub use aggregate::{summarize, Aggregator};
pub use extractor::{
    ExtractError, MockExtractor, PdftotextExtractor, TextExtractor, UnavailableExtractor,
};
pub use format::UploadFormat;
pub use hash::{sha256_bytes, statement_id, to_hex};
pub use pipeline::{Analysis, AnalysisError, Diagnostics, StatementPipeline, Upload};
