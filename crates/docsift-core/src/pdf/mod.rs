//! Heuristic PDF text recovery over raw bytes.

mod extractor;
pub mod literal;
pub mod strategies;

pub use extractor::PdfExtractor;
pub use strategies::RecoveryStrategy;
