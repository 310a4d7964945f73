//! Document Reading and Analysis
//!
//! - `reader` - Reads uploaded images into structured extractions
//! - `cross_check` - Consistency checks across extractions
//! - `analyzer` - Verifies extractions against a requirements checklist

pub mod analyzer;
pub mod cross_check;
pub mod reader;

pub use analyzer::DocumentAnalyzerTask;
pub use cross_check::{cross_check, CrossCheck};
pub use reader::{DocumentReaderTask, ReaderOutput};
