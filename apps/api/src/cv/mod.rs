// CV generation: profile -> HTML -> PDF, behind one failure boundary.
// The orchestrator owns no data; each call gets its own context and engine process.

pub mod handlers;
pub mod pipeline;

pub use pipeline::{CvPipeline, PipelineError};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// The only failure text a caller ever sees besides "Profile not found".
pub const GENERIC_FAILURE: &str = "Could not generate CV. Please try again.";
