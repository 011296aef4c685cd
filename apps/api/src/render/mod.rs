// Template Renderer: RenderContext -> complete HTML document.
// Helpers are installed from an explicit HelperRegistry; no global Tera instance.

pub mod helpers;
pub mod renderer;

pub use helpers::HelperRegistry;
pub use renderer::{CvRenderer, TemplateError, DEFAULT_TEMPLATE};
