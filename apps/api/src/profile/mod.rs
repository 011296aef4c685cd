// Profile data access and aggregation into the template-ready RenderContext.
// Read-only: nothing in this module writes to the profile tables.

pub mod aggregator;
pub mod context;
pub mod store;

pub use aggregator::{AggregateError, ProfileAggregator, ProjectSelection};
pub use context::RenderContext;
pub use store::PgProfileStore;
