pub mod orchestrator;
pub mod pager;
pub mod reconcile;

pub use orchestrator::{Importer, ImportSummary};
pub use pager::Paginator;
pub use reconcile::Reconciler;
