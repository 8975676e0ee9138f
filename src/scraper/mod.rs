pub mod backfill;
pub mod continuous;
pub mod kernel;

pub use backfill::BackfillJob;
pub use continuous::ContinuousJob;
pub use kernel::{process_item_batch, ScraperError};
