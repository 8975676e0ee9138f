pub mod error;
pub mod scheduled_executor;
pub mod similarity;

pub use error::{ApiError, ApiResult};
pub use scheduled_executor::{ScheduledExecutor, ScheduledTask};
pub use similarity::lcs_ratio;
