pub mod retry;
pub mod tolerance;

pub use retry::RetryStrategy;
pub use tolerance::{Attempt, ToleranceStrategy};
