pub mod caller;
pub mod rate_limit;

pub use caller::{CallerAddress, CALLER_HEADER};
