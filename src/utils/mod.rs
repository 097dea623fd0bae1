pub mod log_buffer;
pub mod logging;
pub mod wait;

pub use log_buffer::{LogBatch, LogBuffer, LogEntry};
pub use wait::{poll_until, wait_until};
