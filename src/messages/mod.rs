pub mod log;
pub mod types;

pub use log::MessageLog;
pub use types::{Author, Message};
