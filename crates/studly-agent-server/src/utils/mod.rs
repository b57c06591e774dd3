pub mod error;
pub mod logger;

pub use error::AgentError;
pub use logger::init_logger;
