pub mod logging;

pub use logging::{init_logging, init_logging_with_level};
