pub mod config;
pub mod detector;
pub mod error;
pub mod period;

pub use config::{Config, OpenSearchConfig, ValidationSettings};
pub use detector::*;
pub use error::*;
pub use period::*;
