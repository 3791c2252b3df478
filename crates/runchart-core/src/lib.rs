pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::AppConfig;
pub use error::{Result, RunchartError};
pub use traits::CommandRunner;
pub use types::*;
