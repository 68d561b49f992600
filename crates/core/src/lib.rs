pub mod config;
pub mod error;
pub mod process;

pub use config::Config;
pub use error::*;
pub use process::*;
