pub mod client;
pub mod error;
pub mod models;
pub mod parser;

pub use client::RcloneClient;
pub use error::{ToolError, Result};
pub use models::*;
