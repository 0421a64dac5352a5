pub mod config;
pub mod error;
pub mod gateway;
pub mod llm;
pub mod payments;
pub mod server;
pub mod validation;

pub use error::{Error, Result, ServiceError};
