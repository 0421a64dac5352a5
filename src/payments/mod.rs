mod storage;
mod types;

pub use storage::PaymentStorage;
pub use types::*;
