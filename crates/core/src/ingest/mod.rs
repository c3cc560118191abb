pub mod provider;
pub mod retry;
pub mod types;

pub use provider::{EastmoneyQuoteClient, QuoteSource};
pub use retry::RetryPolicy;
