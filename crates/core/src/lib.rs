pub mod channel;
pub mod config;
pub mod error;
pub mod parser;
pub mod retry;
pub mod types;
