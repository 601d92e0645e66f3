//! Caller-driven cancellation of extraction requests.

mod token;

pub use token::CancellationToken;
