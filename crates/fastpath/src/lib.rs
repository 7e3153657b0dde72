//! Multi-factor instant match run before the main detector pipeline.
//! Keeps a sparse in-process index keyed by salted HMAC so neither raw
//! IPs nor raw user agents ever sit in memory.

mod factors;
mod matcher;
mod store;

pub use factors::{FactorHashes, IdentityInputs};
pub use matcher::{FastPathSignatureMatcher, MatchOutcome};
pub use store::StoredSignature;
