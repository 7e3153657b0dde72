//! Post-response analysis: PII masking, honeypot substitution, and the
//! final per-operation summary raised onto the global signal sink.

mod coordinator;
mod pii;
mod types;

pub use coordinator::{ResponseDetectionCoordinator, ResponseInput};
pub use types::{OperationSummary, ResponseAction, ResponseAnalysisContext, ResponseMode, Thoroughness, MAX_BLOCKING_DURATION, MAX_BUFFER_BYTES};
