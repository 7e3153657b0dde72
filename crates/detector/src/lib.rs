//! The detector contract: the fixed, small interface leaf detectors
//! implement, plus the registry that enumerates them by manifest.

mod contract;
mod registry;
mod types;

pub use contract::{CoordinatorQuery, Detector, DetectorState, NullCoordinatorQuery};
pub use registry::{DetectorManifest, DetectorRegistry};
pub use types::{
    BotType, ClientFingerprint, DetectionContribution, DetectorClass, RequestSnapshot, Verified,
};
