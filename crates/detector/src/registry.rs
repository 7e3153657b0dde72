use std::collections::HashMap;
use std::sync::Arc;

use bot_detect_signal::{SignalKey, SignalPattern};
use tracing::warn;

use crate::contract::Detector;

/// Static metadata about a registered detector, independent of any one
/// policy. Detector code registers itself behind a stable `name`; a
/// policy then refers to detectors by that name.
#[derive(Clone)]
pub struct DetectorManifest {
    pub name: String,
    pub priority: i32,
    pub wave: u32,
    pub triggers: Vec<SignalPattern>,
    pub emitted: Vec<SignalKey>,
    pub default_weight: f64,
    pub enabled: bool,
    pub required: bool,
}

struct Registration {
    manifest: DetectorManifest,
    detector: Arc<dyn Detector>,
}

/// Enumerates detectors with their manifests and hands back the ordered
/// subset a given policy should run.
#[derive(Default)]
pub struct DetectorRegistry {
    by_name: HashMap<String, Registration>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, manifest: DetectorManifest, detector: Arc<dyn Detector>) {
        self.by_name.insert(manifest.name.clone(), Registration { manifest, detector });
    }

    pub fn manifest(&self, name: &str) -> Option<&DetectorManifest> {
        self.by_name.get(name).map(|r| &r.manifest)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn all_names(&self) -> Vec<&str> {
        self.by_name.keys().map(|s| s.as_str()).collect()
    }

    /// Returns detectors named in `names`, ordered by `(wave, priority)`.
    /// Unknown names are logged and skipped rather than failing the
    /// whole lookup — startup-fatal handling for `required` detectors is
    /// the caller's job (policy load time), not this method's.
    pub fn detectors_for(&self, names: &[String]) -> Vec<(DetectorManifest, Arc<dyn Detector>)> {
        let mut resolved: Vec<(DetectorManifest, Arc<dyn Detector>)> = names
            .iter()
            .filter_map(|name| match self.by_name.get(name) {
                Some(reg) if reg.manifest.enabled => {
                    Some((reg.manifest.clone(), reg.detector.clone()))
                }
                Some(_) => None,
                None => {
                    warn!(detector = %name, "policy references unknown detector, skipping");
                    None
                }
            })
            .collect();
        resolved.sort_by(|a, b| (a.0.wave, a.0.priority).cmp(&(b.0.wave, b.0.priority)));
        resolved
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
