use std::collections::HashMap;
use std::time::Duration;

use crate::expr::Transition;

/// A named detection recipe: which detectors run, their weights,
/// thresholds, and transition rules.
#[derive(Clone)]
pub struct Policy {
    pub name: String,
    pub fast_path: Vec<String>,
    pub slow_path: Vec<String>,
    pub ai_path: Vec<String>,
    pub per_detector_weight: HashMap<String, f64>,
    pub early_exit_threshold: f64,
    pub immediate_block_threshold: f64,
    pub ai_escalation_threshold: f64,
    pub min_confidence: f64,
    /// Baseline for the aggregator's coverage term (§4.5), default 3.0.
    pub coverage_baseline: f64,
    pub timeout_budget: Duration,
    pub parallelism: usize,
    pub transitions: Vec<Transition>,
}

impl Policy {
    pub fn weight_for(&self, detector_name: &str, default_weight: f64) -> f64 {
        self.per_detector_weight.get(detector_name).copied().unwrap_or(default_weight)
    }

    /// All detector names this policy can ever run across waves, in
    /// fast/slow/ai path order, used for startup validation.
    pub fn all_detector_names(&self) -> impl Iterator<Item = &String> {
        self.fast_path.iter().chain(self.slow_path.iter()).chain(self.ai_path.iter())
    }
}

pub struct PolicyBuilder {
    policy: Policy,
}

impl PolicyBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            policy: Policy {
                name: name.into(),
                fast_path: Vec::new(),
                slow_path: Vec::new(),
                ai_path: Vec::new(),
                per_detector_weight: HashMap::new(),
                early_exit_threshold: 0.9,
                immediate_block_threshold: 0.95,
                ai_escalation_threshold: 1.1, // > 1.0 means "never" unless overridden
                min_confidence: 0.5,
                coverage_baseline: 3.0,
                timeout_budget: Duration::from_millis(25),
                parallelism: 8,
                transitions: Vec::new(),
            },
        }
    }

    pub fn fast_path(mut self, detectors: impl IntoIterator<Item = &'static str>) -> Self {
        self.policy.fast_path = detectors.into_iter().map(String::from).collect();
        self
    }

    pub fn slow_path(mut self, detectors: impl IntoIterator<Item = &'static str>) -> Self {
        self.policy.slow_path = detectors.into_iter().map(String::from).collect();
        self
    }

    pub fn ai_path(mut self, detectors: impl IntoIterator<Item = &'static str>) -> Self {
        self.policy.ai_path = detectors.into_iter().map(String::from).collect();
        self
    }

    pub fn weight(mut self, detector: &str, weight: f64) -> Self {
        self.policy.per_detector_weight.insert(detector.to_string(), weight);
        self
    }

    pub fn early_exit_threshold(mut self, v: f64) -> Self {
        self.policy.early_exit_threshold = v;
        self
    }

    pub fn immediate_block_threshold(mut self, v: f64) -> Self {
        self.policy.immediate_block_threshold = v;
        self
    }

    pub fn ai_escalation_threshold(mut self, v: f64) -> Self {
        self.policy.ai_escalation_threshold = v;
        self
    }

    pub fn min_confidence(mut self, v: f64) -> Self {
        self.policy.min_confidence = v;
        self
    }

    pub fn timeout_budget(mut self, d: Duration) -> Self {
        self.policy.timeout_budget = d;
        self
    }

    pub fn parallelism(mut self, n: usize) -> Self {
        self.policy.parallelism = n;
        self
    }

    pub fn transition(mut self, t: Transition) -> Self {
        self.policy.transitions.push(t);
        self
    }

    pub fn build(mut self) -> Policy {
        self.policy.transitions.sort_by(|a, b| b.priority.cmp(&a.priority));
        self.policy
    }
}
