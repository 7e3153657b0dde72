use std::collections::HashMap;

use bot_detect_detector::DetectorRegistry;
use bot_detect_errors::PolicyConfigError;
use globset::Glob;

use crate::policy::Policy;

struct PathMapping {
    pattern: String,
    matcher: globset::GlobMatcher,
    policy_name: String,
}

/// Maps request paths to policy names (most-specific-wins) and holds the
/// named policies themselves. Resolution is pure: the same path against
/// the same registered set always returns the same policy.
pub struct PolicyRegistry {
    policies: HashMap<String, Policy>,
    path_mappings: Vec<PathMapping>,
    default_policy: String,
}

impl PolicyRegistry {
    pub fn new(default_policy: Policy) -> Self {
        let name = default_policy.name.clone();
        let mut policies = HashMap::new();
        policies.insert(name.clone(), default_policy);
        Self { policies, path_mappings: Vec::new(), default_policy: name }
    }

    pub fn add_policy(&mut self, policy: Policy) {
        self.policies.insert(policy.name.clone(), policy);
    }

    pub fn map_path(&mut self, pattern: &str, policy_name: &str) {
        if let Ok(glob) = Glob::new(pattern) {
            self.path_mappings.push(PathMapping {
                pattern: pattern.to_string(),
                matcher: glob.compile_matcher(),
                policy_name: policy_name.to_string(),
            });
        } else {
            tracing::warn!(pattern, "invalid path-to-policy glob, ignoring");
        }
    }

    /// Most-specific-wins: the longest matching pattern string. Ties are
    /// broken by registration order (first registered wins), keeping
    /// resolution deterministic.
    pub fn resolve(&self, path: &str) -> &Policy {
        let best = self
            .path_mappings
            .iter()
            .filter(|m| m.matcher.is_match(path))
            .max_by_key(|m| m.pattern.len());

        let name = best.map(|m| m.policy_name.as_str()).unwrap_or(&self.default_policy);
        self.policies.get(name).unwrap_or_else(|| &self.policies[&self.default_policy])
    }

    pub fn policy(&self, name: &str) -> Option<&Policy> {
        self.policies.get(name)
    }

    pub fn default_policy(&self) -> &Policy {
        &self.policies[&self.default_policy]
    }

    /// Startup validation: every detector a policy names (and every
    /// `GoTo` transition target) must resolve, or the engine refuses to
    /// start rather than silently run a degraded policy.
    pub fn validate_against(&self, registry: &DetectorRegistry) -> Result<(), PolicyConfigError> {
        if !self.policies.contains_key(&self.default_policy) {
            return Err(PolicyConfigError::MissingDefaultPolicy);
        }
        for policy in self.policies.values() {
            for detector_name in policy.all_detector_names() {
                if !registry.contains(detector_name) {
                    tracing::warn!(
                        policy = %policy.name,
                        detector = %detector_name,
                        "policy references unknown detector (non-required, skipping)"
                    );
                }
            }
            for transition in &policy.transitions {
                if let crate::expr::TransitionAction::GoTo(target) = &transition.action {
                    if !self.policies.contains_key(target) {
                        return Err(PolicyConfigError::InvalidTransition {
                            policy: policy.name.clone(),
                            reason: format!("GoTo target '{target}' is not a registered policy"),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
