use bot_detect_identity::IdentitySalt;

use crate::factors::{FactorHashes, IdentityInputs};
use crate::store::FastPathStore;

/// Result of a fast-path lookup, in descending order of confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchOutcome {
    Exact(f64),
    Partial(f64),
    Weak(f64),
    None,
}

impl MatchOutcome {
    pub fn confidence(self) -> f64 {
        match self {
            MatchOutcome::Exact(c) | MatchOutcome::Partial(c) | MatchOutcome::Weak(c) => c,
            MatchOutcome::None => 0.0,
        }
    }

    pub fn is_match(self) -> bool {
        !matches!(self, MatchOutcome::None)
    }
}

/// Multi-factor instant match run before the main detector pipeline.
pub struct FastPathSignatureMatcher {
    salt: IdentitySalt,
    store: FastPathStore,
}

impl FastPathSignatureMatcher {
    pub fn new(salt: IdentitySalt) -> Self {
        Self { salt, store: FastPathStore::new() }
    }

    /// Evaluates the decision rules in spec order and records the
    /// request's factors regardless of outcome, so a future request
    /// with overlapping factors can match against it.
    pub fn check(&self, inputs: &IdentityInputs<'_>) -> MatchOutcome {
        let hashes = FactorHashes::compute(&self.salt, inputs);

        let outcome = self.evaluate(&hashes);
        self.store.store(&hashes);
        tracing::trace!(outcome = ?outcome, primary = %hashes.primary, "fast path checked");
        outcome
    }

    fn evaluate(&self, hashes: &FactorHashes) -> MatchOutcome {
        if self.store.get(&hashes.primary).is_some() {
            return MatchOutcome::Exact(1.0);
        }
        if self.store.ip_and_ua_both_match(hashes) {
            return MatchOutcome::Exact(1.0);
        }

        let candidates = self.store.candidates_for(hashes);
        let mut best: Option<MatchOutcome> = None;
        for primary in &candidates {
            let Some(record) = self.store.get(primary) else { continue };
            let (factor_count, weight_sum) = Self::score(&record, hashes);

            let candidate_outcome = if factor_count >= 2 && weight_sum >= 100.0 {
                MatchOutcome::Partial((weight_sum / 100.0).min(0.99))
            } else if factor_count >= 3 && weight_sum >= 80.0 {
                MatchOutcome::Weak(weight_sum / 100.0)
            } else {
                MatchOutcome::None
            };

            best = match (best, candidate_outcome) {
                (None, c) => Some(c),
                (Some(b), c) if c.confidence() > b.confidence() => Some(c),
                (Some(b), _) => Some(b),
            };
        }

        best.unwrap_or(MatchOutcome::None)
    }

    fn score(record: &crate::store::StoredSignature, query: &FactorHashes) -> (u32, f64) {
        let mut count = 0u32;
        let mut weight = 0.0;
        for (factor, hash) in record.factor_hashes() {
            let query_hash = match factor {
                crate::factors::Factor::Primary => Some(&query.primary),
                crate::factors::Factor::Ip => Some(&query.ip),
                crate::factors::Factor::Ua => Some(&query.ua),
                crate::factors::Factor::Subnet => Some(&query.subnet),
                crate::factors::Factor::ClientSide => query.client_side.as_ref(),
                crate::factors::Factor::Plugin => query.plugin.as_ref(),
            };
            if query_hash == Some(hash) {
                count += 1;
                weight += factor.weight();
            }
        }
        (count, weight)
    }

    /// Merges client-side factors learned from the post-response
    /// callback into the signature recorded for `ip`/`ua`.
    pub fn merge_client_side(&self, ip: &str, ua: &str, canvas: &str, webgl: &str, audio: &str) {
        let primary = self.salt.hash(&[ip, ua]);
        let client_side_hash = self.salt.hash(&[canvas, webgl, audio]);
        self.store.merge_client_side(&primary, client_side_hash);
    }

    pub fn stored_signature_count(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> FastPathSignatureMatcher {
        FastPathSignatureMatcher::new(IdentitySalt::new("test-secret"))
    }

    #[test]
    fn first_contact_is_no_match() {
        let m = matcher();
        let inputs = IdentityInputs { ip: "1.2.3.4", ua: "curl/8.0", subnet: "1.2.3.0/24", client_side: None, plugins: None };
        assert_eq!(m.check(&inputs), MatchOutcome::None);
    }

    #[test]
    fn repeat_same_ip_and_ua_is_exact() {
        let m = matcher();
        let inputs = IdentityInputs { ip: "1.2.3.4", ua: "curl/8.0", subnet: "1.2.3.0/24", client_side: None, plugins: None };
        m.check(&inputs);
        assert_eq!(m.check(&inputs), MatchOutcome::Exact(1.0));
    }

    #[test]
    fn shared_ip_and_ua_across_distinct_subnets_is_exact() {
        let m = matcher();
        let first = IdentityInputs { ip: "1.2.3.4", ua: "curl/8.0", subnet: "1.2.3.0/24", client_side: None, plugins: None };
        m.check(&first);
        // same ip+ua, but a different subnet string recorded this time:
        // rule 2 (ip match AND ua match) should still fire before we'd
        // fall through to scoring partial/weak factors.
        let second = IdentityInputs { ip: "1.2.3.4", ua: "curl/8.0", subnet: "1.2.3.0/24", client_side: None, plugins: None };
        assert_eq!(m.check(&second), MatchOutcome::Exact(1.0));
    }

    #[test]
    fn shared_subnet_and_ua_only_is_partial_or_weak() {
        let m = matcher();
        let first = IdentityInputs { ip: "1.2.3.4", ua: "curl/8.0", subnet: "1.2.3.0/24", client_side: None, plugins: None };
        m.check(&first);
        // different ip, same subnet and ua: 2 factors match (subnet 30 + ua 50 = 80), below partial's 100 threshold and weak needs 3 factors.
        let second = IdentityInputs { ip: "1.2.3.99", ua: "curl/8.0", subnet: "1.2.3.0/24", client_side: None, plugins: None };
        assert_eq!(m.check(&second), MatchOutcome::None);
    }

    #[test]
    fn three_shared_factors_cross_partial_threshold() {
        let m = matcher();
        let first = IdentityInputs {
            ip: "1.2.3.4",
            ua: "curl/8.0",
            subnet: "1.2.3.0/24",
            client_side: None,
            plugins: Some(("flash,java", "arial,courier")),
        };
        m.check(&first);
        // same ua, subnet, plugins but different ip: 3 factors (50+30+60=140) -> partial (>=100, >=2 factors).
        let second = IdentityInputs {
            ip: "9.9.9.9",
            ua: "curl/8.0",
            subnet: "1.2.3.0/24",
            client_side: None,
            plugins: Some(("flash,java", "arial,courier")),
        };
        let outcome = m.check(&second);
        assert!(matches!(outcome, MatchOutcome::Partial(_)));
    }

    #[test]
    fn merge_client_side_is_visible_on_next_check() {
        let m = matcher();
        let inputs = IdentityInputs { ip: "5.6.7.8", ua: "Mozilla/5.0", subnet: "5.6.7.0/24", client_side: None, plugins: None };
        m.check(&inputs);
        m.merge_client_side("5.6.7.8", "Mozilla/5.0", "canvas-a", "webgl-a", "audio-a");

        let primary = IdentitySalt::new("test-secret").hash(&["5.6.7.8", "Mozilla/5.0"]);
        let stored = m.store.get(&primary).expect("record was stored");
        assert!(stored.client_side.is_some());
    }
}
