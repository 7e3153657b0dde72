use std::time::Duration;

use bot_detect_signal::SignalPattern;

use crate::expr::{Expr, LeafCondition, Transition, TransitionAction};
use crate::policy::{Policy, PolicyBuilder};
use crate::registry::PolicyRegistry;

const FAST_PATH: [&str; 5] =
    ["fast_path_signature", "reputation_fastpath", "ua_pattern", "tcp_fingerprint", "geo_ip"];
const SLOW_PATH: [&str; 6] = [
    "reputation_bias",
    "header_consistency",
    "behavioral_timing",
    "handshake_storm",
    "honeypot_path",
    "security_tool_ua",
];
const AI_PATH: [&str; 1] = ["llm_intent_classifier"];

fn block_when_high_risk(priority: i32) -> Transition {
    Transition {
        name: "block-high-risk".into(),
        condition: Expr::And(vec![
            Expr::Leaf(LeafCondition::RiskExceeds(0.8)),
            Expr::Leaf(LeafCondition::ConfidenceAtLeast(0.5)),
        ]),
        action: TransitionAction::Block,
        priority,
    }
}

fn escalate_to_slow_path(priority: i32, threshold: f64) -> Transition {
    Transition {
        name: "escalate-slow-path".into(),
        condition: Expr::Leaf(LeafCondition::RiskExceeds(threshold)),
        action: TransitionAction::EscalateToSlowPath,
        priority,
    }
}

fn allow_when_low_risk(priority: i32) -> Transition {
    Transition {
        name: "allow-low-risk".into(),
        condition: Expr::Leaf(LeafCondition::RiskBelow(0.2)),
        action: TransitionAction::Allow,
        priority,
    }
}

fn honeypot_forces_block(priority: i32) -> Transition {
    Transition {
        name: "honeypot-block".into(),
        condition: Expr::Leaf(LeafCondition::Signal(SignalPattern::compile("response.honeypot"))),
        action: TransitionAction::Block,
        priority,
    }
}

/// The built-in `default` policy: a balanced recipe matching §4.4's
/// named built-ins.
pub fn default_policy() -> Policy {
    PolicyBuilder::new("default")
        .fast_path(FAST_PATH)
        .slow_path(SLOW_PATH)
        .ai_path(AI_PATH)
        .early_exit_threshold(0.9)
        .immediate_block_threshold(0.95)
        .ai_escalation_threshold(0.55)
        .min_confidence(0.5)
        .timeout_budget(Duration::from_millis(25))
        .parallelism(8)
        .transition(block_when_high_risk(100))
        .transition(escalate_to_slow_path(90, 0.35))
        .transition(allow_when_low_risk(10))
        .build()
}

/// `strict`: lower thresholds, blocks sooner, used on sensitive paths.
pub fn strict_policy() -> Policy {
    PolicyBuilder::new("strict")
        .fast_path(FAST_PATH)
        .slow_path(SLOW_PATH)
        .ai_path(AI_PATH)
        .early_exit_threshold(0.7)
        .immediate_block_threshold(0.8)
        .ai_escalation_threshold(0.4)
        .min_confidence(0.4)
        .timeout_budget(Duration::from_millis(40))
        .parallelism(8)
        .transition(Transition {
            name: "strict-block-high-risk".into(),
            condition: Expr::And(vec![
                Expr::Leaf(LeafCondition::RiskExceeds(0.65)),
                Expr::Leaf(LeafCondition::ConfidenceAtLeast(0.4)),
            ]),
            action: TransitionAction::Block,
            priority: 100,
        })
        .transition(escalate_to_slow_path(90, 0.25))
        .transition(honeypot_forces_block(95))
        .build()
}

/// `relaxed`: higher thresholds, throttles instead of blocking,
/// appropriate for low-value public endpoints.
pub fn relaxed_policy() -> Policy {
    PolicyBuilder::new("relaxed")
        .fast_path(FAST_PATH)
        .slow_path(SLOW_PATH)
        .ai_path(AI_PATH)
        .early_exit_threshold(0.95)
        .immediate_block_threshold(0.98)
        .ai_escalation_threshold(0.7)
        .min_confidence(0.6)
        .timeout_budget(Duration::from_millis(15))
        .parallelism(8)
        .transition(Transition {
            name: "relaxed-throttle-high-risk".into(),
            condition: Expr::Leaf(LeafCondition::RiskExceeds(0.85)),
            action: TransitionAction::Throttle,
            priority: 100,
        })
        .transition(allow_when_low_risk(10))
        .build()
}

/// `allowVerifiedBots`: same thresholds as default but with a transition
/// that lets a confirmed-good reputation state short-circuit to allow —
/// used on endpoints search engines and monitoring services must reach.
pub fn allow_verified_bots_policy() -> Policy {
    PolicyBuilder::new("allowVerifiedBots")
        .fast_path(FAST_PATH)
        .slow_path(SLOW_PATH)
        .ai_path(AI_PATH)
        .early_exit_threshold(0.9)
        .immediate_block_threshold(0.95)
        .ai_escalation_threshold(0.55)
        .min_confidence(0.5)
        .timeout_budget(Duration::from_millis(25))
        .parallelism(8)
        .transition(Transition {
            name: "verified-good-allow".into(),
            condition: Expr::Leaf(LeafCondition::ReputationState("ConfirmedGood".into())),
            action: TransitionAction::Allow,
            priority: 110,
        })
        .transition(block_when_high_risk(100))
        .transition(escalate_to_slow_path(90, 0.35))
        .build()
}

/// Builds a registry pre-populated with the four built-in policies and a
/// default path mapping (`/**` → `default`).
pub fn builtin_registry() -> PolicyRegistry {
    let mut registry = PolicyRegistry::new(default_policy());
    registry.add_policy(strict_policy());
    registry.add_policy(relaxed_policy());
    registry.add_policy(allow_verified_bots_policy());
    registry.map_path("/**", "default");
    registry
}
