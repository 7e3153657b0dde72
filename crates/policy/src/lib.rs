//! Path-to-policy resolution, named policies, and the minimal
//! transition-expression grammar evaluated after each detection wave.

mod builtins;
mod expr;
mod policy;
mod registry;

pub use builtins::{
    allow_verified_bots_policy, builtin_registry, default_policy, relaxed_policy, strict_policy,
};
pub use expr::{EvalContext, Expr, LeafCondition, Transition, TransitionAction};
pub use policy::{Policy, PolicyBuilder};
pub use registry::PolicyRegistry;

#[cfg(test)]
mod tests {
    use super::*;
    use bot_detect_signal::SignalSink;

    #[test]
    fn longest_pattern_wins() {
        let mut registry = builtin_registry();
        registry.add_policy(PolicyBuilder::new("checkout").build());
        registry.map_path("/checkout/**", "checkout");

        assert_eq!(registry.resolve("/checkout/pay").name, "checkout");
        assert_eq!(registry.resolve("/home").name, "default");
    }

    #[test]
    fn resolution_is_pure() {
        let registry = builtin_registry();
        let a = registry.resolve("/anything").name.clone();
        let b = registry.resolve("/anything").name.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn transition_and_or_evaluates() {
        let sink = SignalSink::operation_scoped();
        let ctx = EvalContext { bot_probability: 0.9, confidence: 0.6, sink: &sink, reputation_state: None };
        let t = Transition {
            name: "t".into(),
            condition: Expr::And(vec![
                Expr::Leaf(LeafCondition::RiskExceeds(0.8)),
                Expr::Leaf(LeafCondition::ConfidenceAtLeast(0.5)),
            ]),
            action: TransitionAction::Block,
            priority: 1,
        };
        assert!(t.matches(&ctx));
    }
}
