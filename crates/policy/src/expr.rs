use bot_detect_signal::{SignalPattern, SignalSink};

/// The evaluation-time facts a compiled transition expression can see.
/// Built fresh after every wave.
pub struct EvalContext<'a> {
    pub bot_probability: f64,
    pub confidence: f64,
    pub sink: &'a SignalSink,
    pub reputation_state: Option<&'a str>,
}

/// A single, non-compound condition. Kept intentionally minimal per the
/// spec's "leaf conditions AND/OR'd, numeric comparisons, equality on
/// enums" grammar.
#[derive(Clone)]
pub enum LeafCondition {
    RiskExceeds(f64),
    RiskBelow(f64),
    ConfidenceAtLeast(f64),
    Signal(SignalPattern),
    ReputationState(String),
}

impl LeafCondition {
    fn eval(&self, ctx: &EvalContext<'_>) -> bool {
        match self {
            LeafCondition::RiskExceeds(x) => ctx.bot_probability >= *x,
            LeafCondition::RiskBelow(x) => ctx.bot_probability < *x,
            LeafCondition::ConfidenceAtLeast(x) => ctx.confidence >= *x,
            LeafCondition::Signal(pattern) => ctx.sink.has_match(pattern.clone()),
            LeafCondition::ReputationState(state) => {
                ctx.reputation_state.map(|s| s == state).unwrap_or(false)
            }
        }
    }
}

/// A pre-compiled boolean expression over leaf conditions.
#[derive(Clone)]
pub enum Expr {
    Leaf(LeafCondition),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn eval(&self, ctx: &EvalContext<'_>) -> bool {
        match self {
            Expr::Leaf(l) => l.eval(ctx),
            Expr::And(parts) => parts.iter().all(|p| p.eval(ctx)),
            Expr::Or(parts) => parts.iter().any(|p| p.eval(ctx)),
        }
    }
}

/// The action side of a transition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TransitionAction {
    Allow,
    LogOnly,
    Challenge,
    Throttle,
    Block,
    EscalateToSlowPath,
    EscalateToAi,
    GoTo(String),
}

/// `condition → action or policy name`, evaluated in priority order
/// after each wave.
#[derive(Clone)]
pub struct Transition {
    pub name: String,
    pub condition: Expr,
    pub action: TransitionAction,
    pub priority: i32,
}

impl Transition {
    pub fn matches(&self, ctx: &EvalContext<'_>) -> bool {
        self.condition.eval(ctx)
    }
}
