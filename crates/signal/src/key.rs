use std::fmt;

use globset::{GlobBuilder, GlobMatcher};

/// A dotted, immutable, comparable signal path, e.g. `transport.is_streaming`.
///
/// Keys never contain glob metacharacters themselves — those only appear in
/// [`SignalPattern`], the query side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct SignalKey(String);

impl SignalKey {
    pub fn new(dotted: impl Into<String>) -> Self {
        Self(dotted.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_path(&self) -> String {
        self.0.replace('.', "/")
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SignalKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SignalKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A compiled glob pattern over dotted [`SignalKey`] segments.
///
/// `*` matches exactly one segment; `**` matches zero or more segments.
/// Compilation happens once at construction so `Sense` stays O(1) per
/// candidate key rather than re-parsing the pattern on every call.
#[derive(Clone)]
pub struct SignalPattern {
    source: String,
    matcher: GlobMatcher,
}

impl SignalPattern {
    pub fn compile(pattern: impl Into<String>) -> Self {
        let source = pattern.into();
        let path_pattern = source.replace('.', "/");
        // `*` must stop at a segment boundary; `**` is always allowed to
        // cross them regardless of this setting, which is exactly the
        // `*` = one segment / `**` = any depth split the spec calls for.
        let glob = GlobBuilder::new(&path_pattern)
            .literal_separator(true)
            .build()
            .unwrap_or_else(|_| {
                GlobBuilder::new("__unmatchable__")
                    .literal_separator(true)
                    .build()
                    .expect("literal glob is valid")
            });
        Self { source, matcher: glob.compile_matcher() }
    }

    pub fn matches(&self, key: &SignalKey) -> bool {
        self.matcher.is_match(key.as_path())
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for SignalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignalPattern").field(&self.source).finish()
    }
}

impl From<&str> for SignalPattern {
    fn from(s: &str) -> Self {
        Self::compile(s)
    }
}

impl From<String> for SignalPattern {
    fn from(s: String) -> Self {
        Self::compile(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_star_matches_one_segment() {
        let p = SignalPattern::compile("transport.*");
        assert!(p.matches(&SignalKey::new("transport.is_streaming")));
        assert!(!p.matches(&SignalKey::new("transport.tcp.window")));
    }

    #[test]
    fn double_star_matches_any_depth() {
        let p = SignalPattern::compile("transport.**");
        assert!(p.matches(&SignalKey::new("transport.is_streaming")));
        assert!(p.matches(&SignalKey::new("transport.tcp.window")));
        assert!(p.matches(&SignalKey::new("transport")));
    }

    #[test]
    fn exact_key_matches_itself() {
        let p = SignalPattern::compile("response.status");
        assert!(p.matches(&SignalKey::new("response.status")));
        assert!(!p.matches(&SignalKey::new("response.status.code")));
    }
}
