use std::sync::OnceLock;

use regex::Regex;

fn patterns() -> &'static [(&'static str, fn() -> &'static Regex)] {
    &[("email", email_regex), ("phone", phone_regex), ("ssn", ssn_regex)]
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").unwrap())
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\+?\d[\d\-. ]{8,}\d)\b").unwrap())
}

fn ssn_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap())
}

/// Redacts obvious PII shapes from a bounded body prefix, returning the
/// masked text and which categories fired (for the
/// `response.pii_masking.*` signals).
pub fn mask(body: &str) -> (String, Vec<&'static str>) {
    let mut masked = body.to_string();
    let mut fired = Vec::new();
    for (name, regex_fn) in patterns() {
        let re = regex_fn();
        if re.is_match(&masked) {
            masked = re.replace_all(&masked, "[REDACTED]").into_owned();
            fired.push(*name);
        }
    }
    (masked, fired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_email_addresses() {
        let (masked, fired) = mask("contact us at help@example.com for support");
        assert!(!masked.contains("help@example.com"));
        assert_eq!(fired, vec!["email"]);
    }

    #[test]
    fn leaves_clean_text_untouched() {
        let (masked, fired) = mask("nothing sensitive here");
        assert_eq!(masked, "nothing sensitive here");
        assert!(fired.is_empty());
    }

    #[test]
    fn masks_ssn_shaped_numbers() {
        let (masked, fired) = mask("ssn: 123-45-6789");
        assert!(masked.contains("[REDACTED]"));
        assert_eq!(fired, vec!["ssn"]);
    }
}
