/// A complete variable reference such as `{{trigger.enabled}}`.
pub fn is_variable(text: &str) -> bool {
    let text = text.trim();
    text.len() >= 4 && text.starts_with("{{") && text.ends_with("}}")
}

/// Text that is on its way to becoming a variable reference (`{{trig`).
pub fn is_partial_variable(text: &str) -> bool {
    text.trim().contains("{{")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_references() {
        assert!(is_variable("{{trigger.enabled}}"));
        assert!(is_variable("  {{accounts.slack}} "));
        assert!(!is_variable("{{trigger"));
        assert!(!is_variable("true"));
        assert!(is_partial_variable("{{trig"));
        assert!(!is_partial_variable("{ \"a\": 1 }"));
    }
}
