/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// True when the response is a single JSON object with nothing around it:
/// no markdown fence, no leading or trailing prose. Backticks inside string
/// values are fine.
pub fn is_bare_json_object(response: &str) -> bool {
    let trimmed = response.trim();
    trimmed.starts_with('{') && trimmed.ends_with('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Noticia de último momento";
        let truncated = truncate_to_char_boundary(text, 12);
        assert!(truncated.len() <= 12);
        assert!(text.starts_with(truncated));
        assert_eq!(truncated, "Noticia de ");
    }

    #[test]
    fn test_truncate_within_bounds() {
        assert_eq!(truncate_to_char_boundary("Hola", 100), "Hola");
    }

    #[test]
    fn bare_json_detection() {
        assert!(is_bare_json_object("{\"times\": 1}"));
        assert!(is_bare_json_object("  {\"times\": 1}\n"));
        assert!(!is_bare_json_object("```json\n{\"times\": 1}\n```"));
        assert!(!is_bare_json_object("Here you go: {\"times\": 1}"));
        assert!(!is_bare_json_object("[1, 2]"));
    }

    #[test]
    fn backticks_inside_string_values_are_allowed() {
        let reply = r#"{"category": "Fake", "reasoning": "El texto cita ``` como código."}"#;
        assert!(is_bare_json_object(reply));
    }
}
