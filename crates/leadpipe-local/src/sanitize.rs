use regex::Regex;
use std::sync::LazyLock;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```json\n?|```").expect("static regex")
});
static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",\s*([\]}])").expect("static regex")
});
static SINGLE_QUOTED_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":\s*'([^']*)'").expect("static regex")
});

/// Remove Markdown code-fence markers the model likes to wrap JSON in.
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw.trim(), "").trim().to_string()
}

/// Best-effort lexical repair of near-valid JSON text.
///
/// This is deliberately not a grammar-aware parser: it assumes the input is
/// structurally close to valid JSON and only needs touch-ups. Anything it
/// cannot rescue is left for the caller's parse step to reject. Steps, in
/// order:
///
/// 1. trim surrounding whitespace
/// 2. strip C0/C1 control characters (including literal newlines)
/// 3. drop trailing commas before a closing `]` or `}`
/// 4. rewrite single-quoted values (`: 'x'`) to double-quoted
/// 5. collapse escaped newline sequences to single spaces
///
/// Total: always returns a string, never fails.
pub fn sanitize(raw: &str) -> String {
    let s = raw.trim();
    let s: String = s
        .chars()
        .filter(|c| !matches!(*c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}'))
        .collect();
    let s = TRAILING_COMMA.replace_all(&s, "$1");
    let s = SINGLE_QUOTED_VALUE.replace_all(&s, r#": "$1""#);
    s.replace("\\n", " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_json_fences() {
        let raw = "```json\n[{\"name\":\"A\"}]\n```";
        assert_eq!(strip_code_fences(raw), "[{\"name\":\"A\"}]");
        // Bare fences without the language tag.
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
        // No fences at all: unchanged apart from trimming.
        assert_eq!(strip_code_fences("  [1, 2] "), "[1, 2]");
    }

    #[test]
    fn removes_trailing_commas() {
        assert_eq!(sanitize(r#"[{"a":"b",},]"#), r#"[{"a":"b"}]"#);
        assert_eq!(sanitize("[1, 2, ]"), "[1, 2]");
    }

    #[test]
    fn rewrites_single_quoted_values() {
        assert_eq!(sanitize(r#"{"a": 'hello'}"#), r#"{"a": "hello"}"#);
        let out = sanitize(r#"[{'ok': 'yes'}]"#);
        // Only values after a colon are rewritten; keys are out of scope.
        assert_eq!(out, r#"[{'ok': "yes"}]"#);
    }

    #[test]
    fn strips_control_characters_and_newlines() {
        let raw = "[\n  {\"a\": \"b\u{0007}\"}\n]";
        assert_eq!(sanitize(raw), r#"[  {"a": "b"}]"#);
        assert_eq!(sanitize("{\"a\": \"line\\nbreak\"}"), r#"{"a": "line break"}"#);
    }

    #[test]
    fn already_valid_text_survives() {
        let valid = r#"[{"name":"Dr. Smith","email":"a@x.com"}]"#;
        let out = sanitize(valid);
        assert_eq!(out, valid);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(parsed.is_array());
    }

    #[test]
    fn degenerate_inputs_yield_strings() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("\u{0001}\u{0002}\u{009F}"), "");
        // Hopeless input stays hopeless, but sanitize itself never fails.
        assert_eq!(sanitize("not json at all"), "not json at all");
    }

    #[test]
    fn repaired_model_output_parses() {
        let raw = "```json\n[\n  {\"name\": 'Acme', \"email\": \"a@x.com\",},\n]\n```";
        let cleaned = sanitize(&strip_code_fences(raw));
        let parsed: serde_json::Value = serde_json::from_str(&cleaned).unwrap();
        assert_eq!(parsed[0]["name"], "Acme");
    }

    proptest! {
        #[test]
        fn sanitize_is_total(input in ".*") {
            let out = sanitize(&input);
            // No control characters survive, and a second pass only re-applies
            // the newline collapse (idempotent on the character class).
            let no_controls = out.chars().all(|c| {
                !matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
            });
            prop_assert!(no_controls);
        }

        #[test]
        fn strip_code_fences_is_total(input in ".*") {
            let out = strip_code_fences(&input);
            prop_assert!(!out.contains("```"));
        }
    }
}
