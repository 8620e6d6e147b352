//! Inquiry response parsing.
//!
//! `inquiry.cgi` answers with JavaScript-style declarations, one per line:
//!
//! ```text
//! var EncVidCodec1 = "h265";
//! var BitRate1 = "15000";
//! ```
//!
//! The text is matched line by line; it is never evaluated.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// `var NAME = VALUE;` with the value in double quotes, single quotes, or bare.
#[allow(clippy::expect_used)]
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*var\s+([A-Za-z_$][\w$]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^;\s]*))\s*;?\s*$"#,
    )
    .expect("declaration pattern is valid")
});

/// Device values from an inquiry, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InquiryValues(BTreeMap<String, String>);

impl InquiryValues {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Parse `var NAME = "VALUE";` lines. Blank and unrecognized lines are
/// skipped; a repeated name keeps its last value.
pub fn parse_declarations(text: &str) -> InquiryValues {
    let mut values = BTreeMap::new();

    for line in text.lines() {
        let Some(caps) = DECLARATION.captures(line) else {
            continue;
        };
        let Some(name) = caps.get(1) else {
            continue;
        };
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());

        values.insert(name.as_str().to_string(), value.to_string());
    }

    InquiryValues(values)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let values = parse_declarations("var EncVidCodec1 = \"h265\";\n\nvar BitRate1 = \"15000\";");

        assert_eq!(values.len(), 2);
        assert_eq!(values.get("EncVidCodec1"), Some("h265"));
        assert_eq!(values.get("BitRate1"), Some("15000"));
    }

    #[test]
    fn test_parse_tolerates_formatting() {
        let text = "  var A=\"1\"  \r\nvar B = '2'\nvar C = 3;\nvar D = \"\";\n";
        let values = parse_declarations(text);

        assert_eq!(values.get("A"), Some("1"));
        assert_eq!(values.get("B"), Some("2"));
        assert_eq!(values.get("C"), Some("3"));
        assert_eq!(values.get("D"), Some(""));
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let text = "<html>\nvar = \"x\";\nalert('hi');\nvar ImageSize1 = \"1280,720\";\n";
        let values = parse_declarations(text);

        assert_eq!(values.len(), 1);
        assert_eq!(values.get("ImageSize1"), Some("1280,720"));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let values = parse_declarations("var A = \"1\";\nvar A = \"2\";");
        assert_eq!(values.get("A"), Some("2"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_declarations("").is_empty());
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let values = parse_declarations("var B = \"2\";\nvar A = \"1\";");
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"{"A":"1","B":"2"}"#);

        let pairs: Vec<(&str, &str)> = values.iter().collect();
        assert_eq!(pairs, vec![("A", "1"), ("B", "2")]);
    }
}
