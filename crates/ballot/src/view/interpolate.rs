//! `{{dotted.key}}` substitution over a JSON data context.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;

/// Marker in the layout replaced by the page content
pub const CONTENT_MARKER: &str = "{{content}}";

static VAR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{([A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z0-9_$]+)*)\}\}").unwrap()
});

/// Replace every `{{dotted.key}}` with the value found in `data`
///
/// A path that does not resolve produces an empty string. Text that does
/// not fit the grammar (`{{ spaced }}`, `{{a..b}}`) is left untouched.
pub fn interpolate(template: &str, data: &JsonValue) -> String {
    VAR_REGEX
        .replace_all(template, |caps: &Captures| {
            lookup(data, &caps[1]).map(display).unwrap_or_default()
        })
        .into_owned()
}

/// Walk `data` along a dotted path: objects by key, arrays by index
pub fn lookup<'a>(data: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.').try_fold(data, |current, part| match current {
        JsonValue::Object(map) => map.get(part),
        JsonValue::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// String form of a template value
pub fn display(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Insert page content into the layout at its first `{{content}}` marker
pub fn compose(layout: &str, content: &str) -> String {
    layout.replacen(CONTENT_MARKER, content, 1)
}

/// Escape text for safe inclusion in HTML
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_nested_value() {
        assert_eq!(interpolate("{{a.b}}", &json!({ "a": { "b": "x" } })), "x");
    }

    #[test]
    fn test_missing_variable() {
        assert_eq!(interpolate("{{missing}}", &json!({})), "");
        assert_eq!(interpolate("<p>{{a.b.c}}</p>", &json!({ "a": 1 })), "<p></p>");
    }

    #[test]
    fn test_simple_interpolation() {
        let data = json!({ "name": "Alice", "age": 30, "admin": false });
        assert_eq!(
            interpolate("<p>Hello, {{name}}! Age: {{age}} {{admin}}</p>", &data),
            "<p>Hello, Alice! Age: 30 false</p>"
        );
    }

    #[test]
    fn test_non_matching_text_untouched() {
        let data = json!({ "a": "x" });
        assert_eq!(interpolate("{{ a }} {a} {{a..b}} {{1a}}", &data), "{{ a }} {a} {{a..b}} {{1a}}");
    }

    #[test]
    fn test_value_forms() {
        let data = json!({ "n": null, "list": ["x", "y"], "obj": { "k": 1 } });
        assert_eq!(interpolate("[{{n}}]", &data), "[]");
        assert_eq!(interpolate("{{list.1}}", &data), "y");
        assert_eq!(interpolate("{{list}}", &data), r#"["x","y"]"#);
        assert_eq!(interpolate("{{obj}}", &data), r#"{"k":1}"#);
    }

    #[test]
    fn test_compose_replaces_first_marker_only() {
        let layout = "<main>{{content}}</main><!-- {{content}} -->";
        assert_eq!(
            compose(layout, "<h1>Hi</h1>"),
            "<main><h1>Hi</h1></main><!-- {{content}} -->"
        );
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
    }
}
