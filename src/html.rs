use serde_json::Value;

/// Comment out tracking code for a visitor that should not be tracked.
pub fn disable_html(html: &str, service: &str) -> String {
    format!("<!-- {service} disabled on internal IP address\n{html}\n-->")
}

/// Escape a value for a single-quoted JavaScript string literal inside a
/// `<script>` element.
pub fn js_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\x3c"),
            '>' => out.push_str("\\x3e"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// Compact JSON (sorted keys) for a `<script>` element that may itself sit
/// inside an HTML comment. Markup characters only ever appear inside JSON
/// strings, where the `\uXXXX` forms are equivalent.
pub fn script_json(v: &Value) -> String {
    let raw = v.to_string();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn disable_wraps_in_comment() {
        assert_eq!(
            disable_html("<script></script>", "KISSmetrics"),
            "<!-- KISSmetrics disabled on internal IP address\n<script></script>\n-->"
        );
    }

    #[test]
    fn escapes_quotes_and_tags() {
        assert_eq!(js_escape("o'neil</script>"), "o\\'neil\\x3c/script\\x3e");
    }

    #[test]
    fn escapes_line_separators() {
        assert_eq!(js_escape("a\u{2028}b\u{2029}c"), "a\\u2028b\\u2029c");
    }

    #[test]
    fn script_json_hides_markup() {
        let out = script_json(&serde_json::json!({"name": "--><img src=x>&\u{2028}"}));
        assert_eq!(out, r#"{"name":"--\u003e\u003cimg src=x\u003e\u0026\u2028"}"#);
        let back: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(back["name"], "--><img src=x>&\u{2028}");
    }
}
