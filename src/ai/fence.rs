/// Removes a markdown code fence the assistant sometimes wraps HTML in.
///
/// A leading "```" line (optionally language-tagged) and a trailing "```" are
/// each removed independently; everything between them is left untouched.
pub fn strip_code_fence(text: &str) -> String {
    let mut body = text;

    if let Some(rest) = body.strip_prefix("```") {
        let (tag, after) = match rest.find('\n') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };
        let tag = tag.trim_end_matches('\r');
        if tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
        {
            body = after;
        }
    }

    let trimmed = body.trim_end();
    if let Some(without) = trimmed.strip_suffix("```") {
        body = without;
    }

    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_language_tagged_fence() {
        assert_eq!(strip_code_fence("```html\n<p>x</p>\n```"), "<p>x</p>\n");
    }

    #[test]
    fn test_strips_bare_fence() {
        assert_eq!(strip_code_fence("```\n<p>x</p>\n```\n"), "<p>x</p>\n");
    }

    #[test]
    fn test_unfenced_text_is_unchanged() {
        let html = "<div style=\"color: red\">Hello</div>\n";
        assert_eq!(strip_code_fence(html), html);
    }

    #[test]
    fn test_inner_fences_are_untouched() {
        let text = "<p>use ```code``` here</p>";
        assert_eq!(strip_code_fence(text), text);
    }

    #[test]
    fn test_only_trailing_fence() {
        assert_eq!(strip_code_fence("<p>x</p>\n```"), "<p>x</p>\n");
    }

    #[test]
    fn test_opening_line_with_spaces_is_not_a_fence_tag() {
        let text = "```not a tag\n<p>x</p>";
        assert_eq!(strip_code_fence(text), text);
    }
}
