pub const HTML_INSTRUCTION: &str =
    "Please respond with HTML including appropriate inline CSS styling for Moodle.";

/// Builds the message sent to the assistant. Blank context is ignored.
pub fn compose_text_prompt(prompt: &str, context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "Context:\n\n{}\n\nUser Request:\n{}\n\n{}",
            context, prompt, HTML_INSTRUCTION
        ),
        None => format!("User Request:\n{}\n\n{}", prompt, HTML_INSTRUCTION),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compose_with_context() {
        assert_eq!(
            compose_text_prompt("Summarize", Some("<p>Photosynthesis</p>")),
            "Context:\n\n<p>Photosynthesis</p>\n\nUser Request:\nSummarize\n\n\
             Please respond with HTML including appropriate inline CSS styling for Moodle."
        );
    }

    #[test]
    fn test_compose_without_context() {
        for context in [None, Some(""), Some("   ")] {
            assert_eq!(
                compose_text_prompt("Write a quiz", context),
                "User Request:\nWrite a quiz\n\n\
                 Please respond with HTML including appropriate inline CSS styling for Moodle."
            );
        }
    }

    #[test]
    fn test_braces_in_input_are_kept_verbatim() {
        let out = compose_text_prompt("{{prompt}}", Some("{x}"));
        assert!(out.contains("Context:\n\n{x}\n\nUser Request:\n{{prompt}}"));
    }
}
