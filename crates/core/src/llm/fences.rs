/// Removes a surrounding Markdown fence (```html ... ``` or ``` ... ```) if present.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let mut inner = trimmed;
    // Drop the opening fence line (with its optional language tag).
    inner = match inner.split_once('\n') {
        Some((_, after_first)) => after_first,
        None => inner.trim_start_matches('`'),
    };
    if let Some(end) = inner.rfind("```") {
        inner = &inner[..end];
    }
    inner.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_language_tagged_fence() {
        let body = "<h2>当日核心结论</h2>\n<p>放量上涨</p>";
        let fenced = format!("```html\n{body}\n```\n");
        assert_eq!(strip_code_fences(&fenced), body);
    }

    #[test]
    fn leaves_plain_html_alone() {
        let body = "  <h2>x</h2>  ";
        assert_eq!(strip_code_fences(body), "<h2>x</h2>");
    }

    #[test]
    fn handles_unterminated_fence() {
        assert_eq!(strip_code_fences("```\n<p>a</p>"), "<p>a</p>");
    }
}
