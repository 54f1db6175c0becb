//! Markdown body to styled HTML.

use pulldown_cmark::{html, Options, Parser};

/// Render a note body to a full HTML document wrapped with the fixed note
/// style sheet. HTML-source notes skip markdown rendering and are wrapped
/// as-is.
pub fn render_note_html(body: &str, is_html: bool, stylesheet: &str) -> String {
    let html_body = if is_html {
        body.to_string()
    } else {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        let parser = Parser::new_ext(body, options);
        let mut rendered = String::new();
        html::push_html(&mut rendered, parser);
        rendered
    };

    format!(
        "<html><head><style>{}</style></head><body>{}</body></html>",
        stylesheet, html_body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_is_rendered() {
        let out = render_note_html("# Title\n\nSome *text*", false, "body {}");
        assert!(out.starts_with("<html><head><style>body {}</style></head><body>"));
        assert!(out.contains("<h1>Title</h1>"));
        assert!(out.contains("<em>text</em>"));
        assert!(out.ends_with("</body></html>"));
    }

    #[test]
    fn test_html_source_passes_through() {
        let body = "<p>already html</p>";
        let out = render_note_html(body, true, "body {}");
        assert!(out.contains(body));
    }

    #[test]
    fn test_raw_img_tags_survive_rendering() {
        let body = r#"text <img src="/r/pic.png" alt="pic.png" title="pic.png"> more"#;
        let out = render_note_html(body, false, "");
        assert!(out.contains(r#"<img src="/r/pic.png""#));
    }
}
