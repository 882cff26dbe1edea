//! Server-rendered HTML for the caption form.

use std::fmt::Write as _;

use tokio::time::Instant;

use crate::form::{CaptionForm, Status};
use crate::render::{download_file_name, share_links, share_text, ResultEntry};

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Seconds until the page should reload itself, if at all.
fn refresh_after(form: &CaptionForm, now: Instant) -> Option<u64> {
    if form.is_loading() {
        return Some(1);
    }
    form.copies()
        .remaining(now)
        .map(|left| left.as_millis().div_ceil(1000).max(1) as u64)
}

pub fn render(form: &CaptionForm, notice: Option<&str>, now: Instant) -> String {
    let mut html = String::new();
    let loading = form.is_loading();

    html.push_str(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Caption It!</title>
    <link rel="stylesheet" href="/static/style.css">
"#,
    );
    if let Some(secs) = refresh_after(form, now) {
        let _ = writeln!(html, r#"    <meta http-equiv="refresh" content="{}">"#, secs);
    }
    html.push_str(
        r#"</head>
<body id="top">
    <div class="container">
        <h1>🎨 Caption It!</h1>
        <p class="subtitle">Instant captions for your moments ✨</p>
"#,
    );

    if let Some(notice) = notice {
        let _ = writeln!(html, r#"        <div class="error notice">{}</div>"#, escape_html(notice));
    }

    html.push_str(
        r#"        <form id="captionForm" action="/generate" method="post" enctype="multipart/form-data">
            <label class="upload-area" id="uploadArea">
"#,
    );
    match form.image().map(|image| image.preview().url()) {
        Some(url) => {
            let _ = writeln!(
                html,
                r#"                <img class="preview-image" src="{}" alt="Preview">"#,
                escape_html(&url)
            );
        }
        None => html.push_str(
            r#"                <div class="upload-icon">📸</div>
                <div class="upload-text">Click or drag image here</div>
                <div class="upload-hint">Supports JPG, PNG, WebP</div>
"#,
        ),
    }
    html.push_str(
        r#"                <input type="file" id="fileInput" name="image" accept="image/*">
            </label>
            <div class="styles">
"#,
    );
    for option in form.styles() {
        let checked = if option.value == form.style() { " checked" } else { "" };
        let _ = writeln!(
            html,
            r#"                <label class="style-option"><input type="radio" name="type" value="{}"{}> {}</label>"#,
            escape_html(&option.value),
            checked,
            escape_html(&option.label)
        );
    }
    html.push_str(
        r#"            </div>
            <select name="language">
"#,
    );
    for option in form.languages() {
        let selected = if option.value == form.language() { " selected" } else { "" };
        let _ = writeln!(
            html,
            r#"                <option value="{}"{}>{}</option>"#,
            escape_html(&option.value),
            selected,
            escape_html(&option.label)
        );
    }
    let _ = write!(
        html,
        r#"            </select>
            <textarea name="details" rows="2" placeholder="Add any extra details (optional)">{}</textarea>
            <button type="submit" class="primary"{}>{}</button>
        </form>
"#,
        escape_html(form.details()),
        if loading { " disabled" } else { "" },
        if loading { "Generating..." } else { "Generate Caption" }
    );

    if loading {
        html.push_str(
            r#"        <div class="loading">
            <div class="spinner"></div>
            <p>Generating AI caption...</p>
        </div>
"#,
        );
    }

    let entries = form.entries();
    if !entries.is_empty() {
        html.push_str("        <div class=\"results\">\n");
        for (index, entry) in entries.iter().enumerate() {
            match entry {
                ResultEntry::Caption(caption) => {
                    let copied = form.is_copied(index, now);
                    let _ = write!(
                        html,
                        r#"            <div class="result" id="caption-{index}">
                <div class="result-text">{}</div>
"#,
                        escape_html(&caption.caption)
                    );
                    if !caption.hashtags.trim().is_empty() {
                        let _ = writeln!(
                            html,
                            r#"                <div class="hashtags">{}</div>"#,
                            escape_html(&caption.hashtags)
                        );
                    }
                    let _ = write!(
                        html,
                        r#"                <div class="actions">
                    <form class="copy-form" action="/captions/{index}/copy" method="post">
                        <button type="submit" data-copy="{}">{}</button>
                    </form>
                    <a href="/captions/{index}/download" download="{}">Download</a>
"#,
                        escape_html(&share_text(caption)),
                        if copied { "Copied!" } else { "Copy" },
                        download_file_name(index)
                    );
                    for link in share_links(caption) {
                        let _ = writeln!(
                            html,
                            r#"                    <a href="{}" target="_blank" rel="noopener noreferrer">Share on {}</a>"#,
                            escape_html(&link.url),
                            link.name
                        );
                    }
                    html.push_str("                </div>\n            </div>\n");
                }
                ResultEntry::Error(message) => {
                    let _ = writeln!(
                        html,
                        r#"            <div class="result error">{}</div>"#,
                        escape_html(message)
                    );
                }
            }
        }
        html.push_str("        </div>\n");
    }

    if form.image().is_some() || !matches!(form.status(), Status::Idle) {
        html.push_str(
            r#"        <form action="/reset" method="post">
            <button type="submit" class="secondary">Start over</button>
        </form>
"#,
        );
    }

    html.push_str(
        r#"    </div>
    <script src="/static/app.js"></script>
</body>
</html>
"#,
    );
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FormConfig;
    use crate::error::CaptionError;
    use crate::picker::tests::PNG_BYTES;
    use crate::picker::ImagePicker;
    use crate::render::{CaptionEntry, CaptionResult};
    use axum::body::Bytes;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_idle_page_lists_options() {
        let form = CaptionForm::new(&FormConfig::default());
        let html = render(&form, None, Instant::now());

        assert!(html.contains(r#"value="funny" checked"#));
        assert!(html.contains(r#"<option value="en-gb">English (UK)</option>"#));
        assert!(html.contains("Generate Caption"));
        assert!(!html.contains("http-equiv=\"refresh\""));
        assert!(!html.contains("Start over"));
    }

    #[test]
    fn test_submitting_page_shows_loading() {
        let picker = ImagePicker::default();
        let mut form = CaptionForm::new(&FormConfig::default());
        form.set_image(
            picker
                .pick("cat.png", "image/png", Bytes::from_static(PNG_BYTES))
                .unwrap(),
        );
        form.begin_submission().unwrap();

        let html = render(&form, None, Instant::now());
        assert!(html.contains("Generating..."));
        assert!(html.contains(r#"<meta http-equiv="refresh" content="1">"#));
        let preview_src = format!(r#"src="{}""#, form.image().unwrap().preview().url());
        assert!(html.contains(&preview_src));
        assert!(!html.contains("base64"));
    }

    #[test]
    fn test_results_are_escaped_with_actions() {
        let picker = ImagePicker::default();
        let mut form = CaptionForm::new(&FormConfig::default());
        form.set_image(
            picker
                .pick("cat.png", "image/png", Bytes::from_static(PNG_BYTES))
                .unwrap(),
        );
        let submission = form.begin_submission().unwrap();
        form.settle(
            submission.token,
            Ok(CaptionResult(vec![CaptionEntry::new("<script>", "#cats")])),
        );

        let html = render(&form, None, Instant::now());
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<div class=\"result-text\"><script>"));
        assert!(html.contains(r#"download="caption-1.txt""#));
        assert!(html.contains("https://twitter.com/intent/tweet?text="));
        assert!(html.contains("https://wa.me/?text="));
        assert!(html.contains("Start over"));
    }

    #[test]
    fn test_error_renders_one_entry() {
        let picker = ImagePicker::default();
        let mut form = CaptionForm::new(&FormConfig::default());
        form.set_image(
            picker
                .pick("cat.png", "image/png", Bytes::from_static(PNG_BYTES))
                .unwrap(),
        );
        let submission = form.begin_submission().unwrap();
        form.settle(submission.token, Err(CaptionError::ServerError("bad image".into())));

        let html = render(&form, None, Instant::now());
        assert_eq!(html.matches("class=\"result error\"").count(), 1);
        assert!(html.contains("Server error: bad image"));
        assert!(!html.contains("Generating..."));
    }
}
