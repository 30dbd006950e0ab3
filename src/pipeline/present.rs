//! Result presentation: the two result shapes, their HTML fragments, and
//! the actions wired to each.
//!
//! Everything that came from the user or an engine (file names, recognised
//! text, URLs) is HTML-escaped before it is placed in markup.

use crate::pipeline::encode::data_url;
use crate::pipeline::input::StagedFile;
use crate::session::OcrMode;

/// What the result step shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    /// Local modes: the source image next to the recognised text.
    RecognizedText {
        mode: OcrMode,
        text: String,
        /// 0–100.
        confidence: u8,
        image_name: String,
        image_data_url: String,
    },
    /// Cloud mode: a server-generated PPTX.
    Artifact {
        task_id: String,
        download_url: String,
        original_name: String,
    },
}

impl ResultView {
    /// Recognised-text view; `confidence` is rounded and clamped to 0–100.
    pub fn recognized(mode: OcrMode, file: &StagedFile, text: String, confidence: f32) -> Self {
        let confidence = if confidence.is_nan() {
            0
        } else {
            confidence.round().clamp(0.0, 100.0) as u8
        };
        ResultView::RecognizedText {
            mode,
            text,
            confidence,
            image_name: file.name.clone(),
            image_data_url: data_url(file),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ResultView::RecognizedText { text, .. } => Some(text),
            ResultView::Artifact { .. } => None,
        }
    }

    /// `"88%"` for recognised text.
    pub fn confidence_text(&self) -> Option<String> {
        match self {
            ResultView::RecognizedText { confidence, .. } => Some(format!("{confidence}%")),
            ResultView::Artifact { .. } => None,
        }
    }

    /// Actions offered for this view, in display order.
    pub fn actions(&self) -> Vec<ResultAction> {
        match self {
            ResultView::RecognizedText {
                text, image_name, ..
            } => vec![
                ResultAction::CopyText { text: text.clone() },
                ResultAction::DownloadImage {
                    file_name: image_name.clone(),
                },
            ],
            ResultView::Artifact {
                task_id,
                download_url,
                original_name,
            } => vec![
                ResultAction::DownloadArtifact {
                    url: download_url.clone(),
                    file_name: artifact_file_name(task_id),
                },
                ResultAction::DownloadOriginal {
                    file_name: original_name.clone(),
                },
            ],
        }
    }

    /// Self-contained HTML fragment for this view.
    pub fn render_html(&self) -> String {
        match self {
            ResultView::RecognizedText {
                mode,
                text,
                confidence,
                image_name,
                image_data_url,
            } => format!(
                "<div class=\"ocr-result\">\n\
                 \x20 <div class=\"ocr-image\"><img src=\"{src}\" alt=\"{alt}\"></div>\n\
                 \x20 <div class=\"ocr-text\">\n\
                 \x20   <div class=\"ocr-meta\">{mode} · Confidence: <strong>{confidence}%</strong></div>\n\
                 \x20   <pre>{text}</pre>\n\
                 \x20 </div>\n\
                 </div>\n",
                src = escape_html(image_data_url),
                alt = escape_html(image_name),
                mode = mode.label(),
                text = escape_html(text),
            ),
            ResultView::Artifact {
                task_id,
                download_url,
                original_name,
            } => format!(
                "<div class=\"artifact-result\">\n\
                 \x20 <p>Conversion complete.</p>\n\
                 \x20 <a class=\"btn\" href=\"{href}\" download=\"{file}\">Download PPTX</a>\n\
                 \x20 <p class=\"original\">Original: {original}</p>\n\
                 </div>\n",
                href = escape_html(download_url),
                file = escape_html(&artifact_file_name(task_id)),
                original = escape_html(original_name),
            ),
        }
    }
}

/// An action wired to a result view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultAction {
    /// Copy the recognised text to the clipboard.
    CopyText { text: String },
    /// Save the staged image.
    DownloadImage { file_name: String },
    /// Fetch the generated PPTX from the server.
    DownloadArtifact { url: String, file_name: String },
    /// Save the originally staged file.
    DownloadOriginal { file_name: String },
}

impl ResultAction {
    pub fn label(&self) -> &'static str {
        match self {
            ResultAction::CopyText { .. } => "Copy text",
            ResultAction::DownloadImage { .. } => "Download image",
            ResultAction::DownloadArtifact { .. } => "Download PPTX",
            ResultAction::DownloadOriginal { .. } => "Download original",
        }
    }

    /// Transient label shown after the action succeeded.
    pub fn ack_label(&self) -> &'static str {
        match self {
            ResultAction::CopyText { .. } => "Copied!",
            _ => "Saved",
        }
    }
}

/// `94repdf_{first 8 chars of task id}.pptx`
pub fn artifact_file_name(task_id: &str) -> String {
    let short: String = task_id.chars().take(8).collect();
    format!("94repdf_{short}.pptx")
}

/// Escape `& < > " '` for safe insertion into HTML text or attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    for ch in s.chars() {
        match ch {
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

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> StagedFile {
        StagedFile::new("slide.png", "image/png", b"\x89PNG\r\n\x1a\n".to_vec())
    }

    #[test]
    fn escape_html_all_specials() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(escape_html("中文 plain"), "中文 plain");
    }

    #[test]
    fn recognized_view_escapes_text_and_shows_confidence() {
        let view = ResultView::recognized(
            OcrMode::LocalOcr,
            &png(),
            "<script>alert(1)</script>".into(),
            87.6,
        );
        let html = view.render_html();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("<strong>88%</strong>"));
        assert!(html.contains("src=\"data:image/png;base64,"));
        assert_eq!(view.confidence_text().as_deref(), Some("88%"));
    }

    #[test]
    fn recognized_actions_copy_literal_text() {
        let view = ResultView::recognized(OcrMode::LocalAi, &png(), "a & b".into(), 95.0);
        let actions = view.actions();
        assert_eq!(
            actions[0],
            ResultAction::CopyText {
                text: "a & b".into()
            }
        );
        assert_eq!(actions[0].ack_label(), "Copied!");
        assert_eq!(
            actions[1],
            ResultAction::DownloadImage {
                file_name: "slide.png".into()
            }
        );
    }

    #[test]
    fn artifact_view_actions() {
        let view = ResultView::Artifact {
            task_id: "0123456789abcdef".into(),
            download_url: "https://x.test/api/download/0123456789abcdef".into(),
            original_name: "deck.pdf".into(),
        };
        let actions = view.actions();
        assert_eq!(
            actions[0],
            ResultAction::DownloadArtifact {
                url: "https://x.test/api/download/0123456789abcdef".into(),
                file_name: "94repdf_01234567.pptx".into(),
            }
        );
        assert_eq!(actions[1].label(), "Download original");
        assert!(view.render_html().contains("download=\"94repdf_01234567.pptx\""));
        assert!(view.text().is_none());
    }

    #[test]
    fn artifact_file_name_short_ids() {
        assert_eq!(artifact_file_name("abc"), "94repdf_abc.pptx");
    }

    #[test]
    fn confidence_is_clamped() {
        let v = ResultView::recognized(OcrMode::LocalOcr, &png(), String::new(), 140.0);
        assert_eq!(v.confidence_text().as_deref(), Some("100%"));
    }
}
