//! Text extraction from RFC 822 email files.

use std::path::Path;

use mail_parser::{MessageParser, MimeHeaders};

use super::{ExtractError, TextExtractor};

/// Extractor for `.eml` messages.
///
/// Produces a header block (Subject, From, To, Date) followed by the plain
/// text body. HTML-only messages get their tags stripped. Attachments are
/// listed by name so they remain findable, but their contents are not
/// extracted.
pub struct MailExtractor;

impl TextExtractor for MailExtractor {
    fn name(&self) -> &'static str {
        "mail"
    }

    fn content_types(&self) -> &'static [&'static str] {
        &["message/rfc822"]
    }

    fn extract(
        &self,
        path: &Path,
        _content_type: &str,
        _encoding: Option<&str>,
    ) -> Result<String, ExtractError> {
        let raw = std::fs::read(path)?;
        let message = MessageParser::default()
            .parse(&raw)
            .ok_or_else(|| ExtractError::ExtractorFailed("could not parse message".to_string()))?;

        let mut text = String::new();

        if let Some(subject) = message.subject() {
            text.push_str(&format!("Subject: {}\n", subject));
        }
        if let Some(from) = message.from().and_then(|addrs| addrs.first()) {
            let address = from.address().unwrap_or_default();
            match from.name() {
                Some(name) => text.push_str(&format!("From: {} <{}>\n", name, address)),
                None => text.push_str(&format!("From: {}\n", address)),
            }
        }
        if let Some(to) = message.to() {
            let recipients: Vec<String> = to
                .iter()
                .map(|addr| addr.address().unwrap_or_default().to_string())
                .collect();
            if !recipients.is_empty() {
                text.push_str(&format!("To: {}\n", recipients.join(", ")));
            }
        }
        if let Some(date) = message.date() {
            text.push_str(&format!("Date: {}\n", date.to_rfc3339()));
        }

        text.push('\n');

        if let Some(body) = message.body_text(0) {
            text.push_str(&body);
        } else if let Some(html) = message.body_html(0) {
            text.push_str(&strip_html(&html));
        }

        let attachment_names: Vec<&str> = message
            .attachments()
            .filter_map(|part| part.attachment_name())
            .collect();
        if !attachment_names.is_empty() {
            text.push_str("\n\nAttachments:\n");
            for name in attachment_names {
                text.push_str(&format!("- {}\n", name));
            }
        }

        Ok(text)
    }
}

fn strip_html(html: &str) -> String {
    let with_breaks = html
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("</p>", "\n\n")
        .replace("</div>", "\n");

    let re = regex::Regex::new(r"<[^>]+>").unwrap();
    re.replace_all(&with_breaks, "").into_owned()
}
