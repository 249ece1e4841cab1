//! Intake normalizer — raw message bytes to `NormalizedEmail`.
//!
//! Three responsibilities, no network or storage access:
//! 1. Parse the RFC 822 message (sender, subject, recipients, body,
//!    attachment metadata), preferring the plain-text part.
//! 2. Clean the body: truncate at the signature delimiter, drop quoted
//!    reply lines, collapse whitespace runs.
//! 3. Extract entities (email addresses, phone numbers, URLs) from the
//!    cleaned body, in first-occurrence order.

use mail_parser::{MessageParser, MimeHeaders};
use regex::Regex;

use crate::error::IntakeError;
use crate::pipeline::types::{
    Attachment, ExtractedEntities, InboundMessage, NormalizedEmail, RawMessage,
};

/// Parses, cleans, and annotates inbound messages.
pub struct IntakeNormalizer {
    email_re: Regex,
    phone_re: Regex,
    url_re: Regex,
    sender_re: Regex,
    signature_delim_re: Regex,
    quote_header_re: Regex,
}

impl Default for IntakeNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeNormalizer {
    pub fn new() -> Self {
        Self {
            email_re: Regex::new(r"[\w.-]+@[\w.-]+\.\w+").unwrap(),
            phone_re: Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap(),
            url_re: Regex::new(r"https?://[A-Za-z0-9$\-_.+!*'(),%&@#/?=~:]+").unwrap(),
            sender_re: Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap(),
            // Two or more hyphens/underscores mark the start of a signature block
            signature_delim_re: Regex::new(r"[-_]{2,}").unwrap(),
            quote_header_re: Regex::new(r"^On .+ wrote:").unwrap(),
        }
    }

    /// Turn a raw transport message into a `NormalizedEmail`.
    pub fn normalize(&self, raw: &RawMessage) -> Result<NormalizedEmail, IntakeError> {
        let parsed = MessageParser::default()
            .parse(&raw.raw)
            .ok_or_else(|| IntakeError::Malformed("unparseable message".into()))?;

        let sender = parsed
            .from()
            .and_then(|addr| addr.first())
            .and_then(|a| a.address())
            .map(|s| s.to_string())
            .ok_or_else(|| IntakeError::Malformed("missing From header".into()))?;
        if !self.sender_re.is_match(&sender) {
            return Err(IntakeError::InvalidSender(sender));
        }

        let subject = parsed.subject().unwrap_or("(no subject)").to_string();

        let recipients = extract_addresses(parsed.to());

        let body = extract_body(&parsed).ok_or(IntakeError::NoTextPart)?;
        let attachments = extract_attachments(&parsed);

        let cleaned_body = self.clean_body(&body);
        let entities = self.extract_entities(&cleaned_body);

        Ok(NormalizedEmail {
            message: InboundMessage {
                message_id: raw.message_id.clone(),
                sender,
                recipients,
                subject,
                body,
                received_at: raw.received_at,
                attachments,
            },
            cleaned_body,
            entities,
        })
    }

    /// Clean a body: signature truncation, quoted-line removal, whitespace
    /// collapse — in that order, truncation strictly before collapsing so
    /// the delimiter is still intact when searched for.
    ///
    /// Runs the pass to a fixpoint: collapsing can splice a quote header
    /// out of two adjacent lines, and a second pass must not change the
    /// result.
    pub fn clean_body(&self, body: &str) -> String {
        let mut current = body.to_string();
        loop {
            let next = self.clean_pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn clean_pass(&self, body: &str) -> String {
        // (a) Truncate at the first signature delimiter run
        let truncated = match self.signature_delim_re.find(body) {
            Some(m) => &body[..m.start()],
            None => body,
        };

        // (b) Drop quoted-reply lines while line boundaries still exist
        let kept: Vec<&str> = truncated
            .lines()
            .filter(|line| {
                let trimmed = line.trim_start();
                !trimmed.starts_with('>') && !self.quote_header_re.is_match(trimmed)
            })
            .collect();

        // (c) Collapse all whitespace runs to single spaces
        kept.join("\n")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the three entity matchers over the cleaned body. Duplicates are
    /// preserved; order is first occurrence.
    pub fn extract_entities(&self, text: &str) -> ExtractedEntities {
        ExtractedEntities {
            emails: self
                .email_re
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect(),
            phones: self
                .phone_re
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect(),
            urls: self
                .url_re
                .find_iter(text)
                .map(|m| m.as_str().to_string())
                .collect(),
        }
    }
}

/// Flatten an address header into bare addresses.
///
/// Returns an empty vec if the header is missing.
fn extract_addresses(addr: Option<&mail_parser::Address>) -> Vec<String> {
    let Some(addr) = addr else {
        return Vec::new();
    };
    match addr {
        mail_parser::Address::List(addrs) => addrs
            .iter()
            .filter_map(|a| a.address.as_ref().map(|s| s.to_string()))
            .collect(),
        mail_parser::Address::Group(groups) => groups
            .iter()
            .flat_map(|g| {
                g.addresses
                    .iter()
                    .filter_map(|a| a.address.as_ref().map(|s| s.to_string()))
            })
            .collect(),
    }
}

/// Extract readable body text: plain-text part first, stripped HTML second,
/// any text-typed part last.
fn extract_body(parsed: &mail_parser::Message) -> Option<String> {
    if let Some(text) = parsed.body_text(0) {
        return Some(text.to_string());
    }
    if let Some(html) = parsed.body_html(0) {
        return Some(strip_html(html.as_ref()));
    }
    for part in parsed.attachments() {
        if let Some(ct) = MimeHeaders::content_type(part)
            && ct.ctype() == "text"
            && let Ok(text) = std::str::from_utf8(part.contents())
        {
            return Some(text.to_string());
        }
    }
    None
}

/// Attachment metadata only — contents never enter the pipeline.
fn extract_attachments(parsed: &mail_parser::Message) -> Vec<Attachment> {
    parsed
        .attachments()
        .map(|part| {
            let filename = MimeHeaders::attachment_name(part)
                .unwrap_or("unnamed")
                .to_string();
            let content_type = MimeHeaders::content_type(part)
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.ctype(), sub),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".into());
            Attachment {
                filename,
                content_type,
                size: part.contents().len(),
            }
        })
        .collect()
}

/// Strip HTML tags and normalize whitespace (basic).
fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}
