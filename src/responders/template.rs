//! Reply template: greeting, generated content, optional reference line,
//! signature.
//!
//! Rendering is lossless for the inner content — `extract_content` on a
//! rendered reply returns exactly what the generator produced, which keeps
//! refinement and audit flows from accumulating template noise.

/// Reference lines always carry this prefix so they can be told apart from
/// generated content when re-extracting.
pub const REFERENCE_PREFIX: &str = "Ref:";

/// Fixed reply layout shared by every responder.
#[derive(Debug, Clone)]
pub struct ReplyTemplate {
    signature: String,
}

impl ReplyTemplate {
    pub fn new(signature: impl Into<String>) -> Self {
        Self {
            signature: signature.into(),
        }
    }

    /// Render a reply body around generated content.
    ///
    /// `reference` is the category-specific extra line (ticket id, tentative
    /// hold, prior-conversation pointer); it must start with
    /// [`REFERENCE_PREFIX`].
    pub fn render(&self, recipient: &str, content: &str, reference: Option<&str>) -> String {
        let greeting = format!("Dear {},", display_name(recipient));
        match reference {
            Some(reference) => format!(
                "{greeting}\n\n{content}\n\n{reference}\n\n{}",
                self.signature
            ),
            None => format!("{greeting}\n\n{content}\n\n{}", self.signature),
        }
    }

    /// Recover the generated content from a rendered reply.
    ///
    /// Returns `None` if the text was not produced by `render` with this
    /// template's signature.
    pub fn extract_content(&self, rendered: &str) -> Option<String> {
        let after_greeting = rendered.split_once("\n\n")?.1;
        let signature_suffix = format!("\n\n{}", self.signature);
        let body = after_greeting.strip_suffix(signature_suffix.as_str())?;

        if let Some((content, last)) = body.rsplit_once("\n\n")
            && last.starts_with(REFERENCE_PREFIX)
        {
            return Some(content.to_string());
        }
        Some(body.to_string())
    }
}

/// Best-effort display name from an email address: the local part with
/// separators spaced out and words title-cased.
pub fn display_name(address: &str) -> String {
    let local = address.split('@').next().unwrap_or(address);
    let words: Vec<String> = local
        .split(['.', '_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        address.to_string()
    } else {
        words.join(" ")
    }
}
