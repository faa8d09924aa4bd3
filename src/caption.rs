//! Post caption composition.
//!
//! One caption is composed per session and rides on the last document of a
//! `/finish` delivery.

use crate::utils::escape_markdown_v2;

/// Renders the MarkdownV2 caption from fixed template segments and the
/// session's title and body.
///
/// Fixed segments are escaped once at construction; only the user-supplied
/// title and body are escaped per call.
#[derive(Debug, Clone)]
pub struct CaptionTemplate {
    lead_in: String,
    base_prefix: String,
    suffix_text: String,
    suffix_link: String,
}

impl CaptionTemplate {
    /// Builds a template from raw (unescaped) fixed segments.
    ///
    /// `suffix_link` lands inside the MarkdownV2 link parentheses and is
    /// kept verbatim.
    #[must_use]
    pub fn new(lead_in: &str, base_prefix: &str, suffix_text: &str, suffix_link: &str) -> Self {
        Self {
            lead_in: escape_markdown_v2(lead_in),
            base_prefix: escape_markdown_v2(base_prefix),
            suffix_text: escape_markdown_v2(suffix_text),
            suffix_link: suffix_link.to_string(),
        }
    }

    /// Composes the caption for a session's title and body.
    #[must_use]
    pub fn compose(&self, title: &str, body: &str) -> String {
        format!(
            "*{}* *{} {}*\n\n✨ {}\n\n👉 *[{}]({})*",
            self.lead_in,
            self.base_prefix,
            escape_markdown_v2(title),
            escape_markdown_v2(body),
            self.suffix_text,
            self.suffix_link,
        )
    }
}
