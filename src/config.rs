//! Configuration and settings management
//!
//! Loads settings from environment variables and optional config files.
//! Only the Telegram token is mandatory; the caption segments and the
//! default document prefix ship with built-in values.

use crate::caption::CaptionTemplate;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Prefix prepended to finalized document names unless the user overrides
/// it via /setprefix.
pub const DEFAULT_DOC_PREFIX: &str = "DOC-UPDATE_";

const DEFAULT_CAPTION_LEAD_IN: &str = "✅ Text Update:";
const DEFAULT_CAPTION_BASE_PREFIX: &str = "📌 HSC-24:";
const DEFAULT_CAPTION_SUFFIX_TEXT: &str = "🎓 Study on Telegram!";
const DEFAULT_CAPTION_SUFFIX_LINK: &str = "https://t.me/addlist/qwlJ7Ve1bW8xNzg1";
const DEFAULT_TMP_ROOT: &str = "./tmp";

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Bold lead-in at the start of the final caption
    #[serde(default = "default_caption_lead_in")]
    pub caption_lead_in: String,
    /// Bold prefix joined to the post title in the final caption
    #[serde(default = "default_caption_base_prefix")]
    pub caption_base_prefix: String,
    /// Link text of the caption's closing line
    #[serde(default = "default_caption_suffix_text")]
    pub caption_suffix_text: String,
    /// Destination URL of the caption's closing line
    #[serde(default = "default_caption_suffix_link")]
    pub caption_suffix_link: String,

    /// Document name prefix new sessions start with
    #[serde(default = "default_doc_prefix")]
    pub default_doc_prefix: String,
    /// Root directory for per-user temporary files
    #[serde(default = "default_tmp_root")]
    pub tmp_root: String,
}

fn default_caption_lead_in() -> String {
    DEFAULT_CAPTION_LEAD_IN.to_string()
}

fn default_caption_base_prefix() -> String {
    DEFAULT_CAPTION_BASE_PREFIX.to_string()
}

fn default_caption_suffix_text() -> String {
    DEFAULT_CAPTION_SUFFIX_TEXT.to_string()
}

fn default_caption_suffix_link() -> String {
    DEFAULT_CAPTION_SUFFIX_LINK.to_string()
}

fn default_doc_prefix() -> String {
    DEFAULT_DOC_PREFIX.to_string()
}

fn default_tmp_root() -> String {
    DEFAULT_TMP_ROOT.to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly (without prefix)
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?
            .try_deserialize()
    }

    /// Build the caption template once from the configured segments.
    #[must_use]
    pub fn caption_template(&self) -> CaptionTemplate {
        CaptionTemplate::new(
            &self.caption_lead_in,
            &self.caption_base_prefix,
            &self.caption_suffix_text,
            &self.caption_suffix_link,
        )
    }
}
