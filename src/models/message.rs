//! Rendered notification text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<[^>]*>").unwrap_or_else(|_| unreachable!("static pattern is valid"))
});

/// How a provider should treat the text it is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    /// Text carries inline HTML markup (`<b>`, `<i>`).
    Rich,
    /// Markup removed.
    Plain,
}

/// A message rendered with inline markup, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    rich: String,
}

impl RenderedMessage {
    /// Wraps already-rendered markup.
    pub fn new(rich: impl Into<String>) -> Self {
        Self { rich: rich.into() }
    }

    /// The marked-up text.
    pub fn rich(&self) -> &str {
        &self.rich
    }

    /// The same text with markup removed and entities decoded.
    pub fn plain(&self) -> String {
        strip_markup(&self.rich)
    }

    /// Text in the requested format.
    pub fn text(&self, format: MessageFormat) -> String {
        match format {
            MessageFormat::Rich => self.rich.clone(),
            MessageFormat::Plain => self.plain(),
        }
    }
}

/// Removes every `<...>` tag and decodes the entities the formatter emits.
pub fn strip_markup(text: &str) -> String {
    MARKUP_TAG
        .replace_all(text, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Escapes text for inclusion in rich markup.
pub fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
