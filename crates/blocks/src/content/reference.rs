//! Reference resolution for chooser and embed fields.
//!
//! Blocks only declare "a reference to an asset of kind K". Whether the
//! referenced image, document, or page exists is answered by whoever owns
//! asset storage, through [`ReferenceResolver`].

use std::fmt;

use serde::Serialize;

/// The kind of thing a chooser or embed field points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Image,
    Document,
    Page,
    Embed,
}

impl ReferenceKind {
    /// Lowercase name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Page => "page",
            Self::Embed => "embed",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers whether references found in block data point at something real.
pub trait ReferenceResolver: Send + Sync {
    /// Check that an image, document, or page with this id exists.
    fn resolve(&self, kind: ReferenceKind, id: u64) -> bool;

    /// Check that an embed URL can be fetched by the embed provider.
    fn resolve_embed(&self, url: &str) -> bool;
}

/// URL prefixes of embed providers accepted out of the box.
pub const EMBED_WHITELIST: &[&str] = &[
    "youtube.com/watch",
    "youtube.com/embed/",
    "youtu.be/",
    "vimeo.com/",
    "player.vimeo.com/",
];

/// Embed provider allow-list matched against URL prefixes.
///
/// Also usable as a [`ReferenceResolver`] when no asset store is at hand:
/// asset references are taken on trust and only embeds are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedWhitelist {
    patterns: Vec<String>,
}

impl Default for EmbedWhitelist {
    fn default() -> Self {
        Self::with_patterns(EMBED_WHITELIST.iter().copied())
    }
}

impl EmbedWhitelist {
    /// Create a whitelist with no providers.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Create a whitelist from provider prefixes.
    pub fn with_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::empty();
        for pattern in patterns {
            list.add(pattern);
        }
        list
    }

    /// Add a provider prefix such as `"soundcloud.com/"`.
    pub fn add(&mut self, pattern: impl Into<String>) {
        let pattern = normalise(&pattern.into()).to_string();
        if !pattern.is_empty() && !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    /// Provider prefixes, normalised.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check whether the URL matches one of the provider prefixes.
    pub fn matches(&self, url: &str) -> bool {
        let normalised = normalise(url.trim());
        self.patterns
            .iter()
            .any(|pattern| normalised.starts_with(pattern.as_str()))
    }
}

impl ReferenceResolver for EmbedWhitelist {
    fn resolve(&self, _kind: ReferenceKind, _id: u64) -> bool {
        true
    }

    fn resolve_embed(&self, url: &str) -> bool {
        self.matches(url)
    }
}

// Strip scheme and leading "www." so patterns match either form.
fn normalise(url: &str) -> &str {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
}
