//! Pagestream test utilities.
//!
//! Helpers for integration testing: stream entry builders, an in-memory
//! reference resolver, and assertion utilities for validation results.

use std::collections::HashSet;

use serde_json::{Value as JsonValue, json};

use pagestream_blocks::content::{BlockKind, EmbedWhitelist, ReferenceKind, ReferenceResolver};
use pagestream_blocks::StreamEntry;

/// Create a stream entry for the given block kind.
pub fn test_block(kind: BlockKind) -> TestBlock {
    TestBlock {
        kind,
        value: json!({}),
        id: None,
    }
}

/// A stream entry builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestBlock {
    pub kind: BlockKind,
    pub value: JsonValue,
    pub id: Option<String>,
}

impl TestBlock {
    /// Set a custom entry id.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Replace the whole value.
    pub fn with_value(mut self, value: JsonValue) -> Self {
        self.value = value;
        self
    }

    /// Set a single sub-field.
    pub fn with_field(mut self, name: &str, value: JsonValue) -> Self {
        if let Some(obj) = self.value.as_object_mut() {
            obj.insert(name.to_string(), value);
        }
        self
    }

    /// Remove a sub-field.
    pub fn without_field(mut self, name: &str) -> Self {
        if let Some(obj) = self.value.as_object_mut() {
            obj.remove(name);
        }
        self
    }

    /// Build the stream entry.
    pub fn build(self) -> StreamEntry {
        StreamEntry {
            block_type: self.kind.as_str().to_string(),
            value: self.value,
            id: self.id,
        }
    }
}

/// Builders for each standard block with every field populated.
pub mod blocks {
    use super::*;

    /// Heading block.
    pub fn heading(text: &str, size: &str) -> TestBlock {
        test_block(BlockKind::Heading)
            .with_field("heading_text", json!(text))
            .with_field("size", json!(size))
    }

    /// Rich text block.
    pub fn rich_text(html: &str) -> TestBlock {
        test_block(BlockKind::RichText).with_field("value", json!(html))
    }

    /// Captioned image block.
    pub fn image(id: u64, caption: &str, attribution: &str) -> TestBlock {
        test_block(BlockKind::CaptionedImage)
            .with_field("image", json!(id))
            .with_field("caption", json!(caption))
            .with_field("attribution", json!(attribution))
    }

    /// Block quote.
    pub fn quote(text: &str, attribute_name: &str) -> TestBlock {
        test_block(BlockKind::BlockQuote)
            .with_field("text", json!(text))
            .with_field("attribute_name", json!(attribute_name))
    }

    /// Embed block.
    pub fn embed(url: &str) -> TestBlock {
        test_block(BlockKind::Embed).with_field("embed", json!(url))
    }

    /// Document download block.
    pub fn document(id: u64, title: &str, description: &str) -> TestBlock {
        test_block(BlockKind::DocumentDownload)
            .with_field("document", json!(id))
            .with_field("title", json!(title))
            .with_field("description", json!(description))
    }

    /// Page link block.
    pub fn page_link(id: u64) -> TestBlock {
        test_block(BlockKind::PageLink).with_field("page", json!(id))
    }

    /// A fully populated block of the given kind.
    pub fn complete(kind: BlockKind) -> TestBlock {
        match kind {
            BlockKind::Heading => heading("Our Mission", "h2"),
            BlockKind::RichText => rich_text("<p>We build <b>things</b>.</p>"),
            BlockKind::CaptionedImage => image(1, "Harbour at dawn", "Jane Doe"),
            BlockKind::BlockQuote => quote("Simplicity is prerequisite for reliability.", "Dijkstra"),
            BlockKind::Embed => embed("https://www.youtube.com/watch?v=JGwWNGJdvx8"),
            BlockKind::DocumentDownload => document(2, "Annual Report", "Numbers and more"),
            BlockKind::PageLink => page_link(3),
        }
    }
}

/// One complete entry of every block kind, in declaration order.
///
/// References point at image 1, document 2, and page 3; see
/// [`InMemoryResolver::with_sample_assets`].
pub fn sample_stream() -> Vec<StreamEntry> {
    BlockKind::ALL
        .into_iter()
        .map(|kind| blocks::complete(kind).build())
        .collect()
}

/// Reference resolver backed by in-memory id sets.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResolver {
    images: HashSet<u64>,
    documents: HashSet<u64>,
    pages: HashSet<u64>,
    embeds: Option<EmbedWhitelist>,
}

impl InMemoryResolver {
    /// An empty resolver: no assets exist and every embed resolves.
    pub fn new() -> Self {
        Self::default()
    }

    /// The assets referenced by [`sample_stream`].
    pub fn with_sample_assets() -> Self {
        Self::new().with_image(1).with_document(2).with_page(3)
    }

    /// Add an existing image.
    pub fn with_image(mut self, id: u64) -> Self {
        self.images.insert(id);
        self
    }

    /// Add an existing document.
    pub fn with_document(mut self, id: u64) -> Self {
        self.documents.insert(id);
        self
    }

    /// Add an existing page.
    pub fn with_page(mut self, id: u64) -> Self {
        self.pages.insert(id);
        self
    }

    /// Only resolve embeds matching the whitelist.
    pub fn with_embeds(mut self, whitelist: EmbedWhitelist) -> Self {
        self.embeds = Some(whitelist);
        self
    }
}

impl ReferenceResolver for InMemoryResolver {
    fn resolve(&self, kind: ReferenceKind, id: u64) -> bool {
        match kind {
            ReferenceKind::Image => self.images.contains(&id),
            ReferenceKind::Document => self.documents.contains(&id),
            ReferenceKind::Page => self.pages.contains(&id),
            ReferenceKind::Embed => false,
        }
    }

    fn resolve_embed(&self, url: &str) -> bool {
        self.embeds.as_ref().is_none_or(|list| list.matches(url))
    }
}

/// Assertion helpers for validation results.
pub mod assert {
    use pagestream_blocks::ValidationError;
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Assert that validation produced no errors.
    pub fn valid(errors: &[ValidationError]) {
        assert!(errors.is_empty(), "Expected no errors, got: {errors:?}");
    }

    /// Assert that the only error is a missing `field`.
    pub fn only_missing(errors: &[ValidationError], field: &str) {
        assert_eq!(
            errors,
            [ValidationError::MissingRequiredField {
                field: field.to_string()
            }],
            "Expected only '{field}' to be missing"
        );
    }

    /// Assert that some error refers to `field`.
    pub fn mentions_field(errors: &[ValidationError], field: &str) {
        assert!(
            errors.iter().any(|e| e.field() == Some(field)),
            "Expected an error for '{field}', got: {errors:?}"
        );
    }
}
