//! Page content stream schema.
//!
//! A stream is an ordered, heterogeneous list of block instances. The
//! schema fixes which block types may appear; it puts no limit on length,
//! order, or repetition.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::content::block_types::{BlockDefinition, BlockKind, standard_definitions};
use crate::content::reference::ReferenceResolver;
use crate::error::{StreamErrors, StreamValidationError, ValidationError};

/// The page body stream built from default configuration.
static BASE_STREAM: LazyLock<StreamSchema> = LazyLock::new(StreamSchema::standard);

/// One block instance in a stream, in its stored shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamEntry {
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl StreamEntry {
    /// Create an entry with a fresh id.
    pub fn new(kind: BlockKind, value: Value) -> Self {
        Self {
            block_type: kind.as_str().to_string(),
            value,
            id: Some(Uuid::now_v7().to_string()),
        }
    }

    /// The entry's block kind, if its tag is a known one.
    pub fn kind(&self) -> Option<BlockKind> {
        self.block_type.parse().ok()
    }
}

/// Parse a stored stream (a JSON array of entries).
pub fn parse_stream(json: &str) -> Result<Vec<StreamEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Closed set of block types permitted in a content stream.
#[derive(Debug, Clone)]
pub struct StreamSchema {
    blocks: BTreeMap<BlockKind, BlockDefinition>,
}

impl StreamSchema {
    /// Create a schema from the given definitions. A later definition for
    /// the same kind replaces an earlier one.
    pub fn new(definitions: impl IntoIterator<Item = BlockDefinition>) -> Self {
        let blocks = definitions
            .into_iter()
            .map(|definition| (definition.kind, definition))
            .collect();
        Self { blocks }
    }

    /// The seven standard blocks with template roots and rich text
    /// features taken from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(standard_definitions(config))
    }

    /// The seven standard blocks with default configuration.
    pub fn standard() -> Self {
        Self::from_config(&Config::default())
    }

    /// Process-wide page body schema, built once on first use.
    pub fn base() -> &'static StreamSchema {
        &BASE_STREAM
    }

    /// Look up a block definition by kind.
    pub fn get(&self, kind: BlockKind) -> Option<&BlockDefinition> {
        self.blocks.get(&kind)
    }

    /// Look up a definition by its stream tag.
    pub fn lookup(&self, tag: &str) -> Result<&BlockDefinition, ValidationError> {
        tag.parse::<BlockKind>()
            .ok()
            .and_then(|kind| self.blocks.get(&kind))
            .ok_or_else(|| ValidationError::UnknownBlockType {
                tag: tag.to_string(),
            })
    }

    /// Check whether a tag is one of the declared block types.
    pub fn contains(&self, tag: &str) -> bool {
        self.lookup(tag).is_ok()
    }

    /// Return the number of declared block types.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if no block type is declared.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Declared block kinds in declaration order.
    pub fn block_types(&self) -> impl Iterator<Item = BlockKind> + '_ {
        self.blocks.keys().copied()
    }

    /// Declared block definitions in declaration order.
    pub fn definitions(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.blocks.values()
    }

    /// Validate a single entry without resolving references.
    pub fn validate_entry(&self, entry: &StreamEntry) -> Vec<ValidationError> {
        self.validate_entry_inner(entry, None)
    }

    /// Validate every entry of a stream without resolving references.
    ///
    /// Errors are gathered for all entries; an empty stream is valid.
    pub fn validate(&self, entries: &[StreamEntry]) -> Result<(), StreamErrors> {
        self.validate_inner(entries, None)
    }

    /// Validate every entry, checking references against `resolver`.
    pub fn validate_with(
        &self,
        entries: &[StreamEntry],
        resolver: &dyn ReferenceResolver,
    ) -> Result<(), StreamErrors> {
        self.validate_inner(entries, Some(resolver))
    }

    fn validate_entry_inner(
        &self,
        entry: &StreamEntry,
        resolver: Option<&dyn ReferenceResolver>,
    ) -> Vec<ValidationError> {
        match self.lookup(&entry.block_type) {
            Ok(definition) => match resolver {
                Some(resolver) => definition.validate_with(&entry.value, resolver),
                None => definition.validate(&entry.value),
            },
            Err(err) => vec![err],
        }
    }

    fn validate_inner(
        &self,
        entries: &[StreamEntry],
        resolver: Option<&dyn ReferenceResolver>,
    ) -> Result<(), StreamErrors> {
        let failures: Vec<StreamValidationError> = entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let errors = self.validate_entry_inner(entry, resolver);
                (!errors.is_empty()).then(|| StreamValidationError {
                    index,
                    block_type: entry.block_type.clone(),
                    errors,
                })
            })
            .collect();

        tracing::debug!(
            entries = entries.len(),
            failed = failures.len(),
            resolved = resolver.is_some(),
            "validated content stream"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(StreamErrors(failures))
        }
    }

    /// Describe the schema for the editor.
    pub fn describe(&self) -> SchemaDescription {
        SchemaDescription {
            blocks: self
                .definitions()
                .map(|definition| BlockDescription {
                    schema: definition.json_schema(),
                    definition: definition.clone(),
                })
                .collect(),
        }
    }
}

impl Default for StreamSchema {
    fn default() -> Self {
        Self::standard()
    }
}

/// Serialisable description of a stream schema.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescription {
    pub blocks: Vec<BlockDescription>,
}

/// One block type in a [`SchemaDescription`].
#[derive(Debug, Clone, Serialize)]
pub struct BlockDescription {
    #[serde(flatten)]
    pub definition: BlockDefinition,
    /// JSON Schema of the block's value.
    pub schema: Value,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(tag: &str, value: Value) -> StreamEntry {
        StreamEntry {
            block_type: tag.to_string(),
            value,
            id: None,
        }
    }

    #[test]
    fn standard_schema_declares_seven_types() {
        let schema = StreamSchema::standard();
        assert_eq!(schema.len(), 7);
        let tags: Vec<&str> = schema.block_types().map(|k| k.as_str()).collect();
        assert_eq!(
            tags,
            vec![
                "heading_block",
                "rich_text_block",
                "image_block",
                "block_quote",
                "embed_block",
                "document_block",
                "page_link_block",
            ]
        );
    }

    #[test]
    fn base_schema_is_shared() {
        assert!(std::ptr::eq(StreamSchema::base(), StreamSchema::base()));
        assert_eq!(StreamSchema::base().len(), 7);
    }

    #[test]
    fn empty_stream_is_valid() {
        assert!(StreamSchema::standard().validate(&[]).is_ok());
    }

    #[test]
    fn unknown_tag_is_reported() {
        let schema = StreamSchema::standard();
        let err = schema
            .validate(&[entry("carousel", json!({}))])
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(
            err.for_entry(0).unwrap(),
            [ValidationError::UnknownBlockType {
                tag: "carousel".to_string()
            }]
        );
    }

    #[test]
    fn errors_are_collected_across_entries() {
        let schema = StreamSchema::standard();
        let entries = vec![
            entry("heading_block", json!({ "heading_text": "" })),
            entry("rich_text_block", json!("<p>fine</p>")),
            entry("video_block", json!({})),
            entry("image_block", json!({ "caption": "No image" })),
        ];
        let err = schema.validate(&entries).unwrap_err();
        let indexes: Vec<usize> = err.iter().map(|e| e.index).collect();
        assert_eq!(indexes, vec![0, 2, 3]);
        assert_eq!(
            err.for_entry(3).unwrap(),
            [ValidationError::MissingRequiredField {
                field: "image".to_string()
            }]
        );
    }

    #[test]
    fn repeated_and_mixed_types_are_accepted() {
        let schema = StreamSchema::standard();
        let entries = vec![
            entry("page_link_block", json!(3)),
            entry("page_link_block", json!(3)),
            entry("heading_block", json!({ "heading_text": "A" })),
            entry("page_link_block", json!(4)),
        ];
        assert!(schema.validate(&entries).is_ok());
    }

    #[test]
    fn restricted_schema_rejects_undeclared_kinds() {
        let config = Config::default();
        let schema = StreamSchema::new([crate::content::block_types::standard_definition(
            BlockKind::Heading,
            &config,
        )]);
        assert!(schema.contains("heading_block"));
        assert!(!schema.contains("block_quote"));
        let err = schema
            .validate(&[entry("block_quote", json!({ "text": "q" }))])
            .unwrap_err();
        assert!(matches!(
            err.for_entry(0).unwrap()[0],
            ValidationError::UnknownBlockType { .. }
        ));
    }

    #[test]
    fn parse_stream_reads_stored_shape() {
        let entries = parse_stream(
            r#"[
                {"type": "heading_block", "value": {"heading_text": "Hi"}, "id": "a1"},
                {"type": "embed_block", "value": "https://vimeo.com/1"}
            ]"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id.as_deref(), Some("a1"));
        assert_eq!(entries[1].kind(), Some(BlockKind::Embed));
        assert!(entries[1].id.is_none());
    }

    #[test]
    fn new_entries_get_distinct_ids() {
        let a = StreamEntry::new(BlockKind::PageLink, json!(1));
        let b = StreamEntry::new(BlockKind::PageLink, json!(1));
        assert!(a.id.is_some());
        assert_ne!(a.id, b.id);
        assert_eq!(a.block_type, "page_link_block");
    }

    #[test]
    fn describe_exports_every_block() {
        let description = StreamSchema::standard().describe();
        assert_eq!(description.blocks.len(), 7);

        let json = serde_json::to_value(&description).unwrap();
        let heading = &json["blocks"][0];
        assert_eq!(heading["type"], "heading_block");
        assert_eq!(heading["icon"], "title");
        assert_eq!(heading["template"], "blocks/heading_block.html");
        assert_eq!(heading["schema"]["required"], json!(["heading_text"]));
        assert_eq!(heading["fields"][1]["kind"]["type"], "choice");
    }
}
