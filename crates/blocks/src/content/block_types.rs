//! Block type definitions and per-block validation.
//!
//! Provides:
//! - `BlockKind`: the closed set of block tags a page stream may contain
//! - `FieldSpec` / `FieldKind`: the sub-fields of a block and their rules
//! - `BlockDefinition`: fields, editor metadata, templates, and preview sample
//! - `standard_definitions`: the seven page-building blocks

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::config::Config;
use crate::content::reference::{ReferenceKind, ReferenceResolver};
use crate::content::rich_text::FeatureSet;
use crate::error::ValidationError;

/// Tag identifying a block type inside a content stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum BlockKind {
    #[serde(rename = "heading_block")]
    Heading,
    #[serde(rename = "rich_text_block")]
    RichText,
    #[serde(rename = "image_block")]
    CaptionedImage,
    #[serde(rename = "block_quote")]
    BlockQuote,
    #[serde(rename = "embed_block")]
    Embed,
    #[serde(rename = "document_block")]
    DocumentDownload,
    #[serde(rename = "page_link_block")]
    PageLink,
}

impl BlockKind {
    /// All block kinds in stream declaration order.
    pub const ALL: [BlockKind; 7] = [
        Self::Heading,
        Self::RichText,
        Self::CaptionedImage,
        Self::BlockQuote,
        Self::Embed,
        Self::DocumentDownload,
        Self::PageLink,
    ];

    /// Tag used for this block in stored streams.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heading => "heading_block",
            Self::RichText => "rich_text_block",
            Self::CaptionedImage => "image_block",
            Self::BlockQuote => "block_quote",
            Self::Embed => "embed_block",
            Self::DocumentDownload => "document_block",
            Self::PageLink => "page_link_block",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownBlockType { tag: s.to_string() })
    }
}

/// Value type of a block sub-field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "options", rename_all = "snake_case")]
pub enum FieldKind {
    /// Single-line text.
    Char,
    /// Multi-line plain text.
    Text,
    /// One of a fixed list of `(value, label)` pairs.
    Choice(&'static [(&'static str, &'static str)]),
    /// Rich text limited to a feature set.
    RichText(FeatureSet),
    /// External media URL.
    Embed,
    /// Id of an image, document, or page managed by the CMS.
    Chooser(ReferenceKind),
}

/// A named sub-field of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<&'static str>,
}

impl FieldSpec {
    /// A field that must be present and non-blank.
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            label: None,
            help_text: None,
        }
    }

    /// A field that may be absent.
    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    /// Set the editor label.
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Set the editor help text.
    pub fn with_help_text(mut self, help_text: &'static str) -> Self {
        self.help_text = Some(help_text);
        self
    }

    /// JSON Schema fragment for this field's value.
    pub fn json_schema(&self) -> Value {
        match &self.kind {
            FieldKind::Char | FieldKind::Text => json!({ "type": "string" }),
            FieldKind::Choice(choices) => {
                let values: Vec<&str> = choices.iter().map(|(value, _)| *value).collect();
                json!({ "type": "string", "enum": values })
            }
            FieldKind::RichText(features) => json!({
                "type": "string",
                "contentMediaType": "text/html",
                "features": features,
            }),
            FieldKind::Embed => json!({ "type": "string", "format": "uri" }),
            FieldKind::Chooser(kind) => json!({
                "type": "integer",
                "minimum": 1,
                "reference": kind,
            }),
        }
    }

    fn validate(
        &self,
        value: Option<&Value>,
        resolver: Option<&dyn ReferenceResolver>,
        errors: &mut Vec<ValidationError>,
    ) {
        let Some(value) = value.filter(|v| !is_blank(v)) else {
            if self.required {
                errors.push(ValidationError::missing(self.name));
            }
            return;
        };

        match &self.kind {
            FieldKind::Char | FieldKind::Text => {
                if !value.is_string() {
                    errors.push(ValidationError::invalid(self.name, "expected a string"));
                }
            }
            FieldKind::Choice(choices) => match value.as_str() {
                Some(s) if choices.iter().any(|(choice, _)| *choice == s) => {}
                Some(s) => {
                    let allowed: Vec<&str> = choices
                        .iter()
                        .map(|(choice, _)| *choice)
                        .filter(|choice| !choice.is_empty())
                        .collect();
                    errors.push(ValidationError::invalid(
                        self.name,
                        format!("'{s}' is not one of {}", allowed.join(", ")),
                    ));
                }
                None => errors.push(ValidationError::invalid(self.name, "expected a string")),
            },
            FieldKind::RichText(features) => match value.as_str() {
                Some(html) => errors.extend(features.check_markup(html)),
                None => errors.push(ValidationError::invalid(self.name, "expected a string")),
            },
            FieldKind::Embed => match value.as_str().map(str::trim) {
                Some(url) if is_http_url(url) => {
                    if let Some(resolver) = resolver
                        && !resolver.resolve_embed(url)
                    {
                        errors.push(ValidationError::UnresolvableReference {
                            field: self.name.to_string(),
                            kind: ReferenceKind::Embed,
                            reference: url.to_string(),
                        });
                    }
                }
                _ => errors.push(ValidationError::invalid(
                    self.name,
                    "expected an absolute http(s) URL",
                )),
            },
            FieldKind::Chooser(kind) => match reference_id(value) {
                Some(id) => {
                    if let Some(resolver) = resolver
                        && !resolver.resolve(*kind, id)
                    {
                        errors.push(ValidationError::UnresolvableReference {
                            field: self.name.to_string(),
                            kind: *kind,
                            reference: id.to_string(),
                        });
                    }
                }
                None => errors.push(ValidationError::invalid(
                    self.name,
                    format!("expected a positive {kind} id"),
                )),
            },
        }
    }
}

/// Definition of a single block type: fields, editor metadata, templates,
/// and the canned value used for design-time previews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDefinition {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub label: &'static str,
    /// Editor icon name.
    pub icon: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<&'static str>,
    /// Template used for live rendering.
    pub template: String,
    /// Template used for design-time previews.
    pub preview_template: String,
    pub fields: Vec<FieldSpec>,
    pub preview_value: Value,
}

impl BlockDefinition {
    /// Look up a sub-field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Bring instance data into object form.
    ///
    /// Single-field blocks also accept their bare value (a rich text
    /// string, an embed URL, a page id). Returns `None` when a multi-field
    /// block receives something other than an object.
    pub fn normalize(&self, value: &Value) -> Option<Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map.clone()),
            _ if self.fields.len() == 1 => {
                let mut map = Map::new();
                map.insert(self.fields[0].name.to_string(), value.clone());
                Some(map)
            }
            Value::Null => Some(Map::new()),
            _ => None,
        }
    }

    /// Validate instance data without resolving references.
    pub fn validate(&self, value: &Value) -> Vec<ValidationError> {
        self.validate_inner(value, None)
    }

    /// Validate instance data, checking references against `resolver`.
    pub fn validate_with(
        &self,
        value: &Value,
        resolver: &dyn ReferenceResolver,
    ) -> Vec<ValidationError> {
        self.validate_inner(value, Some(resolver))
    }

    fn validate_inner(
        &self,
        value: &Value,
        resolver: Option<&dyn ReferenceResolver>,
    ) -> Vec<ValidationError> {
        let Some(data) = self.normalize(value) else {
            return vec![ValidationError::invalid("value", "expected an object")];
        };

        let mut errors = Vec::new();
        for field in &self.fields {
            field.validate(data.get(field.name), resolver, &mut errors);
        }
        errors
    }

    /// Template context for live rendering: the instance's own data.
    pub fn render_context(&self, value: &Value) -> Value {
        let value = self
            .normalize(value)
            .map_or_else(|| value.clone(), Value::Object);
        json!({ "value": value })
    }

    /// Template context for previews: always the fixed sample, whatever
    /// instance data is passed in.
    pub fn preview_context(&self, _value: &Value) -> Value {
        json!({ "value": self.preview_value })
    }

    /// JSON Schema describing this block's object value.
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Heading sizes offered by the heading block. The empty value means
/// "let the template decide".
pub const HEADING_SIZES: &[(&str, &str)] = &[
    ("", "Select a header size"),
    ("h2", "H2"),
    ("h3", "H3"),
    ("h4", "H4"),
];

/// Build the seven standard block definitions in stream declaration order.
pub fn standard_definitions(config: &Config) -> Vec<BlockDefinition> {
    BlockKind::ALL
        .into_iter()
        .map(|kind| standard_definition(kind, config))
        .collect()
}

/// Build the standard definition for one block kind.
pub fn standard_definition(kind: BlockKind, config: &Config) -> BlockDefinition {
    let templates = |live: &str, preview: &str| {
        (
            join_template(&config.template_dir, live),
            join_template(&config.preview_template_dir, preview),
        )
    };

    match kind {
        BlockKind::Heading => {
            let (template, preview_template) = templates("heading_block.html", "heading_block.html");
            BlockDefinition {
                kind,
                label: "Heading",
                icon: "title",
                description: "A heading with level two, three, or four",
                help_text: None,
                template,
                preview_template,
                fields: vec![
                    FieldSpec::required("heading_text", FieldKind::Char),
                    FieldSpec::optional("size", FieldKind::Choice(HEADING_SIZES)),
                ],
                preview_value: json!({ "heading_text": "Section Heading", "size": "h2" }),
            }
        }
        BlockKind::RichText => {
            let (template, preview_template) =
                templates("rich_text_block.html", "paragraph_block.html");
            BlockDefinition {
                kind,
                label: "Rich text",
                icon: "pilcrow",
                description: "A rich text paragraph",
                help_text: None,
                template,
                preview_template,
                fields: vec![FieldSpec::required(
                    "value",
                    FieldKind::RichText(config.rich_text_features.clone()),
                )],
                preview_value: json!({ "value": RICH_TEXT_PREVIEW }),
            }
        }
        BlockKind::CaptionedImage => {
            let (template, preview_template) =
                templates("captioned_image_block.html", "captioned_image_block.html");
            BlockDefinition {
                kind,
                label: "Image",
                icon: "image",
                description: "An image with optional caption and attribution",
                help_text: None,
                template,
                preview_template,
                fields: vec![
                    FieldSpec::required("image", FieldKind::Chooser(ReferenceKind::Image)),
                    FieldSpec::optional("caption", FieldKind::Char),
                    FieldSpec::optional("attribution", FieldKind::Char),
                ],
                preview_value: json!({
                    "caption": "Sample image caption",
                    "attribution": "Company Name",
                }),
            }
        }
        BlockKind::BlockQuote => {
            let (template, preview_template) = templates("blockquote.html", "blockquote.html");
            BlockDefinition {
                kind,
                label: "Quote",
                icon: "openquote",
                description: "A quote with an optional attribution",
                help_text: None,
                template,
                preview_template,
                fields: vec![
                    FieldSpec::required("text", FieldKind::Text),
                    FieldSpec::optional("attribute_name", FieldKind::Char)
                        .with_label("e.g. Mary Berry"),
                ],
                preview_value: json!({
                    "text": "A meaningful quote that captures the essence of your message.",
                    "attribute_name": "Author Name",
                }),
            }
        }
        BlockKind::Embed => {
            let (template, preview_template) =
                templates("embed_block.html", "static_embed_block.html");
            BlockDefinition {
                kind,
                label: "Embed",
                icon: "media",
                description: "An embedded video or other media",
                help_text: Some(
                    "Insert an embed URL e.g  https://www.youtube.com/watch?v=JGwWNGJdvx8",
                ),
                template,
                preview_template,
                fields: vec![FieldSpec::required("embed", FieldKind::Embed)],
                preview_value: json!({ "embed": "https://www.youtube.com/watch?v=XqZsoesa55w" }),
            }
        }
        BlockKind::DocumentDownload => {
            let (template, preview_template) = templates(
                "document_download_block.html",
                "document_download_block.html",
            );
            BlockDefinition {
                kind,
                label: "Document",
                icon: "doc-full",
                description: "A downloadable document with optional title and description",
                help_text: None,
                template,
                preview_template,
                fields: vec![
                    FieldSpec::required("document", FieldKind::Chooser(ReferenceKind::Document)),
                    FieldSpec::optional("title", FieldKind::Char).with_help_text(
                        "Optional: document title to display instead of the filename",
                    ),
                    FieldSpec::optional("description", FieldKind::Text)
                        .with_help_text("Optional: describe the document"),
                ],
                preview_value: json!({
                    "title": "Annual Report 2023",
                    "description": "Our comprehensive annual report with financial statements and achievements.",
                }),
            }
        }
        BlockKind::PageLink => {
            let (template, preview_template) =
                templates("page_link_block.html", "page_link_block.html");
            BlockDefinition {
                kind,
                label: "Page link",
                icon: "doc-empty-inverse",
                description: "A link to another page on this site",
                help_text: None,
                template,
                preview_template,
                fields: vec![FieldSpec::required(
                    "page",
                    FieldKind::Chooser(ReferenceKind::Page),
                )],
                preview_value: json!({ "page": { "title": "Sample page", "url": "/" } }),
            }
        }
    }
}

const RICH_TEXT_PREVIEW: &str = concat!(
    "<h2>Our Mission</h2>\n",
    "<p>At our company, <b>quality</b> has <i>always</i> been our priority.\n",
    "<a href=\"#\">Our products</a> are designed with care and attention to detail.\n",
    "We strive to deliver excellence in everything we do.</p>",
);

fn join_template(dir: &str, file: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{dir}/{file}")
    }
}

/// Absent, null, or a whitespace-only string.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

/// Chooser ids are positive integers, stored either as numbers or strings.
fn reference_id(value: &Value) -> Option<u64> {
    let id = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}
