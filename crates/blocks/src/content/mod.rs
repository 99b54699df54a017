//! Page content blocks.
//!
//! This module provides:
//! - BlockDefinition: fields, templates, and preview sample for one block type
//! - FeatureSet: rich text feature allow-list
//! - ReferenceResolver: seam for checking image, document, page, and embed references
//! - StreamSchema: the closed set of blocks a page stream may contain
//! - Render dispatch: live and preview template contexts for a stream

pub mod block_render;
pub mod block_types;
pub mod reference;
pub mod rich_text;
pub mod stream;

pub use block_render::RenderedBlock;
pub use block_types::{
    BlockDefinition, BlockKind, FieldKind, FieldSpec, standard_definition, standard_definitions,
};
pub use reference::{EmbedWhitelist, ReferenceKind, ReferenceResolver};
pub use rich_text::{FeatureSet, RichTextFeature};
pub use stream::{SchemaDescription, StreamEntry, StreamSchema, parse_stream};
