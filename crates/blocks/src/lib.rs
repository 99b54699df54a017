//! Pagestream block library.
//!
//! Content block schemas for page building: block definitions, the page
//! body stream schema, validation, and the render/preview contract handed
//! to templates. The `pagestream` binary is a thin operator tool on top.

pub mod config;
pub mod content;
pub mod error;

pub use config::Config;
pub use content::{
    BlockDefinition, BlockKind, EmbedWhitelist, FeatureSet, ReferenceKind, ReferenceResolver,
    RenderedBlock, StreamEntry, StreamSchema,
};
pub use error::{StreamErrors, StreamValidationError, ValidationError};
