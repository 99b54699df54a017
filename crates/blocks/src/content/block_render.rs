//! Render dispatch for content streams.
//!
//! Walks a stream in order and pairs each entry with the template and
//! context its block definition supplies. Turning that into HTML is the
//! template engine's job. Two paths exist:
//! - live: the entry's own data under the block's template
//! - preview: the block's fixed sample under its preview template

use serde::Serialize;
use serde_json::Value;

use crate::content::block_types::{BlockDefinition, BlockKind};
use crate::content::stream::{StreamEntry, StreamSchema};

/// One stream entry resolved to a template and its context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub block_type: BlockKind,
    pub template: String,
    pub context: Value,
}

impl StreamSchema {
    /// Resolve every entry for live rendering.
    ///
    /// Entries with an unknown tag are skipped; rendering never fails.
    pub fn render_plan(&self, entries: &[StreamEntry]) -> Vec<RenderedBlock> {
        self.plan(entries, |definition, value| {
            (
                definition.template.clone(),
                definition.render_context(value),
            )
        })
    }

    /// Resolve every entry for design-time preview.
    pub fn preview_plan(&self, entries: &[StreamEntry]) -> Vec<RenderedBlock> {
        self.plan(entries, |definition, value| {
            (
                definition.preview_template.clone(),
                definition.preview_context(value),
            )
        })
    }

    fn plan<F>(&self, entries: &[StreamEntry], resolve: F) -> Vec<RenderedBlock>
    where
        F: Fn(&BlockDefinition, &Value) -> (String, Value),
    {
        entries
            .iter()
            .filter_map(|entry| {
                let Ok(definition) = self.lookup(&entry.block_type) else {
                    tracing::warn!(
                        block_type = %entry.block_type,
                        id = entry.id.as_deref().unwrap_or(""),
                        "skipping unknown block type during render"
                    );
                    return None;
                };
                let (template, context) = resolve(definition, &entry.value);
                Some(RenderedBlock {
                    id: entry.id.clone(),
                    block_type: definition.kind,
                    template,
                    context,
                })
            })
            .collect()
    }
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
            id: Some(format!("id-{tag}")),
        }
    }

    #[test]
    fn render_plan_uses_live_templates_and_data() {
        let schema = StreamSchema::standard();
        let entries = vec![
            entry("heading_block", json!({ "heading_text": "Our Mission", "size": "h2" })),
            entry("block_quote", json!({ "text": "Quoted" })),
        ];
        let plan = schema.render_plan(&entries);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].template, "blocks/heading_block.html");
        assert_eq!(plan[0].block_type, BlockKind::Heading);
        assert_eq!(plan[0].id.as_deref(), Some("id-heading_block"));
        assert_eq!(
            plan[0].context,
            json!({ "value": { "heading_text": "Our Mission", "size": "h2" } })
        );
        assert_eq!(plan[1].template, "blocks/blockquote.html");
        assert_eq!(plan[1].context["value"]["text"], "Quoted");
    }

    #[test]
    fn render_plan_keeps_stream_order() {
        let schema = StreamSchema::standard();
        let entries = vec![
            entry("page_link_block", json!(2)),
            entry("heading_block", json!({ "heading_text": "A" })),
            entry("page_link_block", json!(5)),
        ];
        let kinds: Vec<BlockKind> = schema
            .render_plan(&entries)
            .into_iter()
            .map(|b| b.block_type)
            .collect();
        assert_eq!(
            kinds,
            vec![BlockKind::PageLink, BlockKind::Heading, BlockKind::PageLink]
        );
    }

    #[test]
    fn render_plan_skips_unknown_types() {
        let schema = StreamSchema::standard();
        let entries = vec![
            entry("unknown_widget", json!({ "foo": "bar" })),
            entry("embed_block", json!("https://youtu.be/abc")),
        ];
        let plan = schema.render_plan(&entries);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].block_type, BlockKind::Embed);
    }

    #[test]
    fn render_plan_does_not_validate() {
        let schema = StreamSchema::standard();
        let plan = schema.render_plan(&[entry("heading_block", json!({ "heading_text": "" }))]);
        assert_eq!(plan[0].context, json!({ "value": { "heading_text": "" } }));
    }

    #[test]
    fn preview_plan_uses_samples() {
        let schema = StreamSchema::standard();
        let entries = vec![
            entry("heading_block", json!({ "heading_text": "Real heading" })),
            entry("embed_block", json!("not even a url")),
            entry("rich_text_block", json!("<p>Live copy</p>")),
        ];
        let plan = schema.preview_plan(&entries);
        assert_eq!(plan[0].template, "blocks/preview/heading_block.html");
        assert_eq!(
            plan[0].context,
            json!({ "value": { "heading_text": "Section Heading", "size": "h2" } })
        );
        assert_eq!(plan[1].template, "blocks/preview/static_embed_block.html");
        assert_eq!(
            plan[1].context["value"]["embed"],
            "https://www.youtube.com/watch?v=XqZsoesa55w"
        );
        assert_eq!(plan[2].template, "blocks/preview/paragraph_block.html");
        let sample = plan[2].context["value"]["value"].as_str().unwrap();
        assert!(sample.starts_with("<h2>Our Mission</h2>"));
    }

    #[test]
    fn empty_stream_renders_nothing() {
        let schema = StreamSchema::standard();
        assert!(schema.render_plan(&[]).is_empty());
        assert!(schema.preview_plan(&[]).is_empty());
    }
}
