//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Context, Result};

use crate::content::reference::EmbedWhitelist;
use crate::content::rich_text::FeatureSet;

/// Block schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory prefix for live block templates (default: blocks).
    pub template_dir: String,

    /// Directory prefix for preview templates (default: blocks/preview).
    pub preview_template_dir: String,

    /// Features enabled on rich text blocks (default: all).
    pub rich_text_features: FeatureSet,

    /// Extra embed provider URL prefixes on top of the built-in list.
    pub embed_providers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_dir: "blocks".to_string(),
            preview_template_dir: "blocks/preview".to_string(),
            rich_text_features: FeatureSet::all(),
            embed_providers: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let template_dir = lookup("BLOCK_TEMPLATE_DIR").unwrap_or(defaults.template_dir);

        let preview_template_dir =
            lookup("BLOCK_PREVIEW_TEMPLATE_DIR").unwrap_or(defaults.preview_template_dir);

        let rich_text_features = match lookup("RICH_TEXT_FEATURES") {
            Some(raw) => FeatureSet::from_names(split_list(&raw))
                .context("RICH_TEXT_FEATURES must list known rich text features")?,
            None => defaults.rich_text_features,
        };

        let embed_providers = lookup("EMBED_PROVIDERS")
            .map(|raw| split_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            template_dir,
            preview_template_dir,
            rich_text_features,
            embed_providers,
        })
    }

    /// Built-in embed providers plus the configured extras.
    pub fn embed_whitelist(&self) -> EmbedWhitelist {
        let mut whitelist = EmbedWhitelist::default();
        for provider in &self.embed_providers {
            whitelist.add(provider.as_str());
        }
        whitelist
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
