use std::collections::BTreeMap;

use dreamink_config::StylizeConfig;
use serde::Serialize;
use tracing::warn;

/// Name of the built-in filter style. It never reaches a diffusion pipeline.
pub const SKETCH_STYLE: &str = "sketch";

/// Prompt and weights for a diffusion-backed style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleSpec {
    pub name: String,
    pub model_path: String,
    pub prompt: String,
}

/// What a requested style name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedStyle<'a> {
    Sketch,
    Diffusion(&'a StyleSpec),
}

#[derive(Debug, Clone, Default)]
pub struct StyleCatalog {
    diffusion: BTreeMap<String, StyleSpec>,
}

impl StyleCatalog {
    pub fn from_config(config: &StylizeConfig) -> Self {
        let mut diffusion = BTreeMap::new();

        for (name, style) in &config.styles {
            let name = name.to_lowercase();
            if !style.enabled {
                continue;
            }
            if name == SKETCH_STYLE {
                warn!("ignoring diffusion style named {SKETCH_STYLE}, the name is reserved");
                continue;
            }

            diffusion.insert(
                name.clone(),
                StyleSpec {
                    name,
                    model_path: style.model_path.clone(),
                    prompt: style.prompt.clone(),
                },
            );
        }

        Self { diffusion }
    }

    /// Case-insensitive lookup. `None` means the style is not offered.
    pub fn resolve(&self, style: &str) -> Option<ResolvedStyle<'_>> {
        let style = style.to_lowercase();
        if style == SKETCH_STYLE {
            return Some(ResolvedStyle::Sketch);
        }
        self.diffusion.get(&style).map(ResolvedStyle::Diffusion)
    }

    /// Style names, the sketch filter first.
    pub fn names(&self) -> Vec<String> {
        std::iter::once(SKETCH_STYLE.to_string())
            .chain(self.diffusion.keys().cloned())
            .collect()
    }

    pub fn diffusion_styles(&self) -> impl Iterator<Item = &StyleSpec> {
        self.diffusion.values()
    }
}

/// Human-facing label used in success messages.
pub fn display_name(style: &str) -> String {
    if style.eq_ignore_ascii_case(SKETCH_STYLE) {
        return "Pencil Sketch".to_string();
    }

    let mut chars = style.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
