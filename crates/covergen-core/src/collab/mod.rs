//! External collaborators invoked by the pipeline steps.
//!
//! The orchestration core treats every collaborator as an opaque, possibly
//! slow, possibly failing call. Each trait returns `anyhow::Result`; the
//! executor converts any error into a recorded step failure.

pub mod design;
pub mod ideogram;
pub mod research;

pub use design::{extract_themes, TemplateDesigner, NEGATIVE_PROMPTS};
pub use ideogram::{IdeogramClient, PlaceholderGenerator};
pub use research::GenreResearcher;

use crate::config::{Config, ImageProvider};
use crate::project::BookInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Research findings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestsellerPattern {
    pub title: String,
    pub cover_style: String,
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub name: String,
    pub colors: Vec<String>,
    pub usage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonElements {
    pub color_palettes: Vec<ColorPalette>,
    pub typography_styles: Vec<String>,
    pub imagery_types: Vec<String>,
    pub layout_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trends {
    pub current_popular: Vec<String>,
    pub emerging: Vec<String>,
    pub oversaturated: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunities {
    pub differentiation_areas: Vec<String>,
    pub market_gaps: Vec<String>,
    pub recommended_approaches: Vec<String>,
}

/// Contents of `research.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchFindings {
    pub genre: String,
    pub genre_category: String,
    pub bestsellers: Vec<BestsellerPattern>,
    pub common_elements: CommonElements,
    pub trends: Trends,
    pub opportunities: Opportunities,
    pub researched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Strategies and prompts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    MarketAligned,
    TrendForward,
    Differentiated,
    ArtisticPremium,
}

impl StrategyKind {
    pub fn all() -> &'static [StrategyKind] {
        &[
            StrategyKind::MarketAligned,
            StrategyKind::TrendForward,
            StrategyKind::Differentiated,
            StrategyKind::ArtisticPremium,
        ]
    }

    pub fn display_name(self) -> &'static str {
        match self {
            StrategyKind::MarketAligned => "Market Aligned",
            StrategyKind::TrendForward => "Trend Forward",
            StrategyKind::Differentiated => "Differentiated",
            StrategyKind::ArtisticPremium => "Artistic Premium",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub id: u32,
    pub kind: StrategyKind,
    pub name: String,
    pub approach: String,
    pub palette: Vec<String>,
    pub typography: String,
    pub imagery: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoids: Vec<String>,
    pub rationale: String,
    pub risk_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub title: String,
    pub author: String,
    pub font_guidance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverPrompt {
    pub id: u32,
    pub concept_name: String,
    pub prompt: String,
    pub negative_prompt: Vec<String>,
    pub style: String,
    pub mood: String,
    pub color_scheme: String,
    pub aspect_ratio: String,
    pub text_overlay: TextOverlay,
    pub rationale: String,
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// One image produced by an [`ImageGenerator`]; persisting it is the
/// caller's job.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub data: Vec<u8>,
    /// File extension without the dot.
    pub extension: String,
    pub source_url: Option<String>,
    pub placeholder: bool,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait MarketResearch: Send + Sync {
    fn research(&self, genre: &str) -> anyhow::Result<ResearchFindings>;
}

pub trait StrategyDesigner: Send + Sync {
    /// Always returns the same fixed number of strategies.
    fn derive_strategies(
        &self,
        book: &BookInfo,
        research: &ResearchFindings,
    ) -> anyhow::Result<Vec<Strategy>>;
}

pub trait PromptBuilder: Send + Sync {
    /// One prompt per strategy, each paired with its negative-prompt list.
    fn build_prompts(
        &self,
        book: &BookInfo,
        strategies: &[Strategy],
        aspect_ratio: &str,
    ) -> anyhow::Result<Vec<CoverPrompt>>;
}

pub trait ImageGenerator: Send + Sync {
    /// Short identifier recorded in `generation_results.json`.
    fn provider(&self) -> &str;

    fn generate_images(
        &self,
        prompt: &CoverPrompt,
        count: u32,
        aspect_ratio: &str,
    ) -> anyhow::Result<Vec<GeneratedImage>>;
}

// ---------------------------------------------------------------------------
// Collaborators bundle
// ---------------------------------------------------------------------------

/// The set of collaborators a pipeline runs against, plus the image settings
/// the Image Generation step needs.
#[derive(Clone)]
pub struct Collaborators {
    pub research: Arc<dyn MarketResearch>,
    pub strategies: Arc<dyn StrategyDesigner>,
    pub prompts: Arc<dyn PromptBuilder>,
    pub images: Arc<dyn ImageGenerator>,
    pub variations_per_concept: u32,
    pub aspect_ratio: String,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("images", &self.images.provider())
            .field("variations_per_concept", &self.variations_per_concept)
            .field("aspect_ratio", &self.aspect_ratio)
            .finish_non_exhaustive()
    }
}

impl Collaborators {
    /// Built-in collaborators with placeholder images. Needs no network.
    pub fn offline() -> Self {
        Self::with_images(Arc::new(PlaceholderGenerator))
    }

    pub fn with_images(images: Arc<dyn ImageGenerator>) -> Self {
        let designer = Arc::new(TemplateDesigner);
        Self {
            research: Arc::new(GenreResearcher),
            strategies: designer.clone(),
            prompts: designer,
            images,
            variations_per_concept: 2,
            aspect_ratio: "2:3".to_string(),
        }
    }

    /// Collaborators selected by `images.provider`.
    pub fn from_config(config: &Config) -> Self {
        let images_cfg = &config.images;
        let images: Arc<dyn ImageGenerator> = match (images_cfg.provider, images_cfg.api_key()) {
            (ImageProvider::Placeholder, _) | (ImageProvider::Auto, None) => {
                Arc::new(PlaceholderGenerator)
            }
            (ImageProvider::Auto | ImageProvider::Ideogram, key) => Arc::new(IdeogramClient::new(
                images_cfg.base_url.clone(),
                key.unwrap_or_default(),
                images_cfg.rendering_speed.clone(),
                Duration::from_secs(images_cfg.timeout_secs),
            )),
        };
        let aspect_ratio = if crate::config::SUPPORTED_ASPECT_RATIOS
            .contains(&images_cfg.aspect_ratio.as_str())
        {
            images_cfg.aspect_ratio.clone()
        } else {
            "2:3".to_string()
        };
        Self {
            variations_per_concept: images_cfg.variations_per_concept.max(1),
            aspect_ratio,
            ..Self::with_images(images)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_provider_selected_explicitly() {
        let mut config = Config::default();
        config.images.provider = ImageProvider::Placeholder;
        config.images.variations_per_concept = 0;
        config.images.aspect_ratio = "7:5".into();
        let collab = Collaborators::from_config(&config);
        assert_eq!(collab.images.provider(), "placeholder");
        assert_eq!(collab.variations_per_concept, 1);
        assert_eq!(collab.aspect_ratio, "2:3");
    }

    #[test]
    fn ideogram_provider_selected_explicitly() {
        let mut config = Config::default();
        config.images.provider = ImageProvider::Ideogram;
        config.images.api_key_env = "COVERGEN_TEST_UNSET_KEY_VAR".into();
        let collab = Collaborators::from_config(&config);
        assert_eq!(collab.images.provider(), "ideogram");
    }

    #[test]
    fn strategy_kinds_have_display_names() {
        let names: Vec<_> = StrategyKind::all().iter().map(|k| k.display_name()).collect();
        assert_eq!(
            names,
            ["Market Aligned", "Trend Forward", "Differentiated", "Artistic Premium"]
        );
    }
}
