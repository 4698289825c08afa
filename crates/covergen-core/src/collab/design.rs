use super::{
    CoverPrompt, PromptBuilder, ResearchFindings, Strategy, StrategyDesigner, StrategyKind,
    TextOverlay,
};
use crate::project::BookInfo;

pub const NEGATIVE_PROMPTS: &[&str] = &[
    "low quality",
    "blurry",
    "pixelated",
    "amateur",
    "unprofessional",
    "generic stock photo",
    "cliche",
    "overused",
    "poor composition",
    "bad typography",
    "illegible text",
    "cluttered",
];

const MAX_THEMES: usize = 3;

const THEME_KEYWORDS: &[(&str, &[&str])] = &[
    ("romance", &["love", "relationship", "passion", "heart", "couple", "forbidden"]),
    ("paranormal", &["werewolf", "vampire", "witch", "shifter", "ghost", "moon", "curse"]),
    ("thriller", &["danger", "conspiracy", "suspense", "crime", "killer", "investigation"]),
    ("fantasy", &["magic", "dragon", "quest", "kingdom", "power", "spell"]),
    ("science fiction", &["future", "space", "technology", "alien", "robot", "time"]),
    ("sci-fi", &["future", "space", "technology", "alien", "robot", "time"]),
    ("mystery", &["murder", "detective", "clue", "solve", "secret"]),
    ("horror", &["haunted", "dark", "terror", "blood", "nightmare"]),
];

/// Pull up to three genre keywords out of a book description. Falls back to
/// the genre itself when nothing matches.
pub fn extract_themes(description: &str, genre: &str) -> Vec<String> {
    let genre = genre.to_lowercase();
    let description = description.to_lowercase();
    let mut themes: Vec<String> = Vec::new();
    for (key, keywords) in THEME_KEYWORDS {
        if !genre.contains(key) {
            continue;
        }
        for keyword in *keywords {
            if description.contains(keyword) && !themes.iter().any(|t| t == keyword) {
                themes.push(keyword.to_string());
            }
        }
    }
    if themes.is_empty() {
        let fallback = genre.trim().replace(' ', "_");
        if !fallback.is_empty() {
            themes.push(fallback);
        }
    }
    themes.truncate(MAX_THEMES);
    themes
}

/// Template-based strategy and prompt authoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateDesigner;

impl StrategyDesigner for TemplateDesigner {
    fn derive_strategies(
        &self,
        _book: &BookInfo,
        research: &ResearchFindings,
    ) -> anyhow::Result<Vec<Strategy>> {
        let elements = &research.common_elements;
        let trends = &research.trends;
        let first = |items: &[String], fallback: &str| {
            items.first().cloned().unwrap_or_else(|| fallback.to_string())
        };
        let primary_palette = elements
            .color_palettes
            .first()
            .map(|p| p.colors.clone())
            .unwrap_or_default();

        let strategies = StrategyKind::all()
            .iter()
            .zip(1u32..)
            .map(|(&kind, id)| {
                let base = Strategy {
                    id,
                    kind,
                    name: kind.display_name().to_string(),
                    approach: String::new(),
                    palette: Vec::new(),
                    typography: String::new(),
                    imagery: String::new(),
                    avoids: Vec::new(),
                    rationale: String::new(),
                    risk_level: String::new(),
                };
                match kind {
                    StrategyKind::MarketAligned => Strategy {
                        approach: "Follows proven successful patterns in the genre".into(),
                        palette: primary_palette.clone(),
                        typography: first(&elements.typography_styles, "clean serif"),
                        imagery: first(&elements.imagery_types, "genre appropriate imagery"),
                        rationale: "Uses the visual language readers expect in this genre".into(),
                        risk_level: "low".into(),
                        ..base
                    },
                    StrategyKind::TrendForward => {
                        let trend = first(&trends.current_popular, "contemporary design");
                        let emerging = first(&trends.emerging, "an innovative approach");
                        Strategy {
                            approach: format!("Incorporates {trend} with {emerging}"),
                            typography: "modern, on-trend type".into(),
                            imagery: trend,
                            rationale: "Builds on what currently sells while adding fresh elements"
                                .into(),
                            risk_level: "medium".into(),
                            ..base
                        }
                    }
                    StrategyKind::Differentiated => Strategy {
                        approach: "Deliberately stands apart from common genre cliches".into(),
                        typography: "unexpected display type".into(),
                        imagery: "non-typical genre imagery".into(),
                        avoids: trends.oversaturated.iter().take(3).cloned().collect(),
                        rationale: "Stands out on crowded digital shelves by avoiding overused elements"
                            .into(),
                        risk_level: "medium-high".into(),
                        ..base
                    },
                    StrategyKind::ArtisticPremium => Strategy {
                        approach: "High-end aesthetic with artistic flair".into(),
                        palette: elements
                            .color_palettes
                            .get(1)
                            .map(|p| p.colors.clone())
                            .unwrap_or_else(|| primary_palette.clone()),
                        typography: "premium serif".into(),
                        imagery: "custom illustration or photography".into(),
                        rationale: "Positions the book as a premium, literary-quality product".into(),
                        risk_level: "low-medium".into(),
                        ..base
                    },
                }
            })
            .collect();
        Ok(strategies)
    }
}

impl PromptBuilder for TemplateDesigner {
    fn build_prompts(
        &self,
        book: &BookInfo,
        strategies: &[Strategy],
        aspect_ratio: &str,
    ) -> anyhow::Result<Vec<CoverPrompt>> {
        if strategies.is_empty() {
            anyhow::bail!("no strategies to build prompts from");
        }
        let themes = extract_themes(&book.description, &book.genre);
        Ok(strategies
            .iter()
            .map(|s| CoverPrompt {
                id: s.id,
                concept_name: s.name.clone(),
                prompt: prompt_text(book, &themes, s),
                negative_prompt: NEGATIVE_PROMPTS.iter().map(|s| s.to_string()).collect(),
                style: style_for(s.kind).to_string(),
                mood: mood_for(&book.genre).to_string(),
                color_scheme: if s.palette.is_empty() {
                    "professional color palette".to_string()
                } else {
                    s.palette.join(", ")
                },
                aspect_ratio: aspect_ratio.to_string(),
                text_overlay: TextOverlay {
                    title: book.title.clone(),
                    author: book.author.clone(),
                    font_guidance: s.typography.clone(),
                },
                rationale: s.rationale.clone(),
            })
            .collect())
    }
}

fn prompt_text(book: &BookInfo, themes: &[String], strategy: &Strategy) -> String {
    let BookInfo {
        title,
        author,
        genre,
        ..
    } = book;
    let themes = if themes.is_empty() {
        genre.clone()
    } else {
        themes.join(", ")
    };
    let text = match strategy.kind {
        StrategyKind::MarketAligned => format!(
            "Professional {genre} book cover featuring {themes}, {imagery}, \
             book title \"{title}\" prominently displayed, author name \"{author}\", \
             bestseller aesthetic, high quality typography, readable at thumbnail size",
            imagery = strategy.imagery,
        ),
        StrategyKind::TrendForward => format!(
            "Trendy {genre} book cover incorporating {imagery}, modern aesthetic, \
             contemporary color palette, book title \"{title}\" with modern typography, \
             author \"{author}\", fresh take on {themes}, eye-catching composition",
            imagery = strategy.imagery,
        ),
        StrategyKind::Differentiated => {
            let avoiding = if strategy.avoids.is_empty() {
                "a unique approach".to_string()
            } else {
                format!(
                    "avoiding {}",
                    strategy.avoids.iter().take(2).cloned().collect::<Vec<_>>().join(", ")
                )
            };
            format!(
                "Unique {genre} book cover, {avoiding}, unexpected color combinations, \
                 {themes} shown through non-typical imagery, book title \"{title}\" with \
                 creative typography, author \"{author}\", memorable shelf-standout design"
            )
        }
        StrategyKind::ArtisticPremium => format!(
            "Premium artistic {genre} book cover evoking {themes}, sophisticated aesthetic, \
             refined color palette, elegant typography, book title \"{title}\", \
             author \"{author}\", gallery-quality composition, luxury book design"
        ),
    };
    clean_prompt(&text)
}

fn clean_prompt(prompt: &str) -> String {
    prompt.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn style_for(kind: StrategyKind) -> &'static str {
    match kind {
        StrategyKind::MarketAligned => "photographic",
        StrategyKind::TrendForward => "modern",
        StrategyKind::Differentiated => "artistic",
        StrategyKind::ArtisticPremium => "illustrated",
    }
}

fn mood_for(genre: &str) -> &'static str {
    let genre = genre.to_lowercase();
    if genre.contains("paranormal") {
        "dark, romantic, mysterious"
    } else if genre.contains("romance") {
        "romantic, warm, inviting"
    } else if genre.contains("thriller") {
        "suspenseful, dark, intense"
    } else if genre.contains("fantasy") {
        "magical, epic, mysterious"
    } else if genre.contains("mystery") {
        "intriguing, noir, atmospheric"
    } else if genre.contains("horror") {
        "dark, ominous, unsettling"
    } else {
        "professional, engaging"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{GenreResearcher, MarketResearch};

    fn book() -> BookInfo {
        BookInfo::new(
            "Blood Moon Rising",
            "Sara Riouch",
            "paranormal romance",
            "A werewolf must choose between his pack and the witch he loves under a cursed moon.",
        )
    }

    #[test]
    fn themes_come_from_description() {
        let themes = extract_themes(&book().description, &book().genre);
        assert_eq!(themes.len(), 3);
        assert!(themes.contains(&"werewolf".to_string()));
    }

    #[test]
    fn themes_fall_back_to_genre() {
        assert_eq!(extract_themes("", "Literary Fiction"), vec!["literary_fiction"]);
        assert!(extract_themes("", "  ").is_empty());
    }

    #[test]
    fn four_strategies_in_fixed_order() {
        let research = GenreResearcher.research("paranormal romance").unwrap();
        let strategies = TemplateDesigner.derive_strategies(&book(), &research).unwrap();
        let names: Vec<_> = strategies.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            ["Market Aligned", "Trend Forward", "Differentiated", "Artistic Premium"]
        );
        assert_eq!(strategies[0].id, 1);
        assert_eq!(strategies[3].id, 4);
        assert!(!strategies[2].avoids.is_empty());
    }

    #[test]
    fn prompts_carry_negative_list_and_overlay() {
        let research = GenreResearcher.research("paranormal romance").unwrap();
        let strategies = TemplateDesigner.derive_strategies(&book(), &research).unwrap();
        let prompts = TemplateDesigner.build_prompts(&book(), &strategies, "2:3").unwrap();
        assert_eq!(prompts.len(), 4);
        for p in &prompts {
            assert_eq!(p.negative_prompt.len(), NEGATIVE_PROMPTS.len());
            assert!(p.prompt.contains("\"Blood Moon Rising\""));
            assert!(!p.prompt.contains("  "));
            assert_eq!(p.text_overlay.author, "Sara Riouch");
            assert_eq!(p.aspect_ratio, "2:3");
        }
    }

    #[test]
    fn no_strategies_is_an_error() {
        assert!(TemplateDesigner.build_prompts(&book(), &[], "2:3").is_err());
    }
}
