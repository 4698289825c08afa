use super::{
    BestsellerPattern, ColorPalette, CommonElements, MarketResearch, Opportunities,
    ResearchFindings, Trends,
};
use chrono::Utc;

/// Genre categories in match order; more specific keywords come first so
/// that "paranormal romance" is not swallowed by "romance".
const CATEGORIES: &[(&str, &[&str])] = &[
    ("paranormal romance", &["paranormal romance", "vampire romance", "shifter romance"]),
    ("romance", &["romance", "romantic"]),
    ("thriller", &["thriller", "suspense"]),
    ("mystery", &["mystery", "detective", "crime", "noir"]),
    ("science fiction", &["science fiction", "sci-fi", "scifi", "dystopian", "space opera"]),
    ("fantasy", &["fantasy", "sword", "epic"]),
    ("horror", &["horror", "gothic", "ghost"]),
];

const FALLBACK_CATEGORY: &str = "general fiction";

/// Every genre the built-in researcher has a dedicated profile for, plus the
/// common aliases offered to users.
pub const SUPPORTED_GENRES: &[&str] = &[
    "fantasy",
    "historical fiction",
    "horror",
    "literary fiction",
    "mystery",
    "paranormal romance",
    "romance",
    "romantic suspense",
    "science fiction",
    "thriller",
    "urban fantasy",
    "young adult",
];

/// Deterministic, table-driven market research keyed by genre category.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenreResearcher;

impl GenreResearcher {
    pub fn category_for(genre: &str) -> &'static str {
        let genre = genre.to_lowercase();
        CATEGORIES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| genre.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(FALLBACK_CATEGORY)
    }
}

impl MarketResearch for GenreResearcher {
    fn research(&self, genre: &str) -> anyhow::Result<ResearchFindings> {
        let genre = genre.trim();
        if genre.is_empty() {
            anyhow::bail!("cannot research an empty genre");
        }
        let category = Self::category_for(genre);
        let profile = profile(category);
        Ok(ResearchFindings {
            genre: genre.to_string(),
            genre_category: category.to_string(),
            bestsellers: profile
                .bestsellers
                .iter()
                .map(|(title, style, colors)| BestsellerPattern {
                    title: title.to_string(),
                    cover_style: style.to_string(),
                    colors: strings(colors),
                })
                .collect(),
            common_elements: CommonElements {
                color_palettes: profile
                    .palettes
                    .iter()
                    .map(|(name, colors, usage)| ColorPalette {
                        name: name.to_string(),
                        colors: strings(colors),
                        usage: usage.to_string(),
                    })
                    .collect(),
                typography_styles: strings(profile.typography),
                imagery_types: strings(profile.imagery),
                layout_patterns: strings(profile.layouts),
            },
            trends: Trends {
                current_popular: strings(profile.popular),
                emerging: strings(profile.emerging),
                oversaturated: strings(profile.oversaturated),
            },
            opportunities: Opportunities {
                differentiation_areas: strings(&[
                    "Unique color combinations not commonly used in the genre",
                    "Fresh take on typical genre imagery",
                    "Modern typography that stands out",
                ]),
                market_gaps: vec![
                    format!("Underserved readers within {category}"),
                    "Artistic styles not yet adopted by the genre".to_string(),
                    "Cross-genre hybrid approaches".to_string(),
                ],
                recommended_approaches: strings(&[
                    "Focus on emotional connection over genre stereotypes",
                    "Adapt contemporary design trends to the genre",
                    "Plan for thumbnail visibility in online stores",
                ]),
            },
            researched_at: Utc::now(),
        })
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Genre profiles
// ---------------------------------------------------------------------------

struct Profile {
    bestsellers: &'static [(&'static str, &'static str, &'static [&'static str])],
    palettes: &'static [(&'static str, &'static [&'static str], &'static str)],
    typography: &'static [&'static str],
    imagery: &'static [&'static str],
    layouts: &'static [&'static str],
    popular: &'static [&'static str],
    emerging: &'static [&'static str],
    oversaturated: &'static [&'static str],
}

fn profile(category: &str) -> Profile {
    match category {
        "romance" => Profile {
            bestsellers: &[
                ("Contemporary romance lead", "couple embrace", &["pink", "purple"]),
                ("Historical romance lead", "single figure", &["red", "gold"]),
            ],
            palettes: &[
                ("Passionate", &["#FF6B6B", "#FF8E8E", "#FFB6C1"], "high"),
                ("Elegant", &["#800080", "#9370DB", "#DDA0DD"], "medium"),
            ],
            typography: &["Script/Cursive", "Serif Elegant", "Sans Modern"],
            imagery: &["Couple silhouettes", "Single attractive figure", "Romantic objects"],
            layouts: &["Title prominent top, author bottom", "Overlaid text on image"],
            popular: &["Illustrated couples", "Minimalist with bold typography", "Foil accents"],
            emerging: &["Abstract geometric designs", "Vintage aesthetic revival"],
            oversaturated: &["Shirtless male torsos", "Clinch poses", "Purple/pink gradients"],
        },
        "paranormal romance" => Profile {
            bestsellers: &[
                ("Shifter romance lead", "moonlit figure", &["deep blue", "silver"]),
                ("Vampire romance lead", "gothic couple", &["crimson", "black"]),
            ],
            palettes: &[
                ("Midnight Moon", &["#0B1D3A", "#3E5C8A", "#C0C0C0"], "very high"),
                ("Blood Rose", &["#5C0A1C", "#A4161A", "#1B1B1B"], "high"),
            ],
            typography: &["Ornate Serif", "Script with glow", "Distressed Serif"],
            imagery: &["Full moon", "Wolf or shadowed creature", "Couple at night", "Mist and forest"],
            layouts: &["Central figure under moon", "Title across upper third"],
            popular: &["Moody moonlit scenes", "Glowing magical accents", "Dark forest settings"],
            emerging: &["Illustrated monster romance", "Tarot-inspired framing"],
            oversaturated: &["Bare-chested werewolves", "Generic red eyes", "Fang close-ups"],
        },
        "thriller" => Profile {
            bestsellers: &[
                ("Psychological thriller lead", "dark atmosphere", &["black", "red"]),
                ("Domestic suspense lead", "shadowy figure", &["blue", "gray"]),
            ],
            palettes: &[
                ("Dark & Moody", &["#000000", "#2C2C2C", "#800000"], "very high"),
                ("Cold Blue", &["#191970", "#4682B4", "#87CEEB"], "high"),
            ],
            typography: &["Bold Sans", "Distressed", "Stencil"],
            imagery: &["Dark silhouettes", "Urban scenes", "Noir lighting"],
            layouts: &["Large title dominance", "High contrast text and background"],
            popular: &["Domestic settings with sinister undertones", "Single accent color on black"],
            emerging: &["Tech paranoia aesthetics", "Fragmented imagery"],
            oversaturated: &["Generic dark alleys", "Blood splatter", "Obvious weapons"],
        },
        "mystery" => Profile {
            bestsellers: &[
                ("Cozy mystery lead", "illustrated village", &["teal", "cream"]),
                ("Police procedural lead", "crime scene detail", &["gray", "amber"]),
            ],
            palettes: &[
                ("Noir", &["#111111", "#4A4A4A", "#D4A017"], "high"),
                ("Cozy", &["#2F6F73", "#F3E9D2", "#C1666B"], "medium"),
            ],
            typography: &["Classic Serif", "Condensed Sans"],
            imagery: &["Key object clue", "Lone figure in fog", "Small-town setting"],
            layouts: &["Framed central object", "Title in bold band"],
            popular: &["Illustrated cozy settings", "Single clue object"],
            emerging: &["Retro pulp revival", "Minimal symbolic covers"],
            oversaturated: &["Magnifying glasses", "Chalk outlines"],
        },
        "science fiction" => Profile {
            bestsellers: &[
                ("Space opera lead", "starship vista", &["navy", "orange"]),
                ("Dystopian lead", "ruined skyline", &["gray", "teal"]),
            ],
            palettes: &[
                ("Deep Space", &["#0B0C2A", "#2E3192", "#F7931E"], "high"),
                ("Neon Grid", &["#0D0221", "#FF2A6D", "#05D9E8"], "medium"),
            ],
            typography: &["Geometric Sans", "Wide Display"],
            imagery: &["Spacecraft", "Planetary horizons", "Lone figure against scale"],
            layouts: &["Vast scene with small figure", "Title in wide tracking"],
            popular: &["Painterly space vistas", "Bold minimal symbols"],
            emerging: &["Climate futures", "Solarpunk palettes"],
            oversaturated: &["Generic lens flares", "Chrome robots"],
        },
        "fantasy" => Profile {
            bestsellers: &[
                ("Epic fantasy lead", "magical elements", &["purple", "gold"]),
                ("Urban fantasy lead", "landscape scene", &["blue", "green"]),
            ],
            palettes: &[
                ("Mystical Purple", &["#663399", "#9933CC", "#CC99FF"], "high"),
                ("Forest Magic", &["#228B22", "#32CD32", "#90EE90"], "high"),
            ],
            typography: &["Medieval/Gothic", "Ornate Serif", "Modern Clean"],
            imagery: &["Fantasy landscapes", "Magical creatures", "Magical objects"],
            layouts: &["Ornate decorative elements", "Central focal imagery"],
            popular: &["Celestial themes", "Diverse fantasy characters"],
            emerging: &["Diverse mythologies", "Minimalist magical symbolism"],
            oversaturated: &["Generic dragons and castles", "Overdone magical effects"],
        },
        "horror" => Profile {
            bestsellers: &[
                ("Haunted house lead", "decaying building", &["black", "sickly green"]),
                ("Folk horror lead", "rural ritual", &["ochre", "black"]),
            ],
            palettes: &[
                ("Dread", &["#0A0A0A", "#3B3B3B", "#7A0000"], "very high"),
                ("Rot", &["#2E3B1F", "#6B705C", "#A5A58D"], "medium"),
            ],
            typography: &["Distressed Serif", "Hand-scratched Display"],
            imagery: &["Empty doorways", "Unsettling silhouettes", "Negative space"],
            layouts: &["Heavy negative space", "Off-center focal point"],
            popular: &["Folk horror imagery", "Single unsettling object"],
            emerging: &["Bright palettes with dark subjects", "Found-document collage"],
            oversaturated: &["Dripping blood fonts", "Screaming faces"],
        },
        _ => Profile {
            bestsellers: &[("Book club pick", "minimalist", &["neutral"])],
            palettes: &[("Neutral", &["#000000", "#FFFFFF", "#808080"], "high")],
            typography: &["Clean Sans"],
            imagery: &["Abstract or minimalist"],
            layouts: &["Simple centered"],
            popular: &["Clean design", "Clear typography"],
            emerging: &["Unique artistic approaches"],
            oversaturated: &["Generic stock imagery"],
        },
    }
}
