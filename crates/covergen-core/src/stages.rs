//! The six standard pipeline stages and the artifacts they write.

use crate::collab::{extract_themes, CoverPrompt, GenreResearcher, ResearchFindings, Strategy};
use crate::error::{CoverError, Result};
use crate::paths;
use crate::project::BookInfo;
use crate::step::{
    StepContext, StepOutput, COVER_STRATEGY, IMAGE_GENERATION, INPUT_COLLECTION,
    MARKET_RESEARCH, PROMPT_GENERATION,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Number of cover strategies the Cover Strategy stage must produce.
pub const STRATEGY_COUNT: usize = 4;

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// `brief.json`: the validated input the rest of the pipeline works from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brief {
    pub book_info: BookInfo,
    pub genre_category: String,
    pub themes: Vec<String>,
    pub collected_at: DateTime<Utc>,
}

/// `strategies.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySet {
    pub concepts: Vec<Strategy>,
    pub created_at: DateTime<Utc>,
}

/// `prompts.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSet {
    pub cover_concepts: Vec<CoverPrompt>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub concept_id: u32,
    pub concept_name: String,
    pub variation: u32,
    /// Project-relative path, `covers/...`.
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub placeholder: bool,
}

/// `generation_results.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResults {
    pub project_slug: String,
    pub provider: String,
    pub aspect_ratio: String,
    pub images: Vec<ImageRecord>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deliverables {
    pub brief_file: String,
    pub research_file: String,
    pub strategies_file: String,
    pub prompts_file: String,
    pub generation_file: String,
    pub cover_images: Vec<String>,
}

/// `final_report.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub project_summary: ReportSummary,
    pub concepts: usize,
    pub images: usize,
    pub placeholders: bool,
    pub deliverables: Deliverables,
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

pub fn input_collection(ctx: &StepContext<'_>) -> Result<StepOutput> {
    let book = ctx.book().normalized()?;
    let brief = Brief {
        genre_category: GenreResearcher::category_for(&book.genre).to_string(),
        themes: extract_themes(&book.description, &book.genre),
        book_info: book,
        collected_at: Utc::now(),
    };
    ctx.write_json(paths::BRIEF_FILE, &brief)?;
    Ok(StepOutput::single(paths::BRIEF_FILE))
}

pub fn market_research(ctx: &StepContext<'_>) -> Result<StepOutput> {
    let brief: Brief = ctx.artifact(INPUT_COLLECTION)?;
    info!(slug = ctx.slug, genre = %brief.book_info.genre, "researching genre");
    let findings = ctx
        .collab
        .research
        .research(&brief.book_info.genre)
        .map_err(|e| ctx.collaborator_error(e))?;
    ctx.write_json(paths::RESEARCH_FILE, &findings)?;
    Ok(StepOutput::single(paths::RESEARCH_FILE))
}

pub fn cover_strategy(ctx: &StepContext<'_>) -> Result<StepOutput> {
    let brief: Brief = ctx.artifact(INPUT_COLLECTION)?;
    let research: ResearchFindings = ctx.artifact(MARKET_RESEARCH)?;
    let concepts = ctx
        .collab
        .strategies
        .derive_strategies(&brief.book_info, &research)
        .map_err(|e| ctx.collaborator_error(e))?;
    if concepts.len() != STRATEGY_COUNT {
        return Err(ctx.collaborator_error(anyhow::anyhow!(
            "expected {STRATEGY_COUNT} strategies, got {}",
            concepts.len()
        )));
    }
    ctx.write_json(
        paths::STRATEGIES_FILE,
        &StrategySet {
            concepts,
            created_at: Utc::now(),
        },
    )?;
    Ok(StepOutput::single(paths::STRATEGIES_FILE))
}

pub fn prompt_generation(ctx: &StepContext<'_>) -> Result<StepOutput> {
    let brief: Brief = ctx.artifact(INPUT_COLLECTION)?;
    let strategies: StrategySet = ctx.artifact(COVER_STRATEGY)?;
    let prompts = ctx
        .collab
        .prompts
        .build_prompts(&brief.book_info, &strategies.concepts, &ctx.collab.aspect_ratio)
        .map_err(|e| ctx.collaborator_error(e))?;
    if prompts.len() != strategies.concepts.len() {
        return Err(ctx.collaborator_error(anyhow::anyhow!(
            "expected one prompt per strategy ({}), got {}",
            strategies.concepts.len(),
            prompts.len()
        )));
    }
    ctx.write_json(
        paths::PROMPTS_FILE,
        &PromptSet {
            cover_concepts: prompts,
            created_at: Utc::now(),
        },
    )?;
    Ok(StepOutput::single(paths::PROMPTS_FILE))
}

pub fn image_generation(ctx: &StepContext<'_>) -> Result<StepOutput> {
    let prompts: PromptSet = ctx.artifact(PROMPT_GENERATION)?;
    let collab = ctx.collab;
    let mut written: Vec<String> = Vec::new();

    let result = (|| -> Result<Vec<ImageRecord>> {
        let mut records = Vec::new();
        for prompt in &prompts.cover_concepts {
            info!(
                slug = ctx.slug,
                concept = prompt.id,
                name = %prompt.concept_name,
                "generating concept"
            );
            let images = collab
                .images
                .generate_images(prompt, collab.variations_per_concept, &collab.aspect_ratio)
                .map_err(|e| ctx.collaborator_error(e))?;
            if images.is_empty() {
                return Err(ctx.collaborator_error(anyhow::anyhow!(
                    "no images returned for concept {}",
                    prompt.id
                )));
            }
            for (image, variation) in images.into_iter().zip(1u32..) {
                let file = paths::cover_file(ctx.slug, prompt.id, variation, &image.extension);
                ctx.write_file(&file, &image.data)?;
                written.push(file.clone());
                records.push(ImageRecord {
                    concept_id: prompt.id,
                    concept_name: prompt.concept_name.clone(),
                    variation,
                    file,
                    source_url: image.source_url,
                    placeholder: image.placeholder,
                });
            }
        }
        Ok(records)
    })();

    let images = match result {
        Ok(images) => images,
        Err(e) => {
            for file in &written {
                if let Err(cleanup) = ctx.remove_file(file) {
                    debug!(file = %file, error = %cleanup, "could not remove partial cover");
                }
            }
            return Err(e);
        }
    };

    let results = GenerationResults {
        project_slug: ctx.slug.to_string(),
        provider: collab.images.provider().to_string(),
        aspect_ratio: collab.aspect_ratio.clone(),
        images,
        generated_at: Utc::now(),
    };
    ctx.write_json(paths::GENERATION_FILE, &results)?;
    Ok(StepOutput::single(paths::GENERATION_FILE).with_extra(written))
}

pub fn output_organization(ctx: &StepContext<'_>) -> Result<StepOutput> {
    let brief: Brief = ctx.artifact(INPUT_COLLECTION)?;
    let prompts: PromptSet = ctx.artifact(PROMPT_GENERATION)?;
    let generation: GenerationResults = ctx.artifact(IMAGE_GENERATION)?;
    if generation.project_slug != ctx.slug {
        return Err(CoverError::CorruptState {
            slug: ctx.slug.to_string(),
            reason: format!(
                "{} belongs to '{}'",
                paths::GENERATION_FILE,
                generation.project_slug
            ),
        });
    }

    let book = brief.book_info;
    let report = FinalReport {
        project_summary: ReportSummary {
            title: book.title,
            author: book.author,
            genre: book.genre,
            completed_at: Utc::now(),
        },
        concepts: prompts.cover_concepts.len(),
        images: generation.images.len(),
        placeholders: generation.images.iter().any(|i| i.placeholder),
        deliverables: Deliverables {
            brief_file: paths::BRIEF_FILE.to_string(),
            research_file: paths::RESEARCH_FILE.to_string(),
            strategies_file: paths::STRATEGIES_FILE.to_string(),
            prompts_file: paths::PROMPTS_FILE.to_string(),
            generation_file: paths::GENERATION_FILE.to_string(),
            cover_images: generation.images.into_iter().map(|i| i.file).collect(),
        },
    };
    ctx.write_json(paths::REPORT_FILE, &report)?;
    Ok(StepOutput::single(paths::REPORT_FILE))
}
