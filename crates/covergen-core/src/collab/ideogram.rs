use super::{CoverPrompt, GeneratedImage, ImageGenerator};
use anyhow::{bail, Context};
use serde::Deserialize;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// Largest image body accepted from the download URL.
const MAX_IMAGE_BYTES: u64 = 32 * 1024 * 1024;

/// Blocking client for the Ideogram v3 generate endpoint.
pub struct IdeogramClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    rendering_speed: String,
}

impl std::fmt::Debug for IdeogramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdeogramClient")
            .field("base_url", &self.base_url)
            .field("rendering_speed", &self.rendering_speed)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    data: Vec<GeneratedEntry>,
}

#[derive(Debug, Deserialize)]
struct GeneratedEntry {
    #[serde(default)]
    url: Option<String>,
}

impl IdeogramClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        rendering_speed: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            rendering_speed: rendering_speed.into(),
        }
    }

    fn generate_one(&self, prompt: &CoverPrompt, aspect_ratio: &str) -> anyhow::Result<GeneratedImage> {
        let url = format!("{}/ideogram-v3/generate", self.base_url);
        let body = serde_json::json!({
            "prompt": prompt.prompt,
            "negative_prompt": prompt.negative_prompt.join(", "),
            "aspect_ratio": api_aspect_ratio(aspect_ratio),
            "rendering_speed": self.rendering_speed,
        });

        let response = match self
            .agent
            .post(&url)
            .set("Api-Key", &self.api_key)
            .send_json(body)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                bail!("image service returned {code}: {}", detail.trim());
            }
            Err(e) => return Err(e).context("image service request failed"),
        };

        let parsed: GenerateResponse = response
            .into_json()
            .context("malformed image service response")?;
        let Some(image_url) = parsed.data.into_iter().find_map(|d| d.url) else {
            bail!("image service response contained no image");
        };
        debug!(concept = prompt.id, url = %image_url, "downloading generated image");

        let download = self
            .agent
            .get(&image_url)
            .call()
            .with_context(|| format!("failed to download {image_url}"))?;
        let data = read_image(download.into_reader(), MAX_IMAGE_BYTES)
            .with_context(|| format!("failed to read {image_url}"))?;

        Ok(GeneratedImage {
            data,
            extension: "png".to_string(),
            source_url: Some(image_url),
            placeholder: false,
        })
    }
}

impl ImageGenerator for IdeogramClient {
    fn provider(&self) -> &str {
        "ideogram"
    }

    fn generate_images(
        &self,
        prompt: &CoverPrompt,
        count: u32,
        aspect_ratio: &str,
    ) -> anyhow::Result<Vec<GeneratedImage>> {
        (1..=count)
            .map(|variation| {
                self.generate_one(prompt, aspect_ratio).with_context(|| {
                    format!("concept {} variation {variation}", prompt.id)
                })
            })
            .collect()
    }
}

/// Read a whole image body. Empty bodies and bodies over `max` bytes are
/// errors.
fn read_image(reader: impl Read, max: u64) -> anyhow::Result<Vec<u8>> {
    let mut data = Vec::new();
    reader.take(max + 1).read_to_end(&mut data)?;
    if data.is_empty() {
        bail!("downloaded image is empty");
    }
    if data.len() as u64 > max {
        bail!("downloaded image exceeds {max} bytes");
    }
    Ok(data)
}

/// Ideogram spells ratios with an `x`; unknown ratios fall back to book format.
fn api_aspect_ratio(ratio: &str) -> &'static str {
    match ratio {
        "1:1" => "1x1",
        "2:3" => "2x3",
        "3:2" => "3x2",
        "3:4" => "3x4",
        "4:3" => "4x3",
        "9:16" => "9x16",
        "16:9" => "16x9",
        _ => "2x3",
    }
}

// ---------------------------------------------------------------------------
// PlaceholderGenerator
// ---------------------------------------------------------------------------

/// Writes a text description of each requested image instead of calling a
/// service.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderGenerator;

impl ImageGenerator for PlaceholderGenerator {
    fn provider(&self) -> &str {
        "placeholder"
    }

    fn generate_images(
        &self,
        prompt: &CoverPrompt,
        count: u32,
        aspect_ratio: &str,
    ) -> anyhow::Result<Vec<GeneratedImage>> {
        Ok((1..=count)
            .map(|variation| {
                let text = format!(
                    "PLACEHOLDER - Book Cover Image\n\n\
                     Concept: {} (ID: {})\n\
                     Variation: {variation}\n\n\
                     PROMPT:\n{}\n\n\
                     NEGATIVE PROMPT:\n{}\n\n\
                     STYLE:\n\
                     - Aspect Ratio: {aspect_ratio}\n\
                     - Style: {}\n\
                     - Mood: {}\n\
                     - Colors: {}\n\n\
                     TEXT OVERLAY:\n\
                     - Title: \"{}\"\n\
                     - Author: \"{}\"\n\
                     - Font: {}\n\n\
                     Set IDEOGRAM_API_KEY to generate real images.\n",
                    prompt.concept_name,
                    prompt.id,
                    prompt.prompt,
                    prompt.negative_prompt.join(", "),
                    prompt.style,
                    prompt.mood,
                    prompt.color_scheme,
                    prompt.text_overlay.title,
                    prompt.text_overlay.author,
                    prompt.text_overlay.font_guidance,
                );
                GeneratedImage {
                    data: text.into_bytes(),
                    extension: "txt".to_string(),
                    source_url: None,
                    placeholder: true,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::TextOverlay;

    fn prompt() -> CoverPrompt {
        CoverPrompt {
            id: 2,
            concept_name: "Trend Forward".into(),
            prompt: "Trendy cover".into(),
            negative_prompt: vec!["blurry".into(), "cluttered".into()],
            style: "modern".into(),
            mood: "dark".into(),
            color_scheme: "#000000".into(),
            aspect_ratio: "2:3".into(),
            text_overlay: TextOverlay {
                title: "Dune".into(),
                author: "Frank Herbert".into(),
                font_guidance: "wide sans".into(),
            },
            rationale: "test".into(),
        }
    }

    #[test]
    fn placeholder_produces_requested_count() {
        let images = PlaceholderGenerator.generate_images(&prompt(), 3, "2:3").unwrap();
        assert_eq!(images.len(), 3);
        assert!(images.iter().all(|i| i.placeholder && i.extension == "txt"));
        let text = String::from_utf8(images[2].data.clone()).unwrap();
        assert!(text.contains("Variation: 3"));
        assert!(text.contains("blurry, cluttered"));
    }

    #[test]
    fn oversized_download_is_rejected() {
        let err = read_image(std::io::Cursor::new(vec![7u8; 11]), 10).unwrap_err();
        assert!(err.to_string().contains("exceeds 10 bytes"));

        assert_eq!(read_image(std::io::Cursor::new(vec![7u8; 10]), 10).unwrap().len(), 10);
        assert!(read_image(std::io::Cursor::new(Vec::new()), 10).is_err());
    }

    #[test]
    fn aspect_ratio_mapping() {
        assert_eq!(api_aspect_ratio("2:3"), "2x3");
        assert_eq!(api_aspect_ratio("16:9"), "16x9");
        assert_eq!(api_aspect_ratio("bogus"), "2x3");
    }

    #[test]
    fn unreachable_service_is_an_error() {
        let client = IdeogramClient::new(
            "http://127.0.0.1:9/v1/",
            "key",
            "TURBO",
            Duration::from_secs(2),
        );
        assert_eq!(client.base_url, "http://127.0.0.1:9/v1");
        let err = client.generate_images(&prompt(), 1, "2:3").unwrap_err();
        assert!(format!("{err:#}").contains("concept 2 variation 1"));
    }
}
