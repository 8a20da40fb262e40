//! Recipe import from a web page, a video link, or pasted text.
//!
//! Import never persists anything. It returns a [`NewRecipe`] draft that
//! the client reviews and saves through the create endpoint. When a recipe
//! cannot be extracted automatically the outcome asks for manual entry and
//! carries a partially filled draft.

use larder_core::models::{NewRecipe, RecipeSource};
use larder_core::UpstreamError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::{ServiceError, ServiceResult};

/// Page text sent to the extractor is cut to this many characters.
pub const MAX_PAGE_CHARS: usize = 8000;

lazy_static! {
    static ref VIDEO_URL: Regex = Regex::new(
        r"(?i)^https?://(?:www\.|m\.)?(?:youtube\.com/(?:watch\?(?:.*&)?v=|shorts/)|youtu\.be/)[\w-]+"
    )
    .expect("valid regex");
    static ref SCRIPT_BLOCK: Regex =
        Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex");
    static ref STYLE_BLOCK: Regex =
        Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex");
    static ref HTML_TAG: Regex = Regex::new(r"(?s)<[^>]+>").expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref BARE_URL: Regex = Regex::new(r"https?://\S+").expect("valid regex");
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRequest {
    pub url: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Imported(NewRecipe),
    NeedsManualEntry { recipe: NewRecipe, message: String },
}

pub fn is_video_url(url: &str) -> bool {
    VIDEO_URL.is_match(url.trim())
}

/// Reduce an HTML document to whitespace-collapsed visible text, cut to
/// [`MAX_PAGE_CHARS`] characters.
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, " ");
    let text = STYLE_BLOCK.replace_all(&text, " ");
    let text = HTML_TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().chars().take(MAX_PAGE_CHARS).collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn manual_draft(source: RecipeSource, source_url: Option<&str>, name: &str) -> NewRecipe {
    NewRecipe {
        name: name.to_string(),
        source,
        source_url: source_url.map(str::to_string),
        ..Default::default()
    }
}

pub async fn import_recipe(
    ctx: &AppContext,
    request: ImportRequest,
) -> ServiceResult<ImportOutcome> {
    let url = request.url.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let text = request.text.as_deref().map(str::trim).filter(|s| !s.is_empty());
    match (url, text) {
        (Some(url), None) => import_from_url(ctx, url).await,
        (None, Some(text)) => import_from_text(ctx, text).await,
        (Some(_), Some(_)) => Err(ServiceError::validation("Provide either url or text, not both")),
        (None, None) => Err(ServiceError::validation("Either url or text is required")),
    }
}

async fn import_from_url(ctx: &AppContext, url: &str) -> ServiceResult<ImportOutcome> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ServiceError::validation(
            "URL must start with http:// or https://",
        ));
    }

    if is_video_url(url) {
        tracing::info!(url, "video link; asking for manual entry");
        return Ok(ImportOutcome::NeedsManualEntry {
            recipe: manual_draft(RecipeSource::Youtube, Some(url), "YouTube Recipe"),
            message: "YouTube videos cannot be automatically parsed. Please enter the recipe details."
                .to_string(),
        });
    }

    let manual = |message: &str| ImportOutcome::NeedsManualEntry {
        recipe: manual_draft(RecipeSource::Url, Some(url), ""),
        message: message.to_string(),
    };

    let page = match fetch_page_text(ctx, url).await {
        Ok(page) if !page.is_empty() => page,
        Ok(_) => {
            tracing::warn!(url, "fetched page has no text");
            return Ok(manual("The page has no readable text. Please enter the recipe details."));
        }
        Err(e) => {
            tracing::warn!(url, error = %format!("{:#}", e), "recipe page fetch failed");
            return Ok(manual("Could not fetch the page. Please enter the recipe details."));
        }
    };

    match extract(ctx, &page, Some(url)).await? {
        Some(mut draft) => {
            draft.source = RecipeSource::Url;
            draft.source_url = Some(url.to_string());
            Ok(ImportOutcome::Imported(draft))
        }
        None => Ok(manual(
            "Could not find a recipe on the page. Please enter the recipe details.",
        )),
    }
}

async fn import_from_text(ctx: &AppContext, text: &str) -> ServiceResult<ImportOutcome> {
    let cleaned = BARE_URL.replace_all(text, "");
    match extract(ctx, &cleaned, None).await? {
        Some(draft) => Ok(ImportOutcome::Imported(draft)),
        None => Ok(ImportOutcome::NeedsManualEntry {
            recipe: manual_draft(RecipeSource::Manual, None, ""),
            message: "Could not find a recipe in the text. Please enter the recipe details."
                .to_string(),
        }),
    }
}

/// Run recipe extraction. A timeout is an error; any other extractor
/// failure is logged and treated as "no recipe found".
async fn extract(
    ctx: &AppContext,
    text: &str,
    source_url: Option<&str>,
) -> ServiceResult<Option<NewRecipe>> {
    match ctx
        .with_ai_deadline(ctx.extractor.extract_recipe(text, source_url))
        .await
    {
        Ok(draft) => Ok(draft),
        Err(UpstreamError::Timeout) => Err(ServiceError::Upstream(UpstreamError::Timeout)),
        Err(e) => {
            tracing::warn!(error = %e, "recipe extraction failed; falling back to manual entry");
            Ok(None)
        }
    }
}

async fn fetch_page_text(ctx: &AppContext, url: &str) -> anyhow::Result<String> {
    let response = ctx.http.get(url).send().await?.error_for_status()?;
    let html = response.text().await?;
    Ok(html_to_text(&html))
}
