//! Inventory operations and the upload ingestion pipeline.
//!
//! # Pipeline
//!
//! ```text
//! upload ──▶ validate ──▶ extract text ──▶ Extractor::extract_items
//!                                              │
//!               inventory ◀── add_batch ◀── drop non-food (receipts)
//! ```
//!
//! Validation happens before any text is extracted or any AI call is made.

use larder_core::extraction::is_food_item;
use larder_core::models::{InventoryItem, InventoryPatch, ItemSource, NewInventoryItem};
use larder_core::providers::ExtractionKind;
use serde::Serialize;

use crate::context::AppContext;
use crate::error::{ServiceError, ServiceResult};
use crate::extract::{extract_text, validate_upload, UploadKind};

/// Items added by one ingestion.
#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    pub message: String,
    pub items: Vec<InventoryItem>,
}

pub async fn list_items(ctx: &AppContext) -> ServiceResult<Vec<InventoryItem>> {
    Ok(ctx.inventory.list_all().await?)
}

fn check_quantity(quantity: f64) -> ServiceResult<()> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(ServiceError::validation(
            "quantity must be a non-negative number",
        ));
    }
    Ok(())
}

pub async fn add_item(ctx: &AppContext, draft: NewInventoryItem) -> ServiceResult<InventoryItem> {
    if draft.name.trim().is_empty() {
        return Err(ServiceError::validation("Item name is required"));
    }
    check_quantity(draft.quantity)?;
    let item = ctx.inventory.add(draft).await?;
    tracing::info!(id = %item.id, name = %item.name, "inventory item added");
    Ok(item)
}

pub async fn update_item(
    ctx: &AppContext,
    id: &str,
    patch: InventoryPatch,
) -> ServiceResult<InventoryItem> {
    if matches!(&patch.name, Some(name) if name.trim().is_empty()) {
        return Err(ServiceError::validation("Item name must not be empty"));
    }
    if let Some(quantity) = patch.quantity {
        check_quantity(quantity)?;
    }
    ctx.inventory
        .update(id, patch)
        .await?
        .ok_or_else(|| ServiceError::not_found("Item", id))
}

pub async fn delete_item(ctx: &AppContext, id: &str) -> ServiceResult<()> {
    if !ctx.inventory.delete(id).await? {
        return Err(ServiceError::not_found("Item", id));
    }
    tracing::info!(id, "inventory item deleted");
    Ok(())
}

pub async fn clear_items(ctx: &AppContext) -> ServiceResult<usize> {
    let removed = ctx.inventory.clear().await?;
    tracing::info!(removed, "inventory cleared");
    Ok(removed)
}

/// Ingest an uploaded transcription (`.txt`) or receipt (`.pdf`).
pub async fn ingest_upload(
    ctx: &AppContext,
    filename: &str,
    bytes: Vec<u8>,
) -> ServiceResult<IngestOutcome> {
    let kind = validate_upload(filename, bytes.len(), ctx.settings.max_upload_bytes)?;
    tracing::info!(filename, bytes = bytes.len(), kind = kind.label(), "processing upload");

    let text = tokio::task::spawn_blocking(move || extract_text(&bytes, kind))
        .await
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("text extraction task failed: {}", e)))?
        .map_err(|e| ServiceError::validation(format!("Could not read {}: {}", filename, e)))?;

    if text.trim().is_empty() {
        return Err(ServiceError::validation(format!(
            "No text found in {}",
            kind.label()
        )));
    }

    ingest_text(ctx, &text, kind).await
}

/// Add items described in free text typed by the user.
pub async fn parse_text(ctx: &AppContext, text: &str) -> ServiceResult<IngestOutcome> {
    if text.trim().is_empty() {
        return Err(ServiceError::validation("No text provided"));
    }
    let extracted = ctx
        .with_ai_deadline(ctx.extractor.extract_items(text, ExtractionKind::Freeform))
        .await?;
    store_extracted(ctx, extracted, ItemSource::Manual, "text").await
}

async fn ingest_text(
    ctx: &AppContext,
    text: &str,
    kind: UploadKind,
) -> ServiceResult<IngestOutcome> {
    let mut extracted = ctx
        .with_ai_deadline(ctx.extractor.extract_items(text, kind.extraction_kind()))
        .await?;

    if kind == UploadKind::Receipt {
        let before = extracted.len();
        extracted.retain(|item| is_food_item(&item.name));
        let dropped = before - extracted.len();
        if dropped > 0 {
            tracing::info!(dropped, "filtered non-food receipt items");
        }
    }

    store_extracted(ctx, extracted, kind.item_source(), kind.label()).await
}

async fn store_extracted(
    ctx: &AppContext,
    extracted: Vec<larder_core::models::ExtractedItem>,
    source: ItemSource,
    label: &str,
) -> ServiceResult<IngestOutcome> {
    if extracted.is_empty() {
        return Err(ServiceError::validation(format!(
            "No food items found in {}",
            label
        )));
    }

    let drafts = extracted
        .into_iter()
        .map(|item| item.into_draft(source))
        .collect();
    let items = ctx.inventory.add_batch(drafts).await?;
    tracing::info!(count = items.len(), source = source.as_str(), "items added to inventory");

    Ok(IngestOutcome {
        message: format!("Added {} items from {} to inventory", items.len(), label),
        items,
    })
}
