use crate::sanitize::{sanitize, strip_code_fences};
use leadpipe_core::{Error, ExtractionModel, LeadRecord, Result, SearchSnippet};
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(200);

/// Fixed extraction instruction. Part of the external contract: changing it
/// changes extraction quality and output shape, so tests pin against it.
pub const LEAD_PROMPT: &str = "\
Analyze these Google search results and extract ALL business information.
Format as JSON array with fields: name, email, phone, location, description (brief), website, contact.

Important instructions:
1. Include ALL entries that might be businesses
2. If a field is not found, use empty string \"\"
3. For description, use a brief excerpt from the text
4. Extract any contact information you can find
5. Include the website URL if available
6. If you find any email or phone, always include the entry
7. Try to extract location from the text if possible

Example format:
[
  {
    \"name\": \"Business Name\",
    \"email\": \"email@example.com\",
    \"phone\": \"1234567890\",
    \"location\": \"City, Area\",
    \"description\": \"Brief description\",
    \"website\": \"https://example.com\",
    \"contact\": \"Additional contact info\"
  }
]";

/// Batch sizing and pacing knobs.
///
/// The delay is a fixed pause between consecutive model calls; the AI service
/// applies its own quota and a burst of batches trips it. No backoff: quota
/// errors surface as ordinary batch failures.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

/// Run the extraction pass over all snippets, batch by batch, sequentially.
///
/// Non-failing at this level: a batch whose model call or parse fails is
/// logged and contributes zero records, so one malformed response never
/// aborts the request. Output preserves batch order and intra-batch order.
pub async fn extract_leads(
    model: &dyn ExtractionModel,
    snippets: &[SearchSnippet],
    config: &BatchConfig,
) -> Vec<LeadRecord> {
    let batch_size = config.batch_size.max(1);
    let total = snippets.len();
    let mut out = Vec::new();

    for (idx, batch) in snippets.chunks(batch_size).enumerate() {
        if idx > 0 && !config.batch_delay.is_zero() {
            tokio::time::sleep(config.batch_delay).await;
        }
        match extract_batch(model, batch).await {
            Ok(records) => out.extend(records),
            Err(e) => {
                tracing::warn!(batch = idx + 1, error = %e, "batch extraction failed; skipping");
            }
        }
        tracing::debug!(
            processed = (idx * batch_size + batch.len()).min(total),
            total,
            kept = out.len(),
            "batch complete"
        );
    }
    out
}

async fn extract_batch(
    model: &dyn ExtractionModel,
    batch: &[SearchSnippet],
) -> Result<Vec<LeadRecord>> {
    let raw = model.complete(LEAD_PROMPT, &batch_text(batch)).await?;
    parse_records(&raw)
}

/// Serialize a batch as `Title:`/`Description:`/`Link:` line triples joined
/// by blank lines — the textual shape the prompt's example was tuned against.
pub fn batch_text(batch: &[SearchSnippet]) -> String {
    batch
        .iter()
        .map(|s| {
            format!(
                "Title: {}\nDescription: {}\nLink: {}",
                s.title,
                s.description,
                s.link.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Parse one raw model response into valid lead records.
///
/// Fences are stripped and the text sanitized before parsing. The response
/// must be a JSON array; entries that fail to deserialize or fail the
/// validity rule are dropped individually.
pub fn parse_records(raw: &str) -> Result<Vec<LeadRecord>> {
    let cleaned = sanitize(&strip_code_fences(raw));
    let value: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|e| Error::Extraction(format!("model output is not valid JSON: {e}")))?;
    let Some(items) = value.as_array() else {
        return Err(Error::Extraction(
            "model output is not a JSON array".to_string(),
        ));
    };

    let mut out = Vec::new();
    for item in items {
        match serde_json::from_value::<LeadRecord>(item.clone()) {
            Ok(record) if record.is_valid() => out.push(record),
            Ok(_) => {}
            Err(e) => tracing::debug!(error = %e, "dropping malformed lead entry"),
        }
    }
    Ok(out)
}
