use crate::extract::{extract_leads, BatchConfig};
use crate::parse::parse_results;
use leadpipe_core::{
    Error, ExtractionModel, ExtractionSummary, LeadQuery, LeadReport, Result, SearchBackend,
};
use std::sync::Arc;
use std::time::Instant;

/// The search-and-extract pass: fetch one results page, parse it, run the
/// batched extraction, summarize.
///
/// One request runs end-to-end on one task; the only suspension points are
/// the search fetch, each model call, and the inter-batch delay. There is no
/// pipeline-wide timeout beyond the per-call network timeouts, and no retry.
pub struct LeadPipeline {
    search: Arc<dyn SearchBackend>,
    config: BatchConfig,
}

impl LeadPipeline {
    pub fn new(search: Arc<dyn SearchBackend>, config: BatchConfig) -> Self {
        Self { search, config }
    }

    pub async fn run(&self, query: &LeadQuery, model: &dyn ExtractionModel) -> Result<LeadReport> {
        let t0 = Instant::now();
        let html = self.search.fetch_results(query).await?;
        let snippets = parse_results(&html);
        tracing::info!(
            query = %query.search_terms(),
            found = snippets.len(),
            "search results parsed"
        );
        if snippets.is_empty() {
            return Err(Error::NoResults("the search returned no results".to_string()));
        }

        let leads = extract_leads(model, &snippets, &self.config).await;
        let summary = ExtractionSummary::from_counts(leads.len(), snippets.len());
        tracing::info!(
            kept = summary.records_kept,
            found = summary.snippets_found,
            rate_percent = summary.success_rate_percent,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "extraction complete"
        );
        Ok(LeadReport { leads, summary })
    }
}
