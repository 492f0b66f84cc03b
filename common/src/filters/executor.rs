use super::compiler::{apply_filters, CompiledQuery, PushdownPredicate};
use super::error::ListError;
use super::types::{Filterable, ResultEnvelope};
use anyhow::Result;
use async_trait::async_trait;

/// Rows returned by a backend fetch.
///
/// `exact_count` is the number of rows matching the predicate ignoring the
/// row window; backends only need to provide it when a window was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRows<R> {
    pub rows: Vec<R>,
    pub exact_count: Option<u64>,
}

/// Row-fetch capability of the storage backend for one list endpoint.
#[async_trait]
pub trait RowSource: Send + Sync {
    type Row: Filterable + Send;

    async fn fetch_rows(&self, predicate: &PushdownPredicate) -> Result<FetchedRows<Self::Row>>;
}

/// Runs a compiled list query against a backend.
///
/// Issues exactly one fetch. When residual filters exist the full candidate
/// set comes back and every filter, the pushed-down ones included, runs in
/// memory before counting and slicing the page.
pub async fn run_list_query<S: RowSource>(
    source: &S,
    compiled: &CompiledQuery,
) -> Result<ResultEnvelope<S::Row>, ListError> {
    let fetched = source
        .fetch_rows(&compiled.pushdown)
        .await
        .map_err(|e| {
            tracing::error!(entity = compiled.entity, error = %e, "list fetch failed");
            ListError::FetchFailed {
                entity: compiled.entity,
                source: e,
            }
        })?;

    if compiled.needs_in_memory() {
        let filtered = apply_filters(fetched.rows, &compiled.filters);
        let total = filtered.len() as u64;
        let offset = usize::try_from(compiled.page.offset()).unwrap_or(usize::MAX);
        let items: Vec<_> = filtered
            .into_iter()
            .skip(offset)
            .take(compiled.page.limit as usize)
            .collect();
        tracing::debug!(
            entity = compiled.entity,
            residual = compiled.residual().count(),
            total,
            "list filtered in memory"
        );
        return Ok(ResultEnvelope::new(items, total, compiled.page));
    }

    let total = fetched
        .exact_count
        .unwrap_or_else(|| compiled.page.offset() + fetched.rows.len() as u64);
    Ok(ResultEnvelope::new(fetched.rows, total, compiled.page))
}
