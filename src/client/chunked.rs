//! Chunked retrieval: fetch the identifier list, split it, then fetch each
//! chunk's documents with per-chunk retries.

use serde_json::Value;

use super::ResourceClient;
use crate::models::{Criteria, Document, Fields, SearchRequest, SortSpec};
use crate::resters::ResterError;
use crate::utils::{with_retry, with_retry_detailed, RetryResult};

/// A consecutive slice of the identifier list, fetched in one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of the chunk in fetch order
    pub index: usize,
    pub ids: Vec<String>,
}

/// Split `ids` into consecutive chunks of `chunk_size` (the last may be
/// smaller), keeping only the first `num_chunks` when a cap is given.
///
/// A `chunk_size` of zero puts everything in one chunk.
pub fn partition(ids: Vec<String>, chunk_size: usize, num_chunks: Option<usize>) -> Vec<Chunk> {
    if ids.is_empty() {
        return Vec::new();
    }
    let size = if chunk_size == 0 { ids.len() } else { chunk_size };
    let cap = num_chunks.unwrap_or(usize::MAX);

    let mut chunks = Vec::with_capacity(ids.len().div_ceil(size).min(cap));
    let mut rest = ids.into_iter();
    while chunks.len() < cap {
        let ids: Vec<String> = rest.by_ref().take(size).collect();
        if ids.is_empty() {
            break;
        }
        chunks.push(Chunk {
            index: chunks.len(),
            ids,
        });
    }
    chunks
}

/// Identifier of a document as a string (numeric ids are stringified)
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl ResourceClient {
    pub(crate) async fn search_chunked(
        &self,
        request: &SearchRequest,
        chunk_size: usize,
    ) -> Result<Vec<Document>, ResterError> {
        let cap = request.num_chunks.map(|n| n.saturating_mul(chunk_size));
        let ids = self
            .fetch_id_list(&request.criteria, request.sort.as_ref(), cap)
            .await?;

        if ids.is_empty() {
            tracing::debug!(resource = %self.name(), "no matching identifiers");
            return Ok(Vec::new());
        }

        let total_ids = ids.len();
        let chunks = partition(ids, chunk_size, request.num_chunks);
        tracing::debug!(
            resource = %self.name(),
            ids = total_ids,
            chunks = chunks.len(),
            chunk_size,
            "fetching in chunks"
        );

        let retry = self.settings().chunk_retry();
        let id_field = self.spec().id_field;
        let mut documents = Vec::with_capacity(total_ids);

        for chunk in chunks {
            let criteria = request.criteria.restrict_ids(id_field, &chunk.ids);
            let limit = chunk.ids.len();

            let outcome = with_retry_detailed(retry, || {
                self.fetch_page(
                    &criteria,
                    &request.fields,
                    request.sort.as_ref(),
                    Some(limit),
                    None,
                )
            })
            .await;

            match outcome {
                RetryResult::Success((docs, _)) => {
                    tracing::debug!(
                        resource = %self.name(),
                        chunk = chunk.index,
                        documents = docs.len(),
                        "chunk fetched"
                    );
                    documents.extend(docs);
                }
                RetryResult::TransientFailure(error, _, attempts) => {
                    tracing::warn!(
                        resource = %self.name(),
                        chunk = chunk.index,
                        attempts,
                        "giving up on chunk"
                    );
                    return Err(ResterError::ChunkRetrieval {
                        resource: self.name().to_string(),
                        index: chunk.index,
                        ids: chunk.ids,
                        attempts,
                        source: Box::new(error),
                    });
                }
                RetryResult::PermanentFailure(error) => return Err(error),
            }
        }

        Ok(documents)
    }

    /// Collect the ordered identifier list, page by page. Stops once `cap`
    /// identifiers are known.
    pub(crate) async fn fetch_id_list(
        &self,
        criteria: &Criteria,
        sort: Option<&SortSpec>,
        cap: Option<usize>,
    ) -> Result<Vec<String>, ResterError> {
        if cap == Some(0) {
            return Ok(Vec::new());
        }

        let id_field = self.spec().id_field;
        let fields = Fields::only([id_field]);
        let page_size = self.settings().id_page_size.max(1);
        let retry = self.settings().chunk_retry();
        let mut ids: Vec<String> = Vec::new();

        loop {
            let skip = ids.len();
            let limit = match cap {
                Some(cap) => page_size.min(cap - skip),
                None => page_size,
            };

            let (docs, meta) = with_retry(retry, || {
                self.fetch_page(criteria, &fields, sort, Some(limit), Some(skip))
            })
            .await?;

            let received = docs.len();
            for doc in &docs {
                let id = doc.get(id_field).and_then(id_string).ok_or_else(|| {
                    ResterError::UnexpectedResponse(format!(
                        "{} returned a document without '{}'",
                        self.name(),
                        id_field
                    ))
                })?;
                ids.push(id);
            }

            let total = meta.total.map_or(ids.len(), |t| t as usize);
            let target = cap.map_or(total, |cap| cap.min(total));
            if received == 0 || ids.len() >= target {
                break;
            }
        }

        if let Some(cap) = cap {
            ids.truncate(cap);
        }
        Ok(ids)
    }
}
