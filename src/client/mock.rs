//! Scripted transports for testing.

use http::{Method, StatusCode};
use serde_json::{json, Map, Value};
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{ALL_FIELDS_PARAM, FIELDS_PARAM, LIMIT_PARAM, SKIP_PARAM, SORT_PARAM};
use crate::utils::{Transport, TransportError, TransportRequest, TransportResponse};

type Handler =
    dyn Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync;

/// Build a JSON response with the given status
pub fn json_response(status: u16, body: Value) -> Result<TransportResponse, TransportError> {
    let status = StatusCode::from_u16(status)
        .map_err(|e| TransportError::Other(format!("invalid status {}: {}", status, e)))?;
    Ok(TransportResponse::new(status, body))
}

/// A transport that answers every request through a handler closure and
/// records what was sent.
pub struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<TransportRequest>>,
    closes: AtomicUsize,
}

impl MockTransport {
    /// Create a transport answering through `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&TransportRequest) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        }
    }

    /// Answer every request with the same status and body
    pub fn always(status: u16, body: Value) -> Self {
        Self::new(move |_| json_response(status, body.clone()))
    }

    /// Serve the given in-memory resources; unknown paths get a 404
    pub fn serving(resources: Vec<InMemoryResource>) -> Self {
        Self::new(move |request| {
            resources
                .iter()
                .find_map(|resource| resource.handle(request))
                .unwrap_or_else(|| json_response(404, json!({"detail": "Not Found"})))
        })
    }

    /// Every request sent so far, in order
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of requests sent so far
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of times the transport was closed
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.request_count())
            .field("closes", &self.close_count())
            .finish()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());
        (self.handler)(request)
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// An in-memory resource speaking the search/lookup wire protocol: equality
/// and membership filters, `_min`/`_max` ranges, sorting, paging, projection
/// and `meta.total`.
#[derive(Debug, Clone)]
pub struct InMemoryResource {
    suffix: String,
    id_field: String,
    id_param: String,
    documents: Vec<Value>,
}

impl InMemoryResource {
    pub fn new(
        suffix: impl Into<String>,
        id_field: impl Into<String>,
        id_param: impl Into<String>,
        documents: Vec<Value>,
    ) -> Self {
        Self {
            suffix: suffix.into(),
            id_field: id_field.into(),
            id_param: id_param.into(),
            documents,
        }
    }

    /// Answer `request` if it targets this resource
    pub fn handle(
        &self,
        request: &TransportRequest,
    ) -> Option<Result<TransportResponse, TransportError>> {
        let rest = request.path.trim_matches('/').strip_prefix(self.suffix.as_str())?;
        if rest.is_empty() {
            return Some(self.search(request));
        }
        let id = rest.strip_prefix('/')?;
        if id.contains('/') || request.method != Method::GET {
            return None;
        }
        Some(self.lookup(id, request))
    }

    /// Like [`InMemoryResource::handle`], answering 404 for foreign paths
    pub fn respond(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        self.handle(request)
            .unwrap_or_else(|| json_response(404, json!({"detail": "Not Found"})))
    }

    fn lookup(&self, id: &str, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let id = urlencoding::decode(id)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| id.to_string());

        match self
            .documents
            .iter()
            .find(|doc| doc.get(&self.id_field).is_some_and(|v| value_matches(v, &id)))
        {
            Some(doc) => json_response(
                200,
                json!({"data": [project(doc, request)], "meta": {"total": 1}}),
            ),
            None => json_response(
                404,
                json!({"detail": format!("Item with {} = {} not found", self.id_field, id)}),
            ),
        }
    }

    fn search(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut matched: Vec<&Value> = self
            .documents
            .iter()
            .filter(|doc| self.matches(doc, request))
            .collect();

        if let Some(sort) = request.query_value(SORT_PARAM) {
            let (field, descending) = match sort.strip_prefix('-') {
                Some(field) => (field, true),
                None => (sort, false),
            };
            matched.sort_by(|a, b| {
                let ordering = compare(a.get(field), b.get(field));
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let total = matched.len();
        let skip = parse_usize(request.query_value(SKIP_PARAM)).unwrap_or(0);
        let limit = parse_usize(request.query_value(LIMIT_PARAM)).unwrap_or(usize::MAX);

        let data: Vec<Value> = matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| project(doc, request))
            .collect();

        json_response(200, json!({"data": data, "meta": {"total": total}}))
    }

    fn matches(&self, doc: &Value, request: &TransportRequest) -> bool {
        request
            .query
            .iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .all(|(key, value)| {
                if *key == self.id_param {
                    return doc
                        .get(&self.id_field)
                        .is_some_and(|v| value.split(',').any(|id| value_matches(v, id)));
                }
                if let Some(field) = key.strip_suffix("_min") {
                    return number_bound(doc.get(field), value, |n, bound| n >= bound);
                }
                if let Some(field) = key.strip_suffix("_max") {
                    return number_bound(doc.get(field), value, |n, bound| n <= bound);
                }
                match doc.get(key.as_str()) {
                    Some(v) => value.split(',').any(|candidate| value_matches(v, candidate)),
                    None => false,
                }
            })
    }
}

fn parse_usize(value: Option<&str>) -> Option<usize> {
    value.and_then(|v| v.parse().ok())
}

/// Whether a document value matches a query string
fn value_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => match (n.as_f64(), expected.parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => n.to_string() == expected,
        },
        Value::Bool(b) => b.to_string() == expected,
        Value::Array(items) => items.iter().any(|item| value_matches(item, expected)),
        _ => false,
    }
}

fn number_bound(value: Option<&Value>, bound: &str, check: impl Fn(f64, f64) -> bool) -> bool {
    match (value.and_then(Value::as_f64), bound.parse::<f64>()) {
        (Some(n), Ok(bound)) => check(n, bound),
        _ => false,
    }
}

/// Order missing values last, numbers numerically, everything else as text
fn compare(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (None, None) => CmpOrdering::Equal,
        (None, Some(_)) => CmpOrdering::Greater,
        (Some(_), None) => CmpOrdering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// Apply `_fields` to a document; `_all_fields` or no projection keeps it whole
fn project(doc: &Value, request: &TransportRequest) -> Value {
    let Some(fields) = request.query_value(FIELDS_PARAM) else {
        return doc.clone();
    };
    if request.query_value(ALL_FIELDS_PARAM) == Some("true") {
        return doc.clone();
    }
    let Value::Object(map) = doc else {
        return doc.clone();
    };

    let mut projected = Map::new();
    for field in fields.split(',') {
        let root = field.split('.').next().unwrap_or(field);
        if let Some(value) = map.get(root) {
            projected.insert(root.to_string(), value.clone());
        }
    }
    Value::Object(projected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> InMemoryResource {
        InMemoryResource::new(
            "materials",
            "material_id",
            "material_ids",
            vec![
                json!({"material_id": "mp-1", "band_gap": 0.5, "elements": ["Fe", "O"]}),
                json!({"material_id": "mp-2", "band_gap": 2.0, "elements": ["Li", "O"]}),
                json!({"material_id": "mp-3", "band_gap": 1.1, "elements": ["Si"]}),
            ],
        )
    }

    #[test]
    fn test_filters_and_projection() {
        let request = TransportRequest::get("materials/")
            .param("band_gap_min", 1.0)
            .param("elements", "O")
            .param(FIELDS_PARAM, "material_id");

        let response = resource().respond(&request).unwrap();
        assert_eq!(
            response.body,
            json!({"data": [{"material_id": "mp-2"}], "meta": {"total": 1}})
        );
    }

    #[test]
    fn test_sort_and_paging() {
        let request = TransportRequest::get("materials/")
            .param(SORT_PARAM, "-band_gap")
            .param(LIMIT_PARAM, 1)
            .param(SKIP_PARAM, 1)
            .param(FIELDS_PARAM, "material_id");

        let response = resource().respond(&request).unwrap();
        assert_eq!(response.body["data"], json!([{"material_id": "mp-3"}]));
        assert_eq!(response.body["meta"]["total"], json!(3));
    }

    #[test]
    fn test_lookup_and_unknown_paths() {
        let found = resource().respond(&TransportRequest::get("materials/mp-2/")).unwrap();
        assert_eq!(found.status, StatusCode::OK);
        assert_eq!(found.body["data"][0]["band_gap"], json!(2.0));

        let missing = resource().respond(&TransportRequest::get("materials/mp-9/")).unwrap();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);

        assert!(resource().handle(&TransportRequest::get("thermo/")).is_none());
    }

    #[tokio::test]
    async fn test_mock_transport_records_requests() {
        let transport = MockTransport::serving(vec![resource()]);

        transport
            .send(&TransportRequest::get("materials/").param("material_ids", "mp-1,mp-3"))
            .await
            .unwrap();
        transport.close();

        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.requests()[0].query_value("material_ids"), Some("mp-1,mp-3"));
        assert_eq!(transport.close_count(), 1);
    }
}
