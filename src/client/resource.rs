//! Client for a single resource endpoint.

use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

use super::session::{check_status, status_error};
use super::{QuerySettings, ResourceSpec, Session};
use crate::models::{
    Criteria, Document, EnvelopeError, Fields, Meta, ResponseEnvelope, SearchRequest, SortSpec,
    LIMIT_PARAM, SKIP_PARAM, SORT_PARAM,
};
use crate::resters::ResterError;
use crate::utils::TransportRequest;

/// Issues `search`, `get_by_id` and `count` against one resource.
///
/// Criteria, projections and identifiers are validated locally, so a bad
/// request fails before anything is sent.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    spec: &'static ResourceSpec,
    name: String,
    session: Arc<Session>,
    id_pattern: Regex,
    settings: QuerySettings,
}

impl ResourceClient {
    /// Create a client for `spec` over a shared session
    pub fn new(
        spec: &'static ResourceSpec,
        session: Arc<Session>,
        settings: QuerySettings,
    ) -> Result<Self, ResterError> {
        let id_pattern = Regex::new(spec.id_pattern).map_err(|e| {
            ResterError::Config(format!("invalid id pattern for '{}': {}", spec.suffix, e))
        })?;

        Ok(Self {
            spec,
            name: spec.name(),
            session,
            id_pattern,
            settings,
        })
    }

    /// Resource name (suffix with `/` replaced by `_`)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &'static ResourceSpec {
        self.spec
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Fields that may be filtered on or projected
    pub fn available_fields(&self) -> &'static [&'static str] {
        self.spec.available_fields
    }

    /// Whether `field` (or the top-level part of a dotted path) is known
    pub fn is_known_field(&self, field: &str) -> bool {
        let root = field.split('.').next().unwrap_or(field);
        root == self.spec.id_field || self.spec.available_fields.contains(&root)
    }

    /// Reject criteria that reference unknown fields
    pub fn validate_criteria(&self, criteria: &Criteria) -> Result<(), ResterError> {
        let unknown: Vec<&str> = criteria
            .fields()
            .filter(|f| !self.is_known_field(f))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(self.validation(format!("unknown criteria fields: {}", unknown.join(", "))))
        }
    }

    /// Reject projections that reference unknown fields
    pub fn validate_fields(&self, fields: &Fields) -> Result<(), ResterError> {
        let Fields::Only(fields) = fields else {
            return Ok(());
        };
        if fields.is_empty() {
            return Err(self.validation("empty field projection".to_string()));
        }

        let unknown: Vec<&str> = fields
            .iter()
            .map(String::as_str)
            .filter(|f| !self.is_known_field(f))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(self.validation(format!("unknown fields: {}", unknown.join(", "))))
        }
    }

    /// Check an identifier against the resource's pattern
    pub fn validate_id(&self, id: &str) -> Result<(), ResterError> {
        if id.trim().is_empty() {
            return Err(self.validation("identifier must not be empty".to_string()));
        }
        if !self.id_pattern.is_match(id) {
            return Err(self.validation(format!(
                "'{}' is not a valid {} (expected {})",
                id, self.spec.id_field, self.spec.id_pattern
            )));
        }
        Ok(())
    }

    fn validate_request(&self, request: &SearchRequest) -> Result<(), ResterError> {
        self.validate_criteria(&request.criteria)?;
        self.validate_fields(&request.fields)?;
        if let Some(sort) = &request.sort {
            if !self.is_known_field(&sort.field) {
                return Err(self.validation(format!("unknown sort field: {}", sort.field)));
            }
        }
        Ok(())
    }

    pub(crate) fn validation(&self, message: String) -> ResterError {
        ResterError::Validation {
            resource: self.name.clone(),
            message,
        }
    }

    /// Chunk size actually used for a request
    pub fn effective_chunk_size(&self, request: &SearchRequest) -> usize {
        if !self.spec.unique_ids {
            if request.chunk_size.is_some_and(|c| c > 0) {
                tracing::debug!(
                    resource = %self.name,
                    "identifiers are not unique, ignoring chunk_size"
                );
            }
            return 0;
        }
        request.chunk_size.unwrap_or(self.settings.chunk_size)
    }

    /// Search the resource.
    ///
    /// With a chunk size of zero a single request is made and the server-side
    /// limit applies. Otherwise the identifier list is fetched first and the
    /// documents are retrieved chunk by chunk.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<Document>, ResterError> {
        self.validate_request(request)?;

        let chunk_size = self.effective_chunk_size(request);
        if chunk_size == 0 {
            let (documents, _) = self
                .fetch_page(&request.criteria, &request.fields, request.sort.as_ref(), None, None)
                .await?;
            return Ok(documents);
        }

        self.search_chunked(request, chunk_size).await
    }

    /// Fetch one document by identifier
    pub async fn get_by_id(&self, id: &str, fields: &Fields) -> Result<Document, ResterError> {
        self.validate_id(id)?;
        self.validate_fields(fields)?;

        let (key, value) = fields.to_query_param();
        let request = TransportRequest::get(self.spec.document_path(id)).param(key, value);

        let response = self.session.send(&self.name, &request).await?;
        let body = check_status(&self.name, id, response)?;
        let (data, _) = self.read_envelope(id, body)?;

        data.into_iter()
            .next()
            .map(|value| Document::from_value(self.name.clone(), value))
            .ok_or_else(|| ResterError::NotFound {
                resource: self.name.clone(),
                id: id.to_string(),
            })
    }

    /// Count matching documents. Only the identifier field of a single
    /// document is transferred.
    pub async fn count(&self, criteria: &Criteria) -> Result<u64, ResterError> {
        self.validate_criteria(criteria)?;

        let fields = Fields::only([self.spec.id_field]);
        let (_, meta) = self.fetch_page(criteria, &fields, None, Some(1), None).await?;
        Ok(meta.total.unwrap_or(0))
    }

    /// POST a JSON body to `{suffix}/{action}/` and return the response data
    pub async fn post_action(&self, action: &str, body: Value) -> Result<Vec<Value>, ResterError> {
        let path = format!("{}/{}/", self.spec.suffix, action);
        let request = TransportRequest::post(path, body);

        let response = self.session.send(&self.name, &request).await?;
        let body = check_status(&self.name, action, response)?;
        let (data, _) = self.read_envelope(action, body)?;
        Ok(data)
    }

    /// One request against the search endpoint
    pub async fn fetch_page(
        &self,
        criteria: &Criteria,
        fields: &Fields,
        sort: Option<&SortSpec>,
        limit: Option<usize>,
        skip: Option<usize>,
    ) -> Result<(Vec<Document>, Meta), ResterError> {
        let (fields_key, fields_value) = fields.to_query_param();
        let mut request = TransportRequest::get(self.spec.search_path())
            .params(criteria.to_query_params(self.spec.id_field, self.spec.id_param))
            .param(fields_key, fields_value);

        if let Some(sort) = sort {
            request = request.param(SORT_PARAM, sort.to_query_value());
        }
        if let Some(limit) = limit {
            request = request.param(LIMIT_PARAM, limit);
        }
        if let Some(skip) = skip.filter(|s| *s > 0) {
            request = request.param(SKIP_PARAM, skip);
        }

        let subject = describe_query(&request);
        let response = self.session.send(&self.name, &request).await?;
        let body = check_status(&self.name, &subject, response)?;
        let (data, meta) = self.read_envelope(&subject, body)?;

        let documents = data
            .into_iter()
            .map(|value| Document::from_value(self.name.clone(), value))
            .collect();
        Ok((documents, meta))
    }

    fn read_envelope(&self, subject: &str, body: Value) -> Result<(Vec<Value>, Meta), ResterError> {
        let envelope: ResponseEnvelope = serde_json::from_value(body).map_err(|e| {
            ResterError::Parse(format!("invalid response from '{}': {}", self.name, e))
        })?;

        envelope.into_data().map_err(|err| match err {
            EnvelopeError::Api(api) => match u16::try_from(api.code) {
                Ok(status) if status >= 400 => {
                    status_error(&self.name, subject, status, api.message)
                }
                _ => ResterError::UnexpectedResponse(format!(
                    "{} returned error {}: {}",
                    self.name, api.code, api.message
                )),
            },
            other => ResterError::UnexpectedResponse(format!("{}: {}", self.name, other)),
        })
    }
}

/// Render the query parameters for error messages
fn describe_query(request: &TransportRequest) -> String {
    request
        .query
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{json_response, MockTransport};
    use crate::utils::{TransportError, TransportResponse};
    use http::StatusCode;
    use serde_json::json;

    static MATERIALS: ResourceSpec = ResourceSpec {
        suffix: "materials",
        id_field: "material_id",
        id_param: "material_ids",
        id_pattern: r"^(mp|mvc)-\d+$",
        unique_ids: true,
        available_fields: &["material_id", "formula_pretty", "chemsys", "structure"],
    };

    fn client(transport: Arc<MockTransport>) -> ResourceClient {
        let session = Arc::new(Session::new(transport, Some("key".to_string())));
        ResourceClient::new(&MATERIALS, session, QuerySettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_id_is_rejected_before_request() {
        let transport = Arc::new(MockTransport::always(200, json!({"data": []})));
        let client = client(transport.clone());

        for bad in ["", "149", "mp-1a", "task-1"] {
            let result = client.get_by_id(bad, &Fields::All).await;
            assert!(
                matches!(result, Err(ResterError::Validation { .. })),
                "'{}' should be rejected",
                bad
            );
        }
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let transport = Arc::new(MockTransport::new(|_: &TransportRequest| {
            json_response(404, json!({"detail": "Item with material_id = mp-0 not found"}))
        }));
        let client = client(transport.clone());

        let result = client.get_by_id("mp-0", &Fields::All).await;
        assert!(matches!(result, Err(ResterError::NotFound { ref id, .. }) if id == "mp-0"));
        assert_eq!(transport.requests()[0].path, "materials/mp-0/");
    }

    #[tokio::test]
    async fn test_get_by_id_empty_data_is_not_found() {
        let transport = Arc::new(MockTransport::always(200, json!({"data": []})));
        let client = client(transport);

        let result = client.get_by_id("mp-149", &Fields::only(["structure"])).await;
        assert!(matches!(result, Err(ResterError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_unknown_criteria_field() {
        let transport = Arc::new(MockTransport::always(200, json!({"data": []})));
        let client = client(transport.clone());

        let request = SearchRequest::new(Criteria::new().equals("colour", "blue"));
        let result = client.search(&request).await;

        assert!(matches!(result, Err(ResterError::Validation { ref message, .. }) if message.contains("colour")));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_dotted_projection_is_checked_by_root() {
        let transport = Arc::new(MockTransport::always(200, json!({"data": []})));
        let client = client(transport);

        assert!(client.validate_fields(&Fields::only(["structure.lattice"])).is_ok());
        assert!(client.validate_fields(&Fields::only(["orig_inputs.incar"])).is_err());
    }

    #[tokio::test]
    async fn test_count_requests_single_id() {
        let transport = Arc::new(MockTransport::new(|_: &TransportRequest| {
            json_response(200, json!({"data": [{"material_id": "mp-149"}], "meta": {"total": 1}}))
        }));
        let client = client(transport.clone());

        let count = client
            .count(&Criteria::new().equals("formula_pretty", "Si"))
            .await
            .unwrap();

        assert_eq!(count, 1);
        let request = &transport.requests()[0];
        assert_eq!(request.query_value("_fields"), Some("material_id"));
        assert_eq!(request.query_value("_limit"), Some("1"));
    }

    #[tokio::test]
    async fn test_unchunked_search_is_single_request() {
        let transport = Arc::new(MockTransport::new(|_: &TransportRequest| {
            json_response(
                200,
                json!({"data": [{"material_id": "mp-2"}, {"material_id": "mp-1"}]}),
            )
        }));
        let client = client(transport.clone());

        let request = SearchRequest::new(Criteria::new().equals("chemsys", "Si"))
            .fields(["material_id"])
            .chunk_size(0);
        let docs = client.search(&request).await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].get_str("material_id"), Some("mp-2"));
        assert_eq!(docs[0].resource(), "materials");
        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.requests()[0].query_value("_limit"), None);
    }

    #[tokio::test]
    async fn test_envelope_error_is_classified() {
        let transport = Arc::new(MockTransport::always(
            200,
            json!({"errors": [{"code": 422, "message": "invalid value for nelements"}]}),
        ));
        let client = client(transport);

        let request = SearchRequest::new(Criteria::new()).chunk_size(0);
        let result = client.search(&request).await;
        assert!(matches!(result, Err(ResterError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let transport = Arc::new(MockTransport::new(|_: &TransportRequest| {
            Err::<TransportResponse, _>(TransportError::Timeout("deadline elapsed".to_string()))
        }));
        let client = client(transport);

        let result = client
            .fetch_page(&Criteria::new(), &Fields::All, None, None, None)
            .await;
        assert!(matches!(
            result,
            Err(ResterError::TransientServer { timeout: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_post_action() {
        let transport = Arc::new(MockTransport::new(|request: &TransportRequest| {
            assert_eq!(request.path, "materials/find_structure/");
            assert!(request.body.is_some());
            Ok(TransportResponse::new(
                StatusCode::OK,
                json!({"data": [{"material_id": "mp-149", "rms_dist": 0.0}]}),
            ))
        }));
        let client = client(transport);

        let data = client
            .post_action("find_structure", json!({"lattice": {}}))
            .await
            .unwrap();
        assert_eq!(data[0]["material_id"], json!("mp-149"));
    }
}
