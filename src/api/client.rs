//! # ApiClient: JSON calls against the dashboard backend.
//!
//! Every method maps to one backend route and returns the decoded JSON body.
//! Non-2xx answers become [`ApiError::Status`] carrying the `detail` field the
//! backend puts in its error bodies.

use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::api::error::ApiError;
use crate::channel::Endpoint;

/// REST client bound to one backend.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Creates a client for `base` (for example `http://localhost:8000/`).
    pub fn new(base: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    /// Creates a client reusing an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    /// Creates a client for the REST base of a feed endpoint.
    pub fn for_endpoint(endpoint: &Endpoint) -> Self {
        Self::new(endpoint.api_base().clone())
    }

    /// Base URL every route is joined onto.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `GET /api/dashboard`
    pub async fn dashboard(&self) -> Result<Value, ApiError> {
        self.call(Method::GET, "api/dashboard", &[], None).await
    }

    /// `GET /api/stats`
    pub async fn stats(&self) -> Result<Value, ApiError> {
        self.call(Method::GET, "api/stats", &[], None).await
    }

    /// `GET /api/system-status`
    pub async fn system_status(&self) -> Result<Value, ApiError> {
        self.call(Method::GET, "api/system-status", &[], None).await
    }

    /// `GET /api/job-history`
    pub async fn job_history(&self) -> Result<Value, ApiError> {
        self.call(Method::GET, "api/job-history", &[], None).await
    }

    /// `DELETE /api/job-history`
    pub async fn clear_job_history(&self) -> Result<Value, ApiError> {
        self.call(Method::DELETE, "api/job-history", &[], None).await
    }

    /// `GET /api/notifications?limit=N`
    pub async fn notifications(&self, limit: Option<u32>) -> Result<Value, ApiError> {
        let limit = limit.map(|n| n.to_string());
        let query: Vec<(&str, &str)> = limit.iter().map(|n| ("limit", n.as_str())).collect();
        self.call(Method::GET, "api/notifications", &query, None).await
    }

    /// `POST /api/notifications/{id}/read`
    pub async fn mark_notification_read(&self, id: &str) -> Result<Value, ApiError> {
        let path = format!("api/notifications/{}/read", segment(id));
        self.call(Method::POST, &path, &[], None).await
    }

    /// `GET /api/sites/{key}/data`
    pub async fn site_data(&self, key: &str) -> Result<Value, ApiError> {
        let path = format!("api/sites/{}/data", segment(key));
        self.call(Method::GET, &path, &[], None).await
    }

    /// `POST /api/crawl/{key}`
    pub async fn start_crawl(&self, key: &str) -> Result<Value, ApiError> {
        let path = format!("api/crawl/{}", segment(key));
        self.call(Method::POST, &path, &[], None).await
    }

    /// `POST /api/crawl/all`
    pub async fn crawl_all(&self) -> Result<Value, ApiError> {
        self.call(Method::POST, "api/crawl/all", &[], None).await
    }

    /// `GET /api/schedules`
    pub async fn schedules(&self) -> Result<Value, ApiError> {
        self.call(Method::GET, "api/schedules", &[], None).await
    }

    /// `GET /api/schedules/{key}`
    pub async fn schedule(&self, key: &str) -> Result<Value, ApiError> {
        let path = format!("api/schedules/{}", segment(key));
        self.call(Method::GET, &path, &[], None).await
    }

    /// `POST /api/schedules/{key}` with a JSON body.
    pub async fn save_schedule(&self, key: &str, body: &Value) -> Result<Value, ApiError> {
        let path = format!("api/schedules/{}", segment(key));
        self.call(Method::POST, &path, &[], Some(body)).await
    }

    /// `DELETE /api/schedules/{key}`
    pub async fn delete_schedule(&self, key: &str) -> Result<Value, ApiError> {
        let path = format!("api/schedules/{}", segment(key));
        self.call(Method::DELETE, &path, &[], None).await
    }

    /// `POST /api/schedules/{key}/trigger`
    pub async fn trigger_schedule(&self, key: &str) -> Result<Value, ApiError> {
        let path = format!("api/schedules/{}/trigger", segment(key));
        self.call(Method::POST, &path, &[], None).await
    }

    /// `POST /api/scheduler/start`
    pub async fn start_scheduler(&self) -> Result<Value, ApiError> {
        self.call(Method::POST, "api/scheduler/start", &[], None).await
    }

    /// `POST /api/scheduler/stop`
    pub async fn stop_scheduler(&self) -> Result<Value, ApiError> {
        self.call(Method::POST, "api/scheduler/stop", &[], None).await
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.base.join(path)?;
        tracing::debug!(method = %method, url = %url, "api request");

        let mut request = self.http.request(method, url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let detail = error_detail(&text, status);
            tracing::warn!(status = status.as_u16(), detail = %detail, "api call failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Extracts `detail` from an error body, falling back to the raw text or the reason phrase.
fn error_detail(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| match v.get("detail") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
        None => None,
    });
    match from_json {
        Some(detail) => detail,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status.canonical_reason().unwrap_or("unknown error").to_string(),
    }
}

/// Percent-encodes one path segment.
fn segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(Url::parse(&format!("{}/", server.uri())).unwrap())
    }

    #[test]
    fn endpoint_client_uses_the_page_origin() {
        let endpoint = Endpoint::from_origin("https://monitor.example.com/dashboard?tab=1").unwrap();
        let api = ApiClient::for_endpoint(&endpoint);
        assert_eq!(api.base().as_str(), "https://monitor.example.com/");
    }

    #[tokio::test]
    async fn dashboard_returns_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_sites": 3})))
            .expect(1)
            .mount(&server)
            .await;

        let body = client(&server).await.dashboard().await.unwrap();
        assert_eq!(body["total_sites"], 3);
    }

    #[tokio::test]
    async fn error_status_carries_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sites/nope/data"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Site not found"})))
            .mount(&server)
            .await;

        let err = client(&server).await.site_data("nope").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.as_label(), "api_status");
        assert!(matches!(err, ApiError::Status { ref detail, .. } if detail == "Site not found"));
    }

    #[tokio::test]
    async fn error_without_json_uses_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/crawl/all"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server).await.crawl_all().await.unwrap_err();
        assert_eq!(err.as_message(), "502: bad gateway");
    }

    #[tokio::test]
    async fn save_schedule_posts_body() {
        let server = MockServer::start().await;
        let schedule = json!({"enabled": true, "interval_hours": 6});
        Mock::given(method("POST"))
            .and(path("/api/schedules/moef"))
            .and(body_json(&schedule))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let body = client(&server).await.save_schedule("moef", &schedule).await.unwrap();
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn notifications_pass_limit_and_empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications"))
            .and(query_param("limit", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/job-history"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let api = client(&server).await;
        assert_eq!(api.notifications(Some(10)).await.unwrap(), json!([]));
        assert_eq!(api.clear_job_history().await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn malformed_success_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).await.stats().await.unwrap_err();
        assert_eq!(err.as_label(), "api_decode");
    }

    #[test]
    fn path_segments_are_encoded() {
        assert_eq!(segment("moef"), "moef");
        assert_eq!(segment("a b/c"), "a%20b%2Fc");
    }
}
