use std::time::Duration;

use reqwest::{redirect, Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::Config;
use crate::profile::Profile;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(String),
    #[error("server answered {0}")]
    Status(u16),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ApiError::Decode(err.to_string());
        }
        ApiError::Transport(format_request_error(err))
    }
}

/// Result of an endpoint that answers with a fresh token on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Token(String),
    Rejected(u16),
}

/// A history or favorites entry as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: i32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub headers: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub date: String,
}

/// Request the server should execute on the user's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurlRequest {
    pub method: String,
    pub url: String,
    pub headers: String,
    pub origin: String,
    pub body: String,
    pub user_email: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let redirect_policy = if config.http.follow_redirects {
            redirect::Policy::limited(config.http.max_redirects as usize)
        } else {
            redirect::Policy::none()
        };
        let mut builder = Client::builder().redirect(redirect_policy);
        if config.http.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(config.http.timeout));
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(&config.server.base_url, http))
    }

    pub fn with_client(base_url: &str, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn bearer(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthOutcome, ApiError> {
        let body = json!({
            "username": "doesntmatter",
            "email": email,
            "password": password,
            "favorites": null,
            "oldPassword": "",
            "deleted": false,
        });
        let response = self
            .http
            .post(self.url(&["api", "user", "auth"]))
            .json(&body)
            .send()
            .await?;
        token_outcome(response).await
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        date: &str,
    ) -> Result<AuthOutcome, ApiError> {
        let body = json!({
            "username": username,
            "email": email,
            "password": password,
            "favorites": null,
            "date": date,
            "oldPassword": "",
            "deleted": false,
        });
        let response = self
            .http
            .post(self.url(&["api", "user", "new"]))
            .json(&body)
            .send()
            .await?;
        token_outcome(response).await
    }

    pub async fn update_user(
        &self,
        token: Option<&str>,
        profile: &Profile,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome, ApiError> {
        let body = json!({
            "username": username,
            "email": profile.email,
            "password": password,
            "favorites": profile.favorites,
            "date": profile.date,
            "oldPassword": profile.password,
            "deleted": false,
        });
        let builder = self.http.put(self.url(&["api", "user", "update"])).json(&body);
        let response = Self::bearer(builder, token).send().await?;
        token_outcome(response).await
    }

    pub async fn update_favorites(
        &self,
        token: Option<&str>,
        profile: &Profile,
        favorites: &[i32],
    ) -> Result<AuthOutcome, ApiError> {
        let body = json!({
            "username": profile.username,
            "email": profile.email,
            "password": profile.password,
            "favorites": favorites,
            "date": profile.date,
            "oldPassword": profile.password,
            "deleted": false,
        });
        let builder = self
            .http
            .patch(self.url(&["api", "user", "favorites"]))
            .json(&body);
        let response = Self::bearer(builder, token).send().await?;
        token_outcome(response).await
    }

    /// Returns true only for a 200 answer whose body is JSON `true`.
    pub async fn delete_user(&self, token: Option<&str>, profile: &Profile) -> Result<bool, ApiError> {
        let body = json!({
            "username": profile.username,
            "email": profile.email,
            "password": profile.password,
            "deleted": false,
        });
        let builder = self.http.delete(self.url(&["api", "user", "delete"])).json(&body);
        let response = Self::bearer(builder, token).send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok(status == StatusCode::OK && matches!(serde_json::from_str::<Value>(&text), Ok(Value::Bool(true))))
    }

    pub async fn hide_request(&self, email: &str, request_id: i32) -> Result<(), ApiError> {
        let id = request_id.to_string();
        let response = self
            .http
            .delete(self.url(&["api", "request", "delete", email, &id]))
            .send()
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::Status(response.status().as_u16()))
        }
    }

    pub async fn history(&self, email: &str) -> Result<Vec<RequestRecord>, ApiError> {
        self.request_list(&["api", "request", "all", email]).await
    }

    pub async fn favorites(&self, email: &str) -> Result<Vec<RequestRecord>, ApiError> {
        self.request_list(&["api", "request", "favorites", email]).await
    }

    async fn request_list(&self, segments: &[&str]) -> Result<Vec<RequestRecord>, ApiError> {
        let response = self.http.get(self.url(segments)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            StatusCode::OK => {
                let text = response.text().await?;
                serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
            }
            status => Err(ApiError::Status(status.as_u16())),
        }
    }

    /// Asks the server to run a request; the answer is an HTML fragment.
    pub async fn send_request(&self, request: &CurlRequest) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url(&["curl", "request"]))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(ApiError::Status(status.as_u16()))
        }
    }

    /// Fetches a pre-rendered fragment from `/handle/<segments...>`.
    pub async fn fragment(&self, segments: &[&str]) -> Result<String, ApiError> {
        let mut path = Vec::with_capacity(segments.len() + 1);
        path.push("handle");
        path.extend_from_slice(segments);
        let response = self.http.get(self.url(&path)).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(ApiError::Status(status.as_u16()))
        }
    }
}

async fn token_outcome(response: Response) -> Result<AuthOutcome, ApiError> {
    let status = response.status();
    let text = response.text().await?;
    if status != StatusCode::OK {
        return Ok(AuthOutcome::Rejected(status.as_u16()));
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::String(token)) => Ok(AuthOutcome::Token(token)),
        _ => Ok(AuthOutcome::Rejected(status.as_u16())),
    }
}

fn format_request_error(err: reqwest::Error) -> String {
    if err.is_timeout() {
        return "Request timed out".to_string();
    }
    if err.is_connect() {
        if let Some(url) = err.url() {
            if let Some(host) = url.host_str() {
                return format!("Connection failed: {}", host);
            }
        }
        return "Connection failed".to_string();
    }
    if err.is_builder() {
        return format!("Invalid URL: {}", err);
    }
    if err.is_redirect() {
        return "Too many redirects".to_string();
    }
    format!("Request failed: {}", err)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::response::{Html, IntoResponse};
    use axum::routing::{delete, get, patch, post, put};
    use axum::{Json, Router};
    use tokio::net::TcpListener;
    use tokio::sync::{oneshot, Mutex};

    use super::*;
    use crate::token::tests::{sample_profile, token_for};

    /// Call recorded by the stub server: route name, bearer token, JSON body.
    pub(crate) type Calls = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

    #[derive(Clone)]
    struct StubState {
        calls: Calls,
        accept: bool,
    }

    pub(crate) struct ServerStub {
        pub base_url: String,
        pub calls: Calls,
        shutdown: Option<oneshot::Sender<()>>,
    }

    impl Drop for ServerStub {
        fn drop(&mut self) {
            if let Some(tx) = self.shutdown.take() {
                let _ = tx.send(());
            }
        }
    }

    fn bearer(headers: &HeaderMap) -> Option<String> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    }

    async fn record(state: &StubState, name: &str, headers: &HeaderMap, body: Value) {
        state.calls.lock().await.push((name.to_string(), bearer(headers), body));
    }

    fn token_reply(state: &StubState, body: &Value) -> axum::response::Response {
        if !state.accept {
            return (AxumStatus::UNAUTHORIZED, Json(Value::Array(vec![]))).into_response();
        }
        let mut profile = sample_profile();
        if let Some(username) = body.get("username").and_then(Value::as_str) {
            if username != "doesntmatter" {
                profile.username = username.to_string();
            }
        }
        if let Some(favorites) = body.get("favorites").and_then(Value::as_array) {
            profile.favorites = favorites.iter().filter_map(Value::as_i64).map(|v| v as i32).collect();
        }
        (AxumStatus::OK, Json(Value::String(token_for(&profile)))).into_response()
    }

    async fn auth(State(s): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        record(&s, "auth", &headers, body.clone()).await;
        token_reply(&s, &body)
    }

    async fn new_user(State(s): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        record(&s, "new", &headers, body.clone()).await;
        token_reply(&s, &body)
    }

    async fn update(State(s): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        record(&s, "update", &headers, body.clone()).await;
        token_reply(&s, &body)
    }

    async fn favorites_patch(State(s): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        record(&s, "favorites", &headers, body.clone()).await;
        token_reply(&s, &body)
    }

    async fn delete_user(State(s): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        record(&s, "delete", &headers, body).await;
        if s.accept {
            (AxumStatus::OK, Json(Value::Bool(true)))
        } else {
            (AxumStatus::OK, Json(Value::Bool(false)))
        }
    }

    async fn hide(State(s): State<StubState>, headers: HeaderMap, Path((email, id)): Path<(String, i32)>) -> impl IntoResponse {
        record(&s, "hide", &headers, json!({ "email": email, "id": id })).await;
        AxumStatus::OK
    }

    async fn history(Path(email): Path<String>) -> impl IntoResponse {
        if email == "anon" {
            return (AxumStatus::NOT_FOUND, Json(json!("No requests found from this user email"))).into_response();
        }
        Json(json!([
            { "id": 9, "url": "https://example.com/b", "method": "POST", "status": "201", "date": "2", "body": "{\"a\":1}" },
            { "id": 3, "url": "https://example.com/a", "method": "GET", "status": "200", "date": "1" }
        ]))
        .into_response()
    }

    async fn favorites_list(Path(email): Path<String>) -> impl IntoResponse {
        if email == "anon" {
            return (AxumStatus::NOT_FOUND, Json(json!("none"))).into_response();
        }
        Json(json!([{ "id": 3, "url": "https://example.com/a", "method": "GET", "status": "200", "date": "1" }]))
            .into_response()
    }

    async fn curl(State(s): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
        record(&s, "curl", &headers, body).await;
        Html(r#"$  status: 200<br /><br /><textarea id="response-textarea" readonly>{"ok":true}&#013;</textarea>"#)
    }

    async fn fragment(Path(rest): Path<String>) -> impl IntoResponse {
        Html(format!("<p>$  fragment {}</p>", rest))
    }

    pub(crate) async fn spawn_stub(accept: bool) -> ServerStub {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            calls: calls.clone(),
            accept,
        };
        let app = Router::new()
            .route("/api/user/auth", post(auth))
            .route("/api/user/new", post(new_user))
            .route("/api/user/update", put(update))
            .route("/api/user/favorites", patch(favorites_patch))
            .route("/api/user/delete", delete(delete_user))
            .route("/api/request/delete/{email}/{id}", delete(hide))
            .route("/api/request/all/{email}", get(history))
            .route("/api/request/favorites/{email}", get(favorites_list))
            .route("/curl/request", post(curl))
            .route("/handle/{*rest}", get(fragment))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            let _ = server.await;
        });

        ServerStub {
            base_url: format!("http://{addr}"),
            calls,
            shutdown: Some(shutdown_tx),
        }
    }

    fn client(stub: &ServerStub) -> ApiClient {
        ApiClient::with_client(&stub.base_url, Client::new())
    }

    #[tokio::test]
    async fn test_authenticate_returns_token() {
        let stub = spawn_stub(true).await;
        let outcome = client(&stub).authenticate("ada@example.com", "pw").await.unwrap();
        let token = match outcome {
            AuthOutcome::Token(token) => token,
            other => panic!("expected token, got {:?}", other),
        };
        assert_eq!(crate::token::decode_token(&token).unwrap().email, "ada@example.com");

        let calls = stub.calls.lock().await;
        assert_eq!(calls[0].0, "auth");
        assert_eq!(calls[0].2["email"], "ada@example.com");
        assert_eq!(calls[0].2["username"], "doesntmatter");
        assert!(calls[0].1.is_none());
    }

    #[tokio::test]
    async fn test_rejected_status_is_not_a_token() {
        let stub = spawn_stub(false).await;
        let outcome = client(&stub).authenticate("ada@example.com", "bad").await.unwrap();
        assert_eq!(outcome, AuthOutcome::Rejected(401));
    }

    #[tokio::test]
    async fn test_create_user_sends_date() {
        let stub = spawn_stub(true).await;
        let outcome = client(&stub)
            .create_user("grace", "grace@example.com", "pw", "1700000000000")
            .await
            .unwrap();
        assert!(matches!(outcome, AuthOutcome::Token(_)));
        let calls = stub.calls.lock().await;
        assert_eq!(calls[0].0, "new");
        assert_eq!(calls[0].2["date"], "1700000000000");
        assert_eq!(calls[0].2["username"], "grace");
    }

    #[tokio::test]
    async fn test_update_favorites_sends_bearer_and_list() {
        let stub = spawn_stub(true).await;
        let profile = sample_profile();
        let token = token_for(&profile);
        let outcome = client(&stub)
            .update_favorites(Some(&token), &profile, &[3])
            .await
            .unwrap();
        let new_token = match outcome {
            AuthOutcome::Token(token) => token,
            other => panic!("expected token, got {:?}", other),
        };
        assert_eq!(crate::token::decode_token(&new_token).unwrap().favorites, vec![3]);

        let calls = stub.calls.lock().await;
        assert_eq!(calls[0].0, "favorites");
        assert_eq!(calls[0].1.as_deref(), Some(token.as_str()));
        assert_eq!(calls[0].2["favorites"], json!([3]));
        assert_eq!(calls[0].2["deleted"], json!(false));
    }

    #[tokio::test]
    async fn test_update_user_keeps_profile_fields() {
        let stub = spawn_stub(true).await;
        let profile = sample_profile();
        client(&stub)
            .update_user(None, &profile, "ada2", "newpw")
            .await
            .unwrap();
        let calls = stub.calls.lock().await;
        assert_eq!(calls[0].2["username"], "ada2");
        assert_eq!(calls[0].2["password"], "newpw");
        assert_eq!(calls[0].2["email"], "ada@example.com");
        assert_eq!(calls[0].2["favorites"], json!([3, 9]));
        assert_eq!(calls[0].2["date"], "1700000000000");
    }

    #[tokio::test]
    async fn test_delete_user_requires_true_body() {
        let accepting = spawn_stub(true).await;
        assert!(client(&accepting).delete_user(None, &sample_profile()).await.unwrap());
        let refusing = spawn_stub(false).await;
        assert!(!client(&refusing).delete_user(None, &sample_profile()).await.unwrap());
    }

    #[tokio::test]
    async fn test_hide_request_encodes_email() {
        let stub = spawn_stub(true).await;
        client(&stub).hide_request("ada@example.com", 42).await.unwrap();
        let calls = stub.calls.lock().await;
        assert_eq!(calls[0].0, "hide");
        assert_eq!(calls[0].2, json!({ "email": "ada@example.com", "id": 42 }));
    }

    #[tokio::test]
    async fn test_history_lists_and_not_found_is_empty() {
        let stub = spawn_stub(true).await;
        let api = client(&stub);
        let history = api.history("ada@example.com").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, 9);
        assert_eq!(history[0].body.as_deref(), Some("{\"a\":1}"));
        assert!(api.history("anon").await.unwrap().is_empty());
        assert_eq!(api.favorites("ada@example.com").await.unwrap()[0].id, 3);
    }

    #[tokio::test]
    async fn test_send_request_and_fragment() {
        let stub = spawn_stub(true).await;
        let api = client(&stub);
        let request = CurlRequest {
            method: "GET".into(),
            url: "https://example.com".into(),
            headers: String::new(),
            origin: String::new(),
            body: String::new(),
            user_email: "anon".into(),
        };
        let html = api.send_request(&request).await.unwrap();
        assert!(html.contains("response-textarea"));

        let fragment = api.fragment(&["navbar", "home", "null"]).await.unwrap();
        assert!(fragment.contains("navbar/home/null"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let api = ApiClient::with_client(&format!("http://{addr}"), Client::new());
        let err = api.authenticate("a", "b").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(ref msg) if msg.starts_with("Connection failed")));
    }
}
