//! HTTP client for the inventory API plus the table state a UI renders from.
//!
//! The client speaks the same envelope the server writes and keeps the
//! session cookie it receives at login. Identical list requests inside the
//! dedup window are served from the last response.

pub mod table;

use reqwest::{header, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::auth::Role;
use crate::inventory::{
    AssignRequest, GroupRow, InventoryFilter, LoanRequest, NewProduct, ProductUpdate, ProductView, RetireRequest,
};
use crate::middleware::auth::TOKEN_COOKIE;
use crate::types::Page;

pub use table::{ColumnPreferences, InventoryTable, TableRow};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Missing configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The signed-in user as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Deserialize)]
struct LoginData {
    user: CurrentUser,
}

pub struct InventoryClient {
    http: reqwest::Client,
    base_url: String,
    dedup_window: Duration,
    session: RwLock<Option<String>>,
    cache: Mutex<ListCache>,
}

type ListCache = HashMap<String, (Instant, Page<ProductView>)>;

/// Caches `page` under `query` and forgets responses older than `window`.
fn remember(cache: &mut ListCache, window: Duration, query: String, page: Page<ProductView>) {
    cache.retain(|_, (fetched_at, _)| fetched_at.elapsed() < window);
    cache.insert(query, (Instant::now(), page));
}

impl InventoryClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid API base URL '{}': {}", base_url, e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            dedup_window: DEFAULT_DEDUP_WINDOW,
            session: RwLock::new(None),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Base URL from `GATI_API_URL`, then `NEXT_PUBLIC_API_URL`, then the
    /// local default.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var("GATI_API_URL")
            .or_else(|_| std::env::var("NEXT_PUBLIC_API_URL"))
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url)
    }

    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn is_signed_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Drops every cached list response.
    pub async fn invalidate(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, ClientError> {
        let response = self
            .request(Method::POST, "/api/v1/auth/login")
            .await
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let token = session_token(response.headers())
            .ok_or_else(|| ClientError::Decode("login response carried no session cookie".to_string()))?;
        let data: LoginData = unwrap_envelope(response).await?;

        *self.session.write().await = Some(token);
        self.invalidate().await;
        Ok(data.user)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.request(Method::POST, "/api/v1/auth/logout").await.send().await?;
        let _: Value = unwrap_envelope(response).await?;
        *self.session.write().await = None;
        self.invalidate().await;
        Ok(())
    }

    pub async fn me(&self) -> Result<CurrentUser, ClientError> {
        self.send(Method::GET, "/api/v1/auth/me", None).await
    }

    /// Lists one page, reusing a response for the same query string when it
    /// is younger than the dedup window.
    pub async fn list(&self, filter: &InventoryFilter) -> Result<Page<ProductView>, ClientError> {
        let query = filter.to_query_string();
        {
            let cache = self.cache.lock().await;
            if let Some((fetched_at, page)) = cache.get(&query) {
                if fetched_at.elapsed() < self.dedup_window {
                    tracing::debug!(%query, "List served from dedup cache");
                    return Ok(page.clone());
                }
            }
        }

        let page: Page<ProductView> = self.send(Method::GET, &format!("/api/v1/inventory?{}", query), None).await?;
        remember(&mut *self.cache.lock().await, self.dedup_window, query, page.clone());
        Ok(page)
    }

    pub async fn grouped(&self, filter: &InventoryFilter) -> Result<Page<GroupRow<ProductView>>, ClientError> {
        let path = format!("/api/v1/inventory/grouped?{}", filter.to_query_string());
        self.send(Method::GET, &path, None).await
    }

    pub async fn get(&self, id: Uuid) -> Result<ProductView, ClientError> {
        self.send(Method::GET, &format!("/api/v1/inventory/{}", id), None).await
    }

    pub async fn create(&self, input: &NewProduct) -> Result<ProductView, ClientError> {
        let view = self.send(Method::POST, "/api/v1/inventory", Some(json_body(input)?)).await?;
        self.invalidate().await;
        Ok(view)
    }

    pub async fn update(&self, id: Uuid, update: &ProductUpdate) -> Result<ProductView, ClientError> {
        let view = self
            .send(Method::PUT, &format!("/api/v1/inventory/{}", id), Some(update_body(update)))
            .await?;
        self.invalidate().await;
        Ok(view)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        let response = self
            .request(Method::DELETE, &format!("/api/v1/inventory/{}", id))
            .await
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        self.invalidate().await;
        Ok(())
    }

    pub async fn assign(&self, id: Uuid, request: &AssignRequest) -> Result<ProductView, ClientError> {
        self.transition(id, "assign", Some(json_body(request)?)).await
    }

    pub async fn loan(&self, id: Uuid, request: &LoanRequest) -> Result<ProductView, ClientError> {
        self.transition(id, "loan", Some(json_body(request)?)).await
    }

    pub async fn return_to_stock(&self, id: Uuid) -> Result<ProductView, ClientError> {
        self.transition(id, "return", None).await
    }

    pub async fn send_to_maintenance(&self, id: Uuid) -> Result<ProductView, ClientError> {
        self.transition(id, "maintenance", None).await
    }

    pub async fn retire(&self, id: Uuid, request: &RetireRequest) -> Result<ProductView, ClientError> {
        self.transition(id, "retire", Some(json_body(request)?)).await
    }

    async fn transition(&self, id: Uuid, action: &str, body: Option<Value>) -> Result<ProductView, ClientError> {
        let view = self
            .send(Method::POST, &format!("/api/v1/inventory/{}/{}", id, action), body)
            .await?;
        self.invalidate().await;
        Ok(view)
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = self.session.read().await.as_deref() {
            builder = builder.header(header::COOKIE, format!("{}={}", TOKEN_COOKIE, token));
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T, ClientError> {
        let mut builder = self.request(method, path).await;
        if let Some(body) = body {
            builder = builder.json(&body);
        }
        unwrap_envelope(builder.send().await?).await
    }
}

fn json_body<T: Serialize>(value: &T) -> Result<Value, ClientError> {
    serde_json::to_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Sends only the fields the caller set; an inner `None` goes out as `null`.
fn update_body(update: &ProductUpdate) -> Value {
    let mut body = serde_json::Map::new();
    let mut put = |key: &str, value: Option<Value>| {
        if let Some(v) = value {
            body.insert(key.to_string(), v);
        }
    };
    put("name", update.name.as_ref().map(|v| json!(v)));
    put("brand", update.brand.as_ref().map(|v| json!(v)));
    put("category", update.category.as_ref().map(|v| json!(v)));
    put("location", update.location.as_ref().map(|v| json!(v)));
    put("serial_number", update.serial_number.as_ref().map(|v| json!(v)));
    put("condition", update.condition.as_ref().map(|v| json!(v)));
    put("description", update.description.as_ref().map(|v| json!(v)));
    put("purchase_date", update.purchase_date.as_ref().map(|v| json!(v)));
    put("cost", update.cost.as_ref().map(|v| json!(v)));
    Value::Object(body)
}

fn session_token(headers: &header::HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    let body: Value = response.json().await?;
    let data = body
        .get("data")
        .cloned()
        .ok_or_else(|| ClientError::Decode("response has no data field".to_string()))?;
    serde_json::from_value(data).map_err(|e| ClientError::Decode(e.to_string()))
}

async fn api_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let error = &body["error"];
    ClientError::Api {
        status: status.as_u16(),
        code: error["code"].as_str().unwrap_or("UNKNOWN").to_string(),
        message: error["message"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string()),
        field_errors: serde_json::from_value(error["field_errors"].clone()).ok(),
    }
}

/// True when the failure means the session is gone and the user must sign
/// in again.
pub fn is_unauthorized(err: &ClientError) -> bool {
    err.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn reads_token_from_set_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("theme=dark; Path=/"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("token=abc.def; HttpOnly; Path=/"));
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def"));

        let mut cleared = HeaderMap::new();
        cleared.append(header::SET_COOKIE, HeaderValue::from_static("token=; Max-Age=0"));
        assert_eq!(session_token(&cleared), None);
    }

    #[test]
    fn update_body_keeps_explicit_nulls_only() {
        let update = ProductUpdate {
            name: Some("Dock".into()),
            serial_number: Some(None),
            ..Default::default()
        };
        let body = update_body(&update);
        assert_eq!(body, json!({ "name": "Dock", "serial_number": null }));
    }

    #[test]
    fn expired_list_responses_are_evicted() {
        let empty = || Page::new(Vec::<ProductView>::new(), 0, 1, 20);
        let mut cache = ListCache::new();
        remember(&mut cache, Duration::from_secs(60), "page=1".into(), empty());
        remember(&mut cache, Duration::from_secs(60), "page=2".into(), empty());
        assert_eq!(cache.len(), 2);

        std::thread::sleep(Duration::from_millis(30));
        remember(&mut cache, Duration::from_millis(20), "page=3".into(), empty());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key("page=3"));
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(matches!(InventoryClient::new("not a url"), Err(ClientError::Config(_))));
        let client = InventoryClient::new("http://localhost:3001/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:3001");
    }
}
