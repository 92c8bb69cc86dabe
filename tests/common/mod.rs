#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use gati_c::auth::Role;
use gati_c::database::models::NewUser;
use gati_c::database::{MemoryStore, Store};
use gati_c::{app, AppConfig, AppState};
use reqwest::{header, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};

pub const PASSWORD: &str = "correct horse battery";

pub fn email_for(role: Role) -> &'static str {
    match role {
        Role::Reader => "reader@gati.test",
        Role::Editor => "editor@gati.test",
        Role::Administrator => "admin@gati.test",
    }
}

/// In-process server on a free port, backed by a fresh in-memory store with
/// one user per role.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub http: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let store = Arc::new(MemoryStore::new());
        for role in [Role::Reader, Role::Editor, Role::Administrator] {
            let user = NewUser {
                name: format!("{} user", role),
                email: email_for(role).to_string(),
                role,
                password: PASSWORD.to_string(),
            }
            .into_user()?;
            store.insert_user(&user).await?;
        }

        let mut config = AppConfig::development();
        config.security.jwt_secret = "integration-test-secret".to_string();
        config.server.enable_request_logging = false;

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let router = app(AppState::new(config, store.clone()));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            port,
            base_url: format!("http://127.0.0.1:{}", port),
            store,
            http: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.http.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Signs in and returns the `Cookie` header value for the session.
    pub async fn login(&self, role: Role) -> Result<String> {
        let res = self
            .http
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email_for(role), "password": PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let set_cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .context("no Set-Cookie on login")?
            .to_str()?
            .to_string();
        let pair = set_cookie.split(';').next().unwrap_or_default().to_string();
        Ok(pair)
    }

    pub fn request(&self, method: Method, path: &str, cookie: &str) -> RequestBuilder {
        self.http.request(method, self.url(path)).header(header::COOKIE, cookie)
    }

    /// Creates a product as the editor and returns its JSON view.
    pub async fn create_product(&self, cookie: &str, body: Value) -> Result<Value> {
        let res = self.request(Method::POST, "/api/v1/inventory", cookie).json(&body).send().await?;
        let status = res.status();
        let payload: Value = res.json().await?;
        anyhow::ensure!(status == StatusCode::CREATED, "create failed ({}): {}", status, payload);
        Ok(payload["data"].clone())
    }
}

pub fn product(name: &str, serial: Option<&str>) -> Value {
    json!({
        "name": name,
        "brand": "Dell",
        "category": "Laptops",
        "location": "HQ",
        "serial_number": serial,
    })
}
