//! # Common Test Utilities
//!
//! `TestApp` spawns the real server on a random port with the extraction
//! provider pointed at an `httpmock::MockServer` and uploads staged in a
//! temporary directory.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use claimintake_server::{
    config::{self, AppConfig},
    router,
    state::{build_app_state, AppState},
};
use claimintake_test_utils::helpers::generate_test_pdf;
use httpmock::MockServer;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde_json::{json, Value};
use std::{fs::File, io::Write, net::SocketAddr, path::PathBuf};
use tempfile::{tempdir, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const CHAT_PATH: &str = "/v1/chat/completions";

pub const JANE_ROE_LINES: &[&str] = &[
    "Petitioner: Jane Roe",
    "Advocate: R. Singh",
    "State: Maharashtra",
    "District: Pune",
    "Court: Pune District Court",
    "Claim Amount: Rs. 50,000",
];

/// The object the mock provider echoes back for the Jane Roe claim.
pub fn jane_roe() -> Value {
    json!({
        "Petitioner name": "Jane Roe",
        "Petitioner Advocate": "R. Singh",
        "State": "Maharashtra",
        "District": "Pune",
        "Court Complex": "Pune District Court",
        "Claim Amount": "50000"
    })
}

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    pub upload_dir: PathBuf,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application server with the test configuration.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    /// Spawns the server after letting the caller adjust the loaded config.
    pub async fn spawn_with(customize: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let mock_server = MockServer::start_async().await;
        let config_dir = tempdir()?;
        let upload_dir = config_dir.path().join("uploads");
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
upload_dir: "{}"
ocr:
  engine: "text_layer"
  tesseract_bin: "/nonexistent/bin/tesseract"
  pdftoppm_bin: "/nonexistent/bin/pdftoppm"
provider:
  api_url: "{}"
  model_name: "mock-chat-model"
  retry:
    max_attempts: 3
    base_delay_ms: 1
    max_delay_ms: 5
    jitter: false
"#,
            upload_dir.display(),
            mock_server.url(CHAT_PATH)
        );
        let mut file = File::create(&config_path)?;
        file.write_all(config_content.as_bytes())?;

        let mut config = config::get_config(Some(config_path.to_str().unwrap()))?;
        customize(&mut config);
        let app_state = build_app_state(config)?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let app_state_for_harness = app_state.clone();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state: app_state_for_harness,
            upload_dir,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Posts a multipart form to `path`.
    pub async fn post_form(&self, path: &str, form: Form) -> Result<reqwest::Response> {
        Ok(self.client.post(self.url(path)).multipart(form).send().await?)
    }

    /// Files left behind in the upload directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
            .unwrap_or_default()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// A form carrying a generated claim PDF and a credential.
pub fn claim_form(lines: &[&str], api_key: Option<&str>) -> Result<Form> {
    let pdf = generate_test_pdf(lines)?;
    let part = Part::bytes(pdf)
        .file_name("claim.pdf")
        .mime_str("application/pdf")?;
    let mut form = Form::new().part("pdf", part);
    if let Some(key) = api_key {
        form = form.text("api_key", key.to_string());
    }
    Ok(form)
}

/// A chat-completions envelope whose message content is `content`.
pub fn chat_body(content: &Value) -> Value {
    claimintake_test_utils::chat_completion(&content.to_string())
}
