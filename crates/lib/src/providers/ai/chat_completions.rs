use crate::{
    constants::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL},
    errors::IntakeError,
    providers::ai::{retry::RetryPolicy, AiProvider},
    types::{ExtractionPrompt, ProviderContract, ProviderResponse},
};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Serialize;
use std::{fmt::Debug, time::Duration};
use tracing::{debug, error, info, warn};

// --- Request bodies for the two provider contracts ---

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ExtractionRequest<'a> {
    Chat {
        model: &'a str,
        messages: Vec<ChatMessage<'a>>,
        max_tokens: u32,
        n: u32,
    },
    Structured {
        model: &'a str,
        prompt: &'a str,
        max_tokens: u32,
        fields: &'a [String],
    },
}

// --- Extraction client implementation ---

/// A client for the hosted chat-completion service that extracts claim fields.
///
/// The credential is supplied per call. Server errors are retried according to
/// the [`RetryPolicy`]; client errors and transport failures are returned at
/// once.
#[derive(Clone, Debug)]
pub struct ExtractionClient {
    client: ReqwestClient,
    api_url: String,
    model: String,
    max_tokens: u32,
    contract: ProviderContract,
    retry: RetryPolicy,
}

impl ExtractionClient {
    /// Creates a new `ExtractionClient`.
    ///
    /// `request_timeout` bounds each individual HTTP attempt.
    pub fn new(
        api_url: String,
        model: Option<String>,
        contract: ProviderContract,
        request_timeout: Option<Duration>,
    ) -> Result<Self, IntakeError> {
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(IntakeError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_url,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: DEFAULT_MAX_TOKENS,
            contract,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, prompt: &'a ExtractionPrompt) -> ExtractionRequest<'a> {
        match self.contract {
            ProviderContract::ChatCompletions => ExtractionRequest::Chat {
                model: &self.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: &prompt.text,
                }],
                max_tokens: self.max_tokens,
                n: 1,
            },
            ProviderContract::Structured => ExtractionRequest::Structured {
                model: &self.model,
                prompt: &prompt.text,
                max_tokens: self.max_tokens,
                fields: &prompt.fields,
            },
        }
    }
}

fn rejection(status: StatusCode, body: String, attempts: u32) -> IntakeError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => IntakeError::Authentication {
            status: status.as_u16(),
            body,
            attempts,
        },
        _ => IntakeError::Rejected {
            status: status.as_u16(),
            body,
            attempts,
        },
    }
}

#[async_trait]
impl AiProvider for ExtractionClient {
    fn contract(&self) -> ProviderContract {
        self.contract
    }

    /// Posts the prompt and returns the body of the first successful attempt.
    async fn complete(
        &self,
        prompt: &ExtractionPrompt,
        credential: &str,
    ) -> Result<ProviderResponse, IntakeError> {
        let request_body = self.request_body(prompt);
        let max_attempts = self.retry.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(attempt, url = %self.api_url, model = %self.model, "--> Sending extraction request");

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(credential)
                .json(&request_body)
                .send()
                .await
                .map_err(|source| IntakeError::Transport {
                    source,
                    attempts: attempt,
                })?;

            let status = response.status();
            if status.is_success() {
                let headers = response
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (
                            name.as_str().to_string(),
                            String::from_utf8_lossy(value.as_bytes()).into_owned(),
                        )
                    })
                    .collect();
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|source| IntakeError::Transport {
                        source,
                        attempts: attempt,
                    })?;
                let body = serde_json::from_slice(&bytes).map_err(|e| {
                    IntakeError::Normalization(format!(
                        "extraction provider returned a non-JSON body: {e}"
                    ))
                })?;
                info!(attempt, status = status.as_u16(), "<-- Extraction provider answered");
                return Ok(ProviderResponse {
                    status: status.as_u16(),
                    headers,
                    body,
                    attempts: attempt,
                });
            }

            let error_text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!(attempt, status = status.as_u16(), "Failed to read error body: {e}");
                    String::new()
                }
            };

            if status.is_client_error() {
                warn!(attempt, status = status.as_u16(), "Extraction provider rejected the request.");
                return Err(rejection(status, error_text, attempt));
            }

            if !status.is_server_error() || attempt >= max_attempts {
                error!(
                    attempts = attempt,
                    status = status.as_u16(),
                    "Extraction provider kept failing, giving up."
                );
                return Err(IntakeError::ExtractionService {
                    status: status.as_u16(),
                    body: error_text,
                    attempts: attempt,
                });
            }

            let delay = self.retry.delay_for(attempt);
            warn!(
                attempt,
                status = status.as_u16(),
                delay_ms = delay.as_millis() as u64,
                "Extraction provider returned a server error, retrying."
            );
            tokio::time::sleep(delay).await;
        }
    }
}
