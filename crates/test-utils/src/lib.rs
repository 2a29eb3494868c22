use claimintake::{
    errors::IntakeError,
    ingest::TextExtractor,
    providers::ai::AiProvider,
    types::{ExtractedText, ExtractionMethod, ExtractionPrompt, ProviderContract, ProviderResponse},
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// --- Mock AI Provider ---

/// A provider that answers from a queue of pre-programmed bodies.
#[derive(Clone, Debug)]
pub struct MockAiProvider {
    contract: ProviderContract,
    responses: Arc<Mutex<VecDeque<Value>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockAiProvider {
    pub fn new(contract: ProviderContract) -> Self {
        Self {
            contract,
            responses: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues the body returned by the next call.
    pub fn add_response(&self, body: Value) {
        self.responses.lock().unwrap().push_back(body);
    }

    /// Retrieves the recorded `(prompt, credential)` pairs for assertion.
    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new(ProviderContract::ChatCompletions)
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    fn contract(&self) -> ProviderContract {
        self.contract
    }

    async fn complete(
        &self,
        prompt: &ExtractionPrompt,
        credential: &str,
    ) -> Result<ProviderResponse, IntakeError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.text.clone(), credential.to_string()));

        match self.responses.lock().unwrap().pop_front() {
            Some(body) => Ok(ProviderResponse {
                status: 200,
                headers: vec![("content-type".to_string(), "application/json".to_string())],
                body,
                attempts: 1,
            }),
            None => Err(IntakeError::ExtractionService {
                status: 500,
                body: "MockAiProvider: no response programmed".to_string(),
                attempts: 1,
            }),
        }
    }
}

/// Wraps a completion in the chat-completions envelope.
pub fn chat_completion(content: &str) -> Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

// --- Mock Text Extractor ---

/// An extractor that returns fixed text, or fails, and records the paths it
/// was asked to read.
#[derive(Clone, Debug)]
pub struct MockTextExtractor {
    outcome: Result<String, String>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockTextExtractor {
    pub fn returning(text: &str) -> Self {
        Self {
            outcome: Ok(text.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn get_calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextExtractor for MockTextExtractor {
    async fn extract(
        &self,
        path: &Path,
        _content_type: &str,
        _language: &str,
    ) -> Result<ExtractedText, IntakeError> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        match &self.outcome {
            Ok(text) => Ok(ExtractedText {
                text: text.clone(),
                page_count: 1,
                method: ExtractionMethod::TextLayer,
            }),
            Err(message) => Err(IntakeError::Ocr(message.clone())),
        }
    }
}

// --- Test-Specific Helpers ---
#[cfg(feature = "pdf")]
pub mod helpers {
    use anyhow::Result;
    use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};

    /// Generates a single-page PDF with one line of text per entry in `lines`.
    pub fn generate_test_pdf(lines: &[&str]) -> Result<Vec<u8>> {
        let mut pdf = Pdf::new();

        let catalog_id = Ref::new(1);
        let page_tree_id = Ref::new(2);
        let page_id = Ref::new(3);
        let font_id = Ref::new(4);
        let content_id = Ref::new(5);
        let font_name = Name(b"F1");

        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id).kids([page_id]).count(1);

        let mut page = pdf.page(page_id);
        page.media_box(Rect::new(0.0, 0.0, 595.0, 842.0));
        page.parent(page_tree_id);
        page.contents(content_id);
        page.resources().fonts().pair(font_name, font_id);
        page.finish();

        pdf.type1_font(font_id).base_font(Name(b"Helvetica"));

        let mut content = Content::new();
        content.begin_text();
        content.set_font(font_name, 12.0);
        content.set_leading(16.0);
        content.next_line(72.0, 770.0);
        for line in lines {
            content.show(Str(line.as_bytes()));
            content.next_line_using_leading();
        }
        content.end_text();
        pdf.stream(content_id, &content.finish());

        Ok(pdf.finish())
    }

    /// A PDF whose only page carries no text operations, like a bare scan.
    pub fn generate_blank_pdf() -> Result<Vec<u8>> {
        generate_test_pdf(&[])
    }
}
