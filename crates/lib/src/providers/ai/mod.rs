pub mod chat_completions;
pub mod retry;

use crate::{
    errors::IntakeError,
    types::{ExtractionPrompt, ProviderContract, ProviderResponse},
};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

pub use chat_completions::ExtractionClient;
pub use retry::RetryPolicy;

/// A trait for the hosted language model that extracts claim fields.
///
/// Implementations own transport concerns (auth, retries); the caller only
/// hands over the prompt and the credential for this request.
#[async_trait]
pub trait AiProvider: Send + Sync + Debug + DynClone {
    /// The response envelope this provider returns.
    fn contract(&self) -> ProviderContract;

    /// Sends the prompt and returns the provider's raw response.
    async fn complete(
        &self,
        prompt: &ExtractionPrompt,
        credential: &str,
    ) -> Result<ProviderResponse, IntakeError>;
}

dyn_clone::clone_trait_object!(AiProvider);
