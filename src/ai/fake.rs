//! Scripted generator for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{AiError, GenerationRequest, TextGenerator};

#[derive(Clone)]
pub struct FakeGenerator {
    response: Option<String>,
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self {
            response: Some("Fake response".to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    /// Every call fails with a 500.
    pub fn failing(mut self) -> Self {
        self.response = None;
        self
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.response {
            Some(text) => Ok(text.clone()),
            None => Err(AiError::Status {
                status: 500,
                body: "fake failure".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
