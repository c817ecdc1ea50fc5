//! LLM client for transaction classification.
//!
//! Supports Ollama-compatible inference endpoints.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ClassifierError, ClassifierErrorKind, TransactionClassifier};
use crate::models::{BusinessContext, Classification, SourceTransaction};

/// Default prompt for classifying a transaction.
pub const DEFAULT_CLASSIFY_PROMPT: &str = r#"You are classifying a business financial transaction for Australian tax reporting. Use the business profile to judge whether the expense relates to earning assessable income.

Business: {business}
Industry: {industry}
ABN: {abn}

Transaction:
Date: {date}
Description: {description}
Amount: {amount}
Account: {account}
Contact: {contact}

Pick the single best tax category (examples: office-expenses, travel, motor-vehicle, professional-services, software-subscriptions, staff-costs, marketing, rent, utilities, bank-fees, income, personal, other).

Respond with ONLY a JSON object and no other text:
{"category": "<lowercase-hyphenated category>", "confidence": <number 0.0-1.0>, "deductible": <true or false>, "reasoning": "<one short sentence>"}"#;

/// Configuration for the LLM classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Inference API endpoint (default: http://localhost:11434)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model to use for classification
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Temperature for generation (0.0 - 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Concurrent in-flight calls per chunk
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Custom classification prompt (uses {description}, {amount}, {date},
    /// {account}, {contact}, {business}, {industry}, {abn} placeholders)
    #[serde(default)]
    pub classify_prompt: Option<String>,
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3.1:8b".to_string()
}
fn default_max_tokens() -> u32 {
    256
}
fn default_temperature() -> f32 {
    0.1
}
fn default_timeout_secs() -> u64 {
    300
}
fn default_concurrency() -> usize {
    super::DEFAULT_CLASSIFY_CONCURRENCY
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            classify_prompt: None,
        }
    }
}

impl ClassifierConfig {
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Get the classification prompt, using custom or default.
    pub fn get_classify_prompt(&self) -> &str {
        self.classify_prompt
            .as_deref()
            .unwrap_or(DEFAULT_CLASSIFY_PROMPT)
    }
}

/// LLM classifier for transaction processing.
pub struct LlmClassifier {
    config: ClassifierConfig,
    client: Client,
}

/// Generate API request format.
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

/// Generate API response format.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[allow(dead_code)]
    done: bool,
}

/// Shape the model is asked to answer with.
#[derive(Debug, Deserialize)]
struct RawClassification {
    category: String,
    confidence: f64,
    #[serde(default)]
    deductible: bool,
    #[serde(default)]
    reasoning: Option<String>,
}

impl LlmClassifier {
    /// Create a new LLM classifier with the given configuration.
    pub fn new(config: ClassifierConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Get the config.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Check if the inference service is available.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.endpoint);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Fill the prompt template for one transaction.
    fn build_prompt(&self, txn: &SourceTransaction, context: &BusinessContext) -> String {
        self.config
            .get_classify_prompt()
            .replace("{business}", context.business_name.as_deref().unwrap_or("(not provided)"))
            .replace("{industry}", context.industry.as_deref().unwrap_or("(not provided)"))
            .replace("{abn}", context.abn.as_deref().unwrap_or("(not provided)"))
            .replace("{date}", &txn.occurred_on.to_string())
            .replace("{description}", &txn.description)
            .replace("{amount}", &format!("{:.2}", txn.amount))
            .replace("{account}", txn.account.as_deref().unwrap_or("(unknown)"))
            .replace("{contact}", txn.contact.as_deref().unwrap_or("(unknown)"))
    }

    /// Call the generate API with a prompt.
    async fn call_generate(&self, prompt: &str) -> Result<String, ClassifierError> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_tokens,
            },
        };

        let url = format!("{}/api/generate", self.config.endpoint);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ClassifierError::new(
                    ClassifierErrorKind::Transient,
                    format!("request failed: {}", e),
                )
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let kind = match status.as_u16() {
                401 | 403 => ClassifierErrorKind::Credential,
                404 => ClassifierErrorKind::ModelUnavailable,
                429 => ClassifierErrorKind::Quota,
                _ => ClassifierErrorKind::Transient,
            };
            return Err(ClassifierError::new(
                kind,
                format!("HTTP {}: {}", status, truncate(&body, 200)),
            ));
        }

        let parsed: GenerateResponse = resp.json().await.map_err(|e| {
            ClassifierError::new(
                ClassifierErrorKind::InvalidResponse,
                format!("bad response body: {}", e),
            )
        })?;

        Ok(parsed.response)
    }

    /// Parse a classification out of the model's answer.
    ///
    /// Tolerates markdown fences and stray prose around the JSON object.
    fn parse_classification(raw: &str) -> Result<Classification, ClassifierError> {
        let cleaned = raw.trim();
        let start = cleaned.find('{');
        let end = cleaned.rfind('}');
        let json = match (start, end) {
            (Some(s), Some(e)) if s < e => &cleaned[s..=e],
            _ => {
                return Err(ClassifierError::new(
                    ClassifierErrorKind::InvalidResponse,
                    format!("no JSON object in answer: {}", truncate(cleaned, 120)),
                ))
            }
        };

        let parsed: RawClassification = serde_json::from_str(json).map_err(|e| {
            ClassifierError::new(
                ClassifierErrorKind::InvalidResponse,
                format!("unparseable classification: {}", e),
            )
        })?;

        let category = parsed.category.trim().to_lowercase();
        if category.is_empty() {
            return Err(ClassifierError::new(
                ClassifierErrorKind::InvalidResponse,
                "empty category in answer",
            ));
        }

        Ok(Classification {
            category,
            confidence: parsed.confidence.clamp(0.0, 1.0),
            deductible: parsed.deductible,
            reasoning: parsed.reasoning.filter(|r| !r.trim().is_empty()),
        })
    }
}

#[async_trait::async_trait]
impl TransactionClassifier for LlmClassifier {
    async fn classify(
        &self,
        txn: &SourceTransaction,
        context: &BusinessContext,
    ) -> Result<Classification, ClassifierError> {
        let prompt = self.build_prompt(txn, context);
        debug!("Classifying transaction: {}", txn.classification_key());
        let answer = self.call_generate(&prompt).await?;
        Self::parse_classification(&answer)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
