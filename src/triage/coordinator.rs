//! Triage coordinator: picks the strategy once per batch, runs it on every
//! message, and falls back to the rule classifier per message when the
//! model classifier fails.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::TriageConfig;
use crate::error::{ClassifyError, LlmError, TriageError};
use crate::llm::{LlmProvider, create_provider};
use crate::triage::classifier::Classifier;
use crate::triage::model::ModelClassifier;
use crate::triage::rules::RuleClassifier;
use crate::triage::types::{Message, TriageResult};

/// Which strategy handles a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Model,
    Rules,
}

impl Strategy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Rules => "rules",
        }
    }
}

/// Coordinates classification of message batches.
pub struct TriageCoordinator {
    /// Primary strategy; `None` means rules only.
    model: Option<Arc<dyn Classifier>>,
    rules: Arc<RuleClassifier>,
    max_concurrency: usize,
}

impl TriageCoordinator {
    /// Create a coordinator. Pass `None` for `model` to always use the rules.
    pub fn new(
        model: Option<Arc<dyn Classifier>>,
        rules: RuleClassifier,
        max_concurrency: usize,
    ) -> Self {
        Self {
            model,
            rules: Arc::new(rules),
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Build from configuration: the model strategy is enabled only when a
    /// usable credential is configured.
    pub fn from_config(config: &TriageConfig) -> Result<Self, LlmError> {
        let llm = create_provider(config)?;
        Ok(Self::with_provider(config, llm))
    }

    /// Build from configuration with an explicit provider.
    pub fn with_provider(config: &TriageConfig, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        let model = llm.map(|llm| {
            Arc::new(ModelClassifier::new(llm, config.locale)) as Arc<dyn Classifier>
        });
        Self::new(
            model,
            RuleClassifier::default_rules(config.locale),
            config.max_concurrency,
        )
    }

    /// Strategy used for the next batch.
    pub fn strategy(&self) -> Strategy {
        if self.model.is_some() {
            Strategy::Model
        } else {
            Strategy::Rules
        }
    }

    /// Validate a raw `{ emails: [...] }` payload and process it.
    ///
    /// Every record is validated before any classification starts.
    pub async fn process_payload(
        &self,
        payload: serde_json::Value,
    ) -> Result<Vec<TriageResult>, TriageError> {
        let messages = parse_batch(payload)?;
        self.process(messages).await
    }

    /// Process a batch. Output order and length match the input.
    pub async fn process(&self, messages: Vec<Message>) -> Result<Vec<TriageResult>, TriageError> {
        let strategy = self.strategy();
        let span = info_span!(
            "triage_batch",
            batch_id = %Uuid::new_v4(),
            strategy = strategy.label()
        );

        async move {
            let count = messages.len();
            info!(count, "Processing message batch");

            let results = match &self.model {
                Some(model) => self.process_with_fallback(Arc::clone(model), messages).await?,
                None => messages
                    .iter()
                    .map(|message| self.rules.classify_message(message))
                    .collect(),
            };

            info!(processed = results.len(), total = count, "Batch processing complete");
            Ok(results)
        }
        .instrument(span)
        .await
    }

    /// Run the model on every message concurrently, falling back per message.
    async fn process_with_fallback(
        &self,
        model: Arc<dyn Classifier>,
        messages: Vec<Message>,
    ) -> Result<Vec<TriageResult>, TriageError> {
        let permits = Arc::new(Semaphore::new(self.max_concurrency));

        let handles: Vec<_> = messages
            .into_iter()
            .map(|message| {
                let model = Arc::clone(&model);
                let rules = Arc::clone(&self.rules);
                let permits = Arc::clone(&permits);

                tokio::spawn(
                    async move {
                        // The semaphore is never closed.
                        let _permit = permits.acquire_owned().await.ok();
                        classify_with_fallback(model.as_ref(), &rules, &message).await
                    }
                    .in_current_span(),
                )
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.map_err(|e| {
                    error!(error = %e, "Classification task failed, aborting batch");
                    TriageError::Internal(e.to_string())
                })
            })
            .collect()
    }
}

/// Classify with `primary`, substituting the rule result on failure.
pub async fn classify_with_fallback(
    primary: &dyn Classifier,
    rules: &RuleClassifier,
    message: &Message,
) -> TriageResult {
    match primary.classify(message).await {
        Ok(result) => result,
        Err(e) => {
            let kind = match e {
                ClassifyError::Upstream(_) => "upstream",
                ClassifyError::MalformedReply(_) => "malformed_reply",
            };
            warn!(
                id = %message.id,
                strategy = primary.name(),
                kind,
                error = %e,
                "Classifier failed, falling back to rules"
            );
            rules.classify_message(message)
        }
    }
}

/// Validate the batch envelope and deserialize every message.
fn parse_batch(payload: serde_json::Value) -> Result<Vec<Message>, TriageError> {
    let serde_json::Value::Object(mut fields) = payload else {
        return Err(TriageError::InvalidInput("payload must be an object".into()));
    };

    let Some(serde_json::Value::Array(records)) = fields.remove("emails") else {
        return Err(TriageError::InvalidInput("emails must be an array".into()));
    };

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            serde_json::from_value(record).map_err(|e| {
                TriageError::InvalidInput(format!("emails[{index}] is not a valid message: {e}"))
            })
        })
        .collect()
}
