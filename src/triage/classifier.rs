//! The strategy seam shared by both classifiers.

use async_trait::async_trait;

use crate::error::ClassifyError;
use crate::triage::types::{Message, TriageResult};

/// A triage strategy: maps one message to one result.
///
/// The rule classifier never returns `Err`; the model classifier reports
/// upstream and parse failures so the coordinator can fall back.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Strategy name for logging ("rules", "model", ...).
    fn name(&self) -> &str;

    /// Classify a single message.
    async fn classify(&self, message: &Message) -> Result<TriageResult, ClassifyError>;
}
