//! Message triage engine.
//!
//! Every message in a batch gets a category, a priority, a handling action
//! and (unless ignored) a drafted reply:
//! 1. `TriageCoordinator` picks the strategy once per batch from configuration
//! 2. `ModelClassifier` asks the LLM when a usable credential is configured
//! 3. `RuleClassifier` handles everything else, and any message the model fails on
//!
//! Results come back in input order, one per message.

pub mod classifier;
pub mod coordinator;
pub mod model;
pub mod rules;
pub mod types;

pub use classifier::Classifier;
pub use coordinator::{Strategy, TriageCoordinator};
pub use model::ModelClassifier;
pub use rules::RuleClassifier;
pub use types::{Action, Locale, Message, Priority, TriageResult};
