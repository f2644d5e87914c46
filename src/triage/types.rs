//! Shared types for the triage engine.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// ── Inbound message ─────────────────────────────────────────────────

/// An inbound message submitted for triage.
///
/// Created by the caller and never mutated; one batch owns its messages
/// until the results are returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Opaque caller-assigned identifier.
    pub id: String,
    /// Sender address.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// When the message was created. The sender's offset is kept as given.
    pub timestamp: DateTime<FixedOffset>,
}

// ── Priority ────────────────────────────────────────────────────────

/// Priority tier of a triaged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    Medium,
    #[default]
    Low,
}

impl Priority {
    /// Wire label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Lenient parse of a priority label coming from a model reply.
    ///
    /// Accepts the English and Arabic labels plus a few synonyms.
    pub fn parse_label(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "urgent" | "high" | "critical" | "عاجل" => Some(Self::Urgent),
            "medium" | "normal" | "moderate" | "متوسط" => Some(Self::Medium),
            "low" | "منخفض" => Some(Self::Low),
            _ => None,
        }
    }
}

// ── Action ──────────────────────────────────────────────────────────

/// Handling action for a triaged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    #[default]
    AutoReply,
    NeedsReview,
    Ignore,
}

impl Action {
    /// Wire label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AutoReply => "auto-reply",
            Self::NeedsReview => "needs-review",
            Self::Ignore => "ignore",
        }
    }

    /// Whether a drafted reply accompanies this action.
    pub fn drafts_reply(&self) -> bool {
        !matches!(self, Self::Ignore)
    }

    /// Lenient parse of an action label coming from a model reply.
    pub fn parse_label(raw: &str) -> Option<Self> {
        match normalize_label(raw).as_str() {
            "auto-reply" | "autoreply" | "reply" | "رد تلقائي" => Some(Self::AutoReply),
            "needs-review" | "review" | "escalate" | "بحاجة لمراجعة" => Some(Self::NeedsReview),
            "ignore" | "skip" | "تجاهل" => Some(Self::Ignore),
            _ => None,
        }
    }
}

/// Lowercase, trim, and fold `_`/space separators of ASCII labels into `-`.
fn normalize_label(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.is_ascii() {
        trimmed
            .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    } else {
        trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

// ── Locale ──────────────────────────────────────────────────────────

/// Language used for drafted replies and model prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Arabic,
    English,
}

impl Locale {
    /// Parse `ar` / `en` (case-insensitive; full names accepted).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "ar" | "arabic" => Some(Self::Arabic),
            "en" | "english" => Some(Self::English),
            _ => None,
        }
    }
}

// ── Triage result ───────────────────────────────────────────────────

/// Classification of one message.
///
/// Serializes flat: the message fields followed by the triage fields.
/// `response` is present exactly when `action` is not `ignore`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageResult {
    #[serde(flatten)]
    pub message: Message,
    pub category: String,
    pub priority: Priority,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl TriageResult {
    /// Assemble a result, dropping the response for `ignore`.
    pub fn new(
        message: Message,
        category: impl Into<String>,
        priority: Priority,
        action: Action,
        response: Option<String>,
    ) -> Self {
        Self {
            message,
            category: category.into(),
            priority,
            action,
            response: if action.drafts_reply() { response } else { None },
        }
    }
}
