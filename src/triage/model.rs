//! Model-backed classifier.
//!
//! Builds a prompt from the message, asks the LLM for a JSON object with
//! `category`, `priority`, `action` and `response`, and normalizes the reply:
//! missing fields take defaults (`general`, `low`, `auto-reply`), unknown
//! priority/action labels are clamped to the same defaults, and the
//! response is dropped for `ignore` or filled with the general template
//! when a replying action came back without one.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ClassifyError;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};
use crate::triage::classifier::Classifier;
use crate::triage::rules::GENERAL_REPLY;
use crate::triage::types::{Action, Locale, Message, Priority, TriageResult};

/// Max tokens for the classification call.
const TRIAGE_MAX_TOKENS: u32 = 500;

/// Sampling temperature for the classification call.
const TRIAGE_TEMPERATURE: f32 = 0.7;

/// Category used when the model omits one.
const DEFAULT_CATEGORY: &str = "general";

/// Classifier that delegates to an external text-generation service.
pub struct ModelClassifier {
    llm: Arc<dyn LlmProvider>,
    locale: Locale,
}

impl ModelClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, locale: Locale) -> Self {
        Self { llm, locale }
    }
}

#[async_trait]
impl Classifier for ModelClassifier {
    fn name(&self) -> &str {
        "model"
    }

    async fn classify(&self, message: &Message) -> Result<TriageResult, ClassifyError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_system_prompt(self.locale)),
            ChatMessage::user(build_user_prompt(message, self.locale)),
        ])
        .with_temperature(TRIAGE_TEMPERATURE)
        .with_max_tokens(TRIAGE_MAX_TOKENS);

        let response = self.llm.complete(request).await?;

        let truncated = response.finish_reason == FinishReason::Length;
        if truncated {
            warn!(
                id = %message.id,
                output_tokens = response.output_tokens,
                "Model reply hit the token limit"
            );
        }

        let reply = parse_model_reply(&response.content)
            .map_err(|e| match e {
                ClassifyError::MalformedReply(reason) if truncated => ClassifyError::MalformedReply(
                    format!("{reason} (reply truncated at {TRIAGE_MAX_TOKENS} tokens)"),
                ),
                other => other,
            })
            .inspect_err(|e| {
                warn!(
                    id = %message.id,
                    raw_response = %response.content,
                    error = %e,
                    "Model reply could not be parsed"
                );
            })?;

        debug!(
            id = %message.id,
            model = self.llm.model_name(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            category = %reply.category,
            priority = reply.priority.label(),
            action = reply.action.label(),
            "Model classifier result"
        );

        Ok(reply.into_result(message.clone(), self.locale))
    }
}

// ── Prompt construction ─────────────────────────────────────────────

/// Fixed system instruction describing the assistant's role.
fn build_system_prompt(locale: Locale) -> String {
    match locale {
        Locale::Arabic => {
            "أنت مساعد ذكي لمعالجة الإيميلات باللغة العربية. قدم ردوداً احترافية ومناسبة.".to_string()
        }
        Locale::English => {
            "You are an assistant that triages inbound email. Write professional, appropriate replies."
                .to_string()
        }
    }
}

/// Instruction prompt embedding sender, subject and body.
fn build_user_prompt(message: &Message, locale: Locale) -> String {
    match locale {
        Locale::Arabic => format!(
            "أنت نظام ذكي لمعالجة الإيميلات. قم بتحليل الإيميل التالي وقدم:\n\
             1. التصنيف (استفسارات، شكاوى، أمور مالية، تسويق، عام، إلخ)\n\
             2. الأولوية (urgent، medium، low)\n\
             3. الإجراء المقترح (auto-reply، needs-review، ignore)\n\
             4. رد مقترح (إذا كان الإجراء auto-reply أو needs-review)\n\n\
             الإيميل:\n\
             من: {}\n\
             الموضوع: {}\n\
             المحتوى: {}\n\n\
             الرجاء الرد بصيغة JSON التالية فقط:\n\
             {{\n  \"category\": \"التصنيف\",\n  \"priority\": \"الأولوية\",\n  \"action\": \"الإجراء\",\n  \"response\": \"الرد المقترح\"\n}}",
            message.from, message.subject, message.body
        ),
        Locale::English => format!(
            "You are an email triage system. Analyze the email below and provide:\n\
             1. A category (inquiries, complaints, financial, marketing, general, ...)\n\
             2. A priority (urgent, medium, low)\n\
             3. A suggested action (auto-reply, needs-review, ignore)\n\
             4. A suggested reply (when the action is auto-reply or needs-review)\n\n\
             Email:\n\
             From: {}\n\
             Subject: {}\n\
             Body: {}\n\n\
             Respond with ONLY this JSON object:\n\
             {{\n  \"category\": \"...\",\n  \"priority\": \"...\",\n  \"action\": \"...\",\n  \"response\": \"...\"\n}}",
            message.from, message.subject, message.body
        ),
    }
}

// ── Reply parsing ───────────────────────────────────────────────────

/// Normalized model reply, before it is attached to its message.
#[derive(Debug, Clone, PartialEq)]
struct ModelReply {
    category: String,
    priority: Priority,
    action: Action,
    response: Option<String>,
}

impl ModelReply {
    fn into_result(self, message: Message, locale: Locale) -> TriageResult {
        let response = match (self.action.drafts_reply(), self.response) {
            (false, _) => None,
            (true, Some(text)) => Some(text),
            (true, None) => Some(GENERAL_REPLY.render(locale, &message.subject)),
        };
        TriageResult::new(message, self.category, self.priority, self.action, response)
    }
}

/// Parse raw completion text into a normalized reply.
///
/// Empty text counts as `{}`. Anything that is not a JSON object is malformed.
fn parse_model_reply(raw: &str) -> Result<ModelReply, ClassifyError> {
    let json_str = match extract_json_object(raw) {
        "" => "{}",
        extracted => extracted,
    };

    let fields: Map<String, Value> = match serde_json::from_str(json_str) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(ClassifyError::MalformedReply(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            )));
        }
        Err(e) => return Err(ClassifyError::MalformedReply(format!("JSON parse error: {e}"))),
    };

    let category = string_field(&fields, "category")
        .map(str::trim)
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string();

    let priority = string_field(&fields, "priority")
        .map(|raw| {
            Priority::parse_label(raw).unwrap_or_else(|| {
                debug!(priority = raw, "Unknown priority from model, using default");
                Priority::default()
            })
        })
        .unwrap_or_default();

    let action = string_field(&fields, "action")
        .map(|raw| {
            Action::parse_label(raw).unwrap_or_else(|| {
                debug!(action = raw, "Unknown action from model, using default");
                Action::default()
            })
        })
        .unwrap_or_default();

    let response = string_field(&fields, "response").map(String::from);

    Ok(ModelReply {
        category,
        priority,
        action,
        response,
    })
}

/// String value of `key`, untouched; blank strings and other JSON types count as absent.
fn string_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Slice out the JSON object from a completion.
///
/// Looks inside the first markdown fence if there is one, then keeps the
/// text from the first `{` to the last `}` so leading and trailing prose
/// is dropped. Text without braces is returned trimmed.
fn extract_json_object(text: &str) -> &str {
    let trimmed = text.trim();
    let candidate = fenced_block(trimmed).unwrap_or(trimmed);

    match (candidate.find('{'), candidate.rfind('}')) {
        (Some(start), Some(end)) if end > start => &candidate[start..=end],
        _ => candidate,
    }
}

/// Contents of the first ```` ``` ```` fence, minus an optional `json` tag.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let rest = &text[open + 3..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let close = rest.find("```")?;
    Some(rest[..close].trim())
}
