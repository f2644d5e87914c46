//! Deterministic keyword rules.
//!
//! Rules are evaluated top-to-bottom and the first match wins:
//! 1. inquiries       → medium / auto-reply
//! 2. complaints      → urgent / needs-review
//! 3. urgent          → urgent / needs-review
//! 4. financial       → medium / auto-reply
//! 5. marketing       → low / ignore (no reply)
//! 6. positive-feedback → low / auto-reply
//!
//! Anything else lands on the `general` rule. Matching is a case-insensitive
//! substring test per field, with Arabic and English keywords side by side.

use async_trait::async_trait;
use tracing::debug;

use crate::error::ClassifyError;
use crate::triage::classifier::Classifier;
use crate::triage::types::{Action, Locale, Message, Priority, TriageResult};

/// Placeholder replaced by the message subject in templates.
const SUBJECT_PLACEHOLDER: &str = "{subject}";

/// Which message field a keyword list is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Subject,
    Body,
}

/// Keywords that trigger a rule when any of them occurs in `field`.
#[derive(Debug, Clone)]
pub struct KeywordMatch {
    pub field: RuleField,
    pub keywords: Vec<&'static str>,
}

impl KeywordMatch {
    fn new(field: RuleField, keywords: &[&'static str]) -> Self {
        Self {
            field,
            keywords: keywords.to_vec(),
        }
    }
}

/// Hand-authored reply in both supported languages.
#[derive(Debug, Clone, Copy)]
pub struct ReplyTemplate {
    pub arabic: &'static str,
    pub english: &'static str,
}

impl ReplyTemplate {
    /// Render for `locale`, substituting the subject where the template asks for it.
    pub fn render(&self, locale: Locale, subject: &str) -> String {
        let text = match locale {
            Locale::Arabic => self.arabic,
            Locale::English => self.english,
        };
        text.replace(SUBJECT_PLACEHOLDER, subject)
    }
}

/// A single ordered triage rule.
#[derive(Debug, Clone)]
pub struct TriageRule {
    pub category: &'static str,
    pub priority: Priority,
    pub action: Action,
    /// Any of these matching triggers the rule. Empty means "always" (default rule).
    pub matches: Vec<KeywordMatch>,
    /// Absent for rules whose action is `ignore`.
    pub reply: Option<ReplyTemplate>,
}

impl TriageRule {
    fn is_match(&self, subject: &str, body: &str) -> bool {
        self.matches.iter().any(|m| {
            let haystack = match m.field {
                RuleField::Subject => subject,
                RuleField::Body => body,
            };
            m.keywords.iter().any(|kw| haystack.contains(kw))
        })
    }

    fn apply(&self, message: &Message, locale: Locale) -> TriageResult {
        let response = self
            .reply
            .map(|template| template.render(locale, &message.subject));
        TriageResult::new(
            message.clone(),
            self.category,
            self.priority,
            self.action,
            response,
        )
    }
}

const INQUIRY_REPLY: ReplyTemplate = ReplyTemplate {
    arabic: "شكراً لتواصلك معنا بخصوص: {subject}.\n\nتم استلام استفسارك وسيتم الرد عليك في أقرب وقت ممكن. فريقنا يعمل على مراجعة طلبك والإجابة على جميع أسئلتك.\n\nمع تحياتنا،\nفريق الدعم",
    english: "Thank you for contacting us about: {subject}.\n\nWe have received your inquiry and will get back to you as soon as possible. Our team is reviewing your request and will answer all of your questions.\n\nBest regards,\nSupport Team",
};

const COMPLAINT_REPLY: ReplyTemplate = ReplyTemplate {
    arabic: "عزيزي العميل،\n\nنعتذر عن أي إزعاج قد تسبب. تم تصنيف رسالتك كأولوية عاجلة وسيقوم فريق الدعم الفني بالتواصل معك خلال 24 ساعة لحل المشكلة.\n\nنقدر صبرك وتفهمك.\n\nمع تحياتنا،\nفريق الدعم",
    english: "Dear customer,\n\nWe apologize for any inconvenience. Your message has been marked as urgent and our technical support team will contact you within 24 hours to resolve the problem.\n\nWe appreciate your patience and understanding.\n\nBest regards,\nSupport Team",
};

const URGENT_REPLY: ReplyTemplate = ReplyTemplate {
    arabic: "تم استلام رسالتك العاجلة. سيتم التواصل معك في أقرب وقت ممكن من قبل أحد أعضاء فريقنا.\n\nشكراً لك.",
    english: "We have received your urgent message. A member of our team will contact you as soon as possible.\n\nThank you.",
};

const FINANCIAL_REPLY: ReplyTemplate = ReplyTemplate {
    arabic: "شكراً لتواصلك معنا بخصوص الأمور المالية.\n\nتم استلام طلبك وسيقوم قسم المحاسبة بمراجعته والرد عليك خلال 48 ساعة.\n\nمع تحياتنا،\nقسم المحاسبة",
    english: "Thank you for contacting us about a financial matter.\n\nWe have received your request and the accounting department will review it and reply within 48 hours.\n\nBest regards,\nAccounting Department",
};

const POSITIVE_REPLY: ReplyTemplate = ReplyTemplate {
    arabic: "شكراً جزيلاً على كلماتك الطيبة!\n\nيسعدنا أن نكون قد لبينا توقعاتك. نحن دائماً في خدمتك.\n\nمع أطيب التحيات،\nفريق العمل",
    english: "Thank you so much for your kind words!\n\nWe are glad we met your expectations. We are always at your service.\n\nWarm regards,\nThe Team",
};

/// Reply for the `general` rule; also used to fill model replies that omit one.
pub const GENERAL_REPLY: ReplyTemplate = ReplyTemplate {
    arabic: "شكراً لتواصلك معنا.\n\nتم استلام رسالتك وسيتم مراجعتها من قبل الفريق المختص.\n\nمع تحياتنا،\nفريق الدعم",
    english: "Thank you for contacting us.\n\nWe have received your message and it will be reviewed by the relevant team.\n\nBest regards,\nSupport Team",
};

/// Deterministic keyword classifier. Pure and total.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    rules: Vec<TriageRule>,
    fallback: TriageRule,
    locale: Locale,
}

impl RuleClassifier {
    /// Create a classifier with the built-in ordered rule set.
    pub fn default_rules(locale: Locale) -> Self {
        use RuleField::{Body, Subject};

        let rules = vec![
            TriageRule {
                category: "inquiries",
                priority: Priority::Medium,
                action: Action::AutoReply,
                matches: vec![
                    KeywordMatch::new(Body, &["طلب", "استفسار", "request", "inquiry"]),
                    KeywordMatch::new(Subject, &["سؤال", "question"]),
                ],
                reply: Some(INQUIRY_REPLY),
            },
            TriageRule {
                category: "complaints",
                priority: Priority::Urgent,
                action: Action::NeedsReview,
                matches: vec![KeywordMatch::new(
                    Body,
                    &["شكوى", "مشكلة", "خطأ", "complaint", "problem", "error"],
                )],
                reply: Some(COMPLAINT_REPLY),
            },
            TriageRule {
                category: "urgent",
                priority: Priority::Urgent,
                action: Action::NeedsReview,
                matches: vec![KeywordMatch::new(
                    Body,
                    &["عاجل", "urgent", "ضروري", "necessary"],
                )],
                reply: Some(URGENT_REPLY),
            },
            TriageRule {
                category: "financial",
                priority: Priority::Medium,
                action: Action::AutoReply,
                matches: vec![KeywordMatch::new(
                    Body,
                    &["فاتورة", "دفع", "مالي", "invoice", "payment", "financial"],
                )],
                reply: Some(FINANCIAL_REPLY),
            },
            TriageRule {
                category: "marketing",
                priority: Priority::Low,
                action: Action::Ignore,
                matches: vec![KeywordMatch::new(
                    Body,
                    &["تسويق", "إعلان", "عرض", "marketing", "advertisement", "offer"],
                )],
                reply: None,
            },
            TriageRule {
                category: "positive-feedback",
                priority: Priority::Low,
                action: Action::AutoReply,
                matches: vec![KeywordMatch::new(
                    Body,
                    &["شكر", "تقدير", "thanks", "appreciation"],
                )],
                reply: Some(POSITIVE_REPLY),
            },
        ];

        let fallback = TriageRule {
            category: "general",
            priority: Priority::Low,
            action: Action::AutoReply,
            matches: Vec::new(),
            reply: Some(GENERAL_REPLY),
        };

        Self {
            rules,
            fallback,
            locale,
        }
    }

    /// Classify a message. Never fails.
    pub fn classify_message(&self, message: &Message) -> TriageResult {
        let subject = message.subject.to_lowercase();
        let body = message.body.to_lowercase();

        let rule = self
            .rules
            .iter()
            .find(|rule| rule.is_match(&subject, &body))
            .unwrap_or(&self.fallback);

        debug!(
            id = %message.id,
            category = rule.category,
            action = rule.action.label(),
            "Rule classifier matched"
        );

        rule.apply(message, self.locale)
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    fn name(&self) -> &str {
        "rules"
    }

    async fn classify(&self, message: &Message) -> Result<TriageResult, ClassifyError> {
        Ok(self.classify_message(message))
    }
}
