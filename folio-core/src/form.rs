use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;
use scraper::Selector;

use crate::dom::{Document, NodeId};
use crate::notify::{Notifier, ToastKind};

pub const CONTACT_FORM: &str = "contactForm";

pub const FIELDS: [&str; 3] = ["name", "email", "message"];

/// Shape an address must have to be accepted.
pub const EMAIL_REGEX: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_REGEX).expect("email pattern is valid"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Trimmed field values read from the contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub name: String,
    pub email: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    MissingFields,
    InvalidEmail,
}

impl Validation {
    pub fn message(&self) -> &'static str {
        match self {
            Validation::Valid => "Thanks — I'll get back to you soon.",
            Validation::MissingFields => "Please fill in all fields.",
            Validation::InvalidEmail => "Please enter a valid email address.",
        }
    }

    pub fn kind(&self) -> ToastKind {
        match self {
            Validation::Valid => ToastKind::Success,
            _ => ToastKind::Error,
        }
    }
}

impl Submission {
    pub fn validate(&self) -> Validation {
        if self.name.is_empty() || self.email.is_empty() || self.message.is_empty() {
            Validation::MissingFields
        } else if !is_valid_email(&self.email) {
            Validation::InvalidEmail
        } else {
            Validation::Valid
        }
    }
}

fn field(doc: &Document, form: NodeId, name: &str) -> Option<NodeId> {
    let css = format!(r#"input[name="{name}"], textarea[name="{name}"], select[name="{name}"]"#);
    let selector = Selector::parse(&css).ok()?;
    doc.select_within(form, &selector)
}

/// Read the form's fields. A field missing from the markup reads as empty.
pub fn read_form(doc: &Document, form: NodeId) -> Submission {
    let value = |name: &str| {
        field(doc, form, name)
            .map(|id| doc.value(id).trim().to_string())
            .unwrap_or_default()
    };
    Submission {
        name: value("name"),
        email: value("email"),
        message: value("message"),
    }
}

/// Put every field back to its default value.
pub fn reset_form(doc: &mut Document, form: NodeId) {
    for name in FIELDS {
        if let Some(id) = field(doc, form, name) {
            doc.reset_value(id);
        }
    }
}

/// Handle a submit of the contact form: validate, toast the outcome, and
/// reset the fields on success. Nothing is sent anywhere.
pub fn submit(
    doc: &mut Document,
    form: NodeId,
    notifier: &mut Notifier,
    now: Instant,
) -> Validation {
    let outcome = read_form(doc, form).validate();
    notifier.notify(doc, outcome.message(), outcome.kind(), now);
    if outcome == Validation::Valid {
        reset_form(doc, form);
    }
    outcome
}
