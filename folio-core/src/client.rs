//! Browser client for the built page.
//!
//! The written page is static HTML. `folio.js` wires the menu toggle,
//! smooth scrolling, the scroll-spy and the contact form in the browser,
//! using the same class names, offsets, messages and toast styles as the
//! [`PageController`](crate::page::PageController).

use std::sync::LazyLock;

use scraper::Selector;
use serde::Serialize;
use tera::{Context, Tera};

use crate::behavior::{ACTIVE, HAMBURGER, NAV_LINK, NAV_MENU, SCROLL_SPY_OFFSET};
use crate::dom::Document;
use crate::form::{CONTACT_FORM, EMAIL_REGEX, FIELDS, Validation};
use crate::notify::{NOTIFICATION_CLASS, TOAST_LIFETIME};
use crate::template::TemplateError;

/// File name of the client in the output directory.
pub const CLIENT_SCRIPT: &str = "folio.js";

const CLIENT_TEMPLATE: &str = include_str!("templates/folio.js");

static CLIENT_TAG: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[src="folio.js"]"#).expect("valid selector"));

#[derive(Debug, Serialize)]
struct Notice {
    message: &'static str,
    style: String,
}

impl From<Validation> for Notice {
    fn from(validation: Validation) -> Self {
        Self {
            message: validation.message(),
            style: validation.kind().style(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Notices {
    valid: Notice,
    missing_fields: Notice,
    invalid_email: Notice,
}

#[derive(Debug, Serialize)]
struct ClientSettings {
    active: &'static str,
    hamburger: &'static str,
    nav_menu: &'static str,
    nav_link: &'static str,
    scroll_spy_offset: f64,
    contact_form: &'static str,
    fields: [&'static str; 3],
    email_pattern: &'static str,
    notification_class: &'static str,
    toast_lifetime_ms: u64,
    notices: Notices,
}

impl ClientSettings {
    fn new() -> Self {
        Self {
            active: ACTIVE,
            hamburger: HAMBURGER,
            nav_menu: NAV_MENU,
            nav_link: NAV_LINK,
            scroll_spy_offset: SCROLL_SPY_OFFSET,
            contact_form: CONTACT_FORM,
            fields: FIELDS,
            email_pattern: EMAIL_REGEX,
            notification_class: NOTIFICATION_CLASS,
            toast_lifetime_ms: TOAST_LIFETIME.as_millis() as u64,
            notices: Notices {
                valid: Validation::Valid.into(),
                missing_fields: Validation::MissingFields.into(),
                invalid_email: Validation::InvalidEmail.into(),
            },
        }
    }
}

/// Render `folio.js`.
pub fn client_script() -> Result<String, TemplateError> {
    let mut context = Context::new();
    context.insert("settings", &ClientSettings::new());
    Ok(Tera::one_off(CLIENT_TEMPLATE, &context, false)?)
}

/// Load the client at the end of the body, unless the page already does.
/// Returns whether a tag was added.
pub fn attach(doc: &mut Document) -> bool {
    if doc.select_first(&CLIENT_TAG).is_some() {
        return false;
    }
    let Some(body) = doc.body() else {
        return false;
    };
    doc.append_html(body, &format!(r#"<script src="{CLIENT_SCRIPT}"></script>"#));
    true
}
