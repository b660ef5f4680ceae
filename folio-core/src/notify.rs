use std::sync::LazyLock;
use std::time::{Duration, Instant};

use scraper::Selector;

use crate::dom::{Document, NodeId};

/// How long a toast stays on the page.
pub const TOAST_LIFETIME: Duration = Duration::from_secs(4);

pub const NOTIFICATION_CLASS: &str = "notification";

static NOTIFICATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".notification").expect("valid selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastKind {
    Success,
    Error,
    #[default]
    Info,
}

impl ToastKind {
    pub fn background(&self) -> &'static str {
        match self {
            ToastKind::Success => "#10b981",
            ToastKind::Error => "#ef4444",
            ToastKind::Info => "#3b82f6",
        }
    }

    /// Inline style of a toast of this kind.
    pub fn style(&self) -> String {
        format!(
            "position:fixed;top:20px;right:20px;background:{};color:white;padding:1rem 1.25rem;\
             border-radius:8px;z-index:10000;box-shadow:0 6px 18px rgba(0,0,0,.2);",
            self.background()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dismissal {
    node: NodeId,
    at: Instant,
}

/// Shows transient toasts and removes them once their time is up.
///
/// Only one toast is on the page at a time. Each toast carries its own
/// dismissal deadline; a superseded toast's deadline never touches the toast
/// that replaced it.
#[derive(Debug, Default)]
pub struct Notifier {
    pending: Vec<Dismissal>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `message`, replacing any toast already on the page. Returns the
    /// new toast, or `None` when the page has no body to attach it to.
    pub fn notify(
        &mut self,
        doc: &mut Document,
        message: &str,
        kind: ToastKind,
        now: Instant,
    ) -> Option<NodeId> {
        if let Some(previous) = doc.select_first(&NOTIFICATION) {
            doc.remove(previous);
        }
        let body = doc.body()?;

        let toast = doc.create_element("div");
        doc.set_attr(toast, "class", NOTIFICATION_CLASS);
        doc.set_attr(toast, "style", &kind.style());
        doc.set_text(toast, message);
        doc.append_child(body, toast);

        self.pending.push(Dismissal {
            node: toast,
            at: now + TOAST_LIFETIME,
        });
        tracing::debug!(?kind, "Showing notification: {message}");
        Some(toast)
    }

    /// Remove every toast whose deadline has passed. Returns how many
    /// deadlines fired.
    pub fn expire(&mut self, doc: &mut Document, now: Instant) -> usize {
        let before = self.pending.len();
        self.pending.retain(|dismissal| {
            if dismissal.at <= now {
                doc.remove(dismissal.node);
                false
            } else {
                true
            }
        });
        before - self.pending.len()
    }

    /// Earliest pending deadline, for hosts that schedule a wake-up.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|dismissal| dismissal.at).min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Document {
        Document::parse("<html><body><main></main></body></html>")
    }

    #[test]
    fn test_second_toast_replaces_first() {
        let mut doc = page();
        let mut notifier = Notifier::new();
        let now = Instant::now();

        let first = notifier.notify(&mut doc, "one", ToastKind::Info, now).unwrap();
        let second = notifier.notify(&mut doc, "two", ToastKind::Error, now).unwrap();

        let shown = doc.elements_by_class(NOTIFICATION_CLASS);
        assert_eq!(shown, vec![second]);
        assert!(!doc.is_attached(first));
        assert_eq!(doc.text_content(second), "two");
        assert!(doc.attr(second, "style").unwrap().contains("#ef4444"));
    }

    #[test]
    fn test_toast_expires_after_lifetime() {
        let mut doc = page();
        let mut notifier = Notifier::new();
        let now = Instant::now();

        let toast = notifier.notify(&mut doc, "saved", ToastKind::Success, now).unwrap();
        assert_eq!(notifier.expire(&mut doc, now + Duration::from_secs(3)), 0);
        assert!(doc.is_attached(toast));

        assert_eq!(notifier.expire(&mut doc, now + TOAST_LIFETIME), 1);
        assert!(doc.elements_by_class(NOTIFICATION_CLASS).is_empty());
        assert!(notifier.next_deadline().is_none());
    }

    #[test]
    fn test_superseded_deadline_leaves_new_toast() {
        let mut doc = page();
        let mut notifier = Notifier::new();
        let start = Instant::now();

        notifier.notify(&mut doc, "one", ToastKind::Info, start);
        let later = start + Duration::from_secs(3);
        let second = notifier.notify(&mut doc, "two", ToastKind::Info, later).unwrap();

        assert_eq!(notifier.expire(&mut doc, start + TOAST_LIFETIME), 1);
        assert!(doc.is_attached(second));
        assert_eq!(notifier.next_deadline(), Some(later + TOAST_LIFETIME));
    }

    #[test]
    fn test_default_kind_is_info() {
        assert_eq!(ToastKind::default(), ToastKind::Info);
        assert_eq!(ToastKind::default().background(), "#3b82f6");
    }

    #[test]
    fn test_no_body_no_toast() {
        let mut doc = Document::new();
        let mut notifier = Notifier::new();
        assert!(notifier.notify(&mut doc, "x", ToastKind::Info, Instant::now()).is_none());
    }
}
