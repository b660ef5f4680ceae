//! Event wiring for a live page.
//!
//! [`PageController::init`] does what a browser page does on ready: it finds
//! the elements that get listeners, stamps the year and runs the scroll-spy
//! once. The host then forwards its events through
//! [`PageController::dispatch`].

use std::time::Instant;

use crate::behavior::{self, Layout, ScrollRequest};
use crate::dom::{Document, NodeId};
use crate::form::{self, CONTACT_FORM, Validation};
use crate::loader::{self, ContentSource};
use crate::notify::Notifier;
use crate::renderer::Renderer;
use crate::site::Site;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageEvent {
    Click(NodeId),
    Submit(NodeId),
    Scroll(f64),
    /// Timer wake-up; expires due notifications.
    Tick,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outcome {
    pub default_prevented: bool,
    pub scroll: Option<ScrollRequest>,
    pub menu_open: Option<bool>,
    pub validation: Option<Validation>,
    pub active_section: Option<String>,
}

/// Elements that had listeners attached at init. Elements added later (for
/// example by the content load) do not gain listeners.
#[derive(Debug, Default)]
struct Listeners {
    hamburger: Option<NodeId>,
    nav_links: Vec<NodeId>,
    anchors: Vec<NodeId>,
    form: Option<NodeId>,
}

pub struct PageController<L: Layout> {
    layout: L,
    listeners: Listeners,
    notifier: Notifier,
}

impl<L: Layout> PageController<L> {
    pub fn init(doc: &mut Document, layout: L, year: i32) -> Self {
        let mut listeners = Listeners::default();
        if let Some((hamburger, _)) = behavior::menu_controls(doc) {
            listeners.hamburger = Some(hamburger);
            listeners.nav_links = doc.elements_by_class(behavior::NAV_LINK);
        }
        listeners.anchors = behavior::in_page_links(doc);
        listeners.form = doc.get_element_by_id(CONTACT_FORM);

        loader::set_year(doc, year);
        behavior::update_active(doc, &layout, 0.0);

        Self {
            layout,
            listeners,
            notifier: Notifier::new(),
        }
    }

    /// Init, then load content. The behaviours are live before the load and
    /// stay live when it fails.
    pub async fn start<S: ContentSource>(
        doc: &mut Document,
        layout: L,
        source: &S,
        renderer: &Renderer,
        year: i32,
    ) -> (Self, Option<Site>) {
        let controller = Self::init(doc, layout, year);
        let site = loader::load_into(doc, source, renderer, year).await;
        (controller, site)
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn dispatch(&mut self, doc: &mut Document, event: PageEvent, now: Instant) -> Outcome {
        let mut outcome = Outcome::default();
        match event {
            PageEvent::Click(target) => {
                if self.listeners.hamburger == Some(target) {
                    outcome.menu_open = behavior::toggle_menu(doc);
                }
                if self.listeners.nav_links.contains(&target) {
                    behavior::close_menu(doc);
                    outcome.menu_open = Some(false);
                }
                if self.listeners.anchors.contains(&target) {
                    outcome.default_prevented = true;
                    outcome.scroll = behavior::scroll_target(doc, target);
                }
            }
            PageEvent::Submit(target) => {
                if self.listeners.form == Some(target) {
                    outcome.default_prevented = true;
                    outcome.validation =
                        Some(form::submit(doc, target, &mut self.notifier, now));
                }
            }
            PageEvent::Scroll(scroll_y) => {
                outcome.active_section =
                    Some(behavior::update_active(doc, &self.layout, scroll_y));
            }
            PageEvent::Tick => {}
        }
        self.notifier.expire(doc, now);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use scraper::Selector;

    use super::*;
    use crate::behavior::{ACTIVE, SectionOffsets};
    use crate::loader::StaticSource;
    use crate::notify::{NOTIFICATION_CLASS, TOAST_LIFETIME};
    use crate::template::DEFAULT_PAGE;

    fn layout() -> SectionOffsets {
        SectionOffsets::new()
            .with("home", 0.0)
            .with("projects", 700.0)
            .with("skills", 1400.0)
            .with("contact", 2100.0)
    }

    fn link(doc: &Document, href: &str) -> NodeId {
        let selector = Selector::parse(&format!(r#".nav-link[href="{href}"]"#)).unwrap();
        doc.select_first(&selector).unwrap()
    }

    #[test]
    fn test_init_marks_first_section_and_year() {
        let mut doc = Document::parse(DEFAULT_PAGE);
        PageController::init(&mut doc, layout(), 2030);

        assert!(doc.has_class(link(&doc, "#home"), ACTIVE));
        let year = doc.get_element_by_id("year").unwrap();
        assert_eq!(doc.text_content(year), "2030");
    }

    #[test]
    fn test_nav_clicks() {
        let mut doc = Document::parse(DEFAULT_PAGE);
        let mut page = PageController::init(&mut doc, layout(), 2030);
        let now = Instant::now();
        let hamburger = doc.elements_by_class("hamburger")[0];

        let outcome = page.dispatch(&mut doc, PageEvent::Click(hamburger), now);
        assert_eq!(outcome.menu_open, Some(true));
        assert!(!outcome.default_prevented);

        let projects = link(&doc, "#projects");
        let outcome = page.dispatch(&mut doc, PageEvent::Click(projects), now);
        assert_eq!(outcome.menu_open, Some(false));
        assert!(outcome.default_prevented);
        assert_eq!(
            outcome.scroll.map(|s| s.target),
            doc.get_element_by_id("projects")
        );
        assert!(!doc.has_class(hamburger, ACTIVE));
    }

    #[test]
    fn test_scroll_updates_active_link() {
        let mut doc = Document::parse(DEFAULT_PAGE);
        let mut page = PageController::init(&mut doc, layout(), 2030);

        let outcome = page.dispatch(&mut doc, PageEvent::Scroll(1300.0), Instant::now());
        assert_eq!(outcome.active_section.as_deref(), Some("skills"));
        assert!(doc.has_class(link(&doc, "#skills"), ACTIVE));
        assert!(!doc.has_class(link(&doc, "#home"), ACTIVE));
    }

    #[test]
    fn test_submit_then_toast_expires() {
        let mut doc = Document::parse(DEFAULT_PAGE);
        let mut page = PageController::init(&mut doc, layout(), 2030);
        let form = doc.get_element_by_id("contactForm").unwrap();
        let start = Instant::now();

        let outcome = page.dispatch(&mut doc, PageEvent::Submit(form), start);
        assert!(outcome.default_prevented);
        assert_eq!(outcome.validation, Some(Validation::MissingFields));
        assert_eq!(doc.elements_by_class(NOTIFICATION_CLASS).len(), 1);

        page.dispatch(&mut doc, PageEvent::Tick, start + Duration::from_secs(1));
        assert_eq!(doc.elements_by_class(NOTIFICATION_CLASS).len(), 1);

        page.dispatch(&mut doc, PageEvent::Tick, start + TOAST_LIFETIME);
        assert!(doc.elements_by_class(NOTIFICATION_CLASS).is_empty());
    }

    #[test]
    fn test_unlistened_targets_are_ignored() {
        let mut doc = Document::parse(DEFAULT_PAGE);
        let mut page = PageController::init(&mut doc, layout(), 2030);
        let hero = doc.get_element_by_id("hero-name").unwrap();

        let outcome = page.dispatch(&mut doc, PageEvent::Click(hero), Instant::now());
        assert_eq!(outcome, Outcome::default());
        let outcome = page.dispatch(&mut doc, PageEvent::Submit(hero), Instant::now());
        assert_eq!(outcome, Outcome::default());
    }

    #[tokio::test]
    async fn test_behaviours_survive_failed_load() {
        let mut doc = Document::parse(DEFAULT_PAGE);
        let renderer = Renderer::builtin().unwrap();
        let (mut page, site) = PageController::start(
            &mut doc,
            layout(),
            &StaticSource::new("[]"),
            &renderer,
            2030,
        )
        .await;
        assert!(site.is_none());

        let hero = doc.get_element_by_id("hero-name").unwrap();
        assert_eq!(doc.text_content(hero), "Your Name");

        let hamburger = doc.elements_by_class("hamburger")[0];
        let outcome = page.dispatch(&mut doc, PageEvent::Click(hamburger), Instant::now());
        assert_eq!(outcome.menu_open, Some(true));
    }
}
