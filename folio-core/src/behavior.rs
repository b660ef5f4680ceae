//! Navigation behaviour: the mobile menu toggle, in-page smooth scrolling and
//! the scroll-spy that highlights the nav link of the visible section.

use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::Selector;

use crate::dom::{Document, NodeId};

pub const ACTIVE: &str = "active";
pub const HAMBURGER: &str = "hamburger";
pub const NAV_MENU: &str = "nav-menu";
pub const NAV_LINK: &str = "nav-link";

/// A section counts as reached once the viewport is within this many pixels
/// of its top.
pub const SCROLL_SPY_OFFSET: f64 = 200.0;

static HAMBURGER_CONTROL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".hamburger").expect("valid selector"));
static MENU: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".nav-menu").expect("valid selector"));
static NAV_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".nav-link").expect("valid selector"));
static IN_PAGE_LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r##"a[href^="#"]"##).expect("valid selector"));
static SECTIONS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section[id]").expect("valid selector"));

/// Geometry supplied by whatever hosts the page.
pub trait Layout {
    /// Distance in pixels from the top of the page to the element.
    fn offset_top(&self, doc: &Document, node: NodeId) -> Option<f64>;
}

/// Section offsets keyed by element id, for hosts that measure ahead of time.
#[derive(Debug, Clone, Default)]
pub struct SectionOffsets(HashMap<String, f64>);

impl SectionOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, top: f64) -> Self {
        self.0.insert(id.to_string(), top);
        self
    }
}

impl Layout for SectionOffsets {
    fn offset_top(&self, doc: &Document, node: NodeId) -> Option<f64> {
        doc.attr(node, "id").and_then(|id| self.0.get(id)).copied()
    }
}

// Mobile menu

/// The hamburger control and the menu it opens, when the page has both.
pub fn menu_controls(doc: &Document) -> Option<(NodeId, NodeId)> {
    Some((
        doc.select_first(&HAMBURGER_CONTROL)?,
        doc.select_first(&MENU)?,
    ))
}

/// Flip the `active` class on the hamburger and on the menu, each on its
/// own. Returns the hamburger's new state, or `None` when the page has no
/// menu.
pub fn toggle_menu(doc: &mut Document) -> Option<bool> {
    let (hamburger, menu) = menu_controls(doc)?;
    let open = doc.toggle_class(hamburger, ACTIVE);
    doc.toggle_class(menu, ACTIVE);
    Some(open)
}

pub fn close_menu(doc: &mut Document) {
    if let Some((hamburger, menu)) = menu_controls(doc) {
        doc.remove_class(hamburger, ACTIVE);
        doc.remove_class(menu, ACTIVE);
    }
}

// Smooth scroll

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBlock {
    Start,
}

/// Request for the host to scroll an element into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    pub target: NodeId,
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

/// Every in-page anchor currently on the page.
pub fn in_page_links(doc: &Document) -> Vec<NodeId> {
    doc.select(&IN_PAGE_LINKS)
}

/// Resolve where an in-page anchor points. `None` when the anchor has no
/// usable fragment or nothing on the page carries that id.
pub fn scroll_target(doc: &Document, anchor: NodeId) -> Option<ScrollRequest> {
    let fragment = doc.attr(anchor, "href")?.strip_prefix('#')?;
    if fragment.is_empty() || fragment.chars().any(char::is_whitespace) {
        return None;
    }
    let target = doc.get_element_by_id(fragment)?;
    Some(ScrollRequest {
        target,
        behavior: ScrollBehavior::Smooth,
        block: ScrollBlock::Start,
    })
}

// Scroll-spy

/// Id of the section the viewport is in. Every section whose top (less the
/// offset) has been scrolled past qualifies and the last one in document
/// order wins. Empty when none qualifies.
pub fn current_section(doc: &Document, layout: &impl Layout, scroll_y: f64) -> String {
    let mut current = String::new();
    for section in doc.select(&SECTIONS) {
        let Some(id) = doc.attr(section, "id") else {
            continue;
        };
        let Some(top) = layout.offset_top(doc, section) else {
            continue;
        };
        if scroll_y >= top - SCROLL_SPY_OFFSET {
            current = id.to_string();
        }
    }
    current
}

/// Mark the nav link for the current section active and clear the rest.
/// Returns the current section id.
pub fn update_active(doc: &mut Document, layout: &impl Layout, scroll_y: f64) -> String {
    let current = current_section(doc, layout, scroll_y);
    let wanted = format!("#{current}");
    for link in doc.select(&NAV_LINKS) {
        let on = doc.attr(link, "href") == Some(wanted.as_str());
        doc.set_class(link, ACTIVE, on);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html><body>
        <nav>
          <ul class="nav-menu">
            <li><a href="#home" class="nav-link">Home</a></li>
            <li><a href="#projects" class="nav-link">Projects</a></li>
            <li><a href="#contact" class="nav-link">Contact</a></li>
          </ul>
          <div class="hamburger"></div>
        </nav>
        <section id="home"></section>
        <section id="projects"></section>
        <section id="contact"></section>
        <section class="untitled"></section>
        <a id="to-nowhere" href="#missing">gone</a>
        <a id="bare" href="#">top</a>
        <a id="external" href="https://example.com">out</a>
    </body></html>"##;

    fn offsets() -> SectionOffsets {
        SectionOffsets::new()
            .with("home", 0.0)
            .with("projects", 800.0)
            .with("contact", 1600.0)
    }

    fn active_links(doc: &Document) -> Vec<String> {
        doc.elements_by_class(NAV_LINK)
            .into_iter()
            .filter(|&link| doc.has_class(link, ACTIVE))
            .map(|link| doc.attr(link, "href").unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_hamburger_toggles_both() {
        let mut doc = Document::parse(PAGE);
        let (hamburger, menu) = menu_controls(&doc).unwrap();

        assert_eq!(toggle_menu(&mut doc), Some(true));
        assert!(doc.has_class(hamburger, ACTIVE));
        assert!(doc.has_class(menu, ACTIVE));

        assert_eq!(toggle_menu(&mut doc), Some(false));
        assert!(!doc.has_class(hamburger, ACTIVE));
        assert!(!doc.has_class(menu, ACTIVE));
    }

    #[test]
    fn test_hamburger_and_menu_toggle_independently() {
        let mut doc = Document::parse(
            r#"<html><body><ul class="nav-menu active"></ul><div class="hamburger"></div></body></html>"#,
        );
        let (hamburger, menu) = menu_controls(&doc).unwrap();

        assert_eq!(toggle_menu(&mut doc), Some(true));
        assert!(doc.has_class(hamburger, ACTIVE));
        assert!(!doc.has_class(menu, ACTIVE));

        assert_eq!(toggle_menu(&mut doc), Some(false));
        assert!(!doc.has_class(hamburger, ACTIVE));
        assert!(doc.has_class(menu, ACTIVE));
    }

    #[test]
    fn test_close_menu() {
        let mut doc = Document::parse(PAGE);
        toggle_menu(&mut doc);
        close_menu(&mut doc);
        let (hamburger, menu) = menu_controls(&doc).unwrap();
        assert!(!doc.has_class(hamburger, ACTIVE));
        assert!(!doc.has_class(menu, ACTIVE));
    }

    #[test]
    fn test_menu_absent_is_noop() {
        let mut doc = Document::parse(r#"<html><body><div class="hamburger"></div></body></html>"#);
        let before = doc.to_html();
        assert_eq!(toggle_menu(&mut doc), None);
        close_menu(&mut doc);
        assert_eq!(doc.to_html(), before);
    }

    #[test]
    fn test_scroll_target_resolution() {
        let doc = Document::parse(PAGE);
        let links = in_page_links(&doc);
        assert_eq!(links.len(), 5);

        let request = scroll_target(&doc, links[1]).unwrap();
        assert_eq!(request.target, doc.get_element_by_id("projects").unwrap());
        assert_eq!(request.behavior, ScrollBehavior::Smooth);
        assert_eq!(request.block, ScrollBlock::Start);

        let nowhere = doc.get_element_by_id("to-nowhere").unwrap();
        assert!(scroll_target(&doc, nowhere).is_none());
        let bare = doc.get_element_by_id("bare").unwrap();
        assert!(scroll_target(&doc, bare).is_none());
        let external = doc.get_element_by_id("external").unwrap();
        assert!(scroll_target(&doc, external).is_none());
    }

    #[test]
    fn test_scroll_spy_thresholds() {
        let doc = Document::parse(PAGE);
        let layout = offsets();

        assert_eq!(current_section(&doc, &layout, 0.0), "home");
        assert_eq!(current_section(&doc, &layout, 599.0), "home");
        assert_eq!(current_section(&doc, &layout, 600.0), "projects");
        assert_eq!(current_section(&doc, &layout, 5000.0), "contact");
    }

    #[test]
    fn test_scroll_spy_last_match_wins() {
        let doc = Document::parse(PAGE);
        // Overlapping thresholds near the bottom of a short page
        let layout = SectionOffsets::new()
            .with("home", 0.0)
            .with("projects", 100.0)
            .with("contact", 150.0);
        assert_eq!(current_section(&doc, &layout, 0.0), "contact");
    }

    #[test]
    fn test_update_active_marks_single_link() {
        let mut doc = Document::parse(PAGE);
        let layout = offsets();

        assert_eq!(update_active(&mut doc, &layout, 900.0), "projects");
        assert_eq!(active_links(&doc), vec!["#projects"]);

        update_active(&mut doc, &layout, 1500.0);
        assert_eq!(active_links(&doc), vec!["#contact"]);
    }

    #[test]
    fn test_update_active_without_match_clears() {
        let mut doc = Document::parse(PAGE);
        let layout = SectionOffsets::new().with("home", 1000.0);

        update_active(&mut doc, &offsets(), 900.0);
        assert_eq!(update_active(&mut doc, &layout, 0.0), "");
        assert!(active_links(&doc).is_empty());
    }
}
