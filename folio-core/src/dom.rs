//! Mutable page document on top of a parsed [`scraper::Html`] tree.
//!
//! Nodes are addressed by ego-tree [`NodeId`]s. Removing a node only detaches
//! it, so ids handed out earlier stay valid. Queries start at the document
//! root, which means detached nodes drop out of every lookup.
//!
//! Operations given an id that is not an element are silent no-ops. Missing
//! anchors are expected, not exceptional.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::LazyLock;

use ego_tree::NodeRef;
use ego_tree::iter::Edge;
use html5ever::serialize::{Serialize, SerializeOpts, Serializer, TraversalScope, serialize};
use html5ever::tendril::StrTendril;
use html5ever::{LocalName, Namespace, QualName};
use scraper::node::{Comment, Doctype, Element, Text};
use scraper::{ElementRef, Html, Node, Selector};

pub use ego_tree::NodeId;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static HEAD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("head").expect("valid selector"));
static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

fn attr_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

/// Keep scraper's cached id and class set in line with the attributes.
fn refresh_caches(el: &mut Element) {
    el.id = el.attr("id").map(LocalName::from);
    el.classes = el
        .attr("class")
        .map(|classes| classes.split_whitespace().map(LocalName::from).collect())
        .unwrap_or_default();
}

/// A subtree handed to the html5ever serializer. Attributes are written in
/// name order since the parsed attribute map is unordered.
struct Subtree<'a>(NodeRef<'a, Node>);

impl Serialize for Subtree<'_> {
    fn serialize<S: Serializer>(
        &self,
        serializer: &mut S,
        traversal_scope: TraversalScope,
    ) -> io::Result<()> {
        let children_only = traversal_scope == TraversalScope::ChildrenOnly(None);
        for edge in self.0.traverse() {
            match edge {
                Edge::Open(node) => {
                    if children_only && node == self.0 {
                        continue;
                    }
                    match node.value() {
                        Node::Comment(comment) => serializer.write_comment(comment)?,
                        Node::Text(text) => serializer.write_text(text)?,
                        Node::Element(el) => {
                            let mut attrs: Vec<(&QualName, &str)> =
                                el.attrs.iter().map(|(name, value)| (name, &**value)).collect();
                            attrs.sort_by(|a, b| (*a.0.local).cmp(&*b.0.local));
                            serializer.start_elem(el.name.clone(), attrs.into_iter())?;
                        }
                        _ => {}
                    }
                }
                Edge::Close(node) => {
                    if children_only && node == self.0 {
                        continue;
                    }
                    if let Some(el) = node.value().as_element() {
                        serializer.end_elem(el.name.clone())?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn serialize_element<W: Write>(
    out: &mut W,
    element: NodeRef<'_, Node>,
    traversal_scope: TraversalScope,
) -> io::Result<()> {
    // Scripting on, so <noscript> content is written back as markup
    let opts = SerializeOpts {
        scripting_enabled: true,
        traversal_scope,
        create_missing_parent: false,
    };
    serialize(out, &Subtree(element), opts)
}

fn write_doctype<W: Write>(out: &mut W, doctype: &Doctype) -> io::Result<()> {
    write!(out, "<!DOCTYPE {}", doctype.name())?;
    match (doctype.public_id(), doctype.system_id()) {
        ("", "") => {}
        (public, "") => write!(out, " PUBLIC \"{public}\"")?,
        ("", system) => write!(out, " SYSTEM \"{system}\"")?,
        (public, system) => write!(out, " PUBLIC \"{public}\" \"{system}\"")?,
    }
    out.write_all(b">")
}

#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    /// Live values of form controls the user has changed.
    values: HashMap<NodeId, String>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document with no children.
    pub fn new() -> Self {
        Self {
            html: Html::new_document(),
            values: HashMap::new(),
        }
    }

    /// Parse a complete HTML page. Parsing never fails; malformed markup is
    /// repaired the way a browser would.
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            values: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.html.tree.root().id()
    }

    // Node access

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.html.tree.get(id).map(|node| node.value())
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).and_then(Node::as_element)
    }

    fn element_ref(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    fn update_element(&mut self, id: NodeId, update: impl FnOnce(&mut Element)) {
        if let Some(mut node) = self.html.tree.get_mut(id)
            && let Node::Element(el) = node.value()
        {
            update(el);
            refresh_caches(el);
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.html.tree.get(id)?.parent().map(|parent| parent.id())
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(id)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(id)
            .map(|node| {
                node.children()
                    .filter(|child| child.value().is_element())
                    .map(|child| child.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.html.tree.get(id)?.first_child().map(|child| child.id())
    }

    /// Whether the node is reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let root = self.root();
        self.html
            .tree
            .get(id)
            .is_some_and(|node| node.id() == root || node.ancestors().any(|a| a.id() == root))
    }

    // Queries

    /// Attached elements in document order.
    fn attached_elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.html.tree.root().descendants().filter_map(ElementRef::wrap)
    }

    /// Every attached element matching the selector, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.attached_elements()
            .filter(|el| selector.matches(el))
            .map(|el| el.id())
            .collect()
    }

    pub fn select_first(&self, selector: &Selector) -> Option<NodeId> {
        self.attached_elements()
            .find(|el| selector.matches(el))
            .map(|el| el.id())
    }

    /// First element below `ancestor` matching the selector.
    pub fn select_within(&self, ancestor: NodeId, selector: &Selector) -> Option<NodeId> {
        self.element_ref(ancestor)?
            .select(selector)
            .next()
            .map(|el| el.id())
    }

    /// Every element below `ancestor` matching the selector.
    pub fn select_all_within(&self, ancestor: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.element_ref(ancestor)
            .map(|el| el.select(selector).map(|found| found.id()).collect())
            .unwrap_or_default()
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.attached_elements()
            .find(|el| el.value().id() == Some(id))
            .map(|el| el.id())
    }

    pub fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.attached_elements()
            .filter(|el| el.value().classes().any(|c| c == class))
            .map(|el| el.id())
            .collect()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.select_first(&BODY)
    }

    pub fn head(&self) -> Option<NodeId> {
        self.select_first(&HEAD)
    }

    // Attributes and classes

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.update_element(id, |el| {
            el.attrs.insert(attr_name(name), StrTendril::from(value));
        });
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        self.update_element(id, |el| {
            el.attrs.remove(&attr_name(name));
        });
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|el| el.classes().any(|c| c == class))
    }

    /// Add or remove a single class, leaving the others in place.
    pub fn set_class(&mut self, id: NodeId, class: &str, on: bool) {
        let Some(current) = self.element(id).map(|el| el.attr("class").unwrap_or_default()) else {
            return;
        };
        let mut classes: Vec<&str> = current.split_whitespace().filter(|c| *c != class).collect();
        if on {
            classes.push(class);
        }
        let updated = classes.join(" ");
        self.set_attr(id, "class", &updated);
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            self.set_class(id, class, true);
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            self.set_class(id, class, false);
        }
    }

    /// Flip a class and return whether it is now present.
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> bool {
        let on = !self.has_class(id, class);
        self.set_class(id, class, on);
        on
    }

    // Text

    pub fn text_content(&self, id: NodeId) -> String {
        match self.node(id) {
            Some(Node::Text(text)) => text.to_string(),
            Some(Node::Comment(comment)) => comment.to_string(),
            Some(_) => self
                .html
                .tree
                .get(id)
                .map(|node| {
                    node.descendants()
                        .filter_map(|n| n.value().as_text().map(|text| &**text))
                        .collect()
                })
                .unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Replace the node's text. Elements lose all children in favour of a
    /// single text node; text nodes have their data replaced.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        match self.node(id) {
            Some(Node::Text(_)) => {
                if let Some(mut node) = self.html.tree.get_mut(id) {
                    *node.value() = Node::Text(Text { text: text.into() });
                }
            }
            Some(Node::Element(_)) => {
                self.clear_children(id);
                if !text.is_empty()
                    && let Some(mut node) = self.html.tree.get_mut(id)
                {
                    node.append(Node::Text(Text { text: text.into() }));
                }
            }
            _ => {}
        }
    }

    pub fn title(&self) -> String {
        self.select_first(&TITLE)
            .map(|id| self.text_content(id))
            .unwrap_or_default()
    }

    /// Set the page title, creating a `<title>` in the head when missing.
    pub fn set_title(&mut self, title: &str) {
        let existing = self.select_first(&TITLE);
        let id = match (existing, self.head()) {
            (Some(id), _) => id,
            (None, Some(head)) => {
                let id = self.create_element("title");
                self.append_child(head, id);
                id
            }
            (None, None) => return,
        };
        self.set_text(id, title);
    }

    // Form control values

    /// Current value of an input or textarea: the live value when one was
    /// set, otherwise the control's default.
    pub fn value(&self, id: NodeId) -> String {
        let Some(el) = self.element(id) else {
            return String::new();
        };
        if let Some(value) = self.values.get(&id) {
            return value.clone();
        }
        if el.name() == "textarea" {
            self.text_content(id)
        } else {
            el.attr("value").unwrap_or_default().to_string()
        }
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if self.element(id).is_some() {
            self.values.insert(id, value.to_string());
        }
    }

    pub fn reset_value(&mut self, id: NodeId) {
        self.values.remove(&id);
    }

    // Structure

    /// A new detached element in the HTML namespace.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let name = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(tag.to_ascii_lowercase()),
        );
        self.html
            .tree
            .orphan(Node::Element(Element::new(name, Vec::new())))
            .id()
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.html
            .tree
            .orphan(Node::Text(Text { text: text.into() }))
            .id()
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.html
            .tree
            .orphan(Node::Comment(Comment {
                comment: text.into(),
            }))
            .id()
    }

    /// Append `child` as the last child of `parent`, moving it if it is
    /// already in the tree.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let (Some(parent_node), Some(child_node)) =
            (self.html.tree.get(parent), self.html.tree.get(child))
        else {
            return;
        };
        if child == self.root() || !(parent_node.value().is_element() || parent == self.root()) {
            return;
        }
        // Refuse to create a cycle
        if parent == child || parent_node.ancestors().any(|a| a.id() == child) {
            return;
        }
        if child_node.parent().map(|p| p.id()) == Some(parent)
            && parent_node.last_child().map(|last| last.id()) == Some(child)
        {
            return;
        }
        if let Some(mut parent_node) = self.html.tree.get_mut(parent) {
            parent_node.append_id(child);
        }
    }

    /// Detach a node from the tree. The id stays valid.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root() {
            return;
        }
        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id) {
            self.remove(child);
        }
    }

    /// Replace the children of `id` with the parsed markup.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) {
        if self.element(id).is_none() {
            return;
        }
        self.clear_children(id);
        self.append_html(id, html);
    }

    /// Parse markup and append it after the existing children of `id`.
    pub fn append_html(&mut self, id: NodeId, html: &str) {
        if self.element(id).is_none() {
            return;
        }
        let fragment = Html::parse_fragment(html);
        // Fragment content sits under a synthetic <html> context element
        let Some(context) = fragment
            .tree
            .root()
            .children()
            .find(|child| child.value().is_element())
        else {
            return;
        };
        for child in context.children() {
            self.graft(id, child);
        }
    }

    /// Copy a subtree from another tree under `parent`.
    fn graft(&mut self, parent: NodeId, source: NodeRef<'_, Node>) {
        let Some(mut parent_node) = self.html.tree.get_mut(parent) else {
            return;
        };
        let id = parent_node.append(source.value().clone()).id();
        for child in source.children() {
            self.graft(id, child);
        }
    }

    // Serialisation

    /// Write the attached document as HTML.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for child in self.html.tree.root().children() {
            self.write_node(out, child.id())?;
        }
        Ok(())
    }

    pub fn to_html(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut buf = Vec::new();
        let _ = self.write_node(&mut buf, id);
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut buf = Vec::new();
        if let Some(node) = self.html.tree.get(id)
            && node.value().is_element()
        {
            let _ = serialize_element(&mut buf, node, TraversalScope::ChildrenOnly(None));
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn write_node<W: Write>(&self, out: &mut W, id: NodeId) -> io::Result<()> {
        let Some(node) = self.html.tree.get(id) else {
            return Ok(());
        };
        match node.value() {
            Node::Doctype(doctype) => write_doctype(out, doctype),
            Node::Comment(comment) => write!(out, "<!--{}-->", &**comment),
            Node::Text(text) => out.write_all(html_escape::encode_text(&**text).as_bytes()),
            Node::Element(_) => serialize_element(out, node, TraversalScope::IncludeNode),
            Node::Document | Node::Fragment => {
                for child in node.children() {
                    self.write_node(out, child.id())?;
                }
                Ok(())
            }
            Node::ProcessingInstruction(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Old</title></head>
<body>
  <h1 id="hero-name" class="hero title">Placeholder</h1>
  <div id="grid"><p>one</p><p>two</p></div>
  <form id="contactForm">
    <input name="name" value="Default">
    <textarea name="message">Hello</textarea>
  </form>
</body>
</html>"#;

    fn selector(css: &str) -> Selector {
        Selector::parse(css).unwrap()
    }

    #[test]
    fn test_lookup_by_id_and_class() {
        let doc = Document::parse(PAGE);
        let hero = doc.get_element_by_id("hero-name").unwrap();
        assert_eq!(doc.tag_name(hero), Some("h1"));
        assert_eq!(doc.text_content(hero), "Placeholder");
        assert_eq!(doc.elements_by_class("title"), vec![hero]);
        assert_eq!(doc.select(&selector("#grid > p")).len(), 2);
        assert!(doc.get_element_by_id("missing").is_none());
    }

    #[test]
    fn test_set_text_escapes_on_output() {
        let mut doc = Document::parse(PAGE);
        let hero = doc.get_element_by_id("hero-name").unwrap();
        doc.set_text(hero, "<script>alert(1)</script>");

        assert_eq!(doc.text_content(hero), "<script>alert(1)</script>");
        let html = doc.outer_html(hero);
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_set_inner_html_replaces_children() {
        let mut doc = Document::parse(PAGE);
        let grid = doc.get_element_by_id("grid").unwrap();
        doc.set_inner_html(grid, r#"<span class="a">x</span>"#);
        doc.append_html(grid, r#"<span class="a">y</span>"#);

        let children = doc.element_children(grid);
        assert_eq!(children.len(), 2);
        assert_eq!(doc.text_content(children[1]), "y");
        assert!(doc.select(&selector("p")).is_empty());
        assert_eq!(doc.inner_html(grid), r#"<span class="a">x</span><span class="a">y</span>"#);
    }

    #[test]
    fn test_class_toggling() {
        let mut doc = Document::parse(PAGE);
        let hero = doc.get_element_by_id("hero-name").unwrap();

        assert!(doc.toggle_class(hero, "active"));
        assert!(doc.has_class(hero, "active"));
        assert!(doc.has_class(hero, "hero"));
        assert_eq!(doc.select(&selector("h1.active")), vec![hero]);
        assert!(!doc.toggle_class(hero, "active"));
        assert_eq!(doc.attr(hero, "class"), Some("hero title"));
        assert!(doc.select(&selector(".active")).is_empty());
    }

    #[test]
    fn test_changed_id_is_found() {
        let mut doc = Document::parse(PAGE);
        let hero = doc.get_element_by_id("hero-name").unwrap();
        doc.set_attr(hero, "id", "renamed");

        assert_eq!(doc.get_element_by_id("renamed"), Some(hero));
        assert!(doc.get_element_by_id("hero-name").is_none());
        doc.remove_attr(hero, "id");
        assert!(doc.get_element_by_id("renamed").is_none());
    }

    #[test]
    fn test_removed_nodes_leave_queries() {
        let mut doc = Document::parse(PAGE);
        let hero = doc.get_element_by_id("hero-name").unwrap();
        doc.remove(hero);

        assert!(!doc.is_attached(hero));
        assert!(doc.get_element_by_id("hero-name").is_none());
        assert!(doc.select(&selector("h1")).is_empty());
        assert_eq!(doc.tag_name(hero), Some("h1"));
    }

    #[test]
    fn test_title_round_trip() {
        let mut doc = Document::parse(PAGE);
        assert_eq!(doc.title(), "Old");
        doc.set_title("New");
        assert_eq!(doc.title(), "New");

        let mut bare = Document::parse("<p>no title</p>");
        bare.set_title("Created");
        assert_eq!(bare.title(), "Created");
        assert!(bare.to_html().contains("<head><title>Created</title></head>"));
    }

    #[test]
    fn test_form_values_reset_to_defaults() {
        let mut doc = Document::parse(PAGE);
        let form = doc.get_element_by_id("contactForm").unwrap();
        let name = doc.select_within(form, &selector("[name=name]")).unwrap();
        let message = doc.select_within(form, &selector("[name=message]")).unwrap();

        assert_eq!(doc.value(name), "Default");
        assert_eq!(doc.value(message), "Hello");

        doc.set_value(name, "Ada");
        assert_eq!(doc.value(name), "Ada");
        doc.reset_value(name);
        assert_eq!(doc.value(name), "Default");
    }

    #[test]
    fn test_serialisation_keeps_structure() {
        let doc = Document::parse(PAGE);
        let html = doc.to_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r#"<input name="name" value="Default">"#));
        assert!(!html.contains("</input>"));
        assert!(html.contains(r#"<h1 class="hero title" id="hero-name">"#));
        assert!(html.contains("<title>Old</title>"));
    }

    #[test]
    fn test_serialisation_keeps_doctype_ids_and_noscript() {
        let doc = Document::parse(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01 Transitional//EN"><html><head><noscript><link rel="stylesheet" href="nojs.css"></noscript></head><body><!-- note --></body></html>"#,
        );
        let html = doc.to_html();
        assert!(html.starts_with(r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01 Transitional//EN">"#));
        assert!(html.contains(r#"<noscript><link rel="stylesheet" href="nojs.css"></noscript>"#));
        assert!(!html.contains("&lt;link"));
        assert!(html.contains("<!-- note -->"));

        let strict = Document::parse(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd"><p>x</p>"#,
        );
        assert!(strict.to_html().starts_with(
            r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">"#
        ));
    }

    #[test]
    fn test_created_nodes_serialise_in_place() {
        let mut doc = Document::parse(PAGE);
        let body = doc.body().unwrap();
        let footer = doc.create_element("FOOTER");
        let note = doc.create_comment(" built ");
        let text = doc.create_text("a < b");
        doc.append_child(footer, text);
        doc.append_child(body, footer);
        doc.append_child(body, note);

        assert_eq!(doc.tag_name(footer), Some("footer"));
        assert!(doc.is_attached(footer));
        assert!(doc.to_html().contains("<footer>a &lt; b</footer><!-- built --></body>"));
    }

    #[test]
    fn test_non_elements_are_ignored() {
        let mut doc = Document::parse(PAGE);
        let hero = doc.get_element_by_id("hero-name").unwrap();
        let text = doc.first_child(hero).unwrap();
        let before = doc.to_html();

        doc.set_attr(text, "id", "x");
        doc.set_class(text, "active", true);
        doc.set_inner_html(text, "<b>x</b>");
        doc.append_child(text, doc.root());
        doc.append_child(text, hero);
        let orphan = doc.create_element("span");
        doc.append_child(text, orphan);
        doc.remove(doc.root());
        assert_eq!(doc.to_html(), before);
    }
}
