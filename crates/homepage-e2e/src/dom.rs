//! Parsed HTML documents
//!
//! Pages are parsed with html5ever into an rcdom tree, then flattened into an
//! index-based arena so elements can be handed out as cheap `Copy` handles
//! with parent links for selector matching.

use crate::selector::{Selector, SelectorError};
use html5ever::tendril::TendrilSink;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Elements whose content is never rendered
const NEVER_RENDERED: &[&str] = &["head", "script", "style", "template", "noscript", "title"];

#[derive(Debug)]
struct Node {
    parent: Option<usize>,
    children: Vec<usize>,
    kind: NodeKind,
}

#[derive(Debug)]
enum NodeKind {
    Root,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

/// A parsed HTML document
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Parse a full HTML document. html5ever recovers from any markup, so
    /// this never fails.
    pub fn parse(html: &str) -> Self {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        let mut doc = Document {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Root,
            }],
        };
        for child in dom.document.children.borrow().iter() {
            doc.append(0, child);
        }
        doc
    }

    fn append(&mut self, parent: usize, handle: &Handle) {
        let kind = match &handle.data {
            NodeData::Element { name, attrs, .. } => NodeKind::Element {
                name: name.local.to_string(),
                attrs: attrs
                    .borrow()
                    .iter()
                    .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                    .collect(),
            },
            NodeData::Text { contents } => NodeKind::Text(contents.borrow().to_string()),
            NodeData::Document
            | NodeData::Doctype { .. }
            | NodeData::Comment { .. }
            | NodeData::ProcessingInstruction { .. } => return,
        };

        let index = self.nodes.len();
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent].children.push(index);

        // <template> content stays in its own fragment, out of the tree,
        // the way querySelectorAll never descends into it
        for child in handle.children.borrow().iter() {
            self.append(index, child);
        }
    }

    /// All elements in document order
    pub fn elements(&self) -> impl Iterator<Item = Element<'_>> {
        (0..self.nodes.len())
            .filter(|&index| matches!(self.nodes[index].kind, NodeKind::Element { .. }))
            .map(|index| Element { doc: self, index })
    }

    /// Every element matching `selector`, in document order
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'_>>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.elements().filter(|el| selector.matches(*el)).collect())
    }

    /// The first element matching `selector`
    pub fn first(&self, selector: &str) -> Result<Option<Element<'_>>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.elements().find(|el| selector.matches(*el)))
    }

    /// Element with the given `id` attribute
    pub fn by_id(&self, id: &str) -> Option<Element<'_>> {
        self.elements().find(|el| el.attr("id") == Some(id))
    }

    /// Text of the `<title>` element, whitespace-collapsed
    pub fn title(&self) -> Option<String> {
        self.elements()
            .find(|el| el.name() == "title")
            .map(|el| el.text())
    }
}

/// A handle to one element of a [`Document`]
#[derive(Clone, Copy)]
pub struct Element<'a> {
    doc: &'a Document,
    index: usize,
}

impl std::fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}", self.name())?;
        for (name, value) in self.attrs() {
            write!(f, " {name}={value:?}")?;
        }
        write!(f, ">")
    }
}

impl<'a> Element<'a> {
    fn node(&self) -> &'a Node {
        &self.doc.nodes[self.index]
    }

    pub(crate) fn attrs(&self) -> &'a [(String, String)] {
        match &self.node().kind {
            NodeKind::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    /// Lowercase tag name
    pub fn name(&self) -> &'a str {
        match &self.node().kind {
            NodeKind::Element { name, .. } => name,
            _ => "",
        }
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.attrs()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    pub fn classes(&self) -> impl Iterator<Item = &'a str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Parent element, if any (the document root is not an element)
    pub fn parent(&self) -> Option<Element<'a>> {
        let parent = self.node().parent?;
        match self.doc.nodes[parent].kind {
            NodeKind::Element { .. } => Some(Element {
                doc: self.doc,
                index: parent,
            }),
            _ => None,
        }
    }

    /// Ancestor elements, innermost first
    pub fn ancestors(&self) -> impl Iterator<Item = Element<'a>> {
        std::iter::successors(self.parent(), |el| el.parent())
    }

    /// Descendant text content with whitespace runs collapsed to one space
    pub fn text(&self) -> String {
        let mut raw = String::new();
        self.collect_text(self.index, &mut raw);
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_text(&self, index: usize, out: &mut String) {
        for &child in &self.doc.nodes[index].children {
            match &self.doc.nodes[child].kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Element { .. } => self.collect_text(child, out),
                NodeKind::Root => {}
            }
        }
    }

    /// Does the text content contain `needle`?
    pub fn contains_text(&self, needle: &str) -> bool {
        let needle = needle.split_whitespace().collect::<Vec<_>>().join(" ");
        self.text().contains(&needle)
    }

    /// Descendants matching `selector`, in document order
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .doc
            .elements()
            .filter(|el| el.is_descendant_of(*self) && selector.matches(*el))
            .collect())
    }

    pub fn is_descendant_of(&self, other: Element<'_>) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.ancestors().any(|a| a.index == other.index)
    }

    /// Static visibility: neither this element nor an ancestor is hidden by
    /// the `hidden` attribute, an inline `display: none` /
    /// `visibility: hidden` style, or by being content that never renders.
    pub fn is_visible(&self) -> bool {
        std::iter::once(*self)
            .chain(self.ancestors())
            .all(|el| !el.hides_itself())
    }

    fn hides_itself(&self) -> bool {
        if NEVER_RENDERED.contains(&self.name()) || self.has_attr("hidden") {
            return true;
        }
        let Some(style) = self.attr("style") else {
            return false;
        };
        style.split(';').any(|decl| {
            let Some((prop, value)) = decl.split_once(':') else {
                return false;
            };
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim().to_ascii_lowercase();
            (prop == "display" && value.starts_with("none"))
                || (prop == "visibility" && (value.starts_with("hidden") || value.starts_with("collapse")))
        })
    }
}
