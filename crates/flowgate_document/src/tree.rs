//! Immutable element tree.
//!
//! Elements live in a single arena in document order, so the descendants of
//! an element occupy the contiguous index range that follows it. Parent links
//! are plain indices used for upward lookup only; the arena owns every node.

use indexmap::IndexMap;

/// Index of an element within its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    /// Position in document order
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ElementData {
    name: String,
    namespace: Option<String>,
    attributes: IndexMap<String, String>,
    text: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    /// One past the last descendant
    end: usize,
    /// Byte offset of the start tag in the source
    offset: usize,
}

/// A parsed flow document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDocument {
    elements: Vec<ElementData>,
}

impl FlowDocument {
    /// The document element
    #[must_use]
    pub fn root(&self) -> Element<'_> {
        Element {
            doc: self,
            id: ElementId(0),
        }
    }

    /// Look up an element by id.
    ///
    /// Ids are only meaningful for the document that produced them; an id
    /// past the end of this document yields `None`.
    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<Element<'_>> {
        (id.0 < self.elements.len()).then(|| self.at(id))
    }

    fn at(&self, id: ElementId) -> Element<'_> {
        Element { doc: self, id }
    }

    /// Number of elements in the document
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Always false: a document has at least its root element
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements in document order, root included
    pub fn elements(&self) -> impl Iterator<Item = Element<'_>> {
        (0..self.elements.len()).map(move |i| Element {
            doc: self,
            id: ElementId(i),
        })
    }

    /// All elements with the given local name, in document order
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Element<'a>> + 'a {
        self.elements().filter(move |e| e.name() == name)
    }

    fn data(&self, id: ElementId) -> &ElementData {
        &self.elements[id.0]
    }
}

/// Borrowed handle to an element
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    doc: &'a FlowDocument,
    id: ElementId,
}

impl<'a> Element<'a> {
    /// Element id
    #[must_use]
    pub const fn id(&self) -> ElementId {
        self.id
    }

    /// Local name
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.doc.data(self.id).name
    }

    /// Namespace URI, if the element is in one
    #[must_use]
    pub fn namespace(&self) -> Option<&'a str> {
        self.doc.data(self.id).namespace.as_deref()
    }

    /// Attribute value by local name (namespaced attributes use `{uri}name`)
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.doc.data(self.id).attributes.get(name).map(String::as_str)
    }

    /// Attributes in source order
    pub fn attributes(self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.doc
            .data(self.id)
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Character data directly inside this element
    #[must_use]
    pub fn text(&self) -> &'a str {
        &self.doc.data(self.id).text
    }

    /// Byte offset of the start tag in the parsed input
    #[must_use]
    pub fn offset(&self) -> usize {
        self.doc.data(self.id).offset
    }

    /// Parent element, `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<Element<'a>> {
        self.doc.data(self.id).parent.map(|id| self.doc.at(id))
    }

    /// Child elements in document order
    pub fn children(self) -> impl Iterator<Item = Element<'a>> + 'a {
        let doc = self.doc;
        doc.data(self.id)
            .children
            .iter()
            .map(move |&id| Element { doc, id })
    }

    /// Child elements with the given local name
    pub fn children_named(self, name: &'a str) -> impl Iterator<Item = Element<'a>> + 'a {
        self.children().filter(move |c| c.name() == name)
    }

    /// First child element with the given local name
    #[must_use]
    pub fn child(&self, name: &str) -> Option<Element<'a>> {
        self.children().find(|c| c.name() == name)
    }

    /// Text of the first child element with the given local name
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&'a str> {
        self.child(name).map(|c| c.text())
    }

    /// All descendants in document order, excluding this element
    pub fn descendants(self) -> impl Iterator<Item = Element<'a>> + 'a {
        let doc = self.doc;
        let start = self.id.0 + 1;
        let end = doc.data(self.id).end;
        (start..end).map(move |i| Element {
            doc,
            id: ElementId(i),
        })
    }

    /// Descendants with the given local name, in document order
    pub fn descendants_named(self, name: &'a str) -> impl Iterator<Item = Element<'a>> + 'a {
        self.descendants().filter(move |e| e.name() == name)
    }

    /// Ancestors from the parent up to the root
    #[must_use]
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors {
            doc: self.doc,
            next: self.doc.data(self.id).parent,
        }
    }

    /// Whether this element or any ancestor has the given local name
    #[must_use]
    pub fn is_within(&self, name: &str) -> bool {
        self.name() == name || self.ancestors().any(|a| a.name() == name)
    }
}

/// Iterator over the ancestors of an element
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    doc: &'a FlowDocument,
    next: Option<ElementId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.doc.data(id).parent;
        Some(self.doc.at(id))
    }
}

/// Incremental builder used by the parser
#[derive(Debug, Default)]
pub(crate) struct TreeBuilder {
    elements: Vec<ElementData>,
    open: Vec<ElementId>,
    closed_root: bool,
}

/// Structural problems detected while building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildError {
    /// A second top-level element
    MultipleRoots,
    /// Non-whitespace text outside the document element
    TextOutsideRoot,
    /// End tag without a matching start tag
    UnbalancedEnd,
    /// Input ended with open elements
    Unclosed,
    /// No document element at all
    NoRoot,
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultipleRoots => write!(f, "Content is not allowed after the document element"),
            Self::TextOutsideRoot => write!(f, "Text is not allowed outside the document element"),
            Self::UnbalancedEnd => write!(f, "End tag without matching start tag"),
            Self::Unclosed => write!(f, "Document ended before all elements were closed"),
            Self::NoRoot => write!(f, "Document has no root element"),
        }
    }
}

impl TreeBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(
        &mut self,
        name: String,
        namespace: Option<String>,
        attributes: IndexMap<String, String>,
        offset: usize,
    ) -> Result<ElementId, BuildError> {
        let parent = self.open.last().copied();
        if parent.is_none() && (self.closed_root || !self.elements.is_empty()) {
            return Err(BuildError::MultipleRoots);
        }

        let id = ElementId(self.elements.len());
        self.elements.push(ElementData {
            name,
            namespace,
            attributes,
            text: String::new(),
            parent,
            children: Vec::new(),
            end: id.0 + 1,
            offset,
        });
        if let Some(parent) = parent {
            self.elements[parent.0].children.push(id);
        }
        self.open.push(id);
        Ok(id)
    }

    pub(crate) fn close(&mut self) -> Result<(), BuildError> {
        let id = self.open.pop().ok_or(BuildError::UnbalancedEnd)?;
        self.elements[id.0].end = self.elements.len();
        if self.open.is_empty() {
            self.closed_root = true;
        }
        Ok(())
    }

    pub(crate) fn text(&mut self, text: &str) -> Result<(), BuildError> {
        match self.open.last() {
            Some(id) => {
                self.elements[id.0].text.push_str(text);
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(BuildError::TextOutsideRoot),
        }
    }

    pub(crate) fn finish(self) -> Result<FlowDocument, BuildError> {
        if !self.open.is_empty() {
            return Err(BuildError::Unclosed);
        }
        if self.elements.is_empty() {
            return Err(BuildError::NoRoot);
        }
        Ok(FlowDocument {
            elements: self.elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(builder: &mut TreeBuilder, name: &str, text: &str) {
        builder
            .open(name.to_string(), None, IndexMap::new(), 0)
            .unwrap();
        builder.text(text).unwrap();
        builder.close().unwrap();
    }

    fn open(builder: &mut TreeBuilder, name: &str) -> ElementId {
        builder
            .open(name.to_string(), None, IndexMap::new(), 0)
            .unwrap()
    }

    /// flowController > rootGroup > (processor > class, template > processor > class)
    fn sample() -> FlowDocument {
        let mut b = TreeBuilder::new();
        open(&mut b, "flowController");
        open(&mut b, "rootGroup");
        open(&mut b, "processor");
        leaf(&mut b, "class", "org.example.A");
        b.close().unwrap();
        open(&mut b, "template");
        open(&mut b, "processor");
        leaf(&mut b, "class", "org.example.B");
        b.close().unwrap();
        b.close().unwrap();
        b.close().unwrap();
        b.close().unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn test_document_order() {
        let doc = sample();
        let names: Vec<_> = doc.elements().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec![
                "flowController",
                "rootGroup",
                "processor",
                "class",
                "template",
                "processor",
                "class"
            ]
        );
    }

    #[test]
    fn test_descendants_are_contiguous() {
        let doc = sample();
        let root_group = doc.root().child("rootGroup").unwrap();
        assert_eq!(root_group.descendants().count(), 5);

        let template = root_group.child("template").unwrap();
        let classes: Vec<_> = template.descendants_named("class").map(|c| c.text()).collect();
        assert_eq!(classes, vec!["org.example.B"]);
    }

    #[test]
    fn test_element_lookup() {
        let doc = sample();
        let class = doc.elements_named("class").last().unwrap();
        assert_eq!(doc.element(class.id()).unwrap().text(), "org.example.B");

        let mut b = TreeBuilder::new();
        open(&mut b, "flowController");
        b.close().unwrap();
        let small = b.finish().unwrap();
        assert!(small.element(class.id()).is_none());
    }

    #[test]
    fn test_ancestors_and_within() {
        let doc = sample();
        let classes: Vec<_> = doc.elements_named("class").collect();
        assert_eq!(classes.len(), 2);

        assert!(!classes[0].is_within("template"));
        assert!(classes[1].is_within("template"));

        let chain: Vec<_> = classes[1].ancestors().map(|a| a.name()).collect();
        assert_eq!(chain, vec!["processor", "template", "rootGroup", "flowController"]);
    }

    #[test]
    fn test_child_text() {
        let doc = sample();
        let processor = doc.root().descendants_named("processor").next().unwrap();
        assert_eq!(processor.child_text("class"), Some("org.example.A"));
        assert_eq!(processor.child_text("name"), None);
        assert_eq!(processor.parent().unwrap().name(), "rootGroup");
        assert!(doc.root().parent().is_none());
    }

    #[test]
    fn test_builder_rejects_second_root() {
        let mut b = TreeBuilder::new();
        open(&mut b, "a");
        b.close().unwrap();
        let err = b.open("b".to_string(), None, IndexMap::new(), 0).unwrap_err();
        assert_eq!(err, BuildError::MultipleRoots);
    }

    #[test]
    fn test_builder_text_outside_root() {
        let mut b = TreeBuilder::new();
        assert!(b.text("  \n").is_ok());
        assert_eq!(b.text("junk"), Err(BuildError::TextOutsideRoot));
    }

    #[test]
    fn test_builder_unclosed_and_empty() {
        let mut b = TreeBuilder::new();
        open(&mut b, "a");
        assert_eq!(b.finish().unwrap_err(), BuildError::Unclosed);
        assert_eq!(TreeBuilder::new().finish().unwrap_err(), BuildError::NoRoot);
    }
}
