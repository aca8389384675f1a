//! Owned, mutable XML tree for OOXML parts.
//!
//! `roxmltree` gives a fast read-only view; document operations need to splice
//! runs, wrap elements, and re-serialize. Parts are converted once into
//! [`XmlElement`] trees whose names keep the prefixes used by the source part,
//! so `w:p`, `r:id`, and `xml:space` are matched and written exactly as Word
//! writes them.

use std::{error::Error, fmt};

use roxmltree::{Document, Node, NodeType, ParsingOptions};

pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Error type for XML parse failures.
#[derive(Debug)]
pub struct XmlError {
    message: String,
}

impl XmlError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XML error: {}", self.message)
    }
}

impl Error for XmlError {}

impl From<roxmltree::Error> for XmlError {
    fn from(err: roxmltree::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A child of an element: either a nested element or character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlNode {
    #[must_use]
    pub const fn as_element(&self) -> Option<&XmlElement> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }

    pub const fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            Self::Element(element) => Some(element),
            Self::Text(_) => None,
        }
    }
}

impl From<XmlElement> for XmlNode {
    fn from(element: XmlElement) -> Self {
        Self::Element(element)
    }
}

/// An element with its qualified name, attributes in source order, and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Returns true when the element has the given qualified name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Declares `xmlns:{prefix}` on this element unless it is already present.
    pub fn ensure_namespace(&mut self, prefix: &str, uri: &str) {
        let key = format!("xmlns:{prefix}");
        if self.attr(&key).is_none() {
            self.attributes.push((key, uri.to_string()));
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Self> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.elements().filter(move |child| child.is(name))
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut Self> + 'a {
        self.elements_mut().filter(move |child| child.is(name))
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.elements().find(|child| child.is(name))
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Self> {
        self.elements_mut().find(|child| child.is(name))
    }

    /// Returns the named child, appending an empty one when missing.
    pub fn ensure_child(&mut self, name: &str) -> &mut Self {
        let index = match self.child_index(name) {
            Some(index) => index,
            None => {
                self.children.push(XmlNode::Element(Self::new(name)));
                self.children.len() - 1
            }
        };
        self.element_at_mut(index)
    }

    /// Returns the named child, inserting an empty one as the first child when
    /// missing. Property containers (`w:pPr`, `w:rPr`, `w:tcPr`, ...) must lead.
    pub fn ensure_first_child(&mut self, name: &str) -> &mut Self {
        let index = match self.child_index(name) {
            Some(index) => index,
            None => {
                self.children.insert(0, XmlNode::Element(Self::new(name)));
                0
            }
        };
        self.element_at_mut(index)
    }

    /// Index into `children` of the first element with the given name.
    #[must_use]
    pub fn child_index(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(element) if element.is(name)))
    }

    fn element_at_mut(&mut self, index: usize) -> &mut Self {
        match &mut self.children[index] {
            XmlNode::Element(element) => element,
            XmlNode::Text(_) => unreachable!("index was taken from an element position"),
        }
    }

    pub fn push(&mut self, child: Self) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn insert(&mut self, index: usize, child: Self) {
        let index = index.min(self.children.len());
        self.children.insert(index, XmlNode::Element(child));
    }

    /// Removes every direct child element with the given name.
    pub fn remove_children_named(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, XmlNode::Element(element) if element.is(name)));
        before - self.children.len()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlNode::Text(text.into())];
    }

    /// Concatenated character data of this element and all descendants.
    #[must_use]
    pub fn text(&self) -> String {
        let mut output = String::new();
        collect_text(self, &mut output);
        output
    }

    /// Pre-order iterator over descendant elements, excluding `self`.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children.iter()],
        }
    }

    pub fn descendants_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.descendants().filter(move |element| element.is(name))
    }

    /// Paths (child indices) to every descendant matching `predicate`. Matches
    /// are not searched further, so returned paths never nest.
    pub fn find_paths(&self, predicate: &dyn Fn(&Self) -> bool) -> Vec<Vec<usize>> {
        let mut paths = Vec::new();
        let mut current = Vec::new();
        find_paths_into(self, predicate, &mut current, &mut paths);
        paths
    }

    /// Paths to every descendant with the given name.
    #[must_use]
    pub fn find_paths_named(&self, name: &str) -> Vec<Vec<usize>> {
        self.find_paths(&|element| element.is(name))
    }

    #[must_use]
    pub fn at_path(&self, path: &[usize]) -> Option<&Self> {
        let mut current = self;
        for &index in path {
            current = current.children.get(index)?.as_element()?;
        }
        Some(current)
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Self> {
        let mut current = self;
        for &index in path {
            current = current.children.get_mut(index)?.as_element_mut()?;
        }
        Some(current)
    }

    /// Visits every element (including `self`) mutably in pre-order.
    pub fn walk_mut(&mut self, visit: &mut dyn FnMut(&mut Self)) {
        visit(self);
        for child in self.elements_mut() {
            child.walk_mut(visit);
        }
    }

    /// Removes every descendant element matching `predicate` (and its subtree).
    pub fn remove_descendants(&mut self, predicate: &dyn Fn(&Self) -> bool) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, XmlNode::Element(element) if predicate(element)));
        let mut removed = before - self.children.len();
        for child in self.elements_mut() {
            removed += child.remove_descendants(predicate);
        }
        removed
    }

    /// Serializes the element (without an XML declaration).
    #[must_use]
    pub fn to_xml_fragment(&self) -> String {
        let mut output = String::new();
        write_element(self, &mut output);
        output
    }
}

fn collect_text(element: &XmlElement, output: &mut String) {
    for child in &element.children {
        match child {
            XmlNode::Text(text) => output.push_str(text),
            XmlNode::Element(element) => collect_text(element, output),
        }
    }
}

fn find_paths_into(
    element: &XmlElement,
    predicate: &dyn Fn(&XmlElement) -> bool,
    current: &mut Vec<usize>,
    paths: &mut Vec<Vec<usize>>,
) {
    for (index, child) in element.children.iter().enumerate() {
        let XmlNode::Element(child) = child else {
            continue;
        };
        current.push(index);
        if predicate(child) {
            paths.push(current.clone());
        } else {
            find_paths_into(child, predicate, current, paths);
        }
        current.pop();
    }
}

/// Pre-order descendant iterator.
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, XmlNode>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let iter = self.stack.last_mut()?;
            match iter.next() {
                Some(XmlNode::Element(element)) => {
                    self.stack.push(element.children.iter());
                    return Some(element);
                }
                Some(XmlNode::Text(_)) => {}
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// A parsed part: the root element of an XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

impl XmlDocument {
    #[must_use]
    pub const fn new(root: XmlElement) -> Self {
        Self { root }
    }

    /// Parses XML text into an owned tree.
    ///
    /// # Errors
    /// Returns `XmlError` if the text is not well-formed XML.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let options = ParsingOptions {
            allow_dtd: false,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(xml, options)?;
        Ok(Self {
            root: convert(doc.root_element()),
        })
    }

    /// Parses raw part bytes, tolerating a UTF-8 byte order mark.
    ///
    /// # Errors
    /// Returns `XmlError` if the bytes are not UTF-8 or not well-formed XML.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, XmlError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let text = std::str::from_utf8(bytes).map_err(|err| XmlError::new(err.to_string()))?;
        Self::parse(text)
    }

    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut output = String::with_capacity(4096);
        output.push_str(XML_DECLARATION);
        output.push('\n');
        write_element(&self.root, &mut output);
        output
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }
}

fn convert(node: Node<'_, '_>) -> XmlElement {
    let tag = node.tag_name();
    let mut element = XmlElement::new(qualified_name(node, tag.namespace(), tag.name()));
    declare_namespaces(node, &mut element);
    for attribute in node.attributes() {
        let name = qualified_name(node, attribute.namespace(), attribute.name());
        element
            .attributes
            .push((name, attribute.value().to_string()));
    }
    for child in node.children() {
        match child.node_type() {
            NodeType::Element => element.children.push(XmlNode::Element(convert(child))),
            NodeType::Text => {
                if let Some(text) = child.text() {
                    element.children.push(XmlNode::Text(text.to_string()));
                }
            }
            _ => {}
        }
    }
    element
}

fn qualified_name(node: Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(XML_NS) => format!("xml:{local}"),
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
            _ => local.to_string(),
        },
        None => local.to_string(),
    }
}

fn declare_namespaces(node: Node<'_, '_>, element: &mut XmlElement) {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| {
            parent
                .namespaces()
                .map(|ns| (ns.name(), ns.uri()))
                .collect()
        })
        .unwrap_or_default();

    for ns in node.namespaces() {
        if ns.name() == Some("xml") || inherited.contains(&(ns.name(), ns.uri())) {
            continue;
        }
        let key = ns
            .name()
            .map_or_else(|| "xmlns".to_string(), |prefix| format!("xmlns:{prefix}"));
        element.attributes.push((key, ns.uri().to_string()));
    }
}

fn write_element(element: &XmlElement, output: &mut String) {
    output.push('<');
    output.push_str(&element.name);
    for (name, value) in &element.attributes {
        output.push(' ');
        output.push_str(name);
        output.push_str("=\"");
        escape_attribute(value, output);
        output.push('"');
    }
    if element.children.is_empty() {
        output.push_str("/>");
        return;
    }
    output.push('>');
    for child in &element.children {
        match child {
            XmlNode::Element(child) => write_element(child, output),
            XmlNode::Text(text) => escape_text(text, output),
        }
    }
    output.push_str("</");
    output.push_str(&element.name);
    output.push('>');
}

fn escape_text(value: &str, output: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(ch),
        }
    }
}

fn escape_attribute(value: &str, output: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\n' => output.push_str("&#10;"),
            '\r' => output.push_str("&#13;"),
            '\t' => output.push_str("&#9;"),
            _ => output.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><w:body><w:p><w:r><w:t xml:space="preserve">Hello &amp; </w:t></w:r><w:hyperlink r:id="rId4"><w:r><w:t>world</w:t></w:r></w:hyperlink></w:p></w:body></w:document>"#;

    #[test]
    fn keeps_prefixes_and_namespace_declarations() {
        let doc = XmlDocument::parse(SAMPLE).expect("sample should parse");
        assert_eq!(doc.root.name, "w:document");
        assert_eq!(
            doc.root.attr("xmlns:r"),
            Some("http://schemas.openxmlformats.org/officeDocument/2006/relationships")
        );

        let text = doc
            .root
            .descendants_named("w:t")
            .next()
            .expect("first text element");
        assert_eq!(text.attr("xml:space"), Some("preserve"));

        let link = doc
            .root
            .descendants_named("w:hyperlink")
            .next()
            .expect("hyperlink element");
        assert_eq!(link.attr("r:id"), Some("rId4"));

        let reparsed = XmlDocument::parse(&doc.to_xml()).expect("serialized output should parse");
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn escapes_text_and_attributes() {
        let element = XmlElement::new("w:t")
            .with_attr("w:val", "a\"b<c")
            .with_text("1 < 2 & 3");
        assert_eq!(
            element.to_xml_fragment(),
            r#"<w:t w:val="a&quot;b&lt;c">1 &lt; 2 &amp; 3</w:t>"#
        );
    }

    #[test]
    fn find_paths_does_not_descend_into_matches() {
        let doc = XmlDocument::parse(SAMPLE).expect("sample should parse");
        let body = doc.root.child("w:body").expect("body");
        let runs = body.find_paths_named("w:r");
        assert_eq!(runs, vec![vec![0, 0], vec![0, 1, 0]]);
        assert_eq!(body.text(), "Hello & world");
    }

    #[test]
    fn ensure_first_child_inserts_at_front() {
        let mut run = XmlElement::new("w:r").with_child(XmlElement::new("w:t").with_text("x"));
        run.ensure_first_child("w:rPr").ensure_child("w:b");
        assert_eq!(run.elements().next().map(|child| child.name.as_str()), Some("w:rPr"));
        assert!(run.child("w:rPr").and_then(|rpr| rpr.child("w:b")).is_some());
    }
}
