//! A small XML tree for editing generated Android resources.
//!
//! Parsing goes through `quick-xml`. The tree keeps text, comments and the raw start tag of
//! every element, so rendering an unedited document reproduces it byte for byte. Editing an
//! element's attributes drops its raw start tag and re-renders it using the separator the
//! original tag used between attributes.

use crate::error::{EditError, EditResult};
use onetouch_types::{Segment, Selector};
use quick_xml::escape::{escape, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fmt;

const FRAGMENT_ROOT: &str = "onetouch-fragment";
const DEFAULT_INDENT_STEP: &str = "    ";

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
    Comment(String),
    CData(String),
    Decl(String),
    DocType(String),
    Pi(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    /// Attribute values are kept escaped, as written in the source.
    attrs: Vec<(String, String)>,
    children: Vec<XmlNode>,
    self_closing: bool,
    raw: Option<String>,
    attr_sep: String,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unescaped attribute value.
    pub fn attr(&self, name: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| unescape_lossy(v))
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Set an attribute, returning whether the element changed.
    pub fn set_attr(&mut self, name: &str, value: &str) -> bool {
        let escaped = escape(value).into_owned();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) if *v == escaped => return false,
            Some((_, v)) => *v = escaped,
            None => self.attrs.push((name.to_string(), escaped)),
        }
        self.raw = None;
        true
    }

    /// Text content of the element, unescaped.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                XmlNode::Text(t) => Some(unescape_lossy(t)),
                XmlNode::CData(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    fn matches(&self, seg: &Segment) -> bool {
        if self.name != seg.name {
            return false;
        }
        match &seg.predicate {
            None => true,
            Some(p) => self
                .attrs
                .iter()
                .any(|(k, v)| p.matches_name(k) && unescape_lossy(v) == p.value),
        }
    }

    fn append_children(&mut self, nodes: Vec<XmlNode>, indent: &str, closing: &str) {
        if self.self_closing {
            self.self_closing = false;
            if let Some(raw) = &mut self.raw {
                let trimmed = raw.trim_end().len();
                raw.truncate(trimmed);
            }
        }

        // Keep the whitespace before the closing tag at the end.
        let trailing = match self.children.last() {
            Some(XmlNode::Text(t)) if t.trim().is_empty() && t.contains('\n') => {
                self.children.pop()
            }
            _ => None,
        };

        self.children.push(XmlNode::Text(format!("\n{indent}")));
        self.children.extend(nodes);
        let tail = trailing.unwrap_or_else(|| XmlNode::Text(format!("\n{closing}")));
        self.children.push(tail);
    }

    fn from_start(start: &BytesStart<'_>, self_closing: bool) -> EditResult<Self> {
        let raw = utf8(start)?;
        let name = utf8(start.name().as_ref())?;

        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| EditError::Xml {
                position: 0,
                message: format!("<{name}>: {e}"),
            })?;
            attrs.push((utf8(attr.key.as_ref())?, utf8(&attr.value)?));
        }

        let after_name = &raw[name.len().min(raw.len())..];
        let leading_ws: String = after_name
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();
        let attr_sep = if leading_ws.contains('\n') {
            leading_ws
        } else {
            " ".to_string()
        };

        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
            self_closing,
            raw: Some(raw),
            attr_sep,
        })
    }

    fn render(&self, out: &mut String) {
        out.push('<');
        match &self.raw {
            Some(raw) => out.push_str(raw),
            None => {
                out.push_str(&self.name);
                for (k, v) in &self.attrs {
                    out.push_str(&self.attr_sep);
                    out.push_str(k);
                    out.push_str("=\"");
                    out.push_str(v);
                    out.push('"');
                }
            }
        }

        if self.self_closing && self.children.is_empty() {
            out.push_str(if self.raw.is_some() { "/>" } else { " />" });
            return;
        }

        out.push('>');
        for child in &self.children {
            render_node(out, child);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// An editable XML document with exactly one root element.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    root_index: usize,
}

impl XmlDocument {
    pub fn parse(src: &str) -> EditResult<Self> {
        let nodes = parse_nodes(src)?;
        let mut roots = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n, XmlNode::Element(_)));
        let (root_index, _) = roots.next().ok_or_else(|| EditError::Xml {
            position: 0,
            message: "document has no root element".to_string(),
        })?;
        if roots.next().is_some() {
            return Err(EditError::Xml {
                position: 0,
                message: "document has more than one root element".to_string(),
            });
        }
        Ok(Self { nodes, root_index })
    }

    pub fn root(&self) -> &Element {
        match &self.nodes[self.root_index] {
            XmlNode::Element(e) => e,
            _ => unreachable!("root_index always points at an element"),
        }
    }

    fn root_mut(&mut self) -> &mut Element {
        match &mut self.nodes[self.root_index] {
            XmlNode::Element(e) => e,
            _ => unreachable!("root_index always points at an element"),
        }
    }

    /// Index paths (relative to the root element) of every element matching `sel`, in
    /// document order.
    pub fn find(&self, sel: &Selector) -> Vec<Vec<usize>> {
        let Some((first, rest)) = sel.segments.split_first() else {
            return Vec::new();
        };
        if !self.root().matches(first) {
            return Vec::new();
        }

        let mut current: Vec<Vec<usize>> = vec![Vec::new()];
        for seg in rest {
            let mut next = Vec::new();
            for path in &current {
                let Some(el) = self.element_at(path) else {
                    continue;
                };
                for (i, child) in el.children.iter().enumerate() {
                    if let XmlNode::Element(c) = child
                        && c.matches(seg)
                    {
                        let mut p = path.clone();
                        p.push(i);
                        next.push(p);
                    }
                }
            }
            current = next;
        }
        current
    }

    pub fn count(&self, sel: &Selector) -> usize {
        self.find(sel).len()
    }

    pub fn first(&self, sel: &Selector) -> Option<&Element> {
        self.find(sel)
            .first()
            .and_then(|path| self.element_at(path))
    }

    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut el = self.root();
        for &idx in path {
            match el.children.get(idx) {
                Some(XmlNode::Element(child)) => el = child,
                _ => return None,
            }
        }
        Some(el)
    }

    fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut el = self.root_mut();
        for &idx in path {
            match el.children.get_mut(idx) {
                Some(XmlNode::Element(child)) => el = child,
                _ => return None,
            }
        }
        Some(el)
    }

    /// Set attributes on every element matching `sel`. Returns how many elements changed.
    pub fn set_attrs(&mut self, sel: &Selector, attrs: &[(&str, &str)]) -> EditResult<usize> {
        let targets = self.find(sel);
        if targets.is_empty() {
            return Err(EditError::missing(sel));
        }

        let mut changed = 0;
        for path in &targets {
            let el = self
                .element_at_mut(path)
                .ok_or_else(|| EditError::missing(sel))?;
            let mut any = false;
            for (k, v) in attrs {
                any |= el.set_attr(k, v);
            }
            if any {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Parse `fragment` and append it as the last children of every element matching
    /// `parent`.
    pub fn inject_fragment(&mut self, parent: &Selector, fragment: &str) -> EditResult<()> {
        let targets = self.find(parent);
        if targets.is_empty() {
            return Err(EditError::missing(parent));
        }

        for path in &targets {
            let indent = self.child_indent(path);
            let closing = self.indent_of(path);
            let nodes = parse_fragment(fragment, &indent)?;
            let el = self
                .element_at_mut(path)
                .ok_or_else(|| EditError::missing(parent))?;
            el.append_children(nodes, &indent, &closing);
        }
        Ok(())
    }

    /// Replace every element matching `target` with the parsed `fragment`. Returns how many
    /// elements actually changed; zero when nothing matched.
    pub fn replace_fragment(&mut self, target: &Selector, fragment: &str) -> EditResult<usize> {
        let targets = self.find(target);
        let mut changed = 0;

        // Later siblings first, so earlier index paths stay valid.
        for path in targets.iter().rev() {
            let indent = self.indent_of(path);
            let nodes = parse_fragment(fragment, &indent)?;

            let Some((&idx, parent_path)) = path.split_last() else {
                let mut elements = nodes.into_iter().filter_map(|n| match n {
                    XmlNode::Element(e) => Some(e),
                    _ => None,
                });
                let new_root = elements
                    .next()
                    .ok_or_else(|| EditError::shape(target, "fragment has no element"))?;
                if *self.root() != new_root {
                    *self.root_mut() = new_root;
                    changed += 1;
                }
                continue;
            };

            let parent = self
                .element_at_mut(parent_path)
                .ok_or_else(|| EditError::missing(target))?;
            if nodes.len() == 1 && parent.children.get(idx) == nodes.first() {
                continue;
            }
            parent.children.splice(idx..=idx, nodes);
            changed += 1;
        }
        Ok(changed)
    }

    /// Whether some element matching `list` has a child element whose `field` attribute is
    /// `value`.
    pub fn has_child_with_attr(&self, list: &Selector, field: &str, value: &str) -> bool {
        self.find(list).iter().any(|path| {
            self.element_at(path).is_some_and(|el| {
                el.child_elements()
                    .any(|c| c.attr(field).as_deref() == Some(value))
            })
        })
    }

    /// Leading whitespace of the line an element starts on.
    fn indent_of(&self, path: &[usize]) -> String {
        let Some((&idx, parent_path)) = path.split_last() else {
            return String::new();
        };
        let Some(parent) = self.element_at(parent_path) else {
            return String::new();
        };
        match idx.checked_sub(1).and_then(|i| parent.children.get(i)) {
            Some(XmlNode::Text(t)) => indentation_suffix(t).unwrap_or_default(),
            _ => String::new(),
        }
    }

    /// Indentation used by the element's existing children, or one step deeper than the
    /// element itself when it has none.
    fn child_indent(&self, path: &[usize]) -> String {
        if let Some(el) = self.element_at(path) {
            for (i, child) in el.children.iter().enumerate() {
                let prev = i.checked_sub(1).and_then(|p| el.children.get(p));
                if let XmlNode::Element(_) = child
                    && let Some(XmlNode::Text(t)) = prev
                    && let Some(indent) = indentation_suffix(t)
                {
                    return indent;
                }
            }
        }
        format!("{}{DEFAULT_INDENT_STEP}", self.indent_of(path))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            render_node(&mut out, node);
        }
        out
    }
}

impl fmt::Display for XmlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn render_node(out: &mut String, node: &XmlNode) {
    match node {
        XmlNode::Element(el) => el.render(out),
        XmlNode::Text(t) => out.push_str(t),
        XmlNode::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
        XmlNode::CData(c) => {
            out.push_str("<![CDATA[");
            out.push_str(c);
            out.push_str("]]>");
        }
        XmlNode::Decl(d) | XmlNode::Pi(d) => {
            out.push_str("<?");
            out.push_str(d);
            out.push_str("?>");
        }
        XmlNode::DocType(d) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(d.trim_start());
            out.push('>');
        }
    }
}

fn parse_nodes(src: &str) -> EditResult<Vec<XmlNode>> {
    let mut reader = Reader::from_str(src);
    let mut top: Vec<XmlNode> = Vec::new();
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| EditError::Xml {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;

        let node = match event {
            Event::Start(e) => {
                stack.push(Element::from_start(&e, false)?);
                continue;
            }
            Event::End(_) => {
                let el = stack.pop().ok_or_else(|| EditError::Xml {
                    position: reader.buffer_position() as u64,
                    message: "unexpected closing tag".to_string(),
                })?;
                XmlNode::Element(el)
            }
            Event::Empty(e) => XmlNode::Element(Element::from_start(&e, true)?),
            Event::Text(t) => XmlNode::Text(utf8(&t)?),
            Event::CData(t) => XmlNode::CData(utf8(&t)?),
            Event::Comment(t) => XmlNode::Comment(utf8(&t)?),
            Event::Decl(d) => XmlNode::Decl(utf8(&d)?),
            Event::PI(p) => XmlNode::Pi(utf8(&p)?),
            Event::DocType(d) => XmlNode::DocType(utf8(&d)?),
            Event::Eof => break,
        };

        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => top.push(node),
        }
    }

    if let Some(open) = stack.last() {
        return Err(EditError::Xml {
            position: reader.buffer_position() as u64,
            message: format!("unclosed element <{}>", open.name),
        });
    }
    Ok(top)
}

/// Parse a fragment into nodes, re-indenting its continuation lines to `indent`.
fn parse_fragment(fragment: &str, indent: &str) -> EditResult<Vec<XmlNode>> {
    let text = reindent(fragment, indent);
    let wrapped = format!("<{FRAGMENT_ROOT}>{text}</{FRAGMENT_ROOT}>");
    let mut nodes = parse_nodes(&wrapped)?;
    match (nodes.pop(), nodes.is_empty()) {
        (Some(XmlNode::Element(root)), true) => Ok(root.children),
        _ => Err(EditError::Xml {
            position: 0,
            message: "fragment did not parse to a node list".to_string(),
        }),
    }
}

fn reindent(fragment: &str, indent: &str) -> String {
    let trimmed = fragment.trim();
    let mut lines = trimmed.lines();
    let Some(first) = lines.next() else {
        return String::new();
    };
    let rest: Vec<&str> = lines.collect();

    let common = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = first.to_string();
    for line in rest {
        out.push('\n');
        if line.trim().is_empty() {
            continue;
        }
        out.push_str(indent);
        out.push_str(&line[common.min(line.len())..]);
    }
    out
}

fn indentation_suffix(text: &str) -> Option<String> {
    let (_, tail) = text.rsplit_once('\n')?;
    tail.chars()
        .all(|c| c == ' ' || c == '\t')
        .then(|| tail.to_string())
}

fn utf8(bytes: &[u8]) -> EditResult<String> {
    Ok(String::from_utf8(bytes.to_vec())?)
}

fn unescape_lossy(raw: &str) -> String {
    unescape(raw)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
