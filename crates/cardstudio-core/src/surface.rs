//! The editable surface: node tree, inline styles, and the side map of
//! per-node transform records.

use crate::error::EditorResult;
use crate::markup;
use kurbo::Vec2;
use std::collections::HashMap;
use std::ops::Range;
use uuid::Uuid;

/// Stable identity of a node for the lifetime of a surface.
pub type NodeId = Uuid;

/// Ordered inline style declarations (`prop: value; ...`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    declarations: Vec<(String, String)>,
}

impl Style {
    /// Parse an inline `style` attribute value.
    pub fn parse(css: &str) -> Self {
        let declarations = css
            .split(';')
            .filter_map(|decl| {
                let (prop, value) = decl.split_once(':')?;
                let prop = prop.trim().to_ascii_lowercase();
                let value = value.trim();
                if prop.is_empty() || value.is_empty() {
                    None
                } else {
                    Some((prop, value.to_string()))
                }
            })
            .collect();
        Self { declarations }
    }

    pub fn get(&self, prop: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(p, _)| p == prop)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, keeping its position if already present.
    pub fn set(&mut self, prop: &str, value: impl Into<String>) {
        let value = value.into();
        match self.declarations.iter_mut().find(|(p, _)| p == prop) {
            Some(entry) => entry.1 = value,
            None => self.declarations.push((prop.to_string(), value)),
        }
    }

    pub fn remove(&mut self, prop: &str) -> Option<String> {
        let pos = self.declarations.iter().position(|(p, _)| p == prop)?;
        Some(self.declarations.remove(pos).1)
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Numeric value of a `px` (or unitless) property.
    pub fn px(&self, prop: &str) -> Option<f64> {
        parse_px(self.get(prop)?)
    }

    pub fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(p, v)| format!("{p}: {v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Parse `"12px"` or `"12"` into a number.
pub fn parse_px(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// An element node.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Lower-case tag name.
    pub tag: String,
    /// Attributes other than `style`, in source order.
    pub attributes: Vec<(String, String)>,
    /// Inline style.
    pub style: Style,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            style: Style::default(),
        }
    }

    pub fn with_style(mut self, css: &str) -> Self {
        self.style = Style::parse(css);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether this is a heading-like node used for block titles.
    pub fn is_heading_like(&self) -> bool {
        matches!(self.tag.as_str(), "h1" | "h2" | "h3")
            || self
                .style
                .get("font-size")
                .is_some_and(|size| size.starts_with('1'))
    }
}

/// Content of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(Element),
    /// Raw text, entities left encoded.
    Text(String),
}

/// A node in the surface tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(el) => Some(el),
            NodeKind::Text(_) => None,
        }
    }
}

/// Editor-only transform bookkeeping for a node.
///
/// The rendered transform is always `base ∘ translate(tx, ty) ∘ rotate(r)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub rotation_degrees: f64,
    /// The inline transform the node had before it was first edited.
    pub base_transform: String,
    /// Explicit width once resized, in content units.
    pub width: Option<f64>,
    /// Explicit height once resized, in content units.
    pub height: Option<f64>,
}

impl NodeTransform {
    /// Record for a node seen for the first time.
    pub fn capture(base_transform: &str) -> Self {
        Self {
            base_transform: base_transform.trim().to_string(),
            ..Self::default()
        }
    }

    pub fn translation(&self) -> Vec2 {
        Vec2::new(self.translate_x, self.translate_y)
    }

    pub fn set_translation(&mut self, translation: Vec2) {
        self.translate_x = translation.x;
        self.translate_y = translation.y;
    }

    /// No edits on top of the base transform.
    pub fn is_identity(&self) -> bool {
        self.translate_x == 0.0
            && self.translate_y == 0.0
            && self.rotation_degrees == 0.0
            && self.width.is_none()
            && self.height.is_none()
    }

    /// Compose the CSS transform string.
    pub fn css(&self) -> String {
        let mut parts = Vec::new();
        if !self.base_transform.is_empty() {
            parts.push(self.base_transform.clone());
        }
        if self.translate_x != 0.0 || self.translate_y != 0.0 {
            parts.push(format!(
                "translate({}px, {}px)",
                self.translate_x, self.translate_y
            ));
        }
        if self.rotation_degrees != 0.0 {
            parts.push(format!("rotate({}deg)", self.rotation_degrees));
        }
        parts.join(" ")
    }
}

/// The root container of visual nodes.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    transforms: HashMap<NodeId, NodeTransform>,
}

impl Surface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse markup into a fresh surface.
    pub fn parse(input: &str) -> EditorResult<Self> {
        markup::parse(input)
    }

    /// Serialize the whole surface.
    pub fn to_markup(&self) -> String {
        markup::serialize(self)
    }

    /// Top-level nodes, including whitespace text.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub(crate) fn roots_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.roots
    }

    /// Top-level element nodes in document order.
    pub fn element_roots(&self) -> Vec<NodeId> {
        self.roots
            .iter()
            .copied()
            .filter(|&id| self.element(id).is_some())
            .collect()
    }

    /// Whether the node is attached to this surface.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(&id).and_then(Node::as_element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Element children of a node.
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.element(c).is_some())
            .collect()
    }

    /// Ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            result.push(p);
            current = self.parent(p);
        }
        result
    }

    /// All descendants of a node in document order (excluding the node).
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &child in self.children(id) {
            out.push(child);
            out.extend(self.descendants(child));
        }
        out
    }

    /// Every node in document order.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &root in &self.roots {
            out.push(root);
            out.extend(self.descendants(root));
        }
        out
    }

    /// Concatenated text of a subtree.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        self.collect_text(id, &mut text);
        text
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else { return };
        match &node.kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element(_) => {
                for &child in &node.children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Follow element-child indices from a top-level block.
    pub fn element_at_path(&self, block: usize, path: &[usize]) -> Option<NodeId> {
        let mut current = *self.element_roots().get(block)?;
        for &index in path {
            current = *self.element_children(current).get(index)?;
        }
        Some(current)
    }

    /// Append an element under `parent` (or at top level).
    pub fn append_element(&mut self, parent: Option<NodeId>, element: Element) -> NodeId {
        self.append(parent, NodeKind::Element(element))
    }

    /// Append a text run under `parent` (or at top level).
    pub fn append_text(&mut self, parent: Option<NodeId>, text: impl Into<String>) -> NodeId {
        self.append(parent, NodeKind::Text(text.into()))
    }

    fn append(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = Uuid::new_v4();
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        self.nodes.insert(
            id,
            Node {
                id,
                parent,
                kind,
                children: Vec::new(),
            },
        );
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(p) => p.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Replace a node's children with a single text run.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> bool {
        if self.element(id).is_none() {
            return false;
        }
        for child in self.children(id).to_vec() {
            self.drop_subtree(child);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children.clear();
        }
        self.append_text(Some(id), text);
        true
    }

    /// Wrap chars `range` of a text run in `wrapper`, splitting the run
    /// around it. Offsets index the raw text. Returns the wrapper id, or
    /// `None` when `id` is not a text run or the range is empty.
    pub fn wrap_text_range(&mut self, id: NodeId, range: Range<usize>, wrapper: Element) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        let NodeKind::Text(text) = &node.kind else {
            return None;
        };
        let parent = node.parent;
        let chars: Vec<char> = text.chars().collect();
        let end = range.end.min(chars.len());
        if range.start >= end {
            return None;
        }
        let before: String = chars[..range.start].iter().collect();
        let inside: String = chars[range.start..end].iter().collect();
        let after: String = chars[end..].iter().collect();

        let wrap_id = Uuid::new_v4();
        let inner = self.insert_detached(Some(wrap_id), NodeKind::Text(inside), Vec::new());
        self.nodes.insert(
            wrap_id,
            Node {
                id: wrap_id,
                parent,
                kind: NodeKind::Element(wrapper),
                children: vec![inner],
            },
        );

        let mut runs = Vec::with_capacity(3);
        if before.is_empty() {
            self.nodes.remove(&id);
        } else {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.kind = NodeKind::Text(before);
            }
            runs.push(id);
        }
        runs.push(wrap_id);
        if !after.is_empty() {
            runs.push(self.insert_detached(parent, NodeKind::Text(after), Vec::new()));
        }

        let siblings = match parent {
            Some(p) => &mut self.nodes.get_mut(&p)?.children,
            None => &mut self.roots,
        };
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings.splice(pos..=pos, runs);
        Some(wrap_id)
    }

    fn insert_detached(&mut self, parent: Option<NodeId>, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        let id = Uuid::new_v4();
        self.nodes.insert(
            id,
            Node {
                id,
                parent,
                kind,
                children,
            },
        );
        id
    }

    pub fn transform(&self, id: NodeId) -> Option<&NodeTransform> {
        self.transforms.get(&id)
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Option<&mut NodeTransform> {
        self.transforms.get_mut(&id)
    }

    pub(crate) fn insert_transform(&mut self, id: NodeId, record: NodeTransform) {
        self.transforms.insert(id, record);
    }

    /// Get the node's transform record, capturing its base transform the
    /// first time. Returns None for detached nodes and text runs.
    pub fn ensure_transform(&mut self, id: NodeId) -> Option<&mut NodeTransform> {
        let base = self.element(id)?.style.get("transform").unwrap_or("").to_string();
        Some(
            self.transforms
                .entry(id)
                .or_insert_with(|| NodeTransform::capture(&base)),
        )
    }

    /// Detach a node and its subtree. Returns false if it was not attached.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        match node.parent {
            Some(parent) => {
                if let Some(p) = self.nodes.get_mut(&parent) {
                    p.children.retain(|&c| c != id);
                }
            }
            None => self.roots.retain(|&r| r != id),
        }
        self.drop_subtree(id);
        true
    }

    fn drop_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            self.transforms.remove(&id);
            for child in node.children {
                self.drop_subtree(child);
            }
        }
    }

    /// Deep-clone a node (fresh ids) and insert the copy right after it.
    /// Transform records are copied as-is.
    pub fn duplicate(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(&id)?.parent;
        let clone = self.clone_subtree(id, parent)?;
        let siblings = match parent {
            Some(p) => &mut self.nodes.get_mut(&p)?.children,
            None => &mut self.roots,
        };
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings.insert(pos + 1, clone);
        Some(clone)
    }

    fn clone_subtree(&mut self, id: NodeId, parent: Option<NodeId>) -> Option<NodeId> {
        let source = self.nodes.get(&id)?.clone();
        let new_id = Uuid::new_v4();
        if let Some(record) = self.transforms.get(&id).cloned() {
            self.transforms.insert(new_id, record);
        }
        let children = source
            .children
            .iter()
            .filter_map(|&child| self.clone_subtree(child, Some(new_id)))
            .collect();
        self.nodes.insert(
            new_id,
            Node {
                id: new_id,
                parent,
                kind: source.kind,
                children,
            },
        );
        Some(new_id)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Number of attached nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
