use compact_str::CompactString;
use core::fmt;

/// Namespace URI bound to the reserved `xml` prefix.
pub const XML_NS_URI: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// Expanded name of an element, attribute or processing instruction.
///
/// `prefix` is kept only for `name()`; matching uses `local` and `ns_uri`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XmlName {
    pub prefix: Option<CompactString>,
    pub local: CompactString,
    pub ns_uri: Option<CompactString>,
}

impl XmlName {
    pub fn local(local: impl Into<CompactString>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: None }
    }

    pub fn with_namespace(mut self, prefix: Option<&str>, ns_uri: &str) -> Self {
        self.prefix = prefix.map(CompactString::from);
        self.ns_uri = Some(CompactString::from(ns_uri));
        self
    }

    pub fn ns_uri(&self) -> Option<&str> {
        self.ns_uri.as_deref()
    }

    /// Returns `true` when local name and namespace both match.
    pub fn matches(&self, local: &str, ns_uri: Option<&str>) -> bool {
        self.local == local && self.ns_uri() == ns_uri
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        // the parser never allocates more than u32::MAX nodes (checked in TreeBuilder)
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) name: Option<XmlName>,
    pub(crate) value: String,
    pub(crate) attributes: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Last node (in document order) of the subtree rooted here.
    pub(crate) subtree_end: NodeId,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind, id: NodeId, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            name: None,
            value: String::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            subtree_end: id,
        }
    }
}

/// Immutable XML document tree.
///
/// The root node (`Document::root`) is always present; a successfully parsed
/// document additionally has exactly one document element.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    pub(crate) fn from_nodes(nodes: Vec<NodeData>) -> Self {
        debug_assert!(nodes.first().is_some_and(|n| n.kind == NodeKind::Document));
        Self { nodes }
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root()).iter().copied().find(|&c| self.kind(c) == NodeKind::Element)
    }

    /// Number of nodes, the root and attribute nodes included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.data(id).kind
    }

    pub fn name(&self, id: NodeId) -> Option<&XmlName> {
        self.data(id).name.as_ref()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).attributes
    }

    pub(crate) fn subtree_end(&self, id: NodeId) -> NodeId {
        self.data(id).subtree_end
    }

    /// Raw value of a text, attribute, comment or processing-instruction node.
    /// Empty for documents and elements; use [`Document::string_value`] there.
    pub fn value(&self, id: NodeId) -> &str {
        &self.data(id).value
    }

    pub fn attribute(&self, element: NodeId, local: &str, ns_uri: Option<&str>) -> Option<&str> {
        self.attributes(element)
            .iter()
            .find(|&&a| self.name(a).is_some_and(|n| n.matches(local, ns_uri)))
            .map(|&a| self.value(a))
    }

    /// XPath string-value: concatenated descendant text for documents and
    /// elements, the node's own value otherwise.
    pub fn string_value(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Document | NodeKind::Element => {
                let mut out = String::new();
                for d in self.descendants(id) {
                    if self.kind(d) == NodeKind::Text {
                        out.push_str(self.value(d));
                    }
                }
                out
            }
            _ => self.value(id).to_owned(),
        }
    }

    /// Descendants of `id` in document order, attributes excluded.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let start = id.index() + 1;
        let end = self.subtree_end(id).index();
        (start..=end)
            .map(NodeId::from_index)
            .filter(move |&n| self.kind(n) != NodeKind::Attribute)
    }

    /// Ancestors of `id`, nearest first, the root included.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        core::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor < node && node <= self.subtree_end(ancestor)
    }

    /// Iterates every node of the document in document order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId::from_index)
    }
}
