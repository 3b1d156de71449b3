use crate::error::PomlError;

/// Tag name every POML document must use for its root element.
pub const ROOT_TAG: &str = "poml";

/// The tag vocabulary the renderer knows how to format.
///
/// Anything outside the vocabulary is `Unknown`: it contributes no output of
/// its own, but its children are still rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    H1,
    H2,
    H3,
    Paragraph,
    List,
    Item,
    Code,
    Field,
    Unknown,
}

impl NodeKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "h1" => NodeKind::H1,
            "h2" => NodeKind::H2,
            "h3" => NodeKind::H3,
            "p" => NodeKind::Paragraph,
            "list" => NodeKind::List,
            "item" => NodeKind::Item,
            "code" => NodeKind::Code,
            "field" => NodeKind::Field,
            _ => NodeKind::Unknown,
        }
    }
}

/// One markup element.
#[derive(Debug, PartialEq, Eq)]
pub struct Node {
    tag: String,
    kind: NodeKind,
    /// Attributes in document order.
    attrs: Vec<(String, String)>,
    /// Text preceding the first child element, `None` when there was none.
    text: Option<String>,
    children: Vec<Node>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            kind: NodeKind::from_tag(&tag),
            tag,
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attrs(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Looks up an attribute by name. The first occurrence wins.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Own text, or the empty string when the node has none.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub(crate) fn push_attr(&mut self, key: String, value: String) {
        self.attrs.push((key, value));
    }

    /// Appends to the node's own text. Text that arrives after the first
    /// child element is tail text and is dropped.
    pub(crate) fn push_text(&mut self, text: &str) {
        if self.children.is_empty() {
            self.text.get_or_insert_with(String::new).push_str(text);
        }
    }

    pub(crate) fn push_child(&mut self, child: Node) {
        self.children.push(child);
    }
}

// Nesting depth is only bounded by the input, so the subtree is torn down
// with a worklist instead of one stack frame per level.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// A validated POML tree: the root node is always `<poml>`.
#[derive(Debug, PartialEq, Eq)]
pub struct Document {
    root: Node,
}

impl Document {
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Top-level elements, i.e. the children of `<poml>`.
    pub fn children(&self) -> &[Node] {
        self.root.children()
    }
}

impl TryFrom<Node> for Document {
    type Error = PomlError;

    fn try_from(root: Node) -> Result<Self, Self::Error> {
        if root.tag() != ROOT_TAG {
            return Err(PomlError::MissingRoot(root.tag().to_string()));
        }
        Ok(Self { root })
    }
}
