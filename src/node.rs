//! In-memory tree model mirroring a remote file hierarchy.
//!
//! A [`Tree`] owns every node and hands out copyable [`NodeId`] handles, the
//! same shape as a remote host's node table. Each node carries its content
//! bytes, the host metadata it was built from, and a `file_path` derived
//! from its ancestor chain at the moment of attachment.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde_json::Value;

use crate::error::{Error, Result};

/// Reserved name of the synthetic root of a fetch result. Contributes an
/// empty segment to every descendant's `file_path`.
pub const HEAD_NAME: &str = "__head__";

/// MIME type of a PDF document.
pub const MIME_PDF: &str = "application/pdf";
/// MIME type of a ZIP archive.
pub const MIME_ZIP: &str = "application/zip";
/// Alternate ZIP MIME type some hosts report.
pub const MIME_ZIP_COMPAT: &str = "application/x-zip-compressed";
/// MIME type a host uses for folders.
pub const MIME_FOLDER: &str = "application/vnd.google-apps.folder";

/// Classification of a remote entry's declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// A downloadable document (PDF).
    Document,
    /// A downloadable archive (ZIP).
    Archive,
    /// A folder with children of its own.
    Folder,
    /// Anything else; never downloaded.
    Other,
}

impl ContentKind {
    /// Classifies a MIME string.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            MIME_PDF => Self::Document,
            MIME_ZIP | MIME_ZIP_COMPAT => Self::Archive,
            MIME_FOLDER => Self::Folder,
            _ => Self::Other,
        }
    }

    /// Returns true for kinds whose bytes are fetched from the host.
    #[must_use]
    pub const fn is_downloadable(self) -> bool {
        matches!(self, Self::Document | Self::Archive)
    }

    /// File extension (without the dot) used when persisting this kind.
    #[must_use]
    pub const fn extension(self) -> Option<&'static str> {
        match self {
            Self::Document => Some("pdf"),
            Self::Archive => Some("zip"),
            Self::Folder | Self::Other => None,
        }
    }
}

/// Host-specific descriptive fields for one remote entry.
///
/// Stored as the raw JSON object the host returned; `name` and `mimeType`
/// are the two fields the tree itself relies on.
#[derive(Debug, Clone, Default)]
pub struct Metadata(serde_json::Map<String, Value>);

impl Metadata {
    /// Creates empty metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value; anything but an object becomes empty metadata.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Looks up a raw metadata field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The entry's name, if the host provided one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// The entry's declared MIME type, if the host provided one.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.0.get("mimeType").and_then(Value::as_str)
    }

    /// Classifies the declared MIME type; missing types are [`ContentKind::Other`].
    #[must_use]
    pub fn kind(&self) -> ContentKind {
        self.mime_type().map_or(ContentKind::Other, ContentKind::from_mime)
    }
}

/// Handle to a node inside one [`Tree`]. Only valid for the tree that
/// created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct NodeData {
    content: Bytes,
    metadata: Metadata,
    name: String,
    file_path: PathBuf,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Ownership tree of fetched remote entries.
#[derive(Debug)]
pub struct Tree {
    base_dir: PathBuf,
    nodes: Vec<NodeData>,
}

impl Tree {
    /// Creates an empty tree whose node paths are rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            nodes: Vec::new(),
        }
    }

    /// The configured base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of nodes in the tree (detached subtrees included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree holds no nodes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts the synthetic head node: no parent, reserved name, empty
    /// content. Its descendants' paths start directly at the base directory.
    pub fn insert_head(&mut self) -> NodeId {
        let file_path = self.path_for(None, HEAD_NAME);
        self.push(NodeData {
            content: Bytes::new(),
            metadata: Metadata::new(),
            name: HEAD_NAME.to_owned(),
            file_path,
            parent: None,
            children: Vec::new(),
        })
    }

    /// Inserts a node. When `name` is omitted it is taken from
    /// `metadata.name`. `file_path` is computed immediately from the
    /// resulting ancestor chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMetadata`] when no name can be determined.
    pub fn insert(
        &mut self,
        content: Bytes,
        metadata: Metadata,
        name: Option<&str>,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let name = match name {
            Some(n) => n.to_owned(),
            None => metadata.name().ok_or(Error::InvalidMetadata)?.to_owned(),
        };
        let file_path = self.path_for(parent, &name);
        let id = self.push(NodeData {
            content,
            metadata,
            name,
            file_path,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        Ok(id)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    /// Borrows a node by handle.
    ///
    /// # Panics
    ///
    /// Panics if `id` did not come from this tree.
    #[must_use]
    pub fn get(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef {
            id,
            data: &self.nodes[id.0],
        }
    }

    /// The `file_path` a child named `name` WOULD have under `parent`,
    /// computed without attaching anything. This is how callers decide
    /// whether an entry is worth fetching before any node exists for it.
    #[must_use]
    pub fn candidate_path(&self, parent: Option<NodeId>, name: &str) -> PathBuf {
        self.path_for(parent, name)
    }

    /// Moves `id` under `new_parent` (or detaches it entirely when `None`),
    /// then recomputes `file_path` for the node and every descendant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cycle`] when `new_parent` is the node itself or one
    /// of its descendants; the tree is left unchanged.
    pub fn reparent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> Result<()> {
        if let Some(p) = new_parent
            && (p == id || self.is_below(p, id))
        {
            return Err(Error::Cycle);
        }
        if let Some(old) = self.nodes[id.0].parent {
            self.nodes[old.0].children.retain(|c| *c != id);
        }
        self.nodes[id.0].parent = new_parent;
        if let Some(p) = new_parent {
            self.nodes[p.0].children.push(id);
        }
        self.recompute_paths(id);
        Ok(())
    }

    /// Pre-order traversal of everything below `id` (excluding `id`
    /// itself). Lazy; a fresh call reflects the tree as it stands then.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.nodes[id.0].children.clone();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// True when `id` sits strictly below `ancestor`.
    fn is_below(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut cur = self.nodes[id.0].parent;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.nodes[p.0].parent;
        }
        false
    }

    fn path_for(&self, parent: Option<NodeId>, name: &str) -> PathBuf {
        let mut ancestors: Vec<&str> = Vec::new();
        let mut cur = parent;
        while let Some(id) = cur {
            let data = &self.nodes[id.0];
            ancestors.push(&data.name);
            cur = data.parent;
        }

        let mut path = self.base_dir.clone();
        for ancestor in ancestors.iter().rev() {
            push_segment(&mut path, ancestor);
        }
        push_segment(&mut path, name);
        path
    }

    fn recompute_paths(&mut self, id: NodeId) {
        let (parent, name) = {
            let data = &self.nodes[id.0];
            (data.parent, data.name.clone())
        };
        self.nodes[id.0].file_path = self.path_for(parent, &name);
        let children = self.nodes[id.0].children.clone();
        for child in children {
            self.recompute_paths(child);
        }
    }
}

fn push_segment(path: &mut PathBuf, name: &str) {
    let segment = sanitize_name(name);
    if !segment.is_empty() {
        path.push(segment);
    }
}

/// Rewrites path separators embedded in a name so the component cannot
/// introduce further path levels. The head sentinel maps to the empty
/// string.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    if name == HEAD_NAME {
        return String::new();
    }
    name.replace(['/', '\\'], "_")
}

/// Borrowed view of one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    id: NodeId,
    data: &'a NodeData,
}

impl<'a> NodeRef<'a> {
    /// This node's handle.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// The node's (unsanitized) name.
    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.data.name
    }

    /// The node's content bytes; empty for folders and the head.
    #[must_use]
    pub const fn content(&self) -> &'a Bytes {
        &self.data.content
    }

    /// Host metadata the node was built from.
    #[must_use]
    pub const fn metadata(&self) -> &'a Metadata {
        &self.data.metadata
    }

    /// Content classification, derived from the metadata.
    #[must_use]
    pub fn kind(&self) -> ContentKind {
        self.data.metadata.kind()
    }

    /// The materialized filesystem path for this node.
    #[must_use]
    pub fn file_path(&self) -> &'a Path {
        &self.data.file_path
    }

    /// Parent handle, `None` for roots.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.data.parent
    }

    /// Child handles in attachment order.
    #[must_use]
    pub fn children(&self) -> &'a [NodeId] {
        &self.data.children
    }

    /// True for the synthetic head node.
    #[must_use]
    pub fn is_head(&self) -> bool {
        self.data.name == HEAD_NAME
    }
}

/// Lazy pre-order iterator over a subtree, produced by [`Tree::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.get(id);
        self.stack.extend(node.children().iter().rev().copied());
        Some(node)
    }
}
