//! Recursive remote-tree fetching.
//!
//! [`fetch_tree`] resolves one remote identifier (file or folder) into a
//! populated [`Tree`], downloading file bytes and handing every resolved
//! node to an [`ApplySink`]. The walk is strictly sequential: folder
//! children are visited in listing order, one request at a time, so sink
//! invocations are deterministic (children before their folder, siblings
//! in listing order).
//!
//! Failure is isolated per entry: a metadata, listing, or content error
//! for one entry is logged and the walk continues with the entry's
//! siblings. A fetch that hits partial failures still returns whatever
//! part of the tree was resolved.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::fs::same_file;
use crate::node::{ContentKind, Metadata, NodeId, Tree};
use crate::sink::ApplySink;

/// The three calls a host must answer for the tree walk.
///
/// Implementations map these onto the real remote API's request and
/// response shapes; the walk itself never sees anything host-specific.
#[async_trait]
pub trait HostApi: Send + Sync {
    /// Descriptive fields for one entry (must include name and MIME type).
    async fn metadata(&self, id: &str) -> Result<Metadata>;

    /// Identifiers of a folder's immediate children, in listing order.
    async fn children(&self, folder_id: &str) -> Result<Vec<String>>;

    /// An entry's full content.
    async fn content(&self, id: &str) -> Result<Bytes>;
}

/// Per-fetch settings.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Local paths that must never be overwritten. An entry whose
    /// would-be path is one of these (by filesystem identity) is skipped
    /// along with everything beneath it.
    pub paths_to_avoid: Vec<PathBuf>,
    /// Base directory all node paths are rooted at.
    pub target_dir: PathBuf,
}

impl FetchOptions {
    /// Creates options targeting `target_dir` with nothing to avoid.
    #[must_use]
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            paths_to_avoid: Vec::new(),
            target_dir: target_dir.into(),
        }
    }

    /// Sets the protected paths.
    #[must_use]
    pub fn with_paths_to_avoid(mut self, paths: Vec<PathBuf>) -> Self {
        self.paths_to_avoid = paths;
        self
    }
}

/// Resolves `id` into a tree rooted at a synthetic head node.
///
/// Returns the tree and the head's handle; the head's children form the
/// resolved hierarchy (zero children when the fetch failed immediately).
///
/// # Errors
///
/// Per-entry host failures never surface here. Errors are limited to node
/// construction (an entry whose metadata carries no name) and sink
/// failures.
pub async fn fetch_tree<A: HostApi>(
    api: &A,
    id: &str,
    options: &FetchOptions,
    sink: &dyn ApplySink,
) -> Result<(Tree, NodeId)> {
    let mut tree = Tree::new(&options.target_dir);
    let head = tree.insert_head();

    visit(api, &mut tree, head, id, options, sink).await?;

    log::info!(
        "(id={id}) finished fetching tree, total nodes: {}",
        tree.descendants(head).count()
    );
    Ok((tree, head))
}

/// Visits one entry under `parent` and returns the parent handle, which
/// every early exit leaves unchanged so a folder walk continues past a
/// failed or skipped child without special-casing.
fn visit<'a, A: HostApi>(
    api: &'a A,
    tree: &'a mut Tree,
    parent: NodeId,
    id: &'a str,
    options: &'a FetchOptions,
    sink: &'a dyn ApplySink,
) -> BoxFuture<'a, Result<NodeId>> {
    Box::pin(async move {
        log::debug!("(id={id}) visiting");

        let metadata = match api.metadata(id).await {
            Ok(m) => m,
            Err(e) => {
                log::warn!("(id={id}) metadata retrieval failed: {e}");
                return Ok(parent);
            }
        };

        // Two-phase construction: compute the would-be path first and only
        // attach a node once the entry is known to be wanted.
        let Some(name) = metadata.name().map(str::to_owned) else {
            return Err(Error::InvalidMetadata);
        };
        let candidate = tree.candidate_path(Some(parent), &name);

        if is_avoided(&candidate, &options.paths_to_avoid).await {
            return Ok(parent);
        }

        match metadata.kind() {
            kind if kind.is_downloadable() => {
                let content = match api.content(id).await {
                    Ok(c) => c,
                    Err(e) => {
                        log::warn!("(id={id}) content retrieval failed: {e}");
                        return Ok(parent);
                    }
                };
                if content.is_empty() {
                    log::warn!("(id={id}) empty content");
                }
                let node = tree.insert(content, metadata, None, Some(parent))?;
                sink.apply(tree.get(node)).await?;
                log::debug!(
                    "(id={id}) stored {kind:?} node at {}",
                    tree.get(node).file_path().display()
                );
            }
            ContentKind::Folder => {
                let child_ids = match api.children(id).await {
                    Ok(c) => c,
                    Err(e) => {
                        log::warn!("(id={id}) folder listing failed: {e}");
                        return Ok(parent);
                    }
                };
                log::debug!("(id={id}) folder with {} children", child_ids.len());

                let mut folder = tree.insert(Bytes::new(), metadata, None, Some(parent))?;
                for child in &child_ids {
                    // Each call hands back the folder unchanged, keeping
                    // sibling order identical to listing order.
                    folder = visit(api, &mut *tree, folder, child, options, sink).await?;
                }
                sink.apply(tree.get(folder)).await?;
            }
            _ => {
                log::warn!(
                    "(id={id}) unsupported content type: {}",
                    metadata.mime_type().unwrap_or("<none>")
                );
            }
        }

        log::info!("(id={id}) finished");
        Ok(parent)
    })
}

/// True when `candidate` is (by filesystem identity) one of the protected
/// paths. A candidate that does not exist on disk yet can never match.
async fn is_avoided(candidate: &Path, paths_to_avoid: &[PathBuf]) -> bool {
    for path in paths_to_avoid {
        log::debug!(
            "checking path identity: {} ?= {}",
            path.display(),
            candidate.display()
        );
        if same_file(path, candidate).await {
            log::info!("refusing to overwrite {}", path.display());
            return true;
        }
    }
    false
}
