//! Apply-callback contract: what happens to each fully resolved node.
//!
//! Fetching never writes to disk itself; it hands every resolved file and
//! completed folder to an [`ApplySink`]. The canonical implementation is
//! [`DiskSink`], which picks a file extension from the node's content kind
//! and writes the bytes under the node's `file_path`.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::fs::{FileSystem, TokioFileSystem};
use crate::node::NodeRef;

/// Receives every fully resolved node during a fetch.
///
/// File nodes arrive with their content; folder nodes arrive after all of
/// their children have been applied.
#[async_trait]
pub trait ApplySink: Send + Sync {
    /// Called once per resolved node, in resolution order.
    ///
    /// # Errors
    ///
    /// An error aborts the fetch that invoked the sink.
    async fn apply(&self, node: NodeRef<'_>) -> Result<()>;
}

/// A null sink that discards all nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSink;

#[async_trait]
impl ApplySink for NoSink {
    async fn apply(&self, _node: NodeRef<'_>) -> Result<()> {
        Ok(())
    }
}

/// Writes downloadable nodes to disk, creating missing parent directories
/// and appending the kind's extension when the name lacks it. Folders and
/// unclassified nodes are a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSink<F: FileSystem = TokioFileSystem> {
    fs: F,
}

impl DiskSink<TokioFileSystem> {
    /// Creates a disk sink over the default file system.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fs: TokioFileSystem,
        }
    }
}

impl<F: FileSystem> DiskSink<F> {
    /// Creates a disk sink over a custom file system implementation.
    #[must_use]
    pub const fn with_fs(fs: F) -> Self {
        Self { fs }
    }
}

#[async_trait]
impl<F: FileSystem> ApplySink for DiskSink<F> {
    async fn apply(&self, node: NodeRef<'_>) -> Result<()> {
        let Some(ext) = node.kind().extension() else {
            return Ok(());
        };

        let path = node.file_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs.create_dir_all(parent).await?;
        }

        let out: PathBuf = if path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)) {
            path.to_path_buf()
        } else {
            let mut s = path.as_os_str().to_owned();
            s.push(".");
            s.push(ext);
            PathBuf::from(s)
        };

        self.fs.write(&out, node.content()).await?;
        log::debug!("wrote {}", out.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{MIME_FOLDER, MIME_PDF, MIME_ZIP, Metadata, Tree};
    use bytes::Bytes;
    use serde_json::json;
    use tempfile::TempDir;

    fn meta(name: &str, mime: &str) -> Metadata {
        Metadata::from_value(json!({ "name": name, "mimeType": mime }))
    }

    #[test]
    fn no_sink_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NoSink>();
        assert_send_sync::<DiskSink>();
    }

    #[tokio::test]
    async fn writes_document_appending_extension() {
        let dir = TempDir::new().unwrap();
        let mut tree = Tree::new(dir.path());
        let head = tree.insert_head();
        let id = tree
            .insert(
                Bytes::from_static(b"%PDF-1.4"),
                meta("sonata", MIME_PDF),
                None,
                Some(head),
            )
            .unwrap();

        DiskSink::new().apply(tree.get(id)).await.unwrap();

        let written = std::fs::read(dir.path().join("sonata.pdf")).unwrap();
        assert_eq!(written, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn keeps_existing_extension() {
        let dir = TempDir::new().unwrap();
        let mut tree = Tree::new(dir.path());
        let head = tree.insert_head();
        let id = tree
            .insert(
                Bytes::from_static(b"PK\x03\x04"),
                meta("bundle.ZIP", MIME_ZIP),
                None,
                Some(head),
            )
            .unwrap();

        DiskSink::new().apply(tree.get(id)).await.unwrap();

        assert!(dir.path().join("bundle.ZIP").exists());
        assert!(!dir.path().join("bundle.ZIP.zip").exists());
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let mut tree = Tree::new(dir.path());
        let head = tree.insert_head();
        let folder = tree
            .insert(Bytes::new(), meta("album", MIME_FOLDER), None, Some(head))
            .unwrap();
        let id = tree
            .insert(
                Bytes::from_static(b"%PDF-1.4"),
                meta("track.pdf", MIME_PDF),
                None,
                Some(folder),
            )
            .unwrap();

        DiskSink::new().apply(tree.get(id)).await.unwrap();

        assert!(dir.path().join("album/track.pdf").exists());
    }

    #[tokio::test]
    async fn folders_and_other_kinds_are_noops() {
        let dir = TempDir::new().unwrap();
        let mut tree = Tree::new(dir.path().join("out"));
        let head = tree.insert_head();
        let folder = tree
            .insert(Bytes::new(), meta("album", MIME_FOLDER), None, Some(head))
            .unwrap();
        let other = tree
            .insert(
                Bytes::from_static(b"hi"),
                meta("notes.txt", "text/plain"),
                None,
                Some(head),
            )
            .unwrap();

        let sink = DiskSink::new();
        sink.apply(tree.get(folder)).await.unwrap();
        sink.apply(tree.get(other)).await.unwrap();

        // Nothing written at all, not even the base directory.
        assert!(!dir.path().join("out").exists());
    }
}
