//! scores-dl - A library for mirroring file-hosting trees linked from
//! social-media posts.
//!
//! Posts are scanned for file-hosting URLs; each URL is routed to the
//! registered host implementation for its hostname, which recursively
//! resolves the remote file or folder into an in-memory [`node::Tree`]
//! and hands every resolved node to an apply sink for persistence.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use scores_dl::hosts::GoogleDriveHost;
//! use scores_dl::{DiskSink, FetchOptions, HostRegistry};
//!
//! # async fn example() -> scores_dl::Result<()> {
//! // Authenticate against Drive and register the host.
//! let drive = GoogleDriveHost::connect(Path::new("secrets/drive_user_token.json")).await?;
//! let mut registry = HostRegistry::new();
//! registry.register(Arc::new(drive));
//!
//! // Route a URL and mirror the linked tree to disk.
//! let url = "https://drive.google.com/drive/folders/19FHcDNj7pB59UEC2Qr-1esLnpwB7sBgl";
//! let host = registry.resolve(url)?;
//! let options = FetchOptions::new("data/scores");
//! let (tree, head) = host.fetch(url, true, &options, &DiskSink::new()).await?;
//! println!("fetched {} node(s)", tree.descendants(head).count());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod fetch;
pub mod fs;
pub mod hosts;
pub mod ingest;
pub mod ledger;
pub mod node;
pub mod reddit;
pub mod registry;
pub mod sink;
pub mod url;

// Re-export main types for convenience
pub use config::{AppConfig, FetchConfig, PathConfig};
pub use error::{Error, Result};
pub use fetch::{FetchOptions, HostApi, fetch_tree};
pub use fs::{FileSystem, TokioFileSystem, same_file};
pub use ingest::IngestStats;
pub use ledger::{Ledger, LedgerEntry};
pub use node::{ContentKind, HEAD_NAME, Metadata, NodeId, NodeRef, Tree, sanitize_name};
pub use reddit::{Post, PostSource, RedditClient};
pub use registry::{FileHost, HostRegistry};
pub use sink::{ApplySink, DiskSink, NoSink};
pub use url::extract_urls;
