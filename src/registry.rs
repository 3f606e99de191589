//! Routing URLs to the host implementation that understands them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::fetch::FetchOptions;
use crate::node::{NodeId, Tree};
use crate::sink::ApplySink;

/// A file-hosting service the crate can mirror trees from.
///
/// Every implementation exposes the same single entry point, so callers
/// never need to know which concrete host is behind a URL.
#[async_trait]
pub trait FileHost: Send + Sync {
    /// Hostname this implementation answers for (e.g. `drive.google.com`).
    fn host(&self) -> &'static str;

    /// Resolves `target` (a URL when `is_url`, a raw host identifier
    /// otherwise) into a tree, invoking `sink` per resolved node.
    ///
    /// # Errors
    ///
    /// Per-entry remote failures are absorbed by the walk; errors here are
    /// node construction and sink failures.
    async fn fetch(
        &self,
        target: &str,
        is_url: bool,
        options: &FetchOptions,
        sink: &dyn ApplySink,
    ) -> Result<(Tree, NodeId)>;
}

/// Registry mapping hostnames to [`FileHost`] implementations.
///
/// Populated at startup by [`register`](Self::register); new hosts are
/// added by registration, not by editing a dispatch list.
#[derive(Default)]
pub struct HostRegistry {
    hosts: HashMap<String, Arc<dyn FileHost>>,
}

impl HostRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an implementation under its declared host. A second
    /// registration for the same host replaces the first.
    pub fn register(&mut self, host: Arc<dyn FileHost>) {
        self.hosts.insert(host.host().to_owned(), host);
    }

    /// Number of registered hosts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Selects the implementation for `url`'s host: exact hostname match
    /// first, then a dot-boundary suffix match (`docs.drive.google.com`
    /// resolves to a registration for `drive.google.com`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoHostInterface`] when the URL has no parseable
    /// host or no registration matches.
    pub fn resolve(&self, url: &str) -> Result<Arc<dyn FileHost>> {
        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .ok_or_else(|| Error::NoHostInterface {
                host: url.to_owned(),
            })?;

        if let Some(found) = self.hosts.get(&host) {
            return Ok(Arc::clone(found));
        }
        for (registered, implementation) in &self.hosts {
            if host.ends_with(registered)
                && host[..host.len() - registered.len()].ends_with('.')
            {
                return Ok(Arc::clone(implementation));
            }
        }
        Err(Error::NoHostInterface { host })
    }
}
