//! Ingestion driver: candidate posts in, mirrored trees out.
//!
//! For each post the driver extracts candidate URLs, routes each through
//! the host registry, fetches the linked tree into a per-link directory
//! under the post's title, and records the outcome in the ledger. A URL
//! with no matching host and a fetch that fails are both logged and
//! skipped; one bad post never stops the run.

use std::path::Path;

use chrono::Utc;

use crate::config::FetchConfig;
use crate::error::Result;
use crate::fetch::FetchOptions;
use crate::ledger::{Ledger, LedgerEntry};
use crate::node::sanitize_name;
use crate::reddit::PostSource;
use crate::registry::HostRegistry;
use crate::sink::ApplySink;

/// Counters summarizing one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Posts returned by the source.
    pub posts_seen: usize,
    /// Posts skipped because the ledger already had them.
    pub posts_skipped: usize,
    /// Posts processed (and recorded) this run.
    pub posts_processed: usize,
    /// Trees successfully fetched.
    pub trees_fetched: usize,
    /// URLs no registered host answered for.
    pub urls_unmatched: usize,
}

/// Runs one ingestion pass.
///
/// The ledger is saved after every processed post so an interrupted run
/// loses at most the post in flight.
///
/// # Errors
///
/// Returns an error when the source cannot list posts or the ledger
/// cannot be saved. Per-URL failures are logged and counted instead.
pub async fn run<S: PostSource>(
    source: &S,
    registry: &HostRegistry,
    ledger: &mut Ledger,
    ledger_path: &Path,
    config: &FetchConfig,
    data_dir: &Path,
    sink: &dyn ApplySink,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();

    for post in source.posts().await? {
        stats.posts_seen += 1;

        if !config.overwrite && ledger.contains(&post.id) {
            stats.posts_skipped += 1;
            continue;
        }

        let urls = post.candidate_urls();
        if urls.is_empty() {
            log::warn!("no URLs found in post (id={})", post.id);
        }

        let post_dir = data_dir.join(sanitize_name(&post.title));
        for (i, url) in urls.iter().enumerate() {
            let host = match registry.resolve(url) {
                Ok(host) => host,
                Err(e) => {
                    log::warn!("no matching host interface for {url}: {e}");
                    stats.urls_unmatched += 1;
                    continue;
                }
            };

            let options = FetchOptions::new(post_dir.join(format!("link{i}")));
            match host.fetch(url, true, &options, sink).await {
                Ok((tree, head)) => {
                    stats.trees_fetched += 1;
                    log::info!(
                        "(post={}) fetched {} node(s) from {url}",
                        post.id,
                        tree.descendants(head).count()
                    );
                }
                Err(e) => log::error!("(post={}) fetching {url} failed: {e}", post.id),
            }
        }

        ledger.record(
            post.id.clone(),
            LedgerEntry {
                permalink: post.permalink.clone(),
                processed_at: Utc::now(),
                urls,
                dest: post_dir.to_string_lossy().into_owned(),
            },
        );
        ledger.save(ledger_path)?;
        stats.posts_processed += 1;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::node::{NodeId, Tree};
    use crate::reddit::Post;
    use crate::registry::FileHost;
    use crate::sink::NoSink;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct StaticSource(Vec<Post>);

    #[async_trait]
    impl PostSource for StaticSource {
        async fn posts(&self) -> Result<Vec<Post>> {
            Ok(self.0.clone())
        }
    }

    /// Records every fetch target and its target directory.
    #[derive(Default)]
    struct FakeHost {
        calls: Mutex<Vec<(String, PathBuf)>>,
    }

    #[async_trait]
    impl FileHost for FakeHost {
        fn host(&self) -> &'static str {
            "drive.google.com"
        }

        async fn fetch(
            &self,
            target: &str,
            _is_url: bool,
            options: &FetchOptions,
            _sink: &dyn ApplySink,
        ) -> Result<(Tree, NodeId)> {
            self.calls
                .lock()
                .unwrap()
                .push((target.to_owned(), options.target_dir.clone()));
            let mut tree = Tree::new(&options.target_dir);
            let head = tree.insert_head();
            Ok((tree, head))
        }
    }

    fn link_post(id: &str, title: &str, url: &str) -> Post {
        Post {
            id: id.into(),
            title: title.into(),
            permalink: format!("/r/x/{id}"),
            body: String::new(),
            link_url: Some(url.into()),
            is_self: false,
        }
    }

    async fn run_with(
        posts: Vec<Post>,
        ledger: &mut Ledger,
        ledger_path: &Path,
        data_dir: &Path,
        config: &FetchConfig,
    ) -> (IngestStats, Arc<FakeHost>) {
        let host = Arc::new(FakeHost::default());
        let mut registry = HostRegistry::new();
        registry.register(Arc::clone(&host) as Arc<dyn FileHost>);
        let stats = run(
            &StaticSource(posts),
            &registry,
            ledger,
            ledger_path,
            config,
            data_dir,
            &NoSink,
        )
        .await
        .unwrap();
        (stats, host)
    }

    #[tokio::test]
    async fn processes_posts_and_records_ledger() {
        let dir = TempDir::new().unwrap();
        let ledger_path = dir.path().join("ledger.toml");
        let mut ledger = Ledger::new();

        let posts = vec![
            link_post("p1", "Sonata", "https://drive.google.com/file/d/abc"),
            link_post("p2", "Etude / Op.10", "https://drive.google.com/file/d/def"),
        ];
        let (stats, host) = run_with(
            posts,
            &mut ledger,
            &ledger_path,
            dir.path(),
            &FetchConfig::default(),
        )
        .await;

        assert_eq!(stats.posts_seen, 2);
        assert_eq!(stats.posts_processed, 2);
        assert_eq!(stats.trees_fetched, 2);

        let calls = host.calls.lock().unwrap();
        assert_eq!(calls[0].1, dir.path().join("Sonata/link0"));
        // Separator in the title cannot introduce a path level.
        assert_eq!(calls[1].1, dir.path().join("Etude _ Op.10/link0"));

        // Ledger was persisted and knows both posts.
        let reloaded = Ledger::load(&ledger_path).unwrap();
        assert!(reloaded.contains("p1") && reloaded.contains("p2"));
    }

    #[tokio::test]
    async fn skips_ledgered_posts_unless_overwrite() {
        let dir = TempDir::new().unwrap();
        let ledger_path = dir.path().join("ledger.toml");
        let mut ledger = Ledger::new();
        ledger.record(
            "p1",
            LedgerEntry {
                permalink: "/r/x/p1".into(),
                processed_at: Utc::now(),
                urls: vec![],
                dest: String::new(),
            },
        );

        let posts = vec![link_post("p1", "Sonata", "https://drive.google.com/file/d/abc")];
        let (stats, host) = run_with(
            posts.clone(),
            &mut ledger,
            &ledger_path,
            dir.path(),
            &FetchConfig::default(),
        )
        .await;
        assert_eq!(stats.posts_skipped, 1);
        assert_eq!(stats.posts_processed, 0);
        assert!(host.calls.lock().unwrap().is_empty());

        let overwrite = FetchConfig::default().with_overwrite(true);
        let (stats, host) =
            run_with(posts, &mut ledger, &ledger_path, dir.path(), &overwrite).await;
        assert_eq!(stats.posts_skipped, 0);
        assert_eq!(stats.posts_processed, 1);
        assert_eq!(host.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unmatched_urls_are_counted_not_fatal() {
        let dir = TempDir::new().unwrap();
        let ledger_path = dir.path().join("ledger.toml");
        let mut ledger = Ledger::new();

        let posts = vec![
            link_post("p1", "Elsewhere", "https://example.com/file.pdf"),
            link_post("p2", "Sonata", "https://drive.google.com/file/d/abc"),
        ];
        let (stats, host) = run_with(
            posts,
            &mut ledger,
            &ledger_path,
            dir.path(),
            &FetchConfig::default(),
        )
        .await;

        assert_eq!(stats.urls_unmatched, 1);
        assert_eq!(stats.trees_fetched, 1);
        assert_eq!(stats.posts_processed, 2);
        assert_eq!(host.calls.lock().unwrap().len(), 1);
        // The unmatched post is still ledgered so it is not retried forever.
        assert!(ledger.contains("p1"));
    }

    #[tokio::test]
    async fn self_post_with_multiple_urls_gets_numbered_link_dirs() {
        let dir = TempDir::new().unwrap();
        let ledger_path = dir.path().join("ledger.toml");
        let mut ledger = Ledger::new();

        let posts = vec![Post {
            id: "p1".into(),
            title: "Bundle".into(),
            permalink: "/r/x/p1".into(),
            body: "https://drive.google.com/file/d/a and https://drive.google.com/file/d/b"
                .into(),
            link_url: None,
            is_self: true,
        }];
        let (stats, host) = run_with(
            posts,
            &mut ledger,
            &ledger_path,
            dir.path(),
            &FetchConfig::default(),
        )
        .await;

        assert_eq!(stats.trees_fetched, 2);
        let calls = host.calls.lock().unwrap();
        assert_eq!(calls[0].1, dir.path().join("Bundle/link0"));
        assert_eq!(calls[1].1, dir.path().join("Bundle/link1"));
    }

    #[tokio::test]
    async fn source_failure_surfaces() {
        struct FailingSource;

        #[async_trait]
        impl PostSource for FailingSource {
            async fn posts(&self) -> Result<Vec<Post>> {
                Err(Error::Authentication("token revoked".into()))
            }
        }

        let dir = TempDir::new().unwrap();
        let mut ledger = Ledger::new();
        let registry = HostRegistry::new();
        let result = run(
            &FailingSource,
            &registry,
            &mut ledger,
            &dir.path().join("ledger.toml"),
            &FetchConfig::default(),
            dir.path(),
            &NoSink,
        )
        .await;

        assert!(matches!(result, Err(Error::Authentication(_))));
    }
}
