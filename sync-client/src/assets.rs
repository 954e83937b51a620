//! Local and remote asset collection.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use sync_content::{hash_bytes, hash_file, Content};
use sync_core::{resolve_remote_name, Hashed};
use sync_types::{IndexEntry, RemoteIndex};
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::ClientError;
use crate::scan::Scanner;
use crate::transport::Transport;

/// Files hashed at the same time.
const HASH_CONCURRENCY: usize = 32;

/// A local file that survived its source's rules.
#[derive(Debug, Clone)]
pub struct LocalAsset {
    /// Name relative to the source root (what rule tests see).
    pub local_name: String,
    /// Where the bytes come from.
    pub content: Content,
    /// Size in bytes.
    pub size: u64,
    /// Permission bits.
    pub mode: u32,
    /// Modification time in epoch milliseconds.
    pub mtime: i64,
    /// Index of the owning source in [`SyncConfig::sources`].
    pub source: usize,
}

/// Scan every source and key the results by remote name.
///
/// Later sources replace earlier ones on equal remote names. Files dropped by
/// a rule and files that would overwrite the index are left out.
pub async fn local_assets(
    config: &SyncConfig,
) -> Result<BTreeMap<String, LocalAsset>, ClientError> {
    let mut assets = BTreeMap::new();

    for (index, source) in config.sources.iter().enumerate() {
        debug!(directory = %source.directory.display(), "scanning source");
        let mut scanner = Scanner::new(&source.directory);

        while let Some(file) = scanner.next().await? {
            let Some(remote_name) = resolve_remote_name(&source.rules, &file.local_name).await?
            else {
                debug!(local = %file.local_name, "dropped by rules");
                continue;
            };
            if remote_name.is_empty() || remote_name.ends_with('/') {
                warn!(
                    local = %file.local_name,
                    remote = %remote_name,
                    "skipping asset with folder-like remote name"
                );
                continue;
            }
            if remote_name == config.index_name {
                warn!(local = %file.local_name, "skipping asset that would overwrite the index");
                continue;
            }

            let asset = LocalAsset {
                local_name: file.local_name,
                content: Content::File(file.path),
                size: file.size,
                mode: file.mode,
                mtime: file.mtime,
                source: index,
            };
            if let Some(previous) = assets.insert(remote_name.clone(), asset) {
                debug!(remote = %remote_name, replaced = %previous.local_name, "later source wins");
            }
        }
    }

    Ok(assets)
}

/// Load the remote index.
///
/// A missing or unreadable index is not an error: the run continues as if
/// the remote were empty.
pub async fn remote_index<T: Transport + ?Sized>(transport: &T, index_name: &str) -> RemoteIndex {
    let raw = match transport.get(index_name).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "cannot fetch remote index, assuming empty remote");
            return RemoteIndex::new();
        }
    };
    match RemoteIndex::from_bytes(&raw) {
        Ok(index) => {
            debug!(entries = index.len(), "loaded remote index");
            index
        }
        Err(e) => {
            warn!(error = %e, "cannot decode remote index, assuming empty remote");
            RemoteIndex::new()
        }
    }
}

/// Hash every local asset concurrently.
pub async fn hash_assets(
    locals: BTreeMap<String, LocalAsset>,
) -> Result<BTreeMap<String, Hashed<LocalAsset>>, ClientError> {
    stream::iter(locals)
        .map(|(name, asset)| async move {
            let hash = match &asset.content {
                Content::File(path) => hash_file(path).await?,
                Content::Data(data) => hash_bytes(data.as_bytes()),
            };
            let entry = IndexEntry {
                hash,
                size: asset.size,
                mode: asset.mode,
                mtime: asset.mtime,
            };
            Ok::<_, ClientError>((name, Hashed { asset, entry }))
        })
        .buffer_unordered(HASH_CONCURRENCY)
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Source;
    use crate::transport::MockTransport;
    use std::path::Path;
    use sync_core::{Pattern, Rule};
    use url::Url;

    fn touch(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn config() -> SyncConfig {
        SyncConfig::new(Url::parse("file:///unused/").unwrap())
    }

    // ===========================================
    // Local Asset Tests
    // ===========================================

    #[tokio::test]
    async fn rules_rename_and_drop() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "x", "1");
        touch(dir.path(), "keep.txt", "2");

        let source = Source::new(dir.path())
            .with_rule(
                Rule::matching(&[Pattern::Glob("x".into())], &[])
                    .unwrap()
                    .remote_name_template("y"),
            )
            .with_rule(Rule::new().remote_name(|name: String| async move {
                Ok((name != "y").then_some(name))
            }));
        let assets = local_assets(&config().with_source(source)).await.unwrap();

        let names: Vec<_> = assets.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["keep.txt"]);
    }

    #[tokio::test]
    async fn later_source_wins() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        touch(a.path(), "index.html", "from a");
        touch(b.path(), "index.html", "from b");

        let config = config()
            .with_source(Source::new(a.path()))
            .with_source(Source::new(b.path()));
        let assets = local_assets(&config).await.unwrap();

        assert_eq!(assets["index.html"].source, 1);
        let expected = b.path().join("index.html");
        assert_eq!(assets["index.html"].content.path(), Some(expected.as_path()));
    }

    #[tokio::test]
    async fn index_name_is_reserved() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".htdistsync", "not an index");
        touch(dir.path(), "a", "a");

        let assets = local_assets(&config().with_source(Source::new(dir.path())))
            .await
            .unwrap();

        assert!(!assets.contains_key(".htdistsync"));
        assert!(assets.contains_key("a"));
    }

    #[tokio::test]
    async fn missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = config().with_source(Source::new(dir.path().join("nope")));
        let result = local_assets(&config).await;
        assert!(matches!(result, Err(ClientError::Scan { .. })));
    }

    // ===========================================
    // Remote Index Tests
    // ===========================================

    #[tokio::test]
    async fn missing_index_is_empty() {
        let transport = MockTransport::new();
        assert!(remote_index(&transport, ".htdistsync").await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_index_is_empty() {
        let transport = MockTransport::new();
        transport.insert(".htdistsync", "definitely not brotli");
        assert!(remote_index(&transport, ".htdistsync").await.is_empty());
    }

    #[tokio::test]
    async fn stored_index_is_loaded() {
        let mut index = RemoteIndex::new();
        index.insert(
            "a",
            IndexEntry {
                hash: "h".into(),
                size: 1,
                mode: 0o644,
                mtime: 5,
            },
        );
        let transport = MockTransport::new();
        transport.insert("custom-index", index.to_bytes().unwrap());

        assert_eq!(remote_index(&transport, "custom-index").await, index);
    }

    // ===========================================
    // Hashing Tests
    // ===========================================

    #[tokio::test]
    async fn hashes_match_content() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..50 {
            touch(dir.path(), &format!("f{i}"), &format!("content {i}"));
        }
        let locals = local_assets(&config().with_source(Source::new(dir.path())))
            .await
            .unwrap();

        let hashed = hash_assets(locals).await.unwrap();

        assert_eq!(hashed.len(), 50);
        assert_eq!(hashed["f7"].entry.hash, hash_bytes(b"content 7"));
        assert_eq!(hashed["f7"].entry.size, 9);
    }

    #[tokio::test]
    async fn vanished_file_fails_hashing() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "gone", "x");
        let locals = local_assets(&config().with_source(Source::new(dir.path())))
            .await
            .unwrap();
        std::fs::remove_file(dir.path().join("gone")).unwrap();

        let result = hash_assets(locals).await;
        assert!(matches!(result, Err(ClientError::Content(_))));
    }
}
