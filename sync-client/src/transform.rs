//! Transform pipeline for changed assets.
//!
//! Content is read lazily: only when the first applicable transform is
//! reached, and at most once per asset. Assets without an applicable
//! transform keep their unread file locator until upload.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::collections::BTreeMap;
use sync_content::{Content, Data};
use sync_core::{transforms_for, Hashed};

use crate::assets::LocalAsset;
use crate::config::SyncConfig;
use crate::error::ClientError;

/// Assets transformed at the same time.
const TRANSFORM_CONCURRENCY: usize = 16;

/// Content ready to upload.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Final content (transformed data, or the untouched file).
    pub content: Content,
    /// Permission bits to set after the upload.
    pub mode: u32,
}

/// Run each asset's transforms in rule order.
pub async fn transform_assets(
    config: &SyncConfig,
    update: &BTreeMap<String, Hashed<LocalAsset>>,
) -> Result<BTreeMap<String, Upload>, ClientError> {
    stream::iter(update)
        .map(|(remote_name, hashed)| async move {
            let content = transform_one(config, remote_name, &hashed.asset).await?;
            let upload = Upload {
                content,
                mode: hashed.entry.mode,
            };
            Ok::<_, ClientError>((remote_name.clone(), upload))
        })
        .buffer_unordered(TRANSFORM_CONCURRENCY)
        .try_collect()
        .await
}

async fn transform_one(
    config: &SyncConfig,
    remote_name: &str,
    asset: &LocalAsset,
) -> Result<Content, ClientError> {
    let rules = config
        .sources
        .get(asset.source)
        .map(|s| s.rules.as_slice())
        .unwrap_or_default();

    let mut data: Option<Data> = None;
    for transform in transforms_for(rules, &asset.local_name) {
        let input = match data.take() {
            Some(data) => data,
            None => {
                config.info(&format!("generating {remote_name}"));
                asset.content.clone().load().await?
            }
        };
        data = Some(transform(input, asset.local_name.clone()).await?);
    }

    Ok(match data {
        Some(data) => Content::Data(data),
        None => asset.content.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Source;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use sync_content::Codec;
    use sync_core::{Pattern, Rule};
    use sync_types::IndexEntry;
    use url::Url;

    fn asset(dir: &Path, name: &str, content: &str) -> Hashed<LocalAsset> {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        Hashed {
            asset: LocalAsset {
                local_name: name.to_string(),
                content: Content::File(path),
                size: content.len() as u64,
                mode: 0o644,
                mtime: 0,
                source: 0,
            },
            entry: IndexEntry {
                hash: "h".into(),
                size: content.len() as u64,
                mode: 0o644,
                mtime: 0,
            },
        }
    }

    fn glob(p: &str) -> Pattern {
        Pattern::Glob(p.to_string())
    }

    #[tokio::test]
    async fn untransformed_assets_stay_unread() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig::new(Url::parse("file:///r/").unwrap())
            .with_source(Source::new(dir.path()));
        let update = BTreeMap::from([("a.txt".to_string(), asset(dir.path(), "a.txt", "x"))]);

        let out = transform_assets(&config, &update).await.unwrap();

        assert!(matches!(out["a.txt"].content, Content::File(_)));
        assert_eq!(out["a.txt"].mode, 0o644);
    }

    #[tokio::test]
    async fn transforms_chain_in_rule_order() {
        let dir = tempfile::tempdir().unwrap();
        let source = Source::new(dir.path())
            .with_rule(Rule::new().transform(|data: Data, _: String| async move {
                Ok(Data::from(format!("{}+a", data.as_str())))
            }))
            .with_rule(
                Rule::matching(&[glob("*.css")], &[])
                    .unwrap()
                    .transform(|data: Data, _: String| async move {
                        Ok(Data::from(format!("{}+css", data.as_str())))
                    }),
            )
            .with_rule(Rule::new().transform(|data: Data, name: String| async move {
                Ok(Data::from(format!("{}+{name}", data.as_str())))
            }));
        let config = SyncConfig::new(Url::parse("file:///r/").unwrap()).with_source(source);
        let update = BTreeMap::from([
            ("site.css".to_string(), asset(dir.path(), "site.css", "s")),
            ("page.html".to_string(), asset(dir.path(), "page.html", "p")),
        ]);

        let out = transform_assets(&config, &update).await.unwrap();

        let text = |name: &str| match &out[name].content {
            Content::Data(d) => d.as_str().to_string(),
            Content::File(_) => panic!("expected transformed data"),
        };
        assert_eq!(text("site.css"), "s+a+css+site.css");
        assert_eq!(text("page.html"), "p+a+page.html");
    }

    #[tokio::test]
    async fn content_is_loaded_once_and_narrated() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);

        let source = Source::new(dir.path())
            .with_rule(Rule::new().codec(Codec::Gzip))
            .with_rule(Rule::new().transform(move |data: Data, _: String| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok(data) }
            }));
        let config = SyncConfig::new(Url::parse("file:///r/").unwrap())
            .with_source(source)
            .with_progress(move |m| sink.lock().unwrap().push(m.to_string()));
        let update = BTreeMap::from([(
            "gz/a.js".to_string(),
            asset(dir.path(), "a.js", "let a = 1;"),
        )]);

        let out = transform_assets(&config, &update).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*lines.lock().unwrap(), vec!["generating gz/a.js".to_string()]);
        match &out["gz/a.js"].content {
            Content::Data(d) => assert_eq!(&d.as_bytes()[..2], &[0x1f, 0x8b]),
            Content::File(_) => panic!("expected gzip output"),
        }
    }

    #[tokio::test]
    async fn transform_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let source = Source::new(dir.path()).with_rule(Rule::new().transform(
            |_: Data, _: String| async { Err(sync_core::RuleError::custom("minifier crashed")) },
        ));
        let config = SyncConfig::new(Url::parse("file:///r/").unwrap()).with_source(source);
        let update = BTreeMap::from([("a".to_string(), asset(dir.path(), "a", "x"))]);

        let result = transform_assets(&config, &update).await;
        assert!(matches!(result, Err(ClientError::Rule(_))));
    }
}
