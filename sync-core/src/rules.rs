//! Per-source rules: filename tests, transforms and remote-name rewrites.
//!
//! A source owns an ordered list of [`Rule`]s. Every rule has three parts:
//!
//! - a **test** on the *local* name (never on a name rewritten by an earlier rule)
//! - an optional **transform** applied to the content of changed assets
//! - a **remote-name resolver** that rewrites the current remote name, or
//!   returns `None` to drop the asset
//!
//! Configuration values come in two shapes, declarative ([`Pattern`],
//! [`Codec`], templates, the ignore flag) and function values. Both are turned
//! into the same callable signatures when the rule is built, so nothing
//! downstream branches on where a rule came from.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use globset::GlobBuilder;
use regex::Regex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use sync_content::{Codec, Data};
use sync_types::normalize_path;

use crate::error::RuleError;

/// Filename test.
pub type Matcher = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Content transform, called with the content and the local name.
pub type TransformFn =
    Arc<dyn Fn(Data, String) -> BoxFuture<'static, Result<Data, RuleError>> + Send + Sync>;

/// Remote-name resolver; `None` drops the asset.
pub type RemoteNameFn =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<Option<String>, RuleError>> + Send + Sync>;

/// A filename pattern as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// POSIX-style glob; `*` stops at `/`, `**` crosses it.
    Glob(String),
    /// Unanchored regular expression.
    Regex(String),
}

impl Pattern {
    /// Compile into a matcher.
    pub fn compile(&self) -> Result<Matcher, RuleError> {
        match self {
            Pattern::Glob(pattern) => {
                let glob = GlobBuilder::new(pattern)
                    .literal_separator(true)
                    .build()
                    .map_err(|source| RuleError::Glob {
                        pattern: pattern.clone(),
                        source,
                    })?
                    .compile_matcher();
                Ok(Arc::new(move |name: &str| glob.is_match(name)))
            }
            Pattern::Regex(pattern) => {
                let re = Regex::new(pattern).map_err(|source| RuleError::Regex {
                    pattern: pattern.clone(),
                    source,
                })?;
                Ok(Arc::new(move |name: &str| re.is_match(name)))
            }
        }
    }
}

/// One filter + transform + rename step.
#[derive(Clone)]
pub struct Rule {
    test: Matcher,
    transform: Option<TransformFn>,
    remote_name: RemoteNameFn,
}

impl Rule {
    /// A rule that applies to every file and changes nothing.
    pub fn new() -> Self {
        Self::with_test(Arc::new(|_: &str| true))
    }

    /// A rule with a custom test.
    pub fn with_test(test: Matcher) -> Self {
        Self {
            test,
            transform: None,
            remote_name: Arc::new(|name: String| {
                async move { Ok::<_, RuleError>(Some(name)) }.boxed()
            }),
        }
    }

    /// A rule applying to files that match any of `files` (or all files when
    /// `files` is empty) and none of `exclude`.
    pub fn matching(files: &[Pattern], exclude: &[Pattern]) -> Result<Self, RuleError> {
        let files = files
            .iter()
            .map(Pattern::compile)
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = exclude
            .iter()
            .map(Pattern::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_test(Arc::new(move |name: &str| {
            if exclude.iter().any(|m| m(name)) {
                return false;
            }
            files.is_empty() || files.iter().any(|m| m(name))
        })))
    }

    /// Use a built-in codec as the transform.
    pub fn codec(mut self, codec: Codec) -> Self {
        self.transform = Some(Arc::new(move |data: Data, _local_name: String| {
            async move { codec.apply(data).await.map_err(RuleError::from) }.boxed()
        }));
        self
    }

    /// Use a custom async transform.
    pub fn transform<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Data, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Data, RuleError>> + Send + 'static,
    {
        self.transform = Some(Arc::new(move |data: Data, local_name: String| {
            f(data, local_name).boxed()
        }));
        self
    }

    /// Rewrite the remote name from a template; the first `*` is replaced by
    /// the current name.
    pub fn remote_name_template(mut self, template: impl Into<String>) -> Self {
        let template = template.into();
        self.remote_name = Arc::new(move |name: String| {
            let rewritten = template.replacen('*', &name, 1);
            async move { Ok::<_, RuleError>(Some(rewritten)) }.boxed()
        });
        self
    }

    /// Use a custom async remote-name resolver.
    pub fn remote_name<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<String>, RuleError>> + Send + 'static,
    {
        self.remote_name = Arc::new(move |name: String| f(name).boxed());
        self
    }

    /// Drop every matching file.
    pub fn ignore(mut self) -> Self {
        self.remote_name = Arc::new(|_: String| {
            async { Ok::<Option<String>, RuleError>(None) }.boxed()
        });
        self
    }

    /// Check whether this rule applies to a local name.
    pub fn test(&self, local_name: &str) -> bool {
        (self.test)(local_name)
    }

    /// The transform, if any.
    pub fn transform_fn(&self) -> Option<&TransformFn> {
        self.transform.as_ref()
    }
}

impl Default for Rule {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("transform", &self.transform.is_some())
            .finish_non_exhaustive()
    }
}

/// Thread a local name through every matching rule's resolver.
///
/// Returns `Ok(None)` when a resolver drops the asset. Each rewritten name is
/// normalized before it is handed to the next rule.
pub async fn resolve_remote_name(
    rules: &[Rule],
    local_name: &str,
) -> Result<Option<String>, RuleError> {
    let mut name = local_name.to_string();
    for rule in rules {
        if !rule.test(local_name) {
            continue;
        }
        match (rule.remote_name)(name).await? {
            Some(next) => name = normalize_path(&next),
            None => return Ok(None),
        }
    }
    Ok(Some(name))
}

/// Transforms that apply to a local name, in rule order.
pub fn transforms_for<'a>(
    rules: &'a [Rule],
    local_name: &'a str,
) -> impl Iterator<Item = &'a TransformFn> + 'a {
    rules
        .iter()
        .filter(move |rule| rule.test(local_name))
        .filter_map(Rule::transform_fn)
}
