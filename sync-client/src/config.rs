//! Run configuration.
//!
//! This is the resolved, typed configuration a run consumes. Reading it from
//! files and command-line flags is the job of the binary.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use sync_core::Rule;
use sync_types::DEFAULT_INDEX_NAME;
use url::Url;

/// Progress sink receiving the run narrative, one line per call.
pub type Progress = Arc<dyn Fn(&str) + Send + Sync>;

/// A local directory and the rules applied to its files.
#[derive(Debug, Clone)]
pub struct Source {
    /// Directory to scan.
    pub directory: PathBuf,
    /// Ordered rules.
    pub rules: Vec<Rule>,
}

impl Source {
    /// A source without rules.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            rules: Vec::new(),
        }
    }

    /// Append a rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }
}

/// Configuration for one run.
#[derive(Clone)]
pub struct SyncConfig {
    /// Remote directory.
    pub remote: Url,
    /// Password for remotes that need one; overrides a password in the URL.
    pub password: Option<String>,
    /// Sources, later ones overriding earlier ones on equal remote names.
    pub sources: Vec<Source>,
    /// Remote name of the index document.
    pub index_name: String,
    /// Compute and report the plan without changing the remote.
    pub dry_run: bool,
    /// Where the narrative goes; `None` means silence.
    pub progress: Option<Progress>,
}

impl SyncConfig {
    /// Create a configuration with defaults for everything but the remote.
    pub fn new(remote: Url) -> Self {
        Self {
            remote,
            password: None,
            sources: Vec::new(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            dry_run: false,
            progress: None,
        }
    }

    /// Add a source.
    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    /// Set the remote name of the index.
    pub fn with_index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Install a progress sink.
    pub fn with_progress<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(sink));
        self
    }

    pub(crate) fn info(&self, message: &str) {
        if let Some(progress) = &self.progress {
            progress(message);
        }
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("remote", &self.remote.as_str())
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("sources", &self.sources)
            .field("index_name", &self.index_name)
            .field("dry_run", &self.dry_run)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}
