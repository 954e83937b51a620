//! Configuration files for distsync.
//!
//! A configuration file is TOML. Every key is optional:
//!
//! ```toml
//! remote = "https://user@dav.example.com/site/"
//! password_command = "pass show dav"
//! index_name = ".htdistsync"
//! dry_run = false
//! quiet = false
//!
//! [[sources]]
//! directory = "dist"
//! rules = [
//!     { files = "**/*.html", transform = "gzip" },
//!     { files = { regex = "\\.map$" }, ignore = true },
//! ]
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use sync_client::{parse_remote, Source, SyncConfig};
use sync_content::Codec;
use sync_core::{Pattern, Rule};
use sync_types::{normalize_path, DEFAULT_INDEX_NAME};
use tracing::debug;

/// File names searched for, in order, in each directory.
const FILE_NAMES: [&str; 2] = ["distsync.toml", ".distsync.toml"];

/// Source directory used when none is configured.
const DEFAULT_SOURCE: &str = "dist";

/// Remote directory used when none is configured, relative to the base path.
const DEFAULT_REMOTE: &str = "distsync";

/// Either a single value or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// The contents of a configuration file.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    remote: Option<String>,
    password_command: Option<String>,
    index_name: Option<String>,
    dry_run: Option<bool>,
    quiet: Option<bool>,
    sources: Option<OneOrMany<SourceSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SourceSpec {
    Directory(String),
    Table {
        directory: Option<String>,
        #[serde(default)]
        rules: Vec<toml::Value>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleSpec {
    files: Option<OneOrMany<PatternSpec>>,
    exclude: Option<OneOrMany<PatternSpec>>,
    transform: Option<String>,
    remote_name: Option<String>,
    #[serde(default)]
    ignore: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PatternSpec {
    Glob(String),
    Regex { regex: String },
}

impl From<PatternSpec> for Pattern {
    fn from(spec: PatternSpec) -> Self {
        match spec {
            PatternSpec::Glob(glob) => Pattern::Glob(glob),
            PatternSpec::Regex { regex } => Pattern::Regex(regex),
        }
    }
}

/// A parsed configuration file and the directory its paths are relative to.
#[derive(Debug)]
pub struct Loaded {
    /// Parsed contents.
    pub file: FileConfig,
    /// Base path for relative paths.
    pub base: PathBuf,
    /// Where the file was found, if anywhere.
    pub path: Option<PathBuf>,
}

/// Values given on the command line; they win over the file.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Remote URL or path.
    pub remote: Option<String>,
    /// Force a dry run.
    pub dry_run: bool,
    /// Silence the narrative.
    pub quiet: bool,
    /// Source directories replacing the configured ones.
    pub sources: Vec<PathBuf>,
}

/// Everything the binary needs to start a run.
#[derive(Debug)]
pub struct Settings {
    /// The resolved run configuration.
    pub sync: SyncConfig,
    /// Whether to print the narrative.
    pub quiet: bool,
}

/// Load the configuration file.
///
/// `explicit` is the `--config` flag: `Some("")` disables configuration
/// files, `None` searches for one starting at `cwd`.
pub async fn load(explicit: Option<&Path>, cwd: &Path) -> Result<Loaded> {
    let path = match explicit {
        Some(path) if path.as_os_str().is_empty() => None,
        Some(path) => Some(cwd.join(path)),
        None => discover(cwd),
    };

    let Some(path) = path else {
        debug!("no configuration file");
        return Ok(Loaded {
            file: FileConfig::default(),
            base: cwd.to_path_buf(),
            path: None,
        });
    };

    debug!(path = %path.display(), "loading configuration");
    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Cannot read configuration file {}", path.display()))?;
    let file = parse(&text)
        .with_context(|| format!("Invalid configuration file {}", path.display()))?;
    let base = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.to_path_buf());

    Ok(Loaded {
        file,
        base,
        path: Some(path),
    })
}

/// Parse configuration text.
pub fn parse(text: &str) -> Result<FileConfig> {
    Ok(toml::from_str(text)?)
}

/// Search `start` and its ancestors, then the user configuration directory.
fn discover(start: &Path) -> Option<PathBuf> {
    find_upward(start).or_else(|| {
        let dirs = directories::BaseDirs::new()?;
        let path = dirs.config_dir().join("distsync").join(FILE_NAMES[0]);
        path.is_file().then_some(path)
    })
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    })
}

/// Merge file values with command-line overrides into run settings.
///
/// Everything is validated here, before any connection is attempted. The
/// password command only runs for remotes that are not local directories.
pub async fn resolve(loaded: Loaded, overrides: Overrides, cwd: &Path) -> Result<Settings> {
    let Loaded { file, base, .. } = loaded;

    let set = |remote: &&str| !remote.is_empty();
    let remote = match overrides.remote.as_deref().filter(set) {
        Some(remote) => parse_remote(remote, cwd)?,
        None => {
            let remote = file.remote.as_deref().filter(set).unwrap_or(DEFAULT_REMOTE);
            parse_remote(remote, &base)?
        }
    };

    let sources = if overrides.sources.is_empty() {
        file_sources(file.sources, &base)?
    } else {
        overrides
            .sources
            .iter()
            .map(|dir| Source::new(cwd.join(dir)))
            .collect()
    };

    let index_name = normalize_path(file.index_name.as_deref().unwrap_or(DEFAULT_INDEX_NAME));

    let mut sync = SyncConfig::new(remote)
        .with_index_name(index_name)
        .with_dry_run(overrides.dry_run || file.dry_run.unwrap_or(false));
    for source in sources {
        sync = sync.with_source(source);
    }

    if sync.remote.scheme() != "file" {
        if let Some(command) = &file.password_command {
            sync = sync.with_password(run_password_command(command, &base).await?);
        }
    }

    Ok(Settings {
        sync,
        quiet: overrides.quiet || file.quiet.unwrap_or(false),
    })
}

fn file_sources(specs: Option<OneOrMany<SourceSpec>>, base: &Path) -> Result<Vec<Source>> {
    let Some(specs) = specs else {
        return Ok(vec![Source::new(base.join(DEFAULT_SOURCE))]);
    };

    specs
        .into_vec()
        .into_iter()
        .map(|spec| match spec {
            SourceSpec::Directory(directory) => Ok(Source::new(base.join(directory))),
            SourceSpec::Table { directory, rules } => {
                let directory = directory.as_deref().unwrap_or(DEFAULT_SOURCE);
                let mut source = Source::new(base.join(directory));
                for (i, rule) in rules.into_iter().enumerate() {
                    let rule = build_rule(rule)
                        .with_context(|| format!("Invalid rule #{} for source {directory}", i + 1))?;
                    source = source.with_rule(rule);
                }
                Ok(source)
            }
        })
        .collect()
}

fn build_rule(value: toml::Value) -> Result<Rule> {
    if !value.is_table() {
        bail!("expected a table, found {}", value.type_str());
    }
    let spec: RuleSpec = value.try_into()?;

    let patterns = |list: Option<OneOrMany<PatternSpec>>| -> Vec<Pattern> {
        list.map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(Pattern::from)
            .collect()
    };
    let mut rule = Rule::matching(&patterns(spec.files), &patterns(spec.exclude))?;

    if let Some(transform) = spec.transform {
        rule = rule.codec(transform.parse::<Codec>()?);
    }
    if let Some(template) = spec.remote_name {
        rule = rule.remote_name_template(template);
    }
    if spec.ignore {
        rule = rule.ignore();
    }
    Ok(rule)
}

async fn run_password_command(command: &str, base: &Path) -> Result<String> {
    debug!("running password command");
    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(base)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .await
        .context("Cannot run password command")?;

    if !output.status.success() {
        bail!("Password command failed with {}", output.status);
    }
    let stdout = String::from_utf8(output.stdout).context("Password is not valid UTF-8")?;
    Ok(stdout.trim().to_string())
}
