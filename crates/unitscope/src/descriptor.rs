use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::glob::GlobSet;
use crate::pattern::NameMatcher;

/// Include globs applied when a manifest does not list any.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["**/*.jar", "**/*.zip", "**/*.unit"];

/// File name of the manifest read by [`PluginDescriptor::from_manifest_file`].
pub const MANIFEST_FILE_NAME: &str = "plugin.json";

/// Immutable description of one plugin: where its resources live, which of
/// them are visible, and which unit names it may not define itself.
///
/// Both pattern lists are compiled on construction so malformed patterns and
/// missing directories fail here rather than on first resolution.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    base_directory: PathBuf,
    includes: GlobSet,
    excludes: NameMatcher,
}

impl PluginDescriptor {
    pub fn new<I, S, E, T>(
        base_directory: impl Into<PathBuf>,
        include_patterns: I,
        exclude_patterns: E,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        E: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let base_directory = base_directory.into();
        if !base_directory.is_dir() {
            return Err(ConfigError::MissingBaseDirectory(base_directory));
        }
        Ok(Self {
            base_directory,
            includes: GlobSet::compile(include_patterns)?,
            excludes: NameMatcher::compile(exclude_patterns)?,
        })
    }

    pub fn builder(base_directory: impl Into<PathBuf>) -> PluginDescriptorBuilder {
        PluginDescriptorBuilder {
            base_directory: base_directory.into(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Load a descriptor from a JSON manifest. Relative base directories are
    /// resolved against the manifest's own directory.
    pub fn from_manifest_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: PluginManifest =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Manifest {
                path: path.to_path_buf(),
                source,
            })?;
        let manifest_dir = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.into_descriptor(manifest_dir)
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn include_patterns(&self) -> &[String] {
        self.includes.globs()
    }

    /// Default host namespaces followed by the caller's patterns.
    pub fn exclude_patterns(&self) -> &[String] {
        self.excludes.patterns()
    }

    pub fn includes(&self) -> &GlobSet {
        &self.includes
    }

    pub fn excludes(&self) -> &NameMatcher {
        &self.excludes
    }
}

#[derive(Debug, Clone)]
pub struct PluginDescriptorBuilder {
    base_directory: PathBuf,
    include_patterns: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl PluginDescriptorBuilder {
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_patterns.push(pattern.into());
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Falls back to [`DEFAULT_INCLUDE_PATTERNS`] when no include was given.
    pub fn build(self) -> Result<PluginDescriptor, ConfigError> {
        let includes = if self.include_patterns.is_empty() {
            DEFAULT_INCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect()
        } else {
            self.include_patterns
        };
        PluginDescriptor::new(self.base_directory, includes, self.exclude_patterns)
    }
}

/// On-disk form of a descriptor (`plugin.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginManifest {
    pub base_directory: Option<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl PluginManifest {
    pub fn into_descriptor(self, manifest_dir: &Path) -> Result<PluginDescriptor, ConfigError> {
        let base_directory = match self.base_directory {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => manifest_dir.join(dir),
            None => manifest_dir.to_path_buf(),
        };
        let builder = self
            .include
            .into_iter()
            .fold(PluginDescriptor::builder(base_directory), |b, p| b.include(p));
        self.exclude
            .into_iter()
            .fold(builder, |b, p| b.exclude(p))
            .build()
    }
}
