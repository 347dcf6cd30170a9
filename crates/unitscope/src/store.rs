use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{ConfigError, StoreError};
use crate::glob::GlobSet;

/// File suffix of a compiled unit image.
const MAX_PREALLOCATED_IMAGE: u64 = 1 << 20;

pub const UNIT_FILE_SUFFIX: &str = ".unit";

/// Map a qualified unit name to the resource path that holds its image.
pub fn resource_path(unit_name: &str) -> String {
    let mut path = unit_name.replace('.', "/");
    path.push_str(UNIT_FILE_SUFFIX);
    path
}

/// Inverse of [`resource_path`], `None` for resources that are not units.
pub fn unit_name(resource_path: &str) -> Option<String> {
    resource_path
        .strip_suffix(UNIT_FILE_SUFFIX)
        .filter(|stem| !stem.is_empty())
        .map(|stem| stem.replace('/', "."))
}

/// Origin tag of a resource: the archive or loose file it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceLocation {
    Archive(PathBuf),
    File(PathBuf),
}

impl ResourceLocation {
    pub fn path(&self) -> &Path {
        match self {
            ResourceLocation::Archive(path) | ResourceLocation::File(path) => path,
        }
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceLocation::Archive(path) => write!(f, "archive:{}", path.display()),
            ResourceLocation::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// A resource path together with the location that provides it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub path: String,
    pub location: ResourceLocation,
}

impl Resource {
    /// Read the raw image. Failures are reported, never mapped to "absent".
    pub fn read(&self) -> Result<Vec<u8>, StoreError> {
        match &self.location {
            ResourceLocation::File(path) => fs::read(path).map_err(|source| self.io_error(source)),
            ResourceLocation::Archive(path) => {
                let file = File::open(path).map_err(|source| self.io_error(source))?;
                let mut archive = ZipArchive::new(file).map_err(|source| self.archive_error(source))?;
                let mut entry = archive
                    .by_name(&self.path)
                    .map_err(|source| self.archive_error(source))?;
                // The declared size comes from the archive header and is untrusted.
                let hint = entry.size().min(MAX_PREALLOCATED_IMAGE) as usize;
                let mut image = Vec::with_capacity(hint);
                entry
                    .read_to_end(&mut image)
                    .map_err(|source| self.io_error(source))?;
                Ok(image)
            }
        }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            location: self.location.clone(),
            source,
        }
    }

    fn archive_error(&self, source: zip::result::ZipError) -> StoreError {
        StoreError::Archive {
            path: self.path.clone(),
            location: self.location.clone(),
            source,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocatedUnit {
    pub image: Vec<u8>,
    pub origin: ResourceLocation,
}

/// Resource locations discovered under a base directory, with an index of
/// every resource path they provide.
#[derive(Debug)]
pub struct UnitStore {
    base_directory: PathBuf,
    locations: Vec<ResourceLocation>,
    owned: HashSet<ResourceLocation>,
    index: HashMap<String, ResourceLocation>,
}

impl UnitStore {
    /// Walk `base_directory` once and index every regular file whose relative
    /// path matches one of `includes`.
    ///
    /// Files ending in [`UNIT_FILE_SUFFIX`] are loose units; any other match
    /// is read as a zip archive. When two locations provide the same resource
    /// path the first one discovered wins.
    pub fn build(base_directory: impl AsRef<Path>, includes: &GlobSet) -> Result<Self, ConfigError> {
        let base = base_directory.as_ref();
        if !base.is_dir() {
            return Err(ConfigError::MissingBaseDirectory(base.to_path_buf()));
        }

        let mut store = Self {
            base_directory: base.to_path_buf(),
            locations: Vec::new(),
            owned: HashSet::new(),
            index: HashMap::new(),
        };

        for entry in WalkDir::new(base).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(root = %base.display(), %err, "skipping entry while scanning plugin directory");
                    continue;
                }
            };
            if !entry.path().is_file() {
                continue;
            }
            let Some(relative) = relative_key(base, entry.path()) else {
                continue;
            };
            if includes.is_match(&relative) {
                store.register(entry.path(), relative)?;
            }
        }

        tracing::debug!(
            base = %base.display(),
            locations = store.locations.len(),
            resources = store.index.len(),
            "built unit store"
        );
        Ok(store)
    }

    fn register(&mut self, path: &Path, relative: String) -> Result<(), ConfigError> {
        let location = if relative.ends_with(UNIT_FILE_SUFFIX) {
            let location = ResourceLocation::File(path.to_path_buf());
            self.index.entry(relative).or_insert_with(|| location.clone());
            location
        } else {
            let location = ResourceLocation::Archive(path.to_path_buf());
            for name in archive_entries(path)? {
                self.index.entry(name).or_insert_with(|| location.clone());
            }
            location
        };
        if self.owned.insert(location.clone()) {
            self.locations.push(location);
        }
        Ok(())
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Locations in discovery order.
    pub fn locations(&self) -> &[ResourceLocation] {
        &self.locations
    }

    /// Whether `location` is one of the locations this store was built from.
    pub fn owns(&self, location: &ResourceLocation) -> bool {
        self.owned.contains(location)
    }

    pub fn find_resource(&self, path: &str) -> Option<Resource> {
        self.index.get(path).map(|location| Resource {
            path: path.to_string(),
            location: location.clone(),
        })
    }

    pub fn contains_unit(&self, unit_name: &str) -> bool {
        self.index.contains_key(&resource_path(unit_name))
    }

    /// Read the image of `unit_name` if this store provides it.
    pub fn locate(&self, unit_name: &str) -> Result<Option<LocatedUnit>, StoreError> {
        let Some(resource) = self.find_resource(&resource_path(unit_name)) else {
            return Ok(None);
        };
        let image = resource.read()?;
        Ok(Some(LocatedUnit {
            image,
            origin: resource.location,
        }))
    }

    /// Names of every unit the store provides, sorted.
    pub fn unit_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.index.keys().filter_map(|path| unit_name(path)).collect();
        names.sort();
        names
    }

    /// Units provided by `location`, sorted.
    pub fn units_in(&self, location: &ResourceLocation) -> Vec<String> {
        let mut names: Vec<_> = self
            .index
            .iter()
            .filter(|(_, provider)| *provider == location)
            .filter_map(|(path, _)| unit_name(path))
            .collect();
        names.sort();
        names
    }
}

fn relative_key(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let segments: Vec<_> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect();
    Some(segments.join("/"))
}

fn archive_entries(path: &Path) -> Result<Vec<String>, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let archive = ZipArchive::new(file).map_err(|source| ConfigError::Archive {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_owned)
        .collect())
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir_all, File};
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use zip::write::FileOptions;

    use super::*;

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        for (name, bytes) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(bytes.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn includes(globs: &[&str]) -> GlobSet {
        GlobSet::compile(globs).unwrap()
    }

    #[test]
    fn resource_path_round_trips_qualified_names() {
        assert_eq!(resource_path("plugin.api.Foo"), "plugin/api/Foo.unit");
        assert_eq!(unit_name("plugin/api/Foo.unit").as_deref(), Some("plugin.api.Foo"));
        assert_eq!(unit_name("META-INF/MANIFEST.MF"), None);
        assert_eq!(unit_name(".unit"), None);
    }

    #[test]
    fn build_indexes_archives_and_loose_units() {
        let dir = tempdir().unwrap();
        create_dir_all(dir.path().join("lib")).unwrap();
        create_dir_all(dir.path().join("plugin")).unwrap();
        write_archive(
            &dir.path().join("lib/plugin.jar"),
            &[("plugin/Foo.unit", "foo"), ("plugin/res.txt", "txt")],
        );
        fs::write(dir.path().join("plugin/Bar.unit"), b"bar").unwrap();
        fs::write(dir.path().join("README"), b"ignored").unwrap();

        let store = UnitStore::build(dir.path(), &includes(&["**/*.jar", "**/*.unit"])).unwrap();

        assert_eq!(store.locations().len(), 2);
        assert_eq!(store.unit_names(), vec!["plugin.Bar".to_string(), "plugin.Foo".to_string()]);
        let foo = store.locate("plugin.Foo").unwrap().unwrap();
        assert_eq!(foo.image, b"foo".to_vec());
        assert_eq!(foo.origin, ResourceLocation::Archive(dir.path().join("lib/plugin.jar")));
        let bar = store.locate("plugin.Bar").unwrap().unwrap();
        assert_eq!(bar.origin, ResourceLocation::File(dir.path().join("plugin/Bar.unit")));
        assert!(store.find_resource("plugin/res.txt").is_some());
        assert!(store.locate("plugin.Missing").unwrap().is_none());
    }

    #[test]
    fn first_discovered_location_wins() {
        let dir = tempdir().unwrap();
        write_archive(&dir.path().join("a.jar"), &[("plugin/Foo.unit", "first")]);
        write_archive(&dir.path().join("b.jar"), &[("plugin/Foo.unit", "second")]);

        let store = UnitStore::build(dir.path(), &includes(&["*.jar"])).unwrap();
        let foo = store.locate("plugin.Foo").unwrap().unwrap();
        assert_eq!(foo.image, b"first".to_vec());
        assert_eq!(store.units_in(&store.locations()[1]), Vec::<String>::new());
    }

    #[test]
    fn non_matching_files_are_not_locations() {
        let dir = tempdir().unwrap();
        write_archive(&dir.path().join("keep.jar"), &[("plugin/Foo.unit", "foo")]);
        write_archive(&dir.path().join("skip.zip"), &[("plugin/Bar.unit", "bar")]);

        let store = UnitStore::build(dir.path(), &includes(&["*.jar"])).unwrap();
        assert!(store.owns(&ResourceLocation::Archive(dir.path().join("keep.jar"))));
        assert!(!store.owns(&ResourceLocation::Archive(dir.path().join("skip.zip"))));
        assert!(!store.contains_unit("plugin.Bar"));
    }

    #[test]
    fn missing_base_directory_is_a_configuration_error() {
        let dir = tempdir().unwrap();
        let err = UnitStore::build(dir.path().join("nope"), &includes(&["*.jar"])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBaseDirectory(_)));
    }

    #[test]
    fn corrupt_archive_fails_construction() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.jar"), b"not a zip").unwrap();
        let err = UnitStore::build(dir.path(), &includes(&["*.jar"])).unwrap_err();
        assert!(matches!(err, ConfigError::Archive { .. }));
    }

    #[test]
    fn archive_images_beyond_the_preallocation_cap_are_read_whole() {
        let dir = tempdir().unwrap();
        let large = "u".repeat(MAX_PREALLOCATED_IMAGE as usize + 17);
        write_archive(&dir.path().join("big.jar"), &[("plugin/Big.unit", large.as_str())]);

        let store = UnitStore::build(dir.path(), &includes(&["*.jar"])).unwrap();
        let big = store.locate("plugin.Big").unwrap().unwrap();
        assert_eq!(big.image.len(), large.len());
    }

    #[test]
    fn read_failure_is_an_error_not_absence() {
        let dir = tempdir().unwrap();
        let loose = dir.path().join("Gone.unit");
        fs::write(&loose, b"soon gone").unwrap();
        let store = UnitStore::build(dir.path(), &includes(&["*.unit"])).unwrap();
        fs::remove_file(&loose).unwrap();

        let err = store.locate("Gone").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
