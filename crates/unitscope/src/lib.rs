//! Selective isolation loading of plugin units.
//!
//! A plugin is a directory of compiled units, packed into zip archives or
//! kept as loose `.unit` files. [`PluginLoader`] indexes the resources the
//! plugin's include globs select and wraps them in an [`IsolationScope`] that
//! defines those units itself while delegating everything else, including
//! the host's core namespaces, to a parent [`Scope`]. Several plugins can
//! therefore carry different versions of the same unit without affecting the
//! host or each other.
//!
//! Code running inside a plugin finds its scope through the thread's ambient
//! context, installed for the duration of [`run_isolated`].

pub mod bridge;
pub mod context;
mod descriptor;
mod error;
mod glob;
mod host;
mod isolation;
mod loader;
mod pattern;
mod scope;
mod store;
mod unit;

pub use bridge::{run_isolated, PluginError};
pub use descriptor::{
    PluginDescriptor, PluginDescriptorBuilder, PluginManifest, DEFAULT_INCLUDE_PATTERNS,
    MANIFEST_FILE_NAME,
};
pub use error::{ConfigError, ResolveError, StoreError};
pub use glob::GlobSet;
pub use host::HostScope;
pub use isolation::{is_parallel_capable, IsolationScope};
pub use loader::PluginLoader;
pub use pattern::{NameMatcher, NamePattern, DEFAULT_EXCLUDED_PATTERNS};
pub use scope::{DelegatingScope, Scope};
pub use store::{
    resource_path, unit_name, LocatedUnit, Resource, ResourceLocation, UnitStore, UNIT_FILE_SUFFIX,
};
pub use unit::{ScopeId, Unit};
