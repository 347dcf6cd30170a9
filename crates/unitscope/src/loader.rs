use std::sync::Arc;

use crate::bridge::{run_isolated, PluginError};
use crate::descriptor::PluginDescriptor;
use crate::error::{ConfigError, ResolveError};
use crate::isolation::IsolationScope;
use crate::scope::Scope;
use crate::store::UnitStore;
use crate::unit::Unit;

/// A plugin loaded into its own isolation scope on top of a host scope.
#[derive(Debug)]
pub struct PluginLoader {
    descriptor: PluginDescriptor,
    scope: Arc<IsolationScope>,
}

impl PluginLoader {
    pub fn new(descriptor: PluginDescriptor, parent: Arc<dyn Scope>) -> Result<Self, ConfigError> {
        let store = UnitStore::build(descriptor.base_directory(), descriptor.includes())?;
        let scope = Arc::new(IsolationScope::new(
            store,
            descriptor.excludes().clone(),
            parent,
        ));
        tracing::info!(
            base = %descriptor.base_directory().display(),
            scope = %scope.id(),
            locations = scope.store().locations().len(),
            "loaded plugin"
        );
        Ok(Self { descriptor, scope })
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn scope(&self) -> &Arc<IsolationScope> {
        &self.scope
    }

    pub fn load_unit(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
        self.scope.resolve(name)
    }

    /// Run `entry` with this plugin's scope as the ambient scope.
    pub fn invoke_in_plugin<T, F>(&self, entry: F) -> Result<T, PluginError>
    where
        F: FnOnce() -> Result<T, PluginError>,
    {
        run_isolated(self.scope.clone(), entry)
    }
}
