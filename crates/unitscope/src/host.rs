use std::convert::Infallible;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::scope::Scope;
use crate::store::{resource_path, Resource, UnitStore};
use crate::unit::{ScopeId, Unit, UnitTable};

/// Root resolution environment of the host process.
///
/// Units are either defined up front with [`HostScope::define`] or read on
/// first request from the host's own search path.
#[derive(Debug)]
pub struct HostScope {
    id: ScopeId,
    units: UnitTable,
    search_path: Option<UnitStore>,
}

impl HostScope {
    pub fn new() -> Self {
        Self {
            id: ScopeId::next(),
            units: UnitTable::default(),
            search_path: None,
        }
    }

    pub fn with_search_path(store: UnitStore) -> Self {
        Self {
            search_path: Some(store),
            ..Self::new()
        }
    }

    /// Define `name` in the host. An existing definition is kept and returned.
    pub fn define(&self, name: impl Into<String>, image: impl Into<Vec<u8>>) -> Arc<Unit> {
        let name = name.into();
        let image = image.into();
        let defined = self
            .units
            .get_or_try_define(&name, || Ok::<_, Infallible>(Unit::new(name.as_str(), image, None, self.id)));
        match defined {
            Ok(unit) => unit,
            Err(never) => match never {},
        }
    }

    pub fn search_path(&self) -> Option<&UnitStore> {
        self.search_path.as_ref()
    }

    pub fn defined_names(&self) -> Vec<String> {
        self.units.names()
    }
}

impl Default for HostScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope for HostScope {
    fn id(&self) -> ScopeId {
        self.id
    }

    fn resolve(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
        if let Some(unit) = self.units.get(name) {
            return Ok(unit);
        }
        let resource = self
            .find_resource(&resource_path(name))
            .ok_or_else(|| ResolveError::NotFound(name.to_string()))?;
        self.units.get_or_try_define(name, || {
            let image = resource.read().map_err(|source| ResolveError::Read {
                name: name.to_string(),
                source,
            })?;
            Ok(Unit::new(name, image, Some(resource.location.clone()), self.id))
        })
    }

    fn find_resource(&self, path: &str) -> Option<Resource> {
        self.search_path.as_ref()?.find_resource(path)
    }
}
