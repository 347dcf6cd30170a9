use std::sync::{Arc, Once};

use tracing::debug;

use crate::error::ResolveError;
use crate::pattern::NameMatcher;
use crate::scope::Scope;
use crate::store::{resource_path, Resource, UnitStore};
use crate::unit::{ScopeId, Unit, UnitTable};

static PARALLEL_CAPABLE: Once = Once::new();

/// Process-wide opt-in for resolving through isolation scopes from several
/// threads at once. Runs with the first scope constructed.
fn register_parallel_capable() {
    PARALLEL_CAPABLE.call_once(|| debug!("isolation scopes registered as parallel capable"));
}

pub fn is_parallel_capable() -> bool {
    PARALLEL_CAPABLE.is_completed()
}

/// Scope that defines the units of its own store independently and
/// delegates every other request to its parent.
///
/// A request for `name` is answered by, in order:
/// 1. the unit this scope already defined for `name`;
/// 2. the parent, when `name` is excluded;
/// 3. the parent, when the resource for `name` is absent or does not come
///    from one of this store's own locations;
/// 4. a new definition read from the store.
#[derive(Debug)]
pub struct IsolationScope {
    id: ScopeId,
    parent: Arc<dyn Scope>,
    store: UnitStore,
    excluded: NameMatcher,
    resolved: UnitTable,
}

impl IsolationScope {
    pub fn new(store: UnitStore, excluded: NameMatcher, parent: Arc<dyn Scope>) -> Self {
        register_parallel_capable();
        let id = ScopeId::next();
        debug!(
            scope = %id,
            parent = %parent.id(),
            locations = store.locations().len(),
            "created isolation scope"
        );
        Self {
            id,
            parent,
            store,
            excluded,
            resolved: UnitTable::default(),
        }
    }

    pub fn parent(&self) -> &Arc<dyn Scope> {
        &self.parent
    }

    pub fn store(&self) -> &UnitStore {
        &self.store
    }

    pub fn excluded(&self) -> &NameMatcher {
        &self.excluded
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded.matches(name)
    }

    /// Whether a request for `name` would define a new unit in this scope.
    pub fn is_eligible_for_override(&self, name: &str) -> bool {
        !self.is_defined(name) && self.override_resource(name).is_some()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.resolved.get(name).is_some()
    }

    /// Units defined independently so far, sorted.
    pub fn defined_names(&self) -> Vec<String> {
        self.resolved.names()
    }

    pub fn defined_count(&self) -> usize {
        self.resolved.len()
    }

    /// The own store is searched first, so the ownership check only rejects
    /// resources found through the parent.
    fn override_resource(&self, name: &str) -> Option<Resource> {
        if self.excluded.matches(name) {
            return None;
        }
        let resource = self.find_resource(&resource_path(name))?;
        self.store.owns(&resource.location).then_some(resource)
    }
}

impl Scope for IsolationScope {
    fn id(&self) -> ScopeId {
        self.id
    }

    fn resolve(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
        if let Some(unit) = self.resolved.get(name) {
            return Ok(unit);
        }
        let Some(resource) = self.override_resource(name) else {
            debug!(scope = %self.id, unit = name, "delegating to parent");
            return self.parent.resolve(name);
        };
        self.resolved.get_or_try_define(name, || {
            let image = resource.read().map_err(|source| ResolveError::Read {
                name: name.to_string(),
                source,
            })?;
            debug!(
                scope = %self.id,
                unit = name,
                origin = %resource.location,
                "defined unit independently"
            );
            Ok(Unit::new(name, image, Some(resource.location.clone()), self.id))
        })
    }

    fn find_resource(&self, path: &str) -> Option<Resource> {
        self.store
            .find_resource(path)
            .or_else(|| self.parent.find_resource(path))
    }
}
