use std::fmt;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::store::Resource;
use crate::unit::{ScopeId, Unit};

/// A resolution environment: answers "what is the definition of unit `name`",
/// either by defining it itself or by asking its parent.
pub trait Scope: Send + Sync + fmt::Debug {
    fn id(&self) -> ScopeId;

    fn resolve(&self, name: &str) -> Result<Arc<Unit>, ResolveError>;

    /// General resource lookup through this scope and its ancestors.
    fn find_resource(&self, path: &str) -> Option<Resource>;
}

/// Scope that forwards every request to its parent.
#[derive(Debug)]
pub struct DelegatingScope {
    id: ScopeId,
    parent: Arc<dyn Scope>,
}

impl DelegatingScope {
    pub fn new(parent: Arc<dyn Scope>) -> Self {
        Self {
            id: ScopeId::next(),
            parent,
        }
    }

    pub fn parent(&self) -> &Arc<dyn Scope> {
        &self.parent
    }
}

impl Scope for DelegatingScope {
    fn id(&self) -> ScopeId {
        self.id
    }

    fn resolve(&self, name: &str) -> Result<Arc<Unit>, ResolveError> {
        self.parent.resolve(name)
    }

    fn find_resource(&self, path: &str) -> Option<Resource> {
        self.parent.find_resource(path)
    }
}
