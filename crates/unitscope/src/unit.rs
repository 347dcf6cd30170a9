use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::store::ResourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        ScopeId(NEXT.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// A defined unit. Identity is the `Arc` it is handed out in.
#[derive(Debug)]
pub struct Unit {
    name: String,
    image: Arc<[u8]>,
    origin: Option<ResourceLocation>,
    scope: ScopeId,
}

impl Unit {
    pub(crate) fn new(
        name: impl Into<String>,
        image: impl Into<Arc<[u8]>>,
        origin: Option<ResourceLocation>,
        scope: ScopeId,
    ) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            origin,
            scope,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Where the image was read from; `None` for units the host defined directly.
    pub fn origin(&self) -> Option<&ResourceLocation> {
        self.origin.as_ref()
    }

    /// The scope that defined this unit.
    pub fn scope(&self) -> ScopeId {
        self.scope
    }
}

/// Concurrent table of defined units with single-flight definition per name.
///
/// Each name owns a slot that is created under a short write lock and then
/// initialised outside of it, so a slow definition only blocks requests for
/// the same name.
#[derive(Debug, Default)]
pub(crate) struct UnitTable {
    slots: RwLock<HashMap<String, Arc<OnceCell<Arc<Unit>>>>>,
}

impl UnitTable {
    pub fn get(&self, name: &str) -> Option<Arc<Unit>> {
        self.slots.read().get(name).and_then(|slot| slot.get().cloned())
    }

    fn slot(&self, name: &str) -> Arc<OnceCell<Arc<Unit>>> {
        if let Some(slot) = self.slots.read().get(name) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write();
        Arc::clone(slots.entry(name.to_string()).or_default())
    }

    /// Return the unit defined for `name`, running `define` if there is none.
    /// Only one caller's `define` runs; a failed definition leaves the slot
    /// empty.
    pub fn get_or_try_define<E>(
        &self,
        name: &str,
        define: impl FnOnce() -> Result<Unit, E>,
    ) -> Result<Arc<Unit>, E> {
        let slot = self.slot(name);
        slot.get_or_try_init(|| define().map(Arc::new))
            .map(Arc::clone)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }
}
