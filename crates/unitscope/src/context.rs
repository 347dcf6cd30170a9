//! Per-thread ambient scope used by code that resolves units without being
//! handed a scope explicitly.
//!
//! The slot is not inherited by threads spawned while a scope is installed.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::scope::Scope;
use crate::unit::Unit;

thread_local! {
    static AMBIENT: RefCell<Option<Arc<dyn Scope>>> = const { RefCell::new(None) };
}

/// The scope currently installed on this thread.
pub fn current() -> Option<Arc<dyn Scope>> {
    AMBIENT.with(|slot| slot.borrow().clone())
}

/// Install `scope` for the calling thread until the returned guard drops.
pub fn enter(scope: Arc<dyn Scope>) -> ContextGuard {
    let previous = AMBIENT.with(|slot| slot.replace(Some(scope)));
    ContextGuard {
        previous,
        _thread_bound: PhantomData,
    }
}

/// Resolve `name` through the ambient scope.
pub fn resolve(name: &str) -> Result<Arc<Unit>, ResolveError> {
    current().ok_or(ResolveError::NoAmbientScope)?.resolve(name)
}

/// Restores the previously installed scope on drop, including during unwinding.
#[must_use = "the previous scope is restored as soon as the guard is dropped"]
pub struct ContextGuard {
    previous: Option<Arc<dyn Scope>>,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        let _ = AMBIENT.try_with(|slot| *slot.borrow_mut() = previous);
    }
}
