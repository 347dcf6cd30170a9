use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use crate::context;
use crate::error::ResolveError;
use crate::scope::Scope;

/// Failure raised by code running inside a plugin.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A unit's one-time initialisation failed.
    #[error("plugin initialization failed")]
    Initialization {
        #[source]
        cause: Option<Box<PluginError>>,
    },
    /// Wrapper around a failure thrown by a reflectively invoked entry point.
    #[error("plugin invocation failed")]
    Invocation {
        #[source]
        target: Box<PluginError>,
    },
    #[error("plugin panicked: {0}")]
    Panicked(String),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Raised(#[from] anyhow::Error),
}

impl PluginError {
    pub fn initialization(cause: impl Into<PluginError>) -> Self {
        PluginError::Initialization {
            cause: Some(Box::new(cause.into())),
        }
    }

    pub fn invocation(target: impl Into<PluginError>) -> Self {
        PluginError::Invocation {
            target: Box::new(target.into()),
        }
    }

    /// Strip initialization and invocation wrappers, at most two levels deep.
    ///
    /// An initialization wrapper without a cause is its own root.
    pub fn into_root_cause(self) -> PluginError {
        match self {
            PluginError::Initialization { cause: Some(cause) } => *cause,
            PluginError::Invocation { target } => match *target {
                PluginError::Initialization { cause: Some(cause) } => *cause,
                target => target,
            },
            other => other,
        }
    }

    /// Downcast a failure raised by plugin code to its concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            PluginError::Raised(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Run `entry` with `scope` installed as this thread's ambient scope.
///
/// The previous ambient scope is restored on every exit path. Failures are
/// unwrapped to their root cause and logged before being returned.
pub fn run_isolated<T, F>(scope: Arc<dyn Scope>, entry: F) -> Result<T, PluginError>
where
    F: FnOnce() -> Result<T, PluginError>,
{
    let scope_id = scope.id();
    let _guard = context::enter(scope);
    let outcome = panic::catch_unwind(AssertUnwindSafe(entry))
        .unwrap_or_else(|payload| Err(PluginError::Panicked(panic_message(payload.as_ref()))));

    outcome.map_err(|err| {
        let root = err.into_root_cause();
        tracing::error!(scope = %scope_id, error = %root, details = ?root, "plugin invocation failed");
        root
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::host::HostScope;

    #[derive(Debug, Error, PartialEq)]
    #[error("config missing: {0}")]
    struct ConfigMissing(&'static str);

    fn raised(key: &'static str) -> PluginError {
        PluginError::Raised(ConfigMissing(key).into())
    }

    #[test]
    fn initialization_wrapper_unwraps_one_level() {
        let root = PluginError::initialization(raised("a")).into_root_cause();
        assert_eq!(root.downcast_ref::<ConfigMissing>(), Some(&ConfigMissing("a")));
    }

    #[test]
    fn initialization_without_cause_is_its_own_root() {
        let root = PluginError::Initialization { cause: None }.into_root_cause();
        assert!(matches!(root, PluginError::Initialization { cause: None }));
    }

    #[test]
    fn invocation_of_initialization_unwraps_two_levels() {
        let wrapped = PluginError::invocation(PluginError::initialization(raised("b")));
        let root = wrapped.into_root_cause();
        assert_eq!(root.downcast_ref::<ConfigMissing>(), Some(&ConfigMissing("b")));
    }

    #[test]
    fn invocation_unwraps_to_its_target() {
        let root = PluginError::invocation(raised("c")).into_root_cause();
        assert_eq!(root.downcast_ref::<ConfigMissing>(), Some(&ConfigMissing("c")));

        let bare = PluginError::invocation(PluginError::Initialization { cause: None });
        assert!(matches!(bare.into_root_cause(), PluginError::Initialization { cause: None }));
    }

    #[test]
    fn unwrapping_stops_after_two_levels() {
        let deep = PluginError::invocation(PluginError::initialization(
            PluginError::initialization(raised("d")),
        ));
        assert!(matches!(
            deep.into_root_cause(),
            PluginError::Initialization { cause: Some(_) }
        ));
    }

    #[test]
    fn other_failures_pass_through() {
        let root = PluginError::from(anyhow!("plain")).into_root_cause();
        assert_eq!(root.to_string(), "plain");
    }

    #[test]
    fn panics_become_errors_and_restore_context() {
        let scope: Arc<dyn Scope> = Arc::new(HostScope::new());
        let result: Result<(), _> = run_isolated(scope, || panic!("plugin exploded"));
        match result {
            Err(PluginError::Panicked(message)) => assert_eq!(message, "plugin exploded"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(context::current().is_none());
    }
}
