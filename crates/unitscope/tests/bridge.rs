use std::fs;
use std::sync::Arc;

use anyhow::anyhow;
use tempfile::tempdir;
use thiserror::Error;
use unitscope::{context, HostScope, PluginDescriptor, PluginError, PluginLoader, Scope};

#[derive(Debug, Error)]
#[error("database {0} unavailable")]
struct DatabaseUnavailable(String);

fn loader() -> (tempfile::TempDir, Arc<HostScope>, PluginLoader) {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("plugin")).unwrap();
    fs::write(dir.path().join("plugin/Main.unit"), b"main").unwrap();
    let host = Arc::new(HostScope::new());
    let descriptor = PluginDescriptor::builder(dir.path()).build().unwrap();
    let loader = PluginLoader::new(descriptor, host.clone()).unwrap();
    (dir, host, loader)
}

fn ambient_id() -> Option<unitscope::ScopeId> {
    context::current().map(|scope| scope.id())
}

#[test]
fn context_is_restored_after_success() {
    let (_dir, host, loader) = loader();
    let _outer = context::enter(host.clone());

    let inside = loader.invoke_in_plugin(|| Ok(ambient_id())).unwrap();
    assert_eq!(inside, Some(loader.scope().id()));
    assert_eq!(ambient_id(), Some(host.id()));
}

#[test]
fn context_is_restored_after_failure() {
    let (_dir, _host, loader) = loader();
    assert_eq!(ambient_id(), None);

    let result: Result<(), _> = loader.invoke_in_plugin(|| Err(anyhow!("nope").into()));
    assert!(result.is_err());
    assert_eq!(ambient_id(), None);
}

#[test]
fn nested_initialization_failure_surfaces_the_innermost_cause() {
    let (_dir, _host, loader) = loader();

    let result: Result<(), _> = loader.invoke_in_plugin(|| {
        let cause = PluginError::from(anyhow::Error::new(DatabaseUnavailable("units".into())));
        Err(PluginError::invocation(PluginError::initialization(cause)))
    });

    let err = result.unwrap_err();
    let root = err.downcast_ref::<DatabaseUnavailable>().expect("root cause");
    assert_eq!(root.0, "units");
}

#[test]
fn plugin_code_resolves_its_own_units_ambiently() {
    let (_dir, host, loader) = loader();
    host.define("plugin.Main", "host main");

    let main = loader
        .invoke_in_plugin(|| Ok(context::resolve("plugin.Main")?))
        .unwrap();
    assert_eq!(main.image(), b"main");

    let err = loader
        .invoke_in_plugin(|| Ok(context::resolve("plugin.Missing")?))
        .unwrap_err();
    assert!(matches!(err, PluginError::Resolve(e) if e.is_not_found()));
}
