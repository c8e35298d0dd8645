//! Example: a lazily built application tree
//!
//! `App` creates namespaces on demand. `App::Models` hands out typed
//! containers deriving from `App::Record`, and `App::Config` entries are read
//! from manifest files in a temporary directory.
//!
//! Run with `cargo run --example lazy_tree`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use lazyspace::prelude::*;

fn build_app(config_dir: &Path) -> LazyspaceResult<Arc<Namespace>> {
    let app = Namespace::new("App");
    let record = Namespace::typed("App::Record", None);
    app.set("record", Arc::clone(&record));

    let registry = app.attach_registry();

    // Any missing name under App is a plain namespace.
    registry.add_factory(Key::Wildcard, CreateNamespace::new());

    // Models lazily create typed containers deriving from App::Record.
    registry.add_initializer(
        "models",
        on_namespace(move |models| {
            models
                .attach_registry()
                .add_factory(Key::Wildcard, CreateTyped::deriving(Arc::clone(&record)));
            Ok(())
        }),
    )?;

    // Config entries come from `<dir>/<name>.ns`.
    let loader = LoadFromFiles::manifests(LoadConfig::new().with_directories([config_dir]))?;
    registry.add_initializer(
        "config",
        on_namespace(move |config| {
            config
                .attach_registry()
                .add_factory(Key::Wildcard, loader.clone());
            Ok(())
        }),
    )?;

    Ok(app)
}

fn main() -> LazyspaceResult<()> {
    let dir = std::env::temp_dir().join("lazyspace-demo");
    fs::create_dir_all(&dir).map_err(FactoryError::from)?;
    fs::write(dir.join("database.ns"), "host = localhost\nport = 5432\n")
        .map_err(FactoryError::from)?;

    let app = build_app(&dir)?;

    let user = app.lookup("Models::User")?;
    let user = user.as_namespace().ok_or("User is not a namespace")?;
    let record = app.resolve_namespace("record")?;
    println!("{} is a {}: {}", user.path(), record.path(), user.is_a(&record));

    let database = app.lookup("Config::Database")?;
    if let Some(database) = database.as_namespace() {
        for name in database.names() {
            if let Some(value) = database.get(&name) {
                println!(
                    "{}::{} = {}",
                    database.path(),
                    name,
                    value.downcast_ref::<String>().map(String::as_str).unwrap_or("?")
                );
            }
        }
    }

    let registry = app.registry().ok_or("App has no registry")?;
    println!("loaded: {:?}", registry.loaded_names());
    println!("reloaded: {:?}", registry.reload()?);
    println!("App now holds: {:?}", app.names());

    Ok(())
}
