//! Integration tests for lazyspace
//!
//! These tests exercise the resolution protocol end to end: ordering,
//! recursive composition, reload, file-sourced definitions and concurrency.

use lazyspace::prelude::*;
use parking_lot::Mutex;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;

// =============================================================================
// Test Helpers
// =============================================================================

type Log = Arc<Mutex<Vec<String>>>;

/// A factory that records each call and optionally binds a value.
fn recorder(log: &Log, label: &str, binds: bool) -> impl Factory + 'static {
    let log = Arc::clone(log);
    let label = label.to_string();
    move |ns: &Arc<Namespace>, name: &CanonicalName| -> LazyspaceResult<()> {
        log.lock().push(label.clone());
        if binds {
            ns.set(name, Entity::value(label.clone()));
        }
        Ok(())
    }
}

fn init_recorder(log: &Log, label: &str) -> impl Initializer + 'static {
    let log = Arc::clone(log);
    let label = label.to_string();
    move |_: &Entity| -> LazyspaceResult<()> {
        log.lock().push(label.clone());
        Ok(())
    }
}

fn names(list: Vec<CanonicalName>) -> Vec<String> {
    list.iter().map(|n| n.to_string()).collect()
}

// =============================================================================
// Normalization Tests
// =============================================================================

#[test]
fn test_requests_that_normalize_alike_share_a_slot() {
    let app = Namespace::new("App");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    app.attach_registry().add_factory(
        Key::Wildcard,
        move |ns: &Arc<Namespace>, name: &CanonicalName| -> LazyspaceResult<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            ns.set(name, Entity::value(()));
            Ok(())
        },
    );

    let a = app.resolve("user_account").unwrap();
    let b = app.resolve("UserAccount").unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_later_factory_overrides_earlier_default() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    let log: Log = Arc::default();
    registry.add_factory("x", recorder(&log, "f1", true));
    registry.add_factory("x", recorder(&log, "f2", true));

    let x = app.resolve("x").unwrap();
    assert_eq!(x.downcast_ref::<String>().unwrap(), "f2");
    assert_eq!(*log.lock(), vec!["f2"]);
}

#[test]
fn test_initializers_run_forward() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    let log: Log = Arc::default();
    registry.add_factory("x", recorder(&log, "factory", true));
    registry.add_initializer("x", init_recorder(&log, "i1")).unwrap();
    registry.add_initializer("x", init_recorder(&log, "i2")).unwrap();

    app.resolve("x").unwrap();
    assert_eq!(*log.lock(), vec!["factory", "i1", "i2"]);
}

#[test]
fn test_specific_factory_shadows_later_wildcard() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    let log: Log = Arc::default();

    // Specific first, wildcard later: the specific one is still tried first.
    registry.add_factory("x", recorder(&log, "specific", false));
    registry.add_factory(Key::Wildcard, recorder(&log, "wildcard", true));
    let x = app.resolve("x").unwrap();
    assert_eq!(x.downcast_ref::<String>().unwrap(), "wildcard");
    assert_eq!(*log.lock(), vec!["specific", "wildcard"]);

    // Wildcard first, specific later: same order.
    log.lock().clear();
    let other = Namespace::new("Other");
    let registry = other.attach_registry();
    registry.add_factory(Key::Wildcard, recorder(&log, "wildcard", true));
    registry.add_factory("x", recorder(&log, "specific", true));
    let x = other.resolve("x").unwrap();
    assert_eq!(x.downcast_ref::<String>().unwrap(), "specific");
    assert_eq!(*log.lock(), vec!["specific"]);
}

#[test]
fn test_initializers_see_earlier_effects() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    registry.add_factory(Key::Wildcard, CreateNamespace::new());
    registry
        .add_initializer(
            "settings",
            on_namespace(|ns| {
                ns.set("retries", Entity::value(3u32));
                Ok(())
            }),
        )
        .unwrap();
    registry
        .add_initializer(
            "settings",
            on_namespace(|ns| {
                let retries = ns
                    .get("retries")
                    .and_then(|e| e.downcast_ref::<u32>().copied())
                    .ok_or("retries not set")?;
                ns.set("budget", Entity::value(retries * 2));
                Ok(())
            }),
        )
        .unwrap();

    let settings = app.resolve_namespace("settings").unwrap();
    assert_eq!(settings.get("budget").unwrap().downcast_ref::<u32>(), Some(&6));
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_unbound_name_fails_with_not_found() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    let log: Log = Arc::default();
    registry.add_factory(Key::Wildcard, recorder(&log, "declines", false));

    let err = app.resolve("ghost").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Name not found: App::Ghost");
    assert!(registry.loaded_names().is_empty());
}

#[test]
fn test_factory_error_is_not_wrapped() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    registry.add_factory(
        "x",
        |_: &Arc<Namespace>, _: &CanonicalName| -> LazyspaceResult<()> {
            Err(FactoryError::Io("disk on fire".to_string()).into())
        },
    );

    match app.resolve("x") {
        Err(LazyspaceError::Factory(FactoryError::Io(msg))) => assert_eq!(msg, "disk on fire"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_partial_factory_effects_are_not_rolled_back() {
    let app = Namespace::new("App");
    app.attach_registry().add_factory(
        "x",
        |ns: &Arc<Namespace>, _: &CanonicalName| -> LazyspaceResult<()> {
            ns.set("side_effect", Entity::value(true));
            Err("half done".into())
        },
    );

    assert!(app.resolve("x").is_err());
    assert!(app.contains("side_effect"));
    assert!(!app.contains("x"));
}

// =============================================================================
// Registry Tests
// =============================================================================

#[test]
fn test_attach_twice_keeps_chains() {
    let app = Namespace::new("App");
    let log: Log = Arc::default();
    app.attach_registry().add_factory("x", recorder(&log, "f1", true));
    app.attach_registry();

    assert!(app.resolve("x").is_ok());
    assert_eq!(*log.lock(), vec!["f1"]);
}

#[test]
fn test_loaded_names_in_binding_order() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    registry.add_factory(Key::Wildcard, CreateNamespace::new());
    app.set("preexisting", Entity::value(1u8));

    app.resolve("b").unwrap();
    app.resolve("a").unwrap();
    app.resolve("b").unwrap();
    app.resolve("preexisting").unwrap();

    assert_eq!(names(registry.loaded_names()), vec!["B", "A"]);
}

#[test]
fn test_reload_rebuilds_from_scratch() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    let log: Log = Arc::default();
    registry.add_factory("x", recorder(&log, "factory", true));
    registry.add_initializer("x", init_recorder(&log, "init")).unwrap();
    app.set("kept", Entity::value(()));

    let first = app.resolve("x").unwrap();
    assert_eq!(names(registry.loaded_names()), vec!["X"]);

    let removed = registry.reload().unwrap();
    assert_eq!(names(removed), vec!["X"]);
    assert!(!app.contains("x"));
    assert!(app.contains("kept"));
    assert!(registry.loaded_names().is_empty());

    let second = app.resolve("x").unwrap();
    assert!(!first.ptr_eq(&second));
    assert_eq!(*log.lock(), vec!["factory", "init", "factory", "init"]);
    assert_eq!(names(registry.loaded_names()), vec!["X"]);
}

#[test]
fn test_reload_tolerates_manually_removed_names() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    registry.add_factory(Key::Wildcard, CreateNamespace::new());
    app.resolve("a").unwrap();
    app.resolve("b").unwrap();
    app.remove("a");

    assert!(registry.reload().is_ok());
    assert!(app.is_empty());
}

#[test]
fn test_initializer_on_existing_name_runs_now() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    registry.add_factory(Key::Wildcard, CreateNamespace::new());
    let b = app.resolve_namespace("b").unwrap();

    registry
        .add_initializer(
            "b",
            on_namespace(|ns| {
                ns.set("patched", Entity::value(true));
                Ok(())
            }),
        )
        .unwrap();

    assert!(b.contains("patched"));
    assert_eq!(registry.initializer_count("b"), 0);
}

// =============================================================================
// Recursive Composition Tests
// =============================================================================

#[test]
fn test_nested_namespaces_with_typed_leaf() {
    let a = Namespace::new("A");
    let registry = a.attach_registry();
    registry.add_factory(Key::Wildcard, CreateNamespace::new());

    let b = a.resolve_namespace("B").unwrap();
    assert_eq!(b.path(), "A::B");

    let base = Namespace::typed("A::Base", None);
    let typed_base = Arc::clone(&base);
    registry
        .add_initializer(
            "B",
            on_namespace(move |b| {
                b.attach_registry()
                    .add_factory("C", CreateTyped::deriving(Arc::clone(&typed_base)));
                Ok(())
            }),
        )
        .unwrap();

    let c = a.lookup("B::C").unwrap().into_namespace().unwrap();
    assert_eq!(c.path(), "A::B::C");
    assert!(c.is_a(&base));
    assert!(Arc::ptr_eq(c.base().unwrap(), &base));
    assert_eq!(names(b.registry().unwrap().loaded_names()), vec!["C"]);
}

#[test]
fn test_queued_nested_initializers() {
    let a = Namespace::new("A");
    let registry = a.attach_registry();
    registry.add_factory("b", CreateNamespace::new());
    registry
        .add_initializer(
            "b",
            on_namespace(|b| {
                b.attach_registry().add_factory(Key::Wildcard, CreateTyped::new());
                Ok(())
            }),
        )
        .unwrap();
    registry
        .add_initializer(
            "b",
            on_namespace(|b| {
                b.attach_registry().add_initializer(
                    "c",
                    on_namespace(|c| {
                        c.set("d", Entity::value(true));
                        Ok(())
                    }),
                )
            }),
        )
        .unwrap();

    let c = a.lookup("B::C").unwrap();
    assert!(c.as_namespace().unwrap().is_typed());
    let d = a.lookup("B::C::D").unwrap();
    assert_eq!(d.downcast_ref::<bool>(), Some(&true));
}

#[test]
fn test_reload_of_parent_drops_nested_tree() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    registry.add_factory(
        Key::Wildcard,
        CreateNamespace::new().configure(|ns| {
            ns.attach_registry().add_factory(Key::Wildcard, CreateNamespace::new());
            Ok(())
        }),
    );

    let deep = app.lookup("One::Two::Three").unwrap();
    registry.reload().unwrap();
    assert!(!app.contains("one"));

    let rebuilt = app.lookup("One::Two::Three").unwrap();
    assert!(!deep.ptr_eq(&rebuilt));
}

// =============================================================================
// File-Sourced Tests
// =============================================================================

#[test]
fn test_file_in_second_directory_binds_name() {
    let d1 = tempfile::tempdir().unwrap();
    let d2 = tempfile::tempdir().unwrap();
    fs::write(d2.path().join("x.ns"), "source = second\n").unwrap();

    let app = Namespace::new("App");
    let registry = app.attach_registry();
    registry.add_factory(
        "x",
        LoadFromFiles::manifests(LoadConfig::new().with_directories([d1.path(), d2.path()]))
            .unwrap(),
    );
    registry.add_factory(
        "y",
        LoadFromFiles::manifests(LoadConfig::new().with_directories([d1.path(), d2.path()]))
            .unwrap(),
    );

    let x = app.resolve_namespace("x").unwrap();
    assert_eq!(
        x.get("source").unwrap().downcast_ref::<String>().unwrap(),
        "second"
    );
    assert!(app.resolve("y").unwrap_err().is_not_found());
    assert_eq!(names(registry.loaded_names()), vec!["X"]);
}

#[test]
fn test_file_name_uses_path_form() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("user_account.def"), "table = users").unwrap();

    let app = Namespace::new("App");
    app.attach_registry().add_factory(
        Key::Wildcard,
        LoadFromFiles::manifests(
            LoadConfig::new()
                .with_directories([dir.path()])
                .with_extension("def"),
        )
        .unwrap(),
    );

    let account = app.resolve_namespace("UserAccount").unwrap();
    assert_eq!(account.path(), "App::UserAccount");
    assert!(account.contains("table"));
}

#[test]
fn test_broken_file_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.ns"), "this is not a manifest").unwrap();

    let app = Namespace::new("App");
    let log: Log = Arc::default();
    let registry = app.attach_registry();
    registry.add_factory(Key::Wildcard, recorder(&log, "fallback", true));
    registry.add_factory(
        Key::Wildcard,
        LoadFromFiles::manifests(LoadConfig::new().with_directories([dir.path()])).unwrap(),
    );

    let err = app.resolve("broken").unwrap_err();
    assert!(matches!(err, LazyspaceError::FileLoad { .. }));
    // The error stops the search; the older fallback never runs.
    assert!(log.lock().is_empty());
}

#[test]
fn test_missing_file_falls_through_to_older_factory() {
    let dir = tempfile::tempdir().unwrap();
    let app = Namespace::new("App");
    let log: Log = Arc::default();
    let registry = app.attach_registry();
    registry.add_factory(Key::Wildcard, recorder(&log, "fallback", true));
    registry.add_factory(
        Key::Wildcard,
        LoadFromFiles::manifests(LoadConfig::new().with_directories([dir.path()])).unwrap(),
    );

    let entity = app.resolve("anything").unwrap();
    assert_eq!(entity.downcast_ref::<String>().unwrap(), "fallback");
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_first_references_materialize_once() {
    let app = Namespace::new("App");
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    app.attach_registry().add_factory(
        "shared",
        move |ns: &Arc<Namespace>, name: &CanonicalName| -> LazyspaceResult<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            ns.set(name, Entity::value(()));
            Ok(())
        },
    );

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let app = Arc::clone(&app);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                app.resolve("shared").unwrap()
            })
        })
        .collect();

    let entities: Vec<Entity> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(entities.windows(2).all(|w| w[0].ptr_eq(&w[1])));
    assert_eq!(names(app.registry().unwrap().loaded_names()), vec!["Shared"]);
}

#[test]
fn test_reload_never_interleaves_with_resolution() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    registry.add_factory(
        Key::Wildcard,
        |ns: &Arc<Namespace>, name: &CanonicalName| -> LazyspaceResult<()> {
            thread::sleep(Duration::from_millis(1));
            ns.set(name, Entity::value(()));
            Ok(())
        },
    );

    let resolver = {
        let app = Arc::clone(&app);
        thread::spawn(move || {
            for i in 0..50 {
                app.resolve(format!("item_{}", i % 5)).unwrap();
            }
        })
    };
    let reloader = {
        let registry = registry.clone();
        thread::spawn(move || {
            for _ in 0..20 {
                registry.reload().unwrap();
            }
        })
    };
    resolver.join().unwrap();
    reloader.join().unwrap();

    // Every loaded name is still bound: no reload ran between a binding and
    // its record.
    for name in registry.loaded_names() {
        assert!(app.contains(&name));
    }
}

#[test]
fn test_cycle_across_namespaces_and_threads_is_reported() {
    let left = Namespace::new("Left");
    let right = Namespace::new("Right");
    let barrier = Arc::new(Barrier::new(2));

    let bridge = |target: &Arc<Namespace>| {
        let target = Arc::clone(target);
        let barrier = Arc::clone(&barrier);
        let first = AtomicBool::new(true);
        move |ns: &Arc<Namespace>, name: &CanonicalName| -> LazyspaceResult<()> {
            if first.swap(false, Ordering::SeqCst) {
                barrier.wait();
            }
            let shared = target.resolve("shared")?;
            ns.set(name, shared);
            Ok(())
        }
    };
    left.attach_registry().add_factory("shared", bridge(&right));
    right.attach_registry().add_factory("shared", bridge(&left));

    let (tx, rx) = mpsc::channel();
    for ns in [&left, &right] {
        let ns = Arc::clone(ns);
        let tx = tx.clone();
        thread::spawn(move || {
            let _ = tx.send(ns.resolve("shared").map(|_| ()));
        });
    }

    for _ in 0..2 {
        let result = rx.recv_timeout(Duration::from_secs(5)).expect("resolution deadlocked");
        assert!(matches!(result, Err(LazyspaceError::CircularResolution { .. })));
    }
    assert!(!left.contains("shared"));
    assert!(!right.contains("shared"));
}

#[test]
fn test_namespaces_resolve_independently() {
    let left = Namespace::new("Left");
    let right = Namespace::new("Right");
    left.attach_registry().add_factory(Key::Wildcard, CreateNamespace::new());
    right.attach_registry().add_factory(
        Key::Wildcard,
        CreateNamespace::new().configure(|_| Err("right refuses".into())),
    );

    assert!(left.resolve("x").is_ok());
    assert!(right.resolve("x").is_err());
    assert!(right.registry().unwrap().loaded_names().is_empty());
}

// =============================================================================
// Event Tests
// =============================================================================

#[tokio::test]
async fn test_events_follow_resolution_and_reload() {
    use futures::StreamExt;

    let app = Namespace::new("App");
    let registry = app.attach_registry();
    registry.add_factory("known", CreateNamespace::new());
    let mut events = registry.subscribe(16);

    app.resolve("known").unwrap();
    assert!(app.resolve("unknown").is_err());
    registry.reload().unwrap();

    assert_eq!(
        events.next().await,
        Some(RegistryEvent::Bound {
            namespace: "App".to_string(),
            name: CanonicalName::new("Known"),
        })
    );
    assert_eq!(
        events.next().await,
        Some(RegistryEvent::NotFound {
            namespace: "App".to_string(),
            name: CanonicalName::new("Unknown"),
        })
    );
    assert_eq!(
        events.next().await,
        Some(RegistryEvent::Reloaded {
            namespace: "App".to_string(),
            names: vec![CanonicalName::new("Known")],
        })
    );
}

#[tokio::test]
async fn test_dropped_subscriber_does_not_block_resolution() {
    let app = Namespace::new("App");
    let registry = app.attach_registry();
    registry.add_factory(Key::Wildcard, CreateNamespace::new());

    let events = registry.subscribe(1);
    drop(events);
    let _full = registry.subscribe(1);

    for name in ["a", "b", "c"] {
        assert!(app.resolve(name).is_ok());
    }
    assert_eq!(registry.loaded_names().len(), 3);
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_error_display() {
    let error = LazyspaceError::CircularResolution {
        namespace: "App".to_string(),
        name: CanonicalName::new("x"),
    };
    assert_eq!(error.to_string(), "Circular resolution of App::X");

    let error = LazyspaceError::InvalidConfig("at least one directory is required".to_string());
    assert!(error.to_string().contains("directory"));
}
