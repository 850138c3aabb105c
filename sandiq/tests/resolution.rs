use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use sandiq::prelude::*;

#[derive(Debug)]
struct Store {
    kind: &'static str,
}

#[derive(Debug)]
struct Cache {
    name: &'static str,
}

#[derive(Debug)]
struct Repository {
    store: Arc<Store>,
}

fn repository_definition() -> Definition {
    Definition::builder("app::Repository::new")
        .class::<Store>("x")
        .build(|args| Ok(Repository { store: args.object(0)? }))
}

fn file_store() -> Definition {
    Definition::builder("app::Store::file").build(|_| Ok(Store { kind: "file" }))
}

// ── Sharing ──

#[test]
fn shared_key_returns_identical_object() {
    let container = Container::new();
    container.define(Key::of::<Store>(), file_store(), Params::new()).unwrap();
    container.share(Key::of::<Store>());

    let first = container.get::<Store>().unwrap();
    for _ in 0..5 {
        assert!(Arc::ptr_eq(&first, &container.get::<Store>().unwrap()));
    }
}

#[test]
fn instance_returns_identical_object() {
    let container = Container::new();
    let cache: Object = Arc::new(Cache { name: "seeded" });
    container.instance("cache", cache.clone());

    assert!(Arc::ptr_eq(&cache, &container.resolve("cache").unwrap()));
    assert!(container.is_bound("cache"));
}

#[test]
fn unshared_key_builds_fresh_objects() {
    let container = Container::new();
    container.define(Key::of::<Store>(), file_store(), Params::new()).unwrap();

    let a = container.get::<Store>().unwrap();
    let b = container.get::<Store>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn concurrent_cache_misses_agree_on_one_instance() {
    let container = Container::new();
    container.define_with("slow", |_| {
        thread::yield_now();
        Ok(Cache { name: "slow" })
    })
    .unwrap();
    container.share("slow");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let container = container.clone();
            thread::spawn(move || container.resolve("slow").unwrap())
        })
        .collect();
    let objects: Vec<Object> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let cached = container.resolve("slow").unwrap();
    assert!(objects.iter().all(|object| Arc::ptr_eq(object, &cached)));
}

// ── Overrides ──

#[test]
fn override_by_name_replaces_declared_type() {
    let container = Container::new();
    container.define(Key::of::<Store>(), file_store(), Params::new()).unwrap();
    container
        .define_with("store.memory", |_| Ok(Store { kind: "memory" }))
        .unwrap();
    container
        .define(
            Key::of::<Repository>(),
            repository_definition(),
            Params::new().with("$x", Value::key("store.memory")),
        )
        .unwrap();

    assert_eq!(container.get::<Repository>().unwrap().store.kind, "memory");
}

#[test]
fn call_site_overrides_win() {
    let container = Container::new();
    container.define(Key::of::<Repository>(), repository_definition(), Params::new()).unwrap();
    container.params(Key::of::<Repository>(), Params::new().with("x", Value::of(Store { kind: "registered" })));

    let repository = container
        .resolve_with(
            Key::of::<Repository>(),
            Params::new().with("$x", Value::of(Store { kind: "call-site" })),
        )
        .unwrap();
    let repository = repository.downcast::<Repository>().ok().unwrap();
    assert_eq!(repository.store.kind, "call-site");
}

#[test]
fn cache_hit_ignores_overrides() {
    let container = Container::new();
    container.define(Key::of::<Repository>(), repository_definition(), Params::new()).unwrap();
    container.share(Key::of::<Repository>());

    let first = container
        .resolve_with(Key::of::<Repository>(), Params::new().with("x", Value::of(Store { kind: "one" })))
        .unwrap();
    let second = container
        .resolve_with(Key::of::<Repository>(), Params::new().with("x", Value::of(Store { kind: "two" })))
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.downcast_ref::<Repository>().unwrap().store.kind, "one");
}

// ── Optional arguments ──

#[test]
fn optional_argument_falls_back_to_default() {
    #[derive(Debug)]
    struct Page {
        cache: Arc<Cache>,
    }

    let container = Container::new();
    container.autowire_definition(
        Key::of::<Page>(),
        Definition::builder("app::Page::new")
            .argument(
                Argument::class(0, "cache", "app::RedisCache").with_default(Value::of(Cache { name: "null" })),
            )
            .build(|args| Ok(Page { cache: args.object(0)? })),
    );

    assert_eq!(container.get::<Page>().unwrap().cache.name, "null");
}

// ── Aliases ──

#[test]
fn alias_resolves_to_canonical_identity() {
    let container = Container::new();
    container.define("Impl", file_store(), Params::new()).unwrap();
    container.share(["Impl", "Iface"]);
    container.alias("Impl", "Iface");

    let via_alias = container.resolve("Iface").unwrap();
    let direct = container.resolve("Impl").unwrap();
    assert!(Arc::ptr_eq(&via_alias, &direct));
    assert!(container.is_alias("Iface"));
}

#[test]
fn alias_params_take_precedence() {
    let container = Container::new();
    let named = Definition::builder("app::named")
        .scalar::<String>("name")
        .build(|args| args.value::<String>(0));
    container
        .define("conn", named, Params::new().with("name", Value::of(String::from("main"))))
        .unwrap();
    container.alias("conn", ["conn.reporting", "conn.default"]);
    container.params("conn.reporting", Params::new().with("name", Value::of(String::from("reporting"))));

    assert_eq!(container.resolve_as::<String>("conn.reporting").unwrap().as_str(), "reporting");
    assert_eq!(container.resolve_as::<String>("conn.default").unwrap().as_str(), "main");
}

// ── Internal fencing ──

#[test]
fn internal_key_only_reachable_as_dependency() {
    let container = Container::new();
    container.define(Key::of::<Store>(), file_store(), Params::new()).unwrap();
    container.define(Key::of::<Repository>(), repository_definition(), Params::new()).unwrap();
    container.internal(Key::of::<Store>());

    match container.get::<Store>().unwrap_err() {
        SandiqError::InternalResolution { key, alias } => {
            assert_eq!(key, Key::of::<Store>());
            assert!(alias.is_none());
        }
        other => panic!("Expected InternalResolution, got: {other:?}"),
    }
    assert_eq!(container.get::<Repository>().unwrap().store.kind, "file");
}

#[test]
fn internal_alias_is_fenced_too() {
    let container = Container::new();
    container.define("pdo", file_store(), Params::new()).unwrap();
    container.alias("pdo", "db");
    container.internal("db");

    assert!(matches!(
        container.resolve("db").unwrap_err(),
        SandiqError::InternalResolution { alias: Some(_), .. }
    ));
    assert!(container.resolve("pdo").is_ok());
}

#[test]
fn internal_key_is_fenced_from_outside_factories() {
    let container = Container::new();
    container.define_with("secret", |_| Ok(String::from("pw"))).unwrap();
    container.internal("secret");

    match container.get_factory("secret", Params::new()).make_as::<String>(&container).unwrap_err() {
        SandiqError::InternalResolution { key, alias } => {
            assert_eq!(key, Key::from("secret"));
            assert!(alias.is_none());
        }
        other => panic!("Expected InternalResolution, got: {other:?}"),
    }

    // As another argument's value the factory still reaches the key.
    container
        .define(
            "login",
            Definition::builder("app::Login::new")
                .class::<String>("password")
                .build(|args| {
                    let password: Arc<String> = args.object(0)?;
                    Ok(password.len())
                }),
            Params::new().with("$password", container.get_factory("secret", Params::new())),
        )
        .unwrap();
    assert_eq!(*container.resolve_as::<usize>("login").unwrap(), 2);
}

#[test]
fn closure_factories_may_use_internal_keys() {
    let container = Container::new();
    container.instance("secret", Arc::new(String::from("hunter2")));
    container.internal("secret");
    container
        .define_with("vault", |r| {
            let secret: Arc<String> = r.resolve_as("secret")?;
            Ok(secret.len())
        })
        .unwrap();

    assert_eq!(*container.resolve_as::<usize>("vault").unwrap(), 7);
}

// ── Hooks ──

#[test]
fn hooks_fire_once_globals_first() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = Container::new();
    container.define(Key::of::<Store>(), file_store(), Params::new()).unwrap();

    for tag in ["global-1", "global-2"] {
        let log = log.clone();
        container.resolving_any(move |_, _| log.lock().unwrap().push(tag));
    }
    container.resolving(Key::of::<Store>(), {
        let log = log.clone();
        move |_: &mut Store, _| log.lock().unwrap().push("store")
    });

    container.get::<Store>().unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["global-1", "global-2", "store"]);
}

#[test]
fn hooks_mutate_in_place_and_skip_cache_hits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let container = Container::new();
    container.define(Key::of::<Store>(), file_store(), Params::new()).unwrap();
    container.share(Key::of::<Store>());
    container.resolving(Key::of::<Store>(), {
        let calls = calls.clone();
        move |store: &mut Store, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            store.kind = "hooked";
        }
    });

    assert_eq!(container.get::<Store>().unwrap().kind, "hooked");
    assert_eq!(container.get::<Store>().unwrap().kind, "hooked");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn container_aware_objects_receive_handle() {
    #[derive(Debug)]
    struct Controller {
        container: Option<WeakContainer>,
    }

    impl ContainerAware for Controller {
        fn set_container(&mut self, container: WeakContainer) {
            self.container = Some(container);
        }
    }

    let seen_by_hook = Arc::new(AtomicUsize::new(0));
    let container = Container::new();
    container.container_aware::<Controller>();
    container.define_with("controller", |_| Ok(Controller { container: None })).unwrap();
    container.resolving("controller", {
        let seen_by_hook = seen_by_hook.clone();
        move |controller: &mut Controller, _| {
            if controller.container.is_some() {
                seen_by_hook.fetch_add(1, Ordering::SeqCst);
            }
        }
    });

    let controller = container.resolve_as::<Controller>("controller").unwrap();
    let handle = controller.container.as_ref().and_then(WeakContainer::upgrade).unwrap();
    assert!(handle.ptr_eq(&container));
    assert_eq!(seen_by_hook.load(Ordering::SeqCst), 1);
}

// ── Factories ──

#[test]
fn factory_argument_is_built_lazily_with_bound_params() {
    #[derive(Debug)]
    struct Connection {
        name: String,
    }
    #[derive(Debug)]
    struct Report {
        conn: Arc<Connection>,
    }

    let builds = Arc::new(AtomicUsize::new(0));
    let connection = Definition::builder("app::Connection::open").scalar::<String>("name").build({
        let builds = builds.clone();
        move |args| {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(Connection { name: args.value(0)? })
        }
    });
    let report = Definition::builder("app::Report::new")
        .class::<Connection>("conn")
        .build(|args| Ok(Report { conn: args.object(0)? }));
    let factory = Factory::new(connection);

    let container = Container::new();
    container
        .define(
            "report.x",
            report.clone(),
            Params::new().with("$conn", factory.bind(Params::new().with("$name", Value::of(String::from("X"))))),
        )
        .unwrap();
    container
        .define(
            "report.y",
            report,
            Params::new().with("$conn", factory.bind(Params::new().with("$name", Value::of(String::from("Y"))))),
        )
        .unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 0);

    let x = container.resolve_as::<Report>("report.x").unwrap();
    assert_eq!(builds.load(Ordering::SeqCst), 1);
    let y = container.resolve_as::<Report>("report.y").unwrap();

    assert_eq!(x.conn.name, "X");
    assert_eq!(y.conn.name, "Y");
    assert!(!Arc::ptr_eq(&x.conn, &y.conn));
}

#[test]
fn get_factory_binds_params_for_a_key() {
    let container = Container::new();
    let named = Definition::builder("app::named")
        .scalar_or("name", String::from("main"))
        .build(|args| args.value::<String>(0));
    container.define("conn", named, Params::new()).unwrap();
    container.share("conn");

    let reporting = container.get_factory("conn", Params::new().with("$name", Value::of(String::from("reporting"))));
    assert_eq!(reporting.make_as::<String>(&container).unwrap().as_str(), "reporting");
    assert_eq!(container.resolve_as::<String>("conn").unwrap().as_str(), "main");
}

// ── Methods ──

#[derive(Debug)]
struct ConnectionManager {
    opened: Mutex<Vec<String>>,
}

#[derive(Debug)]
struct Pdo {
    connection: String,
}

fn manager_container() -> Container {
    let container = Container::new();
    container.autowire_definition(
        Key::of::<ConnectionManager>(),
        Definition::builder("app::ConnectionManager::new").build(|_| {
            Ok(ConnectionManager {
                opened: Mutex::new(Vec::new()),
            })
        }),
    );
    container.share(Key::of::<ConnectionManager>());
    container.method(
        Key::of::<ConnectionManager>(),
        Definition::builder("app::ConnectionManager::get_pdo")
            .scalar_or("connection", String::from("default"))
            .build_method(|manager: &ConnectionManager, args| {
                let connection: String = args.value(0)?;
                if let Ok(mut opened) = manager.opened.lock() {
                    opened.push(connection.clone());
                }
                Ok(Pdo { connection })
            }),
    );
    container
}

#[test]
fn method_factory_uses_key_params() {
    let container = manager_container();
    container
        .define("PDO", (Key::of::<ConnectionManager>(), "get_pdo"), Params::new())
        .unwrap();
    container.params("PDO", Params::new().with("$connection", Value::of(String::from("reporting"))));

    let pdo = container.resolve_as::<Pdo>("PDO").unwrap();
    assert_eq!(pdo.connection, "reporting");

    let manager = container.get::<ConnectionManager>().unwrap();
    assert_eq!(*manager.opened.lock().unwrap(), vec!["reporting".to_string()]);
}

#[test]
fn invoke_method_with_autowired_receiver() {
    let container = manager_container();
    let pdo = container
        .invoke_as::<Pdo>(Callable::method(Key::of::<ConnectionManager>(), "get_pdo"), Params::new())
        .unwrap();
    assert_eq!(pdo.connection, "default");
}

#[test]
fn invoke_free_function() {
    let container = Container::new();
    container.instance_value(Cache { name: "warm" });
    let describe = Definition::builder("app::describe")
        .class::<Cache>("cache")
        .scalar::<u8>("level")
        .build(|args| {
            let cache: Arc<Cache> = args.object(0)?;
            Ok(format!("{}:{}", cache.name, args.value::<u8>(1)?))
        });

    let text = container
        .invoke_as::<String>(describe, Params::new().with("level", Value::of(2u8)))
        .unwrap();
    assert_eq!(text.as_str(), "warm:2");
}

// ── Failures ──

#[test]
fn missing_binding_is_no_factory() {
    let container = Container::new();
    container.instance("database", Arc::new(1u8));

    match container.resolve("databse").unwrap_err() {
        SandiqError::NoFactory(e) => assert_eq!(e.suggestions, vec!["database".to_string()]),
        other => panic!("Expected NoFactory, got: {other:?}"),
    }
}

#[test]
fn cycle_reports_chain() {
    let container = Container::new();
    container.define("a", Definition::builder("a").class_key("b", "b").build(|_| Ok(())), Params::new()).unwrap();
    container.define("b", Definition::builder("b").class_key("c", "c").build(|_| Ok(())), Params::new()).unwrap();
    container.define("c", Definition::builder("c").class_key("a", "a").build(|_| Ok(())), Params::new()).unwrap();

    let err = container.resolve("a").unwrap_err();
    let keys = match &err {
        SandiqError::CircularDependency(e) => e.chain.iter().map(Key::as_str).collect::<Vec<_>>(),
        other => panic!("Expected CircularDependency, got: {other:?}"),
    };
    assert_eq!(keys, vec!["a", "b", "c", "a"]);
    assert!(err.to_string().contains("a → b → c → a"));
}

#[test]
fn factory_errors_propagate_untouched() {
    let container = Container::new();
    container
        .define_with("flaky", |_| -> Result<u8> {
            Err(SandiqError::construction("flaky", "disk full"))
        })
        .unwrap();

    match container.resolve("flaky").unwrap_err() {
        SandiqError::ConstructionFailed { key, source } => {
            assert_eq!(key.as_str(), "flaky");
            assert_eq!(source.to_string(), "disk full");
        }
        other => panic!("Expected ConstructionFailed, got: {other:?}"),
    }
}
