//! Basic example of the Sandiq container.

use std::sync::Arc;

use sandiq::prelude::*;

// === Define your types ===

#[derive(Injectable)]
struct Config {
    #[inject(default = String::from("postgres://localhost/myapp"))]
    database_url: String,
    #[inject(default)]
    debug: bool,
}

#[derive(Injectable)]
struct Logger {
    #[inject(default = String::from("app"))]
    channel: String,
}

impl Logger {
    fn log(&self, msg: &str) {
        println!("[{}] {msg}", self.channel);
    }
}

struct ConnectionManager {
    config: Arc<Config>,
    logger: Arc<Logger>,
}

struct Connection {
    dsn: String,
}

struct UserRepository {
    db: Arc<Connection>,
}

impl UserRepository {
    fn find_user(&self, id: u64) -> String {
        format!("user {id} from {}", self.db.dsn)
    }
}

#[derive(Injectable)]
struct UserService {
    repo: Arc<UserRepository>,
    logger: Arc<Logger>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        self.logger.log(&format!("Getting user {id}"));
        self.repo.find_user(id)
    }
}

// === Group registrations in a provider ===

struct DatabaseProvider;

impl ServiceProvider for DatabaseProvider {
    fn register(&self, container: &Container) -> Result<()> {
        container.autowire_definition(
            Key::of::<ConnectionManager>(),
            Definition::builder("ConnectionManager::new")
                .class::<Config>("config")
                .class::<Logger>("logger")
                .build(|args| {
                    Ok(ConnectionManager {
                        config: args.object(0)?,
                        logger: args.object(1)?,
                    })
                }),
        );
        container.method(
            Key::of::<ConnectionManager>(),
            Definition::builder("ConnectionManager::connection")
                .scalar_or("name", String::from("main"))
                .build_method(|manager: &ConnectionManager, args| {
                    let name: String = args.value(0)?;
                    manager.logger.log(&format!("Opening connection {name}"));
                    Ok(Connection {
                        dsn: format!("{}#{name}", manager.config.database_url),
                    })
                }),
        );
        container.share([Key::of::<Config>(), Key::of::<Logger>(), Key::of::<ConnectionManager>()]);

        // "db" is the main connection; "db.reporting" the same recipe with another name.
        container.define("db", (Key::of::<ConnectionManager>(), "connection"), Params::new())?;
        container.define(
            "db.reporting",
            (Key::of::<ConnectionManager>(), "connection"),
            Params::new().with("$name", Value::of(String::from("reporting"))),
        )?;
        container.share(["db", "db.reporting"]);
        container.internal(Key::of::<ConnectionManager>());

        container.autowire_definition(
            Key::of::<UserRepository>(),
            Definition::builder("UserRepository::new")
                .class_key("db", "db")
                .build(|args| Ok(UserRepository { db: args.object(0)? })),
        );
        Ok(())
    }

    fn boot(&self, container: &Container) -> Result<()> {
        let config = container.get::<Config>()?;
        if config.debug {
            container.resolving_any(|_, _| println!("[debug] built an object"));
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("sandiq_container=debug")
        .init();

    let container = Container::builder().provider(DatabaseProvider).build()?;

    println!("✅ Container built successfully!");
    println!("{container:?}");

    let service = container.get::<UserService>()?;
    println!("👤 {}", service.get_user(42));

    // Same repository definition, reporting connection, only for this call.
    let reporting = container.resolve_with(
        Key::of::<UserRepository>(),
        Params::new().with("$db", Value::key("db.reporting")),
    )?;
    if let Some(repo) = reporting.downcast_ref::<UserRepository>() {
        println!("📊 {}", repo.find_user(7));
    }

    // The manager is internal: only reachable as a dependency.
    if let Err(err) = container.get::<ConnectionManager>() {
        println!("🔒 {err}");
    }

    // One container per unit of work.
    let scope = container.scope();
    let scoped = scope.resolve("db")?;
    let root = container.resolve("db")?;
    println!("🔁 scoped db is a fresh instance: {}", !Arc::ptr_eq(&scoped, &root));

    println!("\n🎉 Everything works!");
    Ok(())
}
