//! Service providers: modules of related bindings.
//!
//! Providers group the `define`/`share`/`alias`/`params` calls of one
//! subsystem, so the boot phase reads as a list of subsystems instead of
//! one long registration block.
//!
//! # Examples
//! ```rust,ignore
//! struct DatabaseProvider;
//!
//! impl ServiceProvider for DatabaseProvider {
//!     fn register(&self, container: &Container) -> Result<()> {
//!         container.autowire::<ConnectionManager>();
//!         container.define("pdo", ("app::ConnectionManager", "get_pdo"), Params::new())?;
//!         container.share(["pdo", "app::ConnectionManager"]);
//!         Ok(())
//!     }
//! }
//! ```

use crate::container::Container;
use crate::error::Result;

/// A unit of registrations applied to a [`Container`] during boot.
///
/// `register` only records bindings. `boot` runs after every provider
/// has registered, so it may resolve services contributed by others.
pub trait ServiceProvider: Send + Sync {
    /// Records bindings. Called once, when the provider is added.
    fn register(&self, container: &Container) -> Result<()>;

    /// Called once after all providers have registered.
    fn boot(&self, _container: &Container) -> Result<()> {
        Ok(())
    }

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SandiqError;
    use crate::key::Key;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ConfigProvider;

    impl ServiceProvider for ConfigProvider {
        fn register(&self, container: &Container) -> Result<()> {
            container.instance("config.env", Arc::new(String::from("testing")));
            container.define_with("greeting", |r| {
                let env: Arc<String> = r.resolve_as("config.env")?;
                Ok(format!("hello from {env}"))
            })?;
            container.share("greeting");
            Ok(())
        }
    }

    /// Resolves during boot something another provider registered.
    struct GreeterProvider {
        booted: Arc<AtomicUsize>,
    }

    impl ServiceProvider for GreeterProvider {
        fn register(&self, container: &Container) -> Result<()> {
            container.alias("greeting", "greeter");
            Ok(())
        }

        fn boot(&self, container: &Container) -> Result<()> {
            let greeting = container.resolve_as::<String>("greeter")?;
            assert_eq!(greeting.as_str(), "hello from testing");
            self.booted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "greeter"
        }
    }

    struct FailingProvider;

    impl ServiceProvider for FailingProvider {
        fn register(&self, container: &Container) -> Result<()> {
            container.define("broken", ("", "connect"), crate::value::Params::new())
        }
    }

    #[test]
    fn providers_register_then_boot_in_order() {
        let booted = Arc::new(AtomicUsize::new(0));
        let container = Container::builder()
            .provider(GreeterProvider { booted: booted.clone() })
            .provider(ConfigProvider)
            .build()
            .unwrap();

        assert_eq!(booted.load(Ordering::SeqCst), 1);
        assert!(container.is_bound("greeter"));

        container.boot().unwrap();
        assert_eq!(booted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn late_provider_boots_immediately() {
        let booted = Arc::new(AtomicUsize::new(0));
        let container = Container::builder().provider(ConfigProvider).build().unwrap();

        container
            .register_provider(GreeterProvider { booted: booted.clone() })
            .unwrap();
        assert_eq!(booted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn register_errors_propagate() {
        let err = Container::builder().provider(FailingProvider).build().unwrap_err();
        match err {
            SandiqError::InvalidFactory { key, .. } => assert_eq!(key, Key::from("broken")),
            other => panic!("Expected InvalidFactory, got: {other:?}"),
        }
    }

    #[test]
    fn provider_has_name() {
        assert!(ConfigProvider.name().contains("ConfigProvider"));
        let greeter = GreeterProvider { booted: Arc::default() };
        assert_eq!(greeter.name(), "greeter");
    }
}
