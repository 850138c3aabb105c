use std::sync::Arc;

use sandiq::prelude::*;

#[derive(Debug, Injectable)]
struct Logger {
    #[inject(default = String::from("/tmp/log"))]
    path: String,
}

#[derive(Debug, Injectable)]
struct Service {
    logger: Arc<Logger>,
}

#[derive(Debug, Injectable)]
struct Mailer {
    #[inject(key = "mail.transport")]
    transport: Arc<String>,
    #[inject(default)]
    retries: u32,
    #[inject(default = 25)]
    port: u16,
    tracer: Option<Arc<Tracer>>,
}

#[derive(Debug)]
struct Tracer;

#[derive(Debug, Injectable)]
struct Heartbeat;

#[derive(Debug, Injectable)]
struct Holder<T: Send + Sync + 'static> {
    inner: Arc<T>,
}

#[test]
fn logger_and_service_resolve_without_registration() {
    let container = Container::new();
    let service = container.get::<Service>().unwrap();
    assert_eq!(service.logger.path, "/tmp/log");
}

#[test]
fn scalar_override_by_field_name() {
    let container = Container::new();
    container.params(Key::of::<Logger>(), Params::new().with("$path", Value::of(String::from("/var/log/app"))));

    assert_eq!(container.get::<Service>().unwrap().logger.path, "/var/log/app");
}

#[test]
fn derived_definition_lists_fields_in_order() {
    let definition = Mailer::definition();
    let names: Vec<_> = definition.arguments().iter().map(Argument::name).collect();
    assert_eq!(names, vec!["transport", "retries", "port", "tracer"]);

    let arguments = definition.arguments();
    assert_eq!(arguments[0].class_key(), Some(&Key::from("mail.transport")));
    assert!(arguments[0].is_required());
    assert!(!arguments[1].is_required());
    assert!(!arguments[3].is_required());
}

#[test]
fn keyed_and_defaulted_fields() {
    let container = Container::new();
    container.instance("mail.transport", Arc::new(String::from("smtp")));

    let mailer = container.get::<Mailer>().unwrap();
    assert_eq!(mailer.transport.as_str(), "smtp");
    assert_eq!(mailer.retries, 0);
    assert_eq!(mailer.port, 25);
    assert!(mailer.tracer.is_none());
}

#[test]
fn missing_keyed_dependency_names_the_field() {
    let container = Container::new();
    match container.get::<Mailer>().unwrap_err() {
        SandiqError::UnresolvableArgument(e) => {
            assert_eq!(e.name, "transport");
            assert_eq!(e.position, 0);
        }
        other => panic!("Expected UnresolvableArgument, got: {other:?}"),
    }
}

#[test]
fn unit_struct_is_injectable() {
    let container = Container::new();
    assert!(container.get::<Heartbeat>().is_ok());
}

#[test]
fn generic_struct_needs_local_registration() {
    let container = Container::new();
    container.instance_value(7u64);
    assert!(container.get::<Holder<u64>>().is_err());

    container.autowire::<Holder<u64>>();
    assert_eq!(*container.get::<Holder<u64>>().unwrap().inner, 7);
}

#[test]
fn disabled_autowiring_ignores_catalog() {
    let container = Container::builder().autowiring(false).build().unwrap();
    assert!(matches!(
        container.get::<Heartbeat>().unwrap_err(),
        SandiqError::NoFactory(_)
    ));
}
