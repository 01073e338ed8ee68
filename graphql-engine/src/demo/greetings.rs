//! Greetings: root fields only, with arguments and an enum.

use serde_json_bytes::json;

use crate::configuration::Configuration;
use crate::error::BindingError;
use crate::error::LoadError;
use crate::execution::Engine;
use crate::registry::FieldError;
use crate::registry::ResolverBinding;
use crate::registry::ResolverRegistry;
use crate::registry::ResolverRequest;
use crate::registry::resolver_fn;

pub const SCHEMA: &str = include_str!("greetings.graphql");

fn time_of_day_greeting(time_of_day: &str) -> &'static str {
    match time_of_day {
        "MORNING" => "Good morning",
        "AFTERNOON" => "Good afternoon",
        "EVENING" => "Good evening",
        _ => "Go to bed",
    }
}

/// Resolvers of the greetings schema.
pub fn registry() -> Result<ResolverRegistry, BindingError> {
    let mut registry = ResolverRegistry::new();
    registry.bind(ResolverBinding::new(
        "Query",
        "greet",
        resolver_fn(|_| async { Ok(json!("Hello, world!")) }),
    ))?;
    registry.bind(
        ResolverBinding::new(
            "Query",
            "greetPerson",
            resolver_fn(|request: ResolverRequest| async move {
                let person = request.str_argument("person")?;
                Ok::<_, FieldError>(json!(format!("Hello, {person}!")))
            }),
        )
        .with_arguments(["person"]),
    )?;
    registry.bind(
        ResolverBinding::new(
            "Query",
            "greetPersonTimeOfDay",
            resolver_fn(|request: ResolverRequest| async move {
                let person = request.str_argument("person")?;
                let greeting = time_of_day_greeting(request.str_argument("timeOfDay")?);
                Ok::<_, FieldError>(json!(format!("{greeting}, {person}!")))
            }),
        )
        .with_arguments(["person", "timeOfDay"]),
    )?;
    Ok(registry)
}

pub fn engine(configuration: Configuration) -> Result<Engine, LoadError> {
    Engine::load(SCHEMA, registry()?, configuration)
}
