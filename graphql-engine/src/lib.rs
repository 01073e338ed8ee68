//! A GraphQL execution engine: a schema document bound to resolver functions.
//!
//! The schema and the [`ResolverRegistry`] are checked against each other once, when the
//! [`Engine`] is built. Requests then never fail as a whole: each field error is recorded at its
//! path and nulls propagate up to the nearest nullable position.

#![warn(unreachable_pub)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod configuration;
pub mod demo;
pub mod error;
mod executable;
mod execution;
pub mod graphql;
pub mod json_ext;
mod registry;
mod spec;

pub use configuration::Configuration;
pub use executable::main;
pub use execution::Engine;
pub use registry::FieldError;
pub use registry::PropertyResolver;
pub use registry::Resolver;
pub use registry::ResolverBinding;
pub use registry::ResolverRegistry;
pub use registry::ResolverRequest;
pub use registry::resolver_fn;
pub use spec::EnumType;
pub use spec::FieldDefinition;
pub use spec::FieldType;
pub use spec::InputObjectType;
pub use spec::InputValueDefinition;
pub use spec::ObjectType;
pub use spec::OperationKind;
pub use spec::ScalarType;
pub use spec::Schema;
pub use spec::SpecError;
pub use spec::TypeDefinition;
pub use tokio_util::sync::CancellationToken;
