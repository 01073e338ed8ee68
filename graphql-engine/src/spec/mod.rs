//! GraphQL documents: the schema model, parsed operations and input coercion.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub(crate) mod coercion;
mod field_type;
pub(crate) mod query;
mod schema;
mod selection;

use displaydoc::Display;
pub use field_type::*;
pub(crate) use query::Query;
pub(crate) use query::TYPENAME;
pub use schema::*;
pub(crate) use selection::*;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::graphql::ErrorExtension;
use crate::json_ext::Object;

/// Errors detected while preparing a request, before any resolver runs.
#[derive(Error, Debug, Display, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SpecError {
    /// parsing error: {0}
    ParsingError(String),
    /// the request does not contain a query
    MissingQuery,
    /// Unknown operation named "{0}"
    UnknownOperation(String),
    /// Must provide operation name if query contains multiple operations.
    OperationNameRequired,
    /// the document does not contain any operation
    NoOperation,
    /// operation '{0}' is defined more than once
    DuplicateOperation(String),
    /// fragment '{0}' is defined more than once
    DuplicateFragment(String),
    /// Unknown fragment "{0}".
    UnknownFragment(String),
    /// Cannot spread fragment "{0}" within itself.
    FragmentCycle(String),
    /// variable '${0}' is defined more than once
    DuplicateVariable(String),
    /// subscription operation is not supported
    SubscriptionNotSupported,
    /// the schema does not define a mutation root type
    MutationNotSupported,
}

impl ErrorExtension for SpecError {
    fn extension_code(&self) -> String {
        match self {
            SpecError::ParsingError(_) | SpecError::MissingQuery => "GRAPHQL_PARSE_FAILED",
            SpecError::UnknownOperation(_)
            | SpecError::OperationNameRequired
            | SpecError::NoOperation
            | SpecError::DuplicateOperation(_)
            | SpecError::DuplicateFragment(_)
            | SpecError::UnknownFragment(_)
            | SpecError::FragmentCycle(_)
            | SpecError::DuplicateVariable(_)
            | SpecError::MutationNotSupported => "GRAPHQL_VALIDATION_FAILED",
            SpecError::SubscriptionNotSupported => "SUBSCRIPTION_NOT_SUPPORTED",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        if let SpecError::UnknownOperation(name) = self {
            obj.insert("operationName", name.clone().into());
        }
        (!obj.is_empty()).then_some(obj)
    }
}
