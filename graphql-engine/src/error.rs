//! Engine errors.
//!
//! Load-time errors ([`ParseError`], [`BindingError`], [`ConfigurationError`]) are fatal and
//! returned to the caller before any request is accepted. Request-time errors never escape
//! [`crate::Engine::execute`]: they are converted into [`crate::graphql::Error`]s and reported in
//! the response envelope.

use std::time::Duration;

use apollo_compiler::validation::DiagnosticList;
use displaydoc::Display;
use thiserror::Error;

use crate::graphql::ErrorExtension;

/// Errors raised while loading a schema document.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ParseError {
    /// GraphQL syntax error(s): {0}
    Syntax(SyntaxErrors),
    /// type '{0}' is defined more than once
    DuplicateType(String),
    /// field '{field}' is defined more than once on type '{type_name}'
    DuplicateField { type_name: String, field: String },
    /// argument '{argument}' is defined more than once on '{coordinate}'
    DuplicateArgument { coordinate: String, argument: String },
    /// value '{value}' is defined more than once in enum '{type_name}'
    DuplicateEnumValue { type_name: String, value: String },
    /// unknown type '{type_name}' referenced by '{referenced_by}'
    UnknownType {
        type_name: String,
        referenced_by: String,
    },
    /// '{referenced_by}' must be an output type but '{type_name}' is an input object
    InvalidOutputType {
        type_name: String,
        referenced_by: String,
    },
    /// '{referenced_by}' must be an input type but '{type_name}' is an object type
    InvalidInputType {
        type_name: String,
        referenced_by: String,
    },
    /// root operation type '{type_name}' must be an object type
    InvalidRootType { type_name: String },
    /// invalid default value for '{coordinate}': {reason}
    InvalidDefaultValue { coordinate: String, reason: String },
    /// the schema does not define a query root type
    MissingQueryRoot,
    /// type '{0}' declares no fields
    EmptyType(String),
    /// unsupported schema definition: {0}
    Unsupported(String),
}

/// Collection of GraphQL syntax errors.
#[derive(Debug)]
pub struct SyntaxErrors {
    pub(crate) errors: DiagnosticList,
}

impl std::fmt::Display for SyntaxErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut errors = self.errors.iter();
        for (i, error) in errors.by_ref().take(5).enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", error)?;
        }
        let remaining = errors.count();
        if remaining > 0 {
            write!(f, "\n...and {remaining} other errors")?;
        }
        Ok(())
    }
}

/// Errors raised while binding resolvers to a schema.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BindingError {
    /// no resolver is bound to '{type_name}.{field_name}'
    NotFound {
        type_name: String,
        field_name: String,
    },
    /// a resolver is already bound to '{type_name}.{field_name}'
    Duplicate {
        type_name: String,
        field_name: String,
    },
    /// a resolver is bound to '{type_name}.{field_name}' which is not an object field of the schema
    UnknownField {
        type_name: String,
        field_name: String,
    },
    /// the resolver bound to '{type_name}.{field_name}' does not accept the declared argument '{argument}'
    MissingArgument {
        type_name: String,
        field_name: String,
        argument: String,
    },
}

/// Errors recorded at the path of a field while executing an operation.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub(crate) enum ExecutionError {
    /// Cannot query field "{field_name}" on type "{type_name}".
    UnknownField {
        type_name: String,
        field_name: String,
    },
    /// Cannot return null for non-nullable field {type_name}.{field_name}.
    NonNullViolation {
        type_name: String,
        field_name: String,
    },
    /// {ty} cannot represent value {value} returned for field {type_name}.{field_name}.
    InvalidValue {
        type_name: String,
        field_name: String,
        ty: String,
        value: String,
    },
    /// Field "{field_name}" of type "{ty}" must have a selection of subfields.
    MissingSelection { field_name: String, ty: String },
    /// Field "{field_name}" must not have a selection since type "{ty}" has no subfields.
    UnexpectedSelection { field_name: String, ty: String },
    /// Resolver for {type_name}.{field_name} timed out after {timeout:?}.
    Timeout {
        type_name: String,
        field_name: String,
        timeout: Duration,
    },
    /// the operation was cancelled
    Cancelled,
    /// {0}
    Binding(#[from] BindingError),
}

impl ErrorExtension for ExecutionError {
    fn extension_code(&self) -> String {
        match self {
            ExecutionError::UnknownField { .. } => "INVALID_FIELD",
            ExecutionError::NonNullViolation { .. } => "NON_NULL_VIOLATION",
            ExecutionError::InvalidValue { .. } => "INVALID_VALUE",
            ExecutionError::MissingSelection { .. }
            | ExecutionError::UnexpectedSelection { .. } => "SELECTION_MISMATCH",
            ExecutionError::Timeout { .. } => "RESOLVER_TIMEOUT",
            ExecutionError::Cancelled => "OPERATION_CANCELLED",
            ExecutionError::Binding(_) => "INTERNAL_SERVER_ERROR",
        }
        .to_string()
    }
}

/// Errors raised while loading a schema and binding its resolvers.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum LoadError {
    /// could not load schema: {0}
    Parse(#[from] ParseError),
    /// could not bind resolvers: {0}
    Binding(#[from] BindingError),
}

/// Errors raised while reading the engine configuration.
#[derive(Error, Display, Debug)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration: {0}
    Io(#[from] std::io::Error),
    /// could not parse configuration: {0}
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_error_messages() {
        insta::assert_snapshot!(
            BindingError::NotFound {
                type_name: "Query".to_string(),
                field_name: "greet".to_string(),
            }
            .to_string(),
            @"no resolver is bound to 'Query.greet'"
        );
        insta::assert_snapshot!(
            BindingError::MissingArgument {
                type_name: "Query".to_string(),
                field_name: "greetPerson".to_string(),
                argument: "person".to_string(),
            }
            .to_string(),
            @"the resolver bound to 'Query.greetPerson' does not accept the declared argument 'person'"
        );
    }

    #[test]
    fn execution_error_messages() {
        let error = ExecutionError::NonNullViolation {
            type_name: "Query".to_string(),
            field_name: "note".to_string(),
        };
        insta::assert_snapshot!(
            error.to_string(),
            @"Cannot return null for non-nullable field Query.note."
        );
        assert_eq!(
            error.to_graphql_error(None).extension_code().as_deref(),
            Some("NON_NULL_VIOLATION")
        );
        insta::assert_snapshot!(
            ExecutionError::Timeout {
                type_name: "Query".to_string(),
                field_name: "slow".to_string(),
                timeout: Duration::from_millis(50),
            }
            .to_string(),
            @"Resolver for Query.slow timed out after 50ms."
        );
    }

    #[test]
    fn parse_error_messages() {
        insta::assert_snapshot!(
            ParseError::UnknownType {
                type_name: "Nope".to_string(),
                referenced_by: "Query.note".to_string(),
            }
            .to_string(),
            @"unknown type 'Nope' referenced by 'Query.note'"
        );
    }
}
