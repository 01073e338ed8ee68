//! Builds response objects out of field results.

use crate::error::ExecutionError;
use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::Response;
use crate::json_ext::Object;
use crate::json_ext::Value;
use crate::spec::InvalidValue;

/// Outcome of one entry of a selection set.
///
/// An `Err` value means the field is null but may not be: the parent has to become null in turn.
#[derive(Debug)]
pub(crate) struct FieldResult {
    pub(crate) key: String,
    pub(crate) value: Result<Value, InvalidValue>,
    pub(crate) errors: Vec<Error>,
}

impl FieldResult {
    pub(crate) fn new(key: &str, value: Result<Value, InvalidValue>) -> Self {
        Self {
            key: key.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    pub(crate) fn with_error(mut self, error: Error) -> Self {
        self.errors.push(error);
        self
    }
}

/// Assemble the results of a selection set, given in selection order.
///
/// Errors are kept in the order the fields were selected. If any field propagates its null, the
/// object itself does.
pub(crate) fn assemble_object(
    results: Vec<FieldResult>,
) -> (Result<Object, InvalidValue>, Vec<Error>) {
    let mut object = Object::new();
    let mut errors = Vec::new();
    let mut invalid = false;
    for result in results {
        errors.extend(result.errors);
        match result.value {
            Ok(value) => {
                object.insert(result.key, value);
            }
            Err(InvalidValue) => invalid = true,
        }
    }
    if invalid {
        (Err(InvalidValue), errors)
    } else {
        (Ok(object), errors)
    }
}

/// Build the response of an executed operation.
///
/// `data` is null when a non-null root field propagated its null.
pub(crate) fn assemble_response(
    data: Result<Object, InvalidValue>,
    mut errors: Vec<Error>,
    cancelled: bool,
) -> Response {
    if cancelled {
        errors.push(ExecutionError::Cancelled.to_graphql_error(None));
    }
    Response::builder()
        .and_data(data.ok().map(Value::Object))
        .errors(errors)
        .build()
}
