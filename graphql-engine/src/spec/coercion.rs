//! Input coercion: turns argument literals and client supplied variables into the JSON values
//! handed to resolvers.
//!
//! Variables are coerced where they are used, against the type of the argument (or input field,
//! or list item) they stand for.

use std::fmt;

use displaydoc::Display;
use thiserror::Error;

use crate::graphql::ErrorExtension;
use crate::json_ext::Object;
use crate::json_ext::PathElement;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::spec::FieldDefinition;
use crate::spec::FieldType;
use crate::spec::InputObjectType;
use crate::spec::InputValue;
use crate::spec::ScalarType;
use crate::spec::Schema;
use crate::spec::TypeDefinition;
use crate::spec::query::VariableDefinition;

/// Maximum nesting of lists and input objects accepted in an input value.
const MAX_INPUT_DEPTH: usize = 64;

/// Location of a value inside the arguments of a field, e.g. `note.tags[1]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct InputPath(Vec<PathElement>);

impl InputPath {
    fn root(name: &str) -> Self {
        InputPath(vec![PathElement::from(name)])
    }

    fn join(&self, element: impl Into<PathElement>) -> Self {
        let mut elements = self.0.clone();
        elements.push(element.into());
        InputPath(elements)
    }
}

impl fmt::Display for InputPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.0.iter().enumerate() {
            match element {
                PathElement::Index(index) => write!(f, "[{index}]")?,
                PathElement::Key(key) if i == 0 => write!(f, "{key}")?,
                PathElement::Key(key) => write!(f, ".{key}")?,
            }
        }
        Ok(())
    }
}

/// A client supplied value does not fit the type it is used as.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CoercionError {
    /// Variable "${name}" of required type "{ty}" was not provided.
    MissingVariable { name: String, ty: String },
    /// Variable "${0}" is not defined by the operation.
    UndefinedVariable(String),
    /// Argument "{argument}" of required type "{ty}" was not provided.
    MissingArgument { argument: String, ty: String },
    /// Unknown argument "{argument}" on field "{coordinate}".
    UnknownArgument {
        argument: String,
        coordinate: String,
    },
    /// Invalid value {value} for type "{ty}" at "{path}".
    InvalidValue {
        path: InputPath,
        ty: String,
        value: String,
    },
    /// Value "{value}" does not exist in "{ty}" enum at "{path}".
    UnknownEnumValue {
        path: InputPath,
        ty: String,
        value: String,
    },
    /// Field "{field}" of required type "{ty}" was not provided at "{path}".
    MissingInputField {
        path: InputPath,
        field: String,
        ty: String,
    },
    /// Expected non-null value of type "{ty}" at "{path}", found null.
    NullValue { path: InputPath, ty: String },
    /// Input value nested too deeply at "{0}".
    TooDeep(InputPath),
}

impl ErrorExtension for CoercionError {
    fn extension_code(&self) -> String {
        "BAD_USER_INPUT".to_string()
    }
}

/// Coerces inputs for one operation.
pub(crate) struct Coercer<'a> {
    schema: &'a Schema,
    variables: Option<&'a Object>,
    variable_definitions: &'a [VariableDefinition],
}

impl<'a> Coercer<'a> {
    /// A coercer for schema literals: no variable is in scope.
    pub(crate) fn for_schema(schema: &'a Schema) -> Self {
        Self {
            schema,
            variables: None,
            variable_definitions: &[],
        }
    }

    pub(crate) fn new(
        schema: &'a Schema,
        variables: &'a Object,
        variable_definitions: &'a [VariableDefinition],
    ) -> Self {
        Self {
            schema,
            variables: Some(variables),
            variable_definitions,
        }
    }

    /// Coerce the arguments supplied to a field against its declaration.
    ///
    /// The result only ever contains declared argument names. Optional arguments that were not
    /// supplied and have no default are left out.
    pub(crate) fn coerce_arguments(
        &self,
        parent_type: &str,
        field: &FieldDefinition,
        supplied: &[(String, InputValue)],
    ) -> Result<Object, CoercionError> {
        if let Some((argument, _)) = supplied
            .iter()
            .find(|(name, _)| !field.arguments.contains_key(name.as_str()))
        {
            return Err(CoercionError::UnknownArgument {
                argument: argument.clone(),
                coordinate: format!("{parent_type}.{}", field.name),
            });
        }

        let mut arguments = Object::new();
        for (name, definition) in &field.arguments {
            let path = InputPath::root(name);
            let literal = supplied
                .iter()
                .find_map(|(supplied_name, value)| (supplied_name == name).then_some(value));
            let value = match literal {
                Some(InputValue::Variable(variable)) => {
                    match self.variable_value(variable, &definition.ty, &path)? {
                        Some(value) => value,
                        None => match &definition.default_value {
                            Some(default) => {
                                self.coerce_literal(default, &definition.ty, &path, 0)?
                            }
                            None => Value::Null,
                        },
                    }
                }
                Some(literal) => self.coerce_literal(literal, &definition.ty, &path, 0)?,
                None => match &definition.default_value {
                    Some(default) => self.coerce_literal(default, &definition.ty, &path, 0)?,
                    None if definition.ty.is_non_null() => {
                        return Err(CoercionError::MissingArgument {
                            argument: name.clone(),
                            ty: definition.ty.to_string(),
                        });
                    }
                    None => continue,
                },
            };
            arguments.insert(name.as_str(), value);
        }
        Ok(arguments)
    }

    /// Check a default literal declared by the schema.
    pub(crate) fn coerce_default(
        &self,
        name: &str,
        ty: &FieldType,
        literal: &InputValue,
    ) -> Result<Value, CoercionError> {
        self.coerce_literal(literal, ty, &InputPath::root(name), 0)
    }

    /// Value of a variable used where `ty` is expected.
    ///
    /// Returns `Ok(None)` when the variable was not provided, has no default and may be null: the
    /// caller decides between a default of its own and an explicit null.
    fn variable_value(
        &self,
        name: &str,
        ty: &FieldType,
        path: &InputPath,
    ) -> Result<Option<Value>, CoercionError> {
        let definition = self
            .variable_definitions
            .iter()
            .find(|definition| definition.name == name)
            .ok_or_else(|| CoercionError::UndefinedVariable(name.to_string()))?;

        if let Some(value) = self.variables.and_then(|variables| variables.get(name)) {
            return self.coerce_json(value, ty, path, 0).map(Some);
        }
        if let Some(default) = &definition.default_value {
            return self.coerce_literal(default, ty, path, 0).map(Some);
        }
        if definition.ty.is_non_null() || ty.is_non_null() {
            tracing::debug!(variable = name, "required variable was not provided");
            return Err(CoercionError::MissingVariable {
                name: name.to_string(),
                ty: definition.ty.to_string(),
            });
        }
        Ok(None)
    }

    fn coerce_literal(
        &self,
        literal: &InputValue,
        ty: &FieldType,
        path: &InputPath,
        depth: usize,
    ) -> Result<Value, CoercionError> {
        if depth > MAX_INPUT_DEPTH {
            return Err(CoercionError::TooDeep(path.clone()));
        }
        let invalid = || CoercionError::InvalidValue {
            path: path.clone(),
            ty: ty.to_string(),
            value: literal.describe(),
        };

        match (ty, literal) {
            (_, InputValue::Variable(name)) => Ok(self
                .variable_value(name, ty, path)?
                .unwrap_or(Value::Null)),
            (FieldType::NonNull(_), InputValue::Null) => Err(CoercionError::NullValue {
                path: path.clone(),
                ty: ty.to_string(),
            }),
            (FieldType::NonNull(inner), literal) => {
                self.coerce_literal(literal, inner, path, depth)
            }
            (_, InputValue::Null) => Ok(Value::Null),
            (FieldType::List(inner), InputValue::List(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.coerce_literal(item, inner, &path.join(index), depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (FieldType::String, InputValue::String(s)) => Ok(Value::from(s.as_str())),
            (FieldType::Int, InputValue::Int(s)) => s
                .parse::<i32>()
                .map(|i| Value::from(i64::from(i)))
                .map_err(|_| invalid()),
            (FieldType::Float, InputValue::Int(s) | InputValue::Float(s)) => s
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from)
                .ok_or_else(invalid),
            (FieldType::Boolean, InputValue::Boolean(b)) => Ok(Value::Bool(*b)),
            (FieldType::Id, InputValue::String(s) | InputValue::Int(s)) => {
                Ok(Value::from(s.as_str()))
            }
            (FieldType::Named(name), literal) => match self.schema.get_type(name) {
                Some(TypeDefinition::Enum(enum_type)) => match literal {
                    InputValue::Enum(symbol) if enum_type.values.contains(symbol) => {
                        Ok(Value::from(symbol.as_str()))
                    }
                    InputValue::Enum(symbol) => Err(CoercionError::UnknownEnumValue {
                        path: path.clone(),
                        ty: name.clone(),
                        value: symbol.clone(),
                    }),
                    _ => Err(invalid()),
                },
                Some(TypeDefinition::InputObject(input)) => match literal {
                    InputValue::Object(fields) => {
                        self.coerce_input_object_literal(input, fields, path, depth + 1)
                    }
                    _ => Err(invalid()),
                },
                Some(TypeDefinition::Scalar(ScalarType::Custom(_))) => {
                    self.literal_to_json(literal, path)
                }
                Some(_) | None => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }

    fn coerce_input_object_literal(
        &self,
        input: &InputObjectType,
        fields: &[(String, InputValue)],
        path: &InputPath,
        depth: usize,
    ) -> Result<Value, CoercionError> {
        let mut object = Object::new();
        for (name, definition) in &input.fields {
            let field_path = path.join(name.as_str());
            let supplied = fields
                .iter()
                .find_map(|(field_name, value)| (field_name == name).then_some(value));
            let value = match supplied {
                Some(InputValue::Variable(variable)) => {
                    match self.variable_value(variable, &definition.ty, &field_path)? {
                        Some(value) => Some(value),
                        None if definition.has_default() => None,
                        None => Some(Value::Null),
                    }
                }
                Some(literal) => {
                    Some(self.coerce_literal(literal, &definition.ty, &field_path, depth)?)
                }
                None => None,
            };
            match value {
                Some(value) => {
                    object.insert(name.as_str(), value);
                }
                None => self.input_field_default(&mut object, name, definition, path, depth)?,
            }
        }
        Ok(Value::Object(object))
    }

    fn coerce_json(
        &self,
        value: &Value,
        ty: &FieldType,
        path: &InputPath,
        depth: usize,
    ) -> Result<Value, CoercionError> {
        if depth > MAX_INPUT_DEPTH {
            return Err(CoercionError::TooDeep(path.clone()));
        }
        let invalid = || CoercionError::InvalidValue {
            path: path.clone(),
            ty: ty.to_string(),
            value: value.to_compact_string(),
        };

        match (ty, value) {
            (FieldType::NonNull(_), Value::Null) => Err(CoercionError::NullValue {
                path: path.clone(),
                ty: ty.to_string(),
            }),
            (FieldType::NonNull(inner), value) => self.coerce_json(value, inner, path, depth),
            (_, Value::Null) => Ok(Value::Null),
            (FieldType::List(inner), Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.coerce_json(item, inner, &path.join(index), depth + 1))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (FieldType::String, Value::String(_)) => Ok(value.clone()),
            (FieldType::Int, value) => value
                .as_i32()
                .map(|i| Value::from(i64::from(i)))
                .ok_or_else(invalid),
            (FieldType::Float, value) if value.is_valid_float_input() => {
                value.as_f64().map(Value::from).ok_or_else(invalid)
            }
            (FieldType::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (FieldType::Id, Value::String(_)) => Ok(value.clone()),
            (FieldType::Id, Value::Number(number)) if value.is_integer() => {
                Ok(Value::from(number.to_string()))
            }
            (FieldType::Named(name), value) => match self.schema.get_type(name) {
                Some(TypeDefinition::Enum(enum_type)) => match value {
                    Value::String(symbol) if enum_type.values.contains(symbol.as_str()) => {
                        Ok(value.clone())
                    }
                    Value::String(symbol) => Err(CoercionError::UnknownEnumValue {
                        path: path.clone(),
                        ty: name.clone(),
                        value: symbol.as_str().to_string(),
                    }),
                    _ => Err(invalid()),
                },
                Some(TypeDefinition::InputObject(input)) => match value {
                    Value::Object(fields) => {
                        self.coerce_input_object_json(input, fields, path, depth + 1)
                    }
                    _ => Err(invalid()),
                },
                Some(TypeDefinition::Scalar(ScalarType::Custom(_))) => Ok(value.clone()),
                Some(_) | None => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }

    // Keys that are not declared fields are ignored.
    fn coerce_input_object_json(
        &self,
        input: &InputObjectType,
        fields: &Object,
        path: &InputPath,
        depth: usize,
    ) -> Result<Value, CoercionError> {
        let mut object = Object::new();
        for (name, definition) in &input.fields {
            match fields.get(name.as_str()) {
                Some(value) => {
                    let value =
                        self.coerce_json(value, &definition.ty, &path.join(name.as_str()), depth)?;
                    object.insert(name.as_str(), value);
                }
                None => self.input_field_default(&mut object, name, definition, path, depth)?,
            }
        }
        Ok(Value::Object(object))
    }

    fn input_field_default(
        &self,
        object: &mut Object,
        name: &str,
        definition: &crate::spec::InputValueDefinition,
        path: &InputPath,
        depth: usize,
    ) -> Result<(), CoercionError> {
        match &definition.default_value {
            Some(default) => {
                let value =
                    self.coerce_literal(default, &definition.ty, &path.join(name), depth)?;
                object.insert(name, value);
            }
            None if definition.ty.is_non_null() => {
                return Err(CoercionError::MissingInputField {
                    path: path.clone(),
                    field: name.to_string(),
                    ty: definition.ty.to_string(),
                });
            }
            None => {}
        }
        Ok(())
    }

    /// Custom scalars accept any literal; variables inside it are substituted verbatim.
    fn literal_to_json(
        &self,
        literal: &InputValue,
        path: &InputPath,
    ) -> Result<Value, CoercionError> {
        if let Some(value) = literal.to_json() {
            return Ok(value);
        }
        match literal {
            InputValue::Variable(name) => self.raw_variable(name, path),
            InputValue::List(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.literal_to_json(item, &path.join(index)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            InputValue::Object(fields) => fields
                .iter()
                .map(|(name, value)| {
                    Ok((
                        name.as_str().into(),
                        self.literal_to_json(value, &path.join(name.as_str()))?,
                    ))
                })
                .collect::<Result<Object, _>>()
                .map(Value::Object),
            // Only composite literals can hold a variable.
            _ => Ok(Value::Null),
        }
    }

    fn raw_variable(&self, name: &str, path: &InputPath) -> Result<Value, CoercionError> {
        let definition = self
            .variable_definitions
            .iter()
            .find(|definition| definition.name == name)
            .ok_or_else(|| CoercionError::UndefinedVariable(name.to_string()))?;
        match self.variables.and_then(|variables| variables.get(name)) {
            Some(value) => Ok(value.clone()),
            None => match &definition.default_value {
                Some(default) => Ok(default.to_json().unwrap_or_default()),
                None if definition.ty.is_non_null() => Err(CoercionError::MissingVariable {
                    name: name.to_string(),
                    ty: definition.ty.to_string(),
                }),
                None => {
                    tracing::trace!(variable = name, %path, "variable not provided");
                    Ok(Value::Null)
                }
            },
        }
    }
}
