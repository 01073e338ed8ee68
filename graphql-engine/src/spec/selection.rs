use apollo_compiler::ast;

use crate::json_ext::Value;

/// A literal as written in a GraphQL document, before coercion.
///
/// Numbers keep their source text: whether `12` is an `Int`, a `Float` or an `ID` depends on the
/// type it is coerced against.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InputValue {
    Null,
    Variable(String),
    Boolean(bool),
    Int(String),
    Float(String),
    String(String),
    Enum(String),
    List(Vec<InputValue>),
    Object(Vec<(String, InputValue)>),
}

impl From<&'_ ast::Value> for InputValue {
    fn from(value: &'_ ast::Value) -> Self {
        match value {
            ast::Value::Null => InputValue::Null,
            ast::Value::Variable(name) => InputValue::Variable(name.to_string()),
            ast::Value::Boolean(b) => InputValue::Boolean(*b),
            ast::Value::Int(i) => InputValue::Int(i.as_str().to_string()),
            ast::Value::Float(f) => InputValue::Float(f.as_str().to_string()),
            ast::Value::String(s) => InputValue::String(s.to_string()),
            ast::Value::Enum(name) => InputValue::Enum(name.to_string()),
            ast::Value::List(items) => {
                InputValue::List(items.iter().map(|item| (&**item).into()).collect())
            }
            ast::Value::Object(fields) => InputValue::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.to_string(), (&**value).into()))
                    .collect(),
            ),
        }
    }
}

impl InputValue {
    /// Best effort conversion to JSON, for scalars whose format the engine does not know.
    ///
    /// Returns `None` if the literal references a variable.
    pub(crate) fn to_json(&self) -> Option<Value> {
        Some(match self {
            InputValue::Null => Value::Null,
            InputValue::Variable(_) => return None,
            InputValue::Boolean(b) => Value::Bool(*b),
            InputValue::Int(i) => i
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| i.parse::<f64>().map(Value::from))
                .ok()?,
            InputValue::Float(f) => f.parse::<f64>().map(Value::from).ok()?,
            InputValue::String(s) | InputValue::Enum(s) => Value::from(s.as_str()),
            InputValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(InputValue::to_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            InputValue::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(name, value)| Some((name.as_str().into(), value.to_json()?)))
                    .collect::<Option<_>>()?,
            ),
        })
    }

    /// Short rendering used in error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            InputValue::Null => "null".to_string(),
            InputValue::Variable(name) => format!("${name}"),
            InputValue::Boolean(b) => b.to_string(),
            InputValue::Int(s) | InputValue::Float(s) | InputValue::Enum(s) => s.clone(),
            InputValue::String(s) => format!("{s:?}"),
            InputValue::List(_) => "a list".to_string(),
            InputValue::Object(_) => "an object".to_string(),
        }
    }
}

/// A field requested by an operation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Field {
    pub(crate) name: String,
    pub(crate) alias: Option<String>,
    pub(crate) arguments: Vec<(String, InputValue)>,
    pub(crate) selection_set: Vec<Selection>,
}

impl Field {
    /// The key under which this field is written in the response.
    pub(crate) fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// One entry of a selection set.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Selection {
    Field(Field),
    InlineFragment {
        type_condition: Option<String>,
        selection_set: Vec<Selection>,
    },
    FragmentSpread {
        name: String,
    },
}

impl Selection {
    // Directives are not part of the executed language, they are dropped here.
    pub(crate) fn from_ast(selection: &ast::Selection) -> Self {
        match selection {
            // Spec: https://spec.graphql.org/draft/#Field
            ast::Selection::Field(field) => Selection::Field(Field {
                name: field.name.to_string(),
                alias: field.alias.as_ref().map(|alias| alias.to_string()),
                arguments: field
                    .arguments
                    .iter()
                    .map(|argument| (argument.name.to_string(), (&*argument.value).into()))
                    .collect(),
                selection_set: Self::from_ast_set(&field.selection_set),
            }),
            // Spec: https://spec.graphql.org/draft/#InlineFragment
            ast::Selection::InlineFragment(inline_fragment) => Selection::InlineFragment {
                type_condition: inline_fragment
                    .type_condition
                    .as_ref()
                    .map(|ty| ty.to_string()),
                selection_set: Self::from_ast_set(&inline_fragment.selection_set),
            },
            // Spec: https://spec.graphql.org/draft/#FragmentSpread
            ast::Selection::FragmentSpread(fragment_spread) => Selection::FragmentSpread {
                name: fragment_spread.fragment_name.to_string(),
            },
        }
    }

    pub(crate) fn from_ast_set(selections: &[ast::Selection]) -> Vec<Self> {
        selections.iter().map(Self::from_ast).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn literal_to_json() {
        let literal = InputValue::Object(vec![
            ("data".to_string(), InputValue::String("hi".to_string())),
            (
                "tags".to_string(),
                InputValue::List(vec![
                    InputValue::Int("1".to_string()),
                    InputValue::Float("1.5".to_string()),
                    InputValue::Enum("MORNING".to_string()),
                ]),
            ),
        ]);
        assert_eq!(
            literal.to_json(),
            Some(json!({ "data": "hi", "tags": [1, 1.5, "MORNING"] }))
        );
        assert_eq!(
            InputValue::List(vec![InputValue::Variable("v".to_string())]).to_json(),
            None
        );
    }

    #[test]
    fn response_key_prefers_alias() {
        let field = Field {
            name: "greet".to_string(),
            alias: Some("hello".to_string()),
            arguments: Vec::new(),
            selection_set: Vec::new(),
        };
        assert_eq!(field.response_key(), "hello");
    }
}
