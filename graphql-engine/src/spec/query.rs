//! Query string parsing.
//!
//! A [`Query`] holds every operation and fragment of a request document. Which operation runs is
//! decided per request, from the operation name.

use apollo_compiler::ast;
use indexmap::IndexMap;

use crate::error::SyntaxErrors;
use crate::spec::FieldType;
use crate::spec::InputValue;
use crate::spec::OperationKind;
use crate::spec::Selection;
use crate::spec::SpecError;

pub(crate) const TYPENAME: &str = "__typename";

/// A parsed request document.
#[derive(Debug, Default)]
pub(crate) struct Query {
    operations: Vec<Operation>,
    fragments: IndexMap<String, Fragment>,
}

/// A named fragment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fragment {
    pub(crate) type_condition: String,
    pub(crate) selection_set: Vec<Selection>,
}

#[derive(Debug)]
pub(crate) struct Operation {
    pub(crate) name: Option<String>,
    pub(crate) kind: OperationKind,
    pub(crate) variables: Vec<VariableDefinition>,
    pub(crate) selection_set: Vec<Selection>,
}

/// A variable declared by an operation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VariableDefinition {
    pub(crate) name: String,
    pub(crate) ty: FieldType,
    pub(crate) default_value: Option<InputValue>,
}

impl Query {
    #[tracing::instrument(skip_all, level = "trace")]
    pub(crate) fn parse(query: &str, recursion_limit: usize) -> Result<Self, SpecError> {
        let mut parser = apollo_compiler::parser::Parser::new().recursion_limit(recursion_limit);
        let document = parser
            .parse_ast(query, "query.graphql")
            .map_err(|invalid| {
                let errors = SyntaxErrors {
                    errors: invalid.errors,
                };
                tracing::debug!("parsing error(s): {}", errors);
                SpecError::ParsingError(errors.to_string())
            })?;

        // Trace log recursion limit data
        let recursion_limit = parser.recursion_reached();
        tracing::trace!(?recursion_limit, "recursion limit data");

        let mut parsed = Query::default();
        for definition in &document.definitions {
            match definition {
                ast::Definition::OperationDefinition(operation) => {
                    let operation = Operation::from_ast(operation)?;
                    if let Some(name) = &operation.name {
                        if parsed.operations.iter().any(|o| o.name.as_ref() == Some(name)) {
                            return Err(SpecError::DuplicateOperation(name.clone()));
                        }
                    }
                    parsed.operations.push(operation);
                }
                ast::Definition::FragmentDefinition(fragment) => {
                    let name = fragment.name.to_string();
                    if parsed.fragments.contains_key(&name) {
                        return Err(SpecError::DuplicateFragment(name));
                    }
                    parsed.fragments.insert(
                        name,
                        Fragment {
                            type_condition: fragment.type_condition.to_string(),
                            selection_set: Selection::from_ast_set(&fragment.selection_set),
                        },
                    );
                }
                _ => {
                    return Err(SpecError::ParsingError(
                        "the request document may only contain operations and fragments"
                            .to_string(),
                    ));
                }
            }
        }
        parsed.check_fragments()?;
        Ok(parsed)
    }

    /// Every spread names a defined fragment and no fragment spreads itself, directly or not.
    fn check_fragments(&self) -> Result<(), SpecError> {
        let selection_sets = self
            .operations
            .iter()
            .map(|operation| &operation.selection_set)
            .chain(self.fragments.values().map(|fragment| &fragment.selection_set));
        for selection_set in selection_sets {
            if let Some(name) = spreads(selection_set)
                .into_iter()
                .find(|name| !self.fragments.contains_key(*name))
            {
                return Err(SpecError::UnknownFragment(name.to_string()));
            }
        }
        for name in self.fragments.keys() {
            self.check_cycle(name, &mut Vec::new())?;
        }
        Ok(())
    }

    fn check_cycle<'a>(&'a self, name: &'a str, stack: &mut Vec<&'a str>) -> Result<(), SpecError> {
        if stack.contains(&name) {
            return Err(SpecError::FragmentCycle(name.to_string()));
        }
        stack.push(name);
        if let Some(fragment) = self.fragments.get(name) {
            for spread in spreads(&fragment.selection_set) {
                self.check_cycle(spread, stack)?;
            }
        }
        stack.pop();
        Ok(())
    }

    /// Select the operation to run.
    ///
    /// Without a name, the document must contain exactly one operation.
    pub(crate) fn operation(&self, name: Option<&str>) -> Result<&Operation, SpecError> {
        match name {
            Some(name) => self
                .operations
                .iter()
                .find(|operation| operation.name.as_deref() == Some(name))
                .ok_or_else(|| SpecError::UnknownOperation(name.to_string())),
            None => match self.operations.as_slice() {
                [operation] => Ok(operation),
                [] => Err(SpecError::NoOperation),
                _ => Err(SpecError::OperationNameRequired),
            },
        }
    }

    pub(crate) fn fragment(&self, name: &str) -> Option<&Fragment> {
        self.fragments.get(name)
    }
}

/// Names of the fragments spread anywhere in a selection set.
fn spreads(selection_set: &[Selection]) -> Vec<&str> {
    let mut names = Vec::new();
    for selection in selection_set {
        match selection {
            Selection::Field(field) => names.extend(spreads(&field.selection_set)),
            Selection::InlineFragment { selection_set, .. } => names.extend(spreads(selection_set)),
            Selection::FragmentSpread { name } => names.push(name.as_str()),
        }
    }
    names
}

impl Operation {
    // Spec: https://spec.graphql.org/draft/#sec-Language.Operations
    fn from_ast(operation: &ast::OperationDefinition) -> Result<Self, SpecError> {
        let mut variables: Vec<VariableDefinition> = Vec::new();
        for definition in &operation.variables {
            let name = definition.name.to_string();
            if variables.iter().any(|variable| variable.name == name) {
                return Err(SpecError::DuplicateVariable(name));
            }
            variables.push(VariableDefinition {
                name,
                ty: FieldType::from(&*definition.ty),
                default_value: definition
                    .default_value
                    .as_ref()
                    .map(|value| InputValue::from(&**value)),
            });
        }

        Ok(Operation {
            name: operation.name.as_ref().map(|name| name.to_string()),
            kind: operation.operation_type.into(),
            variables,
            selection_set: Selection::from_ast_set(&operation.selection_set),
        })
    }
}

impl From<ast::OperationType> for OperationKind {
    // Spec: https://spec.graphql.org/draft/#OperationType
    fn from(operation_type: ast::OperationType) -> Self {
        match operation_type {
            ast::OperationType::Query => Self::Query,
            ast::OperationType::Mutation => Self::Mutation,
            ast::OperationType::Subscription => Self::Subscription,
        }
    }
}
