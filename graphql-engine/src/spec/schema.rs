//! GraphQL schema.

use apollo_compiler::ast;
use indexmap::IndexMap;
use indexmap::IndexSet;
use indexmap::map::Entry;

use crate::error::ParseError;
use crate::error::SyntaxErrors;
use crate::spec::FieldType;
use crate::spec::InputValue;
use crate::spec::coercion::Coercer;
use crate::spec::field_type::BUILTIN_SCALARS;

/// Parser recursion limit used when no configuration is given.
pub(crate) const DEFAULT_RECURSION_LIMIT: usize = 500;

/// The kind of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        })
    }
}

/// A parsed and checked GraphQL schema.
///
/// Every type reference in the schema names a declared type; references are kept by name, so
/// object types may reference each other freely.
#[derive(Debug, Clone)]
pub struct Schema {
    query_type: String,
    mutation_type: Option<String>,
    types: IndexMap<String, TypeDefinition>,
}

/// A named type of the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Scalar(ScalarType),
    Object(ObjectType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

/// Scalar types. Built-in scalars have their own coercion rules, custom scalars are passed
/// through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Int,
    Float,
    Boolean,
    Id,
    Custom(String),
}

/// An object type and its fields, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub fields: IndexMap<String, FieldDefinition>,
}

/// A field of an object type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: FieldType,
    pub arguments: IndexMap<String, InputValueDefinition>,
}

/// An argument of a field or a field of an input object.
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDefinition {
    pub name: String,
    pub ty: FieldType,
    pub(crate) default_value: Option<InputValue>,
}

impl InputValueDefinition {
    pub fn has_default(&self) -> bool {
        self.default_value.is_some()
    }
}

/// An enum type: the exact, case-sensitive set of symbols it accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub values: IndexSet<String>,
}

/// An input object type.
#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectType {
    pub name: String,
    pub fields: IndexMap<String, InputValueDefinition>,
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar(scalar) => scalar.name(),
            TypeDefinition::Object(object) => &object.name,
            TypeDefinition::Enum(enum_type) => &enum_type.name,
            TypeDefinition::InputObject(input) => &input.name,
        }
    }

    fn is_input(&self) -> bool {
        !matches!(self, TypeDefinition::Object(_))
    }

    fn is_output(&self) -> bool {
        !matches!(self, TypeDefinition::InputObject(_))
    }
}

impl ScalarType {
    pub fn name(&self) -> &str {
        match self {
            ScalarType::String => "String",
            ScalarType::Int => "Int",
            ScalarType::Float => "Float",
            ScalarType::Boolean => "Boolean",
            ScalarType::Id => "ID",
            ScalarType::Custom(name) => name,
        }
    }
}

impl Schema {
    /// Parse and check a schema document.
    pub fn parse(raw_sdl: &str) -> Result<Self, ParseError> {
        Self::parse_with_recursion_limit(raw_sdl, DEFAULT_RECURSION_LIMIT)
    }

    #[tracing::instrument(skip_all, level = "debug")]
    pub(crate) fn parse_with_recursion_limit(
        raw_sdl: &str,
        recursion_limit: usize,
    ) -> Result<Self, ParseError> {
        let mut parser = apollo_compiler::parser::Parser::new().recursion_limit(recursion_limit);
        let document = parser
            .parse_ast(raw_sdl, "schema.graphql")
            .map_err(|invalid| {
                ParseError::Syntax(SyntaxErrors {
                    errors: invalid.errors,
                })
            })?;

        // Trace log recursion limit data
        let recursion_limit = parser.recursion_reached();
        tracing::trace!(?recursion_limit, "recursion limit data");

        let mut builder = SchemaBuilder::default();
        for definition in &document.definitions {
            builder.add_definition(definition)?;
        }
        let schema = builder.build()?;
        tracing::debug!(
            types = schema.types.len(),
            query = %schema.query_type,
            mutation = ?schema.mutation_type,
            "schema loaded"
        );
        Ok(schema)
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn get_object(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name) {
            Some(TypeDefinition::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumType> {
        match self.types.get(name) {
            Some(TypeDefinition::Enum(enum_type)) => Some(enum_type),
            _ => None,
        }
    }

    pub fn get_input_object(&self, name: &str) -> Option<&InputObjectType> {
        match self.types.get(name) {
            Some(TypeDefinition::InputObject(input)) => Some(input),
            _ => None,
        }
    }

    /// All object types of the schema.
    pub fn object_types(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.values().filter_map(|ty| match ty {
            TypeDefinition::Object(object) => Some(object),
            _ => None,
        })
    }

    /// Name of the root type for an operation kind, if the schema supports it.
    pub fn root_operation_name(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => Some(self.query_type.as_str()),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => None,
        }
    }
}

#[derive(Default)]
struct SchemaBuilder {
    types: IndexMap<String, TypeDefinition>,
    roots: Option<(Option<String>, Option<String>)>,
}

impl SchemaBuilder {
    fn add_definition(&mut self, definition: &ast::Definition) -> Result<(), ParseError> {
        match definition {
            ast::Definition::SchemaDefinition(schema) => {
                if self.roots.is_some() {
                    return Err(ParseError::Unsupported(
                        "more than one schema definition".to_string(),
                    ));
                }
                let mut query = None;
                let mut mutation = None;
                for root in &schema.root_operations {
                    let (kind, name) = &**root;
                    match kind {
                        ast::OperationType::Query => query = Some(name.to_string()),
                        ast::OperationType::Mutation => mutation = Some(name.to_string()),
                        ast::OperationType::Subscription => {
                            return Err(ParseError::Unsupported(
                                "subscription root operation".to_string(),
                            ));
                        }
                    }
                }
                self.roots = Some((query, mutation));
            }
            ast::Definition::ObjectTypeDefinition(object) => {
                let mut fields = IndexMap::new();
                for field in &object.fields {
                    let coordinate = format!("{}.{}", object.name, field.name);
                    let definition = FieldDefinition {
                        name: field.name.to_string(),
                        ty: FieldType::from(&field.ty),
                        arguments: input_values(&field.arguments, |argument| {
                            ParseError::DuplicateArgument {
                                coordinate: coordinate.clone(),
                                argument,
                            }
                        })?,
                    };
                    if fields.insert(field.name.to_string(), definition).is_some() {
                        return Err(ParseError::DuplicateField {
                            type_name: object.name.to_string(),
                            field: field.name.to_string(),
                        });
                    }
                }
                self.insert(TypeDefinition::Object(ObjectType {
                    name: object.name.to_string(),
                    fields,
                }))?;
            }
            ast::Definition::EnumTypeDefinition(enum_type) => {
                let mut values = IndexSet::new();
                for value in &enum_type.values {
                    if !values.insert(value.value.to_string()) {
                        return Err(ParseError::DuplicateEnumValue {
                            type_name: enum_type.name.to_string(),
                            value: value.value.to_string(),
                        });
                    }
                }
                self.insert(TypeDefinition::Enum(EnumType {
                    name: enum_type.name.to_string(),
                    values,
                }))?;
            }
            ast::Definition::InputObjectTypeDefinition(input) => {
                let name = input.name.to_string();
                let fields = input_values(&input.fields, |field| {
                    ParseError::DuplicateField {
                        type_name: name.clone(),
                        field,
                    }
                })?;
                self.insert(TypeDefinition::InputObject(InputObjectType {
                    name: name.clone(),
                    fields,
                }))?;
            }
            ast::Definition::ScalarTypeDefinition(scalar) => {
                self.insert(TypeDefinition::Scalar(ScalarType::Custom(
                    scalar.name.to_string(),
                )))?;
            }
            // Directives are not executed; their definitions are accepted and ignored.
            ast::Definition::DirectiveDefinition(_) => {}
            ast::Definition::InterfaceTypeDefinition(interface) => {
                return Err(ParseError::Unsupported(format!(
                    "interface type '{}'",
                    interface.name
                )));
            }
            ast::Definition::UnionTypeDefinition(union) => {
                return Err(ParseError::Unsupported(format!(
                    "union type '{}'",
                    union.name
                )));
            }
            ast::Definition::OperationDefinition(_) | ast::Definition::FragmentDefinition(_) => {
                return Err(ParseError::Unsupported(
                    "executable definition in a schema document".to_string(),
                ));
            }
            _ => {
                return Err(ParseError::Unsupported(
                    "type system extension".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn insert(&mut self, definition: TypeDefinition) -> Result<(), ParseError> {
        let name = definition.name().to_string();
        if BUILTIN_SCALARS.contains(&name.as_str()) {
            return Err(ParseError::DuplicateType(name));
        }
        match self.types.entry(name) {
            Entry::Occupied(entry) => Err(ParseError::DuplicateType(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(definition);
                Ok(())
            }
        }
    }

    fn build(self) -> Result<Schema, ParseError> {
        let mut types: IndexMap<String, TypeDefinition> = [
            ScalarType::String,
            ScalarType::Int,
            ScalarType::Float,
            ScalarType::Boolean,
            ScalarType::Id,
        ]
        .into_iter()
        .map(|scalar| (scalar.name().to_string(), TypeDefinition::Scalar(scalar)))
        .collect();
        types.extend(self.types);

        let (query_type, mutation_type) = match self.roots {
            Some((query, mutation)) => (query.ok_or(ParseError::MissingQueryRoot)?, mutation),
            None => (
                "Query".to_string(),
                types.contains_key("Mutation").then(|| "Mutation".to_string()),
            ),
        };

        let schema = Schema {
            query_type,
            mutation_type,
            types,
        };
        schema.check_roots()?;
        schema.check_references()?;
        schema.check_default_values()?;
        Ok(schema)
    }
}

fn input_values(
    definitions: &[apollo_compiler::Node<ast::InputValueDefinition>],
    duplicate: impl Fn(String) -> ParseError,
) -> Result<IndexMap<String, InputValueDefinition>, ParseError> {
    let mut values = IndexMap::new();
    for definition in definitions {
        let value = InputValueDefinition {
            name: definition.name.to_string(),
            ty: FieldType::from(&*definition.ty),
            default_value: definition
                .default_value
                .as_ref()
                .map(|value| InputValue::from(&**value)),
        };
        if values.insert(definition.name.to_string(), value).is_some() {
            return Err(duplicate(definition.name.to_string()));
        }
    }
    Ok(values)
}

impl Schema {
    fn check_roots(&self) -> Result<(), ParseError> {
        let roots = std::iter::once(Some(&self.query_type))
            .chain(std::iter::once(self.mutation_type.as_ref()))
            .flatten();
        for root in roots {
            match self.types.get(root) {
                Some(TypeDefinition::Object(_)) => {}
                Some(_) => {
                    return Err(ParseError::InvalidRootType {
                        type_name: root.clone(),
                    });
                }
                None if root == &self.query_type => return Err(ParseError::MissingQueryRoot),
                None => {
                    return Err(ParseError::UnknownType {
                        type_name: root.clone(),
                        referenced_by: "schema".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Every referenced type must exist, fields must reference output types and arguments input
    /// types.
    fn check_references(&self) -> Result<(), ParseError> {
        for definition in self.types.values() {
            match definition {
                TypeDefinition::Object(object) => {
                    if object.fields.is_empty() {
                        return Err(ParseError::EmptyType(object.name.clone()));
                    }
                    for field in object.fields.values() {
                        let coordinate = format!("{}.{}", object.name, field.name);
                        let target = self.resolve_reference(&field.ty, &coordinate)?;
                        if !target.is_output() {
                            return Err(ParseError::InvalidOutputType {
                                type_name: target.name().to_string(),
                                referenced_by: coordinate,
                            });
                        }
                        for argument in field.arguments.values() {
                            self.check_input_reference(
                                argument,
                                &format!("{coordinate}({}:)", argument.name),
                            )?;
                        }
                    }
                }
                TypeDefinition::InputObject(input) => {
                    if input.fields.is_empty() {
                        return Err(ParseError::EmptyType(input.name.clone()));
                    }
                    for field in input.fields.values() {
                        self.check_input_reference(
                            field,
                            &format!("{}.{}", input.name, field.name),
                        )?;
                    }
                }
                TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) => {}
            }
        }
        Ok(())
    }

    fn check_input_reference(
        &self,
        definition: &InputValueDefinition,
        coordinate: &str,
    ) -> Result<(), ParseError> {
        let target = self.resolve_reference(&definition.ty, coordinate)?;
        if target.is_input() {
            Ok(())
        } else {
            Err(ParseError::InvalidInputType {
                type_name: target.name().to_string(),
                referenced_by: coordinate.to_string(),
            })
        }
    }

    fn resolve_reference(
        &self,
        ty: &FieldType,
        referenced_by: &str,
    ) -> Result<&TypeDefinition, ParseError> {
        self.types
            .get(ty.named_type())
            .ok_or_else(|| ParseError::UnknownType {
                type_name: ty.named_type().to_string(),
                referenced_by: referenced_by.to_string(),
            })
    }

    /// Default values are literals: run them through the coercer once so that requests never
    /// see an invalid one.
    fn check_default_values(&self) -> Result<(), ParseError> {
        let coercer = Coercer::for_schema(self);
        let defaults = self.types.values().flat_map(|definition| {
            let values: Vec<(String, &InputValueDefinition)> = match definition {
                TypeDefinition::Object(object) => object
                    .fields
                    .values()
                    .flat_map(|field| {
                        field.arguments.values().map(move |argument| {
                            (
                                format!("{}.{}({}:)", object.name, field.name, argument.name),
                                argument,
                            )
                        })
                    })
                    .collect(),
                TypeDefinition::InputObject(input) => input
                    .fields
                    .values()
                    .map(|field| (format!("{}.{}", input.name, field.name), field))
                    .collect(),
                TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) => Vec::new(),
            };
            values
        });
        for (coordinate, definition) in defaults {
            if let Some(default_value) = &definition.default_value {
                coercer
                    .coerce_default(&definition.name, &definition.ty, default_value)
                    .map_err(|error| ParseError::InvalidDefaultValue {
                        coordinate,
                        reason: error.to_string(),
                    })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTES: &str = r#"
        schema {
            query: Query
            mutation: Mutation
        }

        type User {
            userID: ID!
            username: String!
            notes: [Note!]!
        }

        type Note {
            noteID: ID!
            data: String!
            author: User
        }

        input NoteInput {
            data: String!
            pinned: Boolean = false
        }

        type Query {
            users: [User!]!
            note(noteID: ID!): Note!
        }

        type Mutation {
            createNote(userID: ID!, note: NoteInput!): Note!
        }
    "#;

    #[test]
    fn parses_cyclic_types() {
        let schema = Schema::parse(NOTES).unwrap();
        assert_eq!(schema.root_operation_name(OperationKind::Query), Some("Query"));
        assert_eq!(
            schema.root_operation_name(OperationKind::Mutation),
            Some("Mutation")
        );
        let user = schema.get_object("User").unwrap();
        assert_eq!(
            user.fields.keys().collect::<Vec<_>>(),
            ["userID", "username", "notes"]
        );
        assert_eq!(user.fields["notes"].ty.to_string(), "[Note!]!");
        assert_eq!(
            schema.get_object("Note").unwrap().fields["author"].ty,
            FieldType::Named("User".to_string())
        );
        let create_note = &schema.get_object("Mutation").unwrap().fields["createNote"];
        assert_eq!(
            create_note.arguments.keys().collect::<Vec<_>>(),
            ["userID", "note"]
        );
        assert!(
            schema.get_input_object("NoteInput").unwrap().fields["pinned"].has_default()
        );
        assert!(schema.get_type("ID").is_some());
    }

    #[test]
    fn forward_references_are_allowed() {
        let schema = Schema::parse(
            "type Query { greet(timeOfDay: TimeOfDay = MORNING): String! }
             enum TimeOfDay { MORNING AFTERNOON EVENING }",
        )
        .unwrap();
        let time_of_day = schema.get_enum("TimeOfDay").unwrap();
        assert_eq!(time_of_day.values.len(), 3);
        assert!(time_of_day.values.contains("AFTERNOON"));
    }

    #[test]
    fn default_roots() {
        let schema = Schema::parse("type Query { a: Int } type Mutation { b: Int }").unwrap();
        assert_eq!(
            schema.root_operation_name(OperationKind::Mutation),
            Some("Mutation")
        );
        let schema = Schema::parse("type Query { a: Int }").unwrap();
        assert_eq!(schema.root_operation_name(OperationKind::Mutation), None);
        assert_eq!(schema.root_operation_name(OperationKind::Subscription), None);
    }

    #[test]
    fn syntax_error() {
        let error = Schema::parse("type Query { greet: String! ").unwrap_err();
        assert!(matches!(error, ParseError::Syntax(_)), "{error}");
    }

    #[test]
    fn unknown_type() {
        let error = Schema::parse("type Query { note: Note! }").unwrap_err();
        assert!(
            matches!(
                &error,
                ParseError::UnknownType { type_name, referenced_by }
                    if type_name == "Note" && referenced_by == "Query.note"
            ),
            "{error}"
        );

        let error = Schema::parse("type Query { note(id: Identifier): String }").unwrap_err();
        assert!(
            matches!(
                &error,
                ParseError::UnknownType { type_name, .. } if type_name == "Identifier"
            ),
            "{error}"
        );
    }

    #[test]
    fn duplicates() {
        let error = Schema::parse("type Query { a: Int } type Query { b: Int }").unwrap_err();
        assert!(matches!(error, ParseError::DuplicateType(name) if name == "Query"));

        let error = Schema::parse("type Query { a: Int a: String }").unwrap_err();
        assert!(matches!(error, ParseError::DuplicateField { field, .. } if field == "a"));

        let error = Schema::parse("type Query { a(x: Int, x: Int): Int }").unwrap_err();
        assert!(matches!(error, ParseError::DuplicateArgument { argument, .. } if argument == "x"));

        let error = Schema::parse("type Query { a: E } enum E { A B A }").unwrap_err();
        assert!(matches!(error, ParseError::DuplicateEnumValue { value, .. } if value == "A"));

        let error = Schema::parse("type Query { a: Int } scalar String").unwrap_err();
        assert!(matches!(error, ParseError::DuplicateType(name) if name == "String"));
    }

    #[test]
    fn input_and_output_positions() {
        let error =
            Schema::parse("type Query { a: NoteInput } input NoteInput { data: String }")
                .unwrap_err();
        assert!(matches!(error, ParseError::InvalidOutputType { .. }), "{error}");

        let error = Schema::parse("type Query { a(note: Note): Int } type Note { data: String }")
            .unwrap_err();
        assert!(
            matches!(&error, ParseError::InvalidInputType { referenced_by, .. } if referenced_by == "Query.a(note:)"),
            "{error}"
        );
    }

    #[test]
    fn missing_query_root() {
        let error = Schema::parse("type Note { data: String }").unwrap_err();
        assert!(matches!(error, ParseError::MissingQueryRoot));

        let error = Schema::parse("schema { mutation: Mutation } type Mutation { a: Int }")
            .unwrap_err();
        assert!(matches!(error, ParseError::MissingQueryRoot));
    }

    #[test]
    fn invalid_default_values() {
        let error = Schema::parse(
            "type Query { greet(timeOfDay: TimeOfDay = NOON): String }
             enum TimeOfDay { MORNING }",
        )
        .unwrap_err();
        assert!(
            matches!(&error, ParseError::InvalidDefaultValue { coordinate, .. } if coordinate == "Query.greet(timeOfDay:)"),
            "{error}"
        );

        let error = Schema::parse("type Query { a(x: Int = \"one\"): Int }").unwrap_err();
        assert!(matches!(error, ParseError::InvalidDefaultValue { .. }), "{error}");
    }

    #[test]
    fn unsupported_definitions() {
        let error =
            Schema::parse("type Query { a: Node } interface Node { id: ID! }").unwrap_err();
        assert!(matches!(error, ParseError::Unsupported(_)), "{error}");

        let error = Schema::parse("type Query { a: Int } query { a }").unwrap_err();
        assert!(matches!(error, ParseError::Unsupported(_)), "{error}");
    }
}
