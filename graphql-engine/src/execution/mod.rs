//! Execution of operations against a schema and its resolvers.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

mod assembler;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::join_all;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use self::assembler::FieldResult;
use crate::configuration::Configuration;
use crate::error::BindingError;
use crate::error::ExecutionError;
use crate::error::LoadError;
use crate::graphql::Error;
use crate::graphql::ErrorExtension;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::registry::FieldError;
use crate::registry::ResolverRegistry;
use crate::registry::ResolverRequest;
use crate::spec::Field;
use crate::spec::FieldDefinition;
use crate::spec::FieldType;
use crate::spec::InvalidValue;
use crate::spec::ObjectType;
use crate::spec::OperationKind;
use crate::spec::Query;
use crate::spec::ScalarType;
use crate::spec::Schema;
use crate::spec::Selection;
use crate::spec::SpecError;
use crate::spec::TYPENAME;
use crate::spec::TypeDefinition;
use crate::spec::coercion::Coercer;
use crate::spec::query::Operation;

/// A schema bound to its resolvers, ready to execute requests.
///
/// Cloning is cheap and clones share the schema, registry and configuration.
#[derive(Debug, Clone)]
pub struct Engine {
    schema: Arc<Schema>,
    registry: Arc<ResolverRegistry>,
    configuration: Arc<Configuration>,
}

#[buildstructor::buildstructor]
impl Engine {
    /// Bind `registry` to `schema`.
    ///
    /// Fails if an object field has no resolver, if a resolver is bound to a field the schema
    /// does not declare, or if a resolver does not accept all the declared arguments of its field.
    #[builder(visibility = "pub")]
    fn new(
        schema: Schema,
        registry: ResolverRegistry,
        configuration: Option<Configuration>,
    ) -> Result<Self, BindingError> {
        registry.validate(&schema)?;
        tracing::debug!(bindings = registry.len(), "resolvers bound to schema");
        Ok(Self {
            schema: Arc::new(schema),
            registry: Arc::new(registry),
            configuration: Arc::new(configuration.unwrap_or_default()),
        })
    }

    /// Parse `schema` and bind `registry` to it, honoring the parser limits of `configuration`.
    pub fn load(
        schema: &str,
        registry: ResolverRegistry,
        configuration: Configuration,
    ) -> Result<Self, LoadError> {
        let schema =
            Schema::parse_with_recursion_limit(schema, configuration.execution.recursion_limit)?;
        Ok(Self::builder()
            .schema(schema)
            .registry(registry)
            .configuration(configuration)
            .build()?)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Execute a request.
    ///
    /// Never fails: every error ends up in the returned [`Response`].
    pub async fn execute(&self, request: Request) -> Response {
        self.execute_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Execute a request, aborting pending resolvers once `cancellation` is triggered.
    ///
    /// Fields whose resolver was aborted are null and the response gets a single
    /// "the operation was cancelled" error. Data of already resolved fields is kept.
    #[tracing::instrument(
        skip_all,
        level = "debug",
        name = "execute",
        fields(operation_name = request.requested_operation().unwrap_or_default())
    )]
    pub async fn execute_with_cancellation(
        &self,
        request: Request,
        cancellation: CancellationToken,
    ) -> Response {
        let query = match request.query.as_deref() {
            Some(query) => Query::parse(query, self.configuration.execution.recursion_limit),
            None => Err(SpecError::MissingQuery),
        };
        let query = match query {
            Ok(query) => query,
            Err(error) => return request_error(error),
        };
        let (operation, root_type) =
            match self.select_operation(&query, request.requested_operation()) {
                Ok(selected) => selected,
                Err(error) => return request_error(error),
            };

        let context = ExecutionContext {
            schema: &self.schema,
            registry: &self.registry,
            configuration: &self.configuration,
            query: &query,
            operation,
            variables: &request.variables,
            cancellation: &cancellation,
            cancelled: AtomicBool::new(false),
        };
        // Root fields of a mutation run one after the other, in selection order.
        let serial = operation.kind == OperationKind::Mutation
            || !self.configuration.execution.parallel_siblings;
        let (data, errors) = context
            .execute_selection_set(
                root_type,
                Value::Null,
                operation.selection_set.iter().collect(),
                Path::empty(),
                serial,
            )
            .await;
        let cancelled = context.cancelled.load(Ordering::SeqCst);
        tracing::debug!(
            errors = errors.len(),
            cancelled,
            data_is_null = data.is_err(),
            "operation executed"
        );
        assembler::assemble_response(data, errors, cancelled)
    }

    fn select_operation<'q>(
        &self,
        query: &'q Query,
        operation_name: Option<&str>,
    ) -> Result<(&'q Operation, &ObjectType), SpecError> {
        let operation = query.operation(operation_name)?;
        let root_type = match operation.kind {
            OperationKind::Subscription => return Err(SpecError::SubscriptionNotSupported),
            kind => self
                .schema
                .root_operation_name(kind)
                .and_then(|name| self.schema.get_object(name))
                .ok_or(SpecError::MutationNotSupported)?,
        };
        Ok((operation, root_type))
    }
}

fn request_error(error: SpecError) -> Response {
    tracing::debug!(%error, "request rejected before execution");
    Response::from_errors(vec![error.to_graphql_error(None)])
}

/// The null standing in for a field that could not be computed: local when the field is
/// nullable, propagated otherwise.
fn null_for(ty: &FieldType) -> Result<Value, InvalidValue> {
    if ty.is_non_null() {
        Err(InvalidValue)
    } else {
        Ok(Value::Null)
    }
}

/// The field a value is completed for, used in error messages.
#[derive(Clone, Copy)]
struct FieldCoordinate<'a> {
    type_name: &'a str,
    field_name: &'a str,
}

enum Resolved {
    Value(Value),
    Failed(Error),
    Cancelled,
}

struct ExecutionContext<'a> {
    schema: &'a Schema,
    registry: &'a ResolverRegistry,
    configuration: &'a Configuration,
    query: &'a Query,
    operation: &'a Operation,
    variables: &'a Object,
    cancellation: &'a CancellationToken,
    cancelled: AtomicBool,
}

impl<'a> ExecutionContext<'a> {
    fn parallel(&self) -> bool {
        self.configuration.execution.parallel_siblings
    }

    fn execute_selection_set(
        &'a self,
        object_type: &'a ObjectType,
        parent: Value,
        selection_set: Vec<&'a Selection>,
        path: Path,
        serial: bool,
    ) -> BoxFuture<'a, (Result<Object, InvalidValue>, Vec<Error>)> {
        async move {
            let mut fields = IndexMap::new();
            self.collect_fields(object_type, selection_set, &mut fields, &mut HashSet::new());

            let results = if serial {
                let mut results = Vec::with_capacity(fields.len());
                for (key, fields) in fields {
                    results.push(
                        self.execute_field(object_type, &parent, key, fields, &path)
                            .await,
                    );
                }
                results
            } else {
                join_all(fields.into_iter().map(|(key, fields)| {
                    self.execute_field(object_type, &parent, key, fields, &path)
                }))
                .await
            };
            assembler::assemble_object(results)
        }
        .boxed()
    }

    /// Group the fields of a selection set by response key, expanding the fragments that apply
    /// to `object_type`.
    fn collect_fields(
        &self,
        object_type: &ObjectType,
        selection_set: impl IntoIterator<Item = &'a Selection>,
        fields: &mut IndexMap<&'a str, Vec<&'a Field>>,
        visited_fragments: &mut HashSet<&'a str>,
    ) {
        for selection in selection_set {
            match selection {
                Selection::Field(field) => {
                    fields.entry(field.response_key()).or_default().push(field);
                }
                Selection::InlineFragment {
                    type_condition,
                    selection_set,
                } => {
                    if type_condition
                        .as_deref()
                        .is_none_or(|type_condition| type_condition == object_type.name)
                    {
                        self.collect_fields(object_type, selection_set, fields, visited_fragments);
                    }
                }
                Selection::FragmentSpread { name } => {
                    if !visited_fragments.insert(name.as_str()) {
                        continue;
                    }
                    if let Some(fragment) = self
                        .query
                        .fragment(name)
                        .filter(|fragment| fragment.type_condition == object_type.name)
                    {
                        self.collect_fields(
                            object_type,
                            &fragment.selection_set,
                            fields,
                            visited_fragments,
                        );
                    }
                }
            }
        }
    }

    /// Execute all the fields sharing one response key. The first one gives the name and
    /// arguments, their sub-selections are merged.
    async fn execute_field(
        &'a self,
        object_type: &'a ObjectType,
        parent: &Value,
        key: &'a str,
        fields: Vec<&'a Field>,
        parent_path: &Path,
    ) -> FieldResult {
        let path = parent_path.join(key);
        let Some(field) = fields.first().copied() else {
            return FieldResult::new(key, Ok(Value::Null));
        };
        if field.name == TYPENAME {
            return FieldResult::new(key, Ok(Value::from(object_type.name.as_str())));
        }
        let Some(definition) = object_type.fields.get(&field.name) else {
            let error = ExecutionError::UnknownField {
                type_name: object_type.name.clone(),
                field_name: field.name.clone(),
            };
            return FieldResult::new(key, Ok(Value::Null))
                .with_error(error.to_graphql_error(Some(path)));
        };
        let coordinate = FieldCoordinate {
            type_name: &object_type.name,
            field_name: &definition.name,
        };

        let selection_set: Vec<&'a Selection> = fields
            .iter()
            .copied()
            .flat_map(|field| field.selection_set.iter())
            .collect();
        if let Err(error) = self.check_selection(definition, &selection_set) {
            return FieldResult::new(key, null_for(&definition.ty))
                .with_error(error.to_graphql_error(Some(path)));
        }

        let coercer = Coercer::new(self.schema, self.variables, &self.operation.variables);
        let arguments =
            match coercer.coerce_arguments(&object_type.name, definition, &field.arguments) {
                Ok(arguments) => arguments,
                Err(error) => {
                    tracing::debug!(%path, %error, "argument coercion failed");
                    return FieldResult::new(key, null_for(&definition.ty))
                        .with_error(error.to_graphql_error(Some(path)));
                }
            };

        tracing::trace!(%path, field = %definition.name, "resolving field");
        let value = match self.resolve(coordinate, parent, arguments, &path).await {
            Resolved::Value(value) => value,
            Resolved::Failed(error) => {
                return FieldResult::new(key, null_for(&definition.ty)).with_error(error);
            }
            Resolved::Cancelled => return FieldResult::new(key, null_for(&definition.ty)),
        };

        let (value, errors) = self
            .complete_value(&definition.ty, value, selection_set, path, coordinate)
            .await;
        FieldResult {
            key: key.to_string(),
            value,
            errors,
        }
    }

    /// Object fields need a sub-selection, other fields must not have one.
    fn check_selection(
        &self,
        definition: &FieldDefinition,
        selection_set: &[&Selection],
    ) -> Result<(), ExecutionError> {
        let is_object = matches!(
            self.schema.get_type(definition.ty.named_type()),
            Some(TypeDefinition::Object(_))
        );
        match (is_object, selection_set.is_empty()) {
            (true, true) => Err(ExecutionError::MissingSelection {
                field_name: definition.name.clone(),
                ty: definition.ty.to_string(),
            }),
            (false, false) => Err(ExecutionError::UnexpectedSelection {
                field_name: definition.name.clone(),
                ty: definition.ty.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Call the bound resolver, racing it against cancellation and the configured timeout.
    async fn resolve(
        &self,
        coordinate: FieldCoordinate<'_>,
        parent: &Value,
        arguments: Object,
        path: &Path,
    ) -> Resolved {
        let binding = match self
            .registry
            .lookup(coordinate.type_name, coordinate.field_name)
        {
            Ok(binding) => binding,
            Err(error) => {
                return Resolved::Failed(
                    ExecutionError::from(error).to_graphql_error(Some(path.clone())),
                );
            }
        };
        let request = ResolverRequest {
            parent: parent.clone(),
            arguments,
            path: path.clone(),
            type_name: coordinate.type_name.to_string(),
            field_name: coordinate.field_name.to_string(),
            cancellation: self.cancellation.clone(),
        };
        let timeout = self.configuration.execution.resolver_timeout;
        let call = async {
            let resolution = binding.resolver().resolve(request);
            match timeout {
                Some(timeout) => tokio::time::timeout(timeout, resolution)
                    .await
                    .map_err(|_elapsed| timeout),
                None => Ok(resolution.await),
            }
        };

        let outcome: Result<Result<Value, FieldError>, Duration> = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                tracing::debug!(%path, "resolver aborted, the operation was cancelled");
                self.cancelled.store(true, Ordering::SeqCst);
                return Resolved::Cancelled;
            }
            outcome = call => outcome,
        };

        match outcome {
            Ok(Ok(value)) => {
                if value.is_null() && !binding.is_nullable() {
                    tracing::warn!(
                        %path,
                        "resolver for {}.{} is bound as non-nullable but returned null",
                        coordinate.type_name,
                        coordinate.field_name
                    );
                }
                Resolved::Value(value)
            }
            Ok(Err(error)) => {
                if binding.is_fallible() {
                    tracing::debug!(%path, %error, "resolver failed");
                } else {
                    tracing::warn!(
                        %path,
                        %error,
                        "resolver for {}.{} is bound as infallible but failed",
                        coordinate.type_name,
                        coordinate.field_name
                    );
                }
                Resolved::Failed(error.to_graphql_error(path.clone()))
            }
            Err(timeout) => {
                tracing::debug!(%path, ?timeout, "resolver timed out");
                let error = ExecutionError::Timeout {
                    type_name: coordinate.type_name.to_string(),
                    field_name: coordinate.field_name.to_string(),
                    timeout,
                };
                Resolved::Failed(error.to_graphql_error(Some(path.clone())))
            }
        }
    }

    /// Complete a resolved value against its declared type.
    ///
    /// A null in a non-null position is reported once, where it happens, then propagated with
    /// `Err(InvalidValue)` until the nearest nullable position turns it into a local null.
    fn complete_value(
        &'a self,
        ty: &'a FieldType,
        value: Value,
        selection_set: Vec<&'a Selection>,
        path: Path,
        coordinate: FieldCoordinate<'a>,
    ) -> BoxFuture<'a, (Result<Value, InvalidValue>, Vec<Error>)> {
        async move {
            match ty {
                FieldType::NonNull(inner) => {
                    let (result, mut errors) = self
                        .complete_nullable(inner, value, selection_set, path.clone(), coordinate)
                        .await;
                    match result {
                        Ok(Value::Null) => {
                            let error = ExecutionError::NonNullViolation {
                                type_name: coordinate.type_name.to_string(),
                                field_name: coordinate.field_name.to_string(),
                            };
                            errors.push(error.to_graphql_error(Some(path)));
                            (Err(InvalidValue), errors)
                        }
                        result => (result, errors),
                    }
                }
                ty => {
                    let (result, errors) = self
                        .complete_nullable(ty, value, selection_set, path, coordinate)
                        .await;
                    (result.or(Ok(Value::Null)), errors)
                }
            }
        }
        .boxed()
    }

    async fn complete_nullable(
        &'a self,
        ty: &'a FieldType,
        value: Value,
        selection_set: Vec<&'a Selection>,
        path: Path,
        coordinate: FieldCoordinate<'a>,
    ) -> (Result<Value, InvalidValue>, Vec<Error>) {
        if value.is_null() {
            return (Ok(Value::Null), Vec::new());
        }
        let invalid = |value: &Value, path: Path| {
            let error = ExecutionError::InvalidValue {
                type_name: coordinate.type_name.to_string(),
                field_name: coordinate.field_name.to_string(),
                ty: ty.to_string(),
                value: value.to_compact_string(),
            };
            (Err(InvalidValue), vec![error.to_graphql_error(Some(path))])
        };

        match ty {
            FieldType::NonNull(_) => {
                self.complete_value(ty, value, selection_set, path, coordinate)
                    .await
            }
            FieldType::List(item_type) => {
                let items = match value {
                    Value::Array(items) => items,
                    value => return invalid(&value, path),
                };
                let items = items.into_iter().enumerate().map(|(index, item)| {
                    self.complete_value(
                        item_type,
                        item,
                        selection_set.clone(),
                        path.join(index),
                        coordinate,
                    )
                });
                let completed = if self.parallel() {
                    join_all(items).await
                } else {
                    let mut completed = Vec::new();
                    for item in items {
                        completed.push(item.await);
                    }
                    completed
                };

                let mut values = Vec::with_capacity(completed.len());
                let mut errors = Vec::new();
                let mut propagated = false;
                for (result, item_errors) in completed {
                    errors.extend(item_errors);
                    match result {
                        Ok(value) => values.push(value),
                        Err(InvalidValue) => propagated = true,
                    }
                }
                if propagated {
                    (Err(InvalidValue), errors)
                } else {
                    (Ok(Value::Array(values)), errors)
                }
            }
            FieldType::String => match value {
                Value::String(_) => (Ok(value), Vec::new()),
                _ => invalid(&value, path),
            },
            FieldType::Int => match value.as_i32() {
                Some(i) => (Ok(Value::from(i64::from(i))), Vec::new()),
                None => invalid(&value, path),
            },
            FieldType::Float => match value {
                Value::Number(_) => (Ok(value), Vec::new()),
                _ => invalid(&value, path),
            },
            FieldType::Boolean => match value {
                Value::Bool(_) => (Ok(value), Vec::new()),
                _ => invalid(&value, path),
            },
            FieldType::Id => match &value {
                Value::String(_) => (Ok(value), Vec::new()),
                Value::Number(number) if value.is_integer() => {
                    (Ok(Value::from(number.to_string())), Vec::new())
                }
                _ => invalid(&value, path),
            },
            FieldType::Named(name) => match self.schema.get_type(name) {
                Some(TypeDefinition::Object(object_type)) => {
                    if !matches!(value, Value::Object(_)) {
                        return invalid(&value, path);
                    }
                    let (result, errors) = self
                        .execute_selection_set(
                            object_type,
                            value,
                            selection_set,
                            path,
                            !self.parallel(),
                        )
                        .await;
                    (result.map(Value::Object), errors)
                }
                Some(TypeDefinition::Enum(enum_type)) => match &value {
                    Value::String(symbol) if enum_type.values.contains(symbol.as_str()) => {
                        (Ok(value), Vec::new())
                    }
                    _ => invalid(&value, path),
                },
                Some(TypeDefinition::Scalar(ScalarType::Custom(_))) => (Ok(value), Vec::new()),
                Some(TypeDefinition::Scalar(_) | TypeDefinition::InputObject(_)) | None => {
                    invalid(&value, path)
                }
            },
        }
    }
}
