//! Resolver registry: the table binding `(type, field)` pairs of a schema to the code producing
//! their values.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::error::BindingError;
use crate::graphql;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;
use crate::spec::Schema;

/// Produces the value of one field.
#[async_trait]
pub trait Resolver: Send + Sync + 'static {
    async fn resolve(&self, request: ResolverRequest) -> Result<Value, FieldError>;
}

/// Everything a resolver gets to compute a field.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ResolverRequest {
    /// Value of the parent object, `null` for root fields.
    pub parent: Value,
    /// Coerced arguments. Only declared argument names are present.
    pub arguments: Object,
    /// Path of the field in the response.
    pub path: Path,
    pub type_name: String,
    pub field_name: String,
    /// Triggered when the operation is cancelled.
    pub cancellation: CancellationToken,
}

impl ResolverRequest {
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name).filter(|value| !value.is_null())
    }

    /// A string argument. Declared non-null string arguments are always present once coerced.
    pub fn str_argument(&self, name: &str) -> Result<&str, FieldError> {
        self.argument(name)
            .and_then(Value::as_str)
            .ok_or_else(|| FieldError::new(format!("missing argument '{name}'")))
    }

    /// A property of the parent object.
    pub fn parent_property(&self, name: &str) -> Option<&Value> {
        self.parent.as_object().and_then(|parent| parent.get(name))
    }
}

/// Failure reported by a resolver.
///
/// Only the message and the extensions set here reach the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub message: String,
    pub extensions: Object,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: Object::new(),
        }
    }

    pub fn with_extension(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extensions.insert(key, value.into());
        self
    }

    pub(crate) fn to_graphql_error(&self, path: Path) -> graphql::Error {
        graphql::Error::builder()
            .message(self.message.clone())
            .path(path)
            .extensions(self.extensions.clone())
            .build()
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FieldError {}

struct FnResolver<F>(F);

#[async_trait]
impl<F, Fut> Resolver for FnResolver<F>
where
    F: Fn(ResolverRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, FieldError>> + Send + 'static,
{
    async fn resolve(&self, request: ResolverRequest) -> Result<Value, FieldError> {
        (self.0)(request).await
    }
}

/// Wrap an async function as a [`Resolver`].
pub fn resolver_fn<F, Fut>(f: F) -> Arc<dyn Resolver>
where
    F: Fn(ResolverRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, FieldError>> + Send + 'static,
{
    Arc::new(FnResolver(f))
}

/// Reads a key of the parent object. Missing keys and non-object parents give `null`.
#[derive(Debug, Clone)]
pub struct PropertyResolver {
    key: String,
}

impl PropertyResolver {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl Resolver for PropertyResolver {
    async fn resolve(&self, request: ResolverRequest) -> Result<Value, FieldError> {
        Ok(request
            .parent_property(&self.key)
            .cloned()
            .unwrap_or_default())
    }
}

/// A resolver and the shape it is bound with.
#[derive(Clone)]
pub struct ResolverBinding {
    type_name: String,
    field_name: String,
    arguments: Vec<String>,
    fallible: bool,
    nullable: bool,
    resolver: Arc<dyn Resolver>,
}

impl ResolverBinding {
    /// Binding for a resolver that takes no argument, never fails and never returns null.
    pub fn new(
        type_name: impl Into<String>,
        field_name: impl Into<String>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
            arguments: Vec::new(),
            fallible: false,
            nullable: false,
            resolver,
        }
    }

    /// Binding reading the property of the parent with the same name as the field.
    pub fn property(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        let resolver = Arc::new(PropertyResolver::new(field_name.clone()));
        Self::new(type_name, field_name, resolver).nullable()
    }

    /// Names of the arguments the resolver accepts.
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    /// The resolver may report errors.
    pub fn fallible(mut self) -> Self {
        self.fallible = true;
        self
    }

    /// The resolver may return null.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn is_fallible(&self) -> bool {
        self.fallible
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub(crate) fn resolver(&self) -> &Arc<dyn Resolver> {
        &self.resolver
    }
}

impl fmt::Debug for ResolverBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverBinding")
            .field("type_name", &self.type_name)
            .field("field_name", &self.field_name)
            .field("arguments", &self.arguments)
            .field("fallible", &self.fallible)
            .field("nullable", &self.nullable)
            .finish_non_exhaustive()
    }
}

/// Bindings by type name, then field name.
#[derive(Debug, Clone, Default)]
pub struct ResolverRegistry {
    bindings: IndexMap<String, IndexMap<String, ResolverBinding>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding. A `(type, field)` pair can be bound only once.
    pub fn bind(&mut self, binding: ResolverBinding) -> Result<(), BindingError> {
        let fields = self.bindings.entry(binding.type_name.clone()).or_default();
        if fields.contains_key(&binding.field_name) {
            return Err(BindingError::Duplicate {
                type_name: binding.type_name,
                field_name: binding.field_name,
            });
        }
        fields.insert(binding.field_name.clone(), binding);
        Ok(())
    }

    /// Bind [`PropertyResolver`]s for plain data fields of `type_name`.
    pub fn bind_properties<'a>(
        &mut self,
        type_name: &str,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), BindingError> {
        fields
            .into_iter()
            .try_for_each(|field| self.bind(ResolverBinding::property(type_name, field)))
    }

    pub fn lookup(
        &self,
        type_name: &str,
        field_name: &str,
    ) -> Result<&ResolverBinding, BindingError> {
        self.bindings
            .get(type_name)
            .and_then(|fields| fields.get(field_name))
            .ok_or_else(|| BindingError::NotFound {
                type_name: type_name.to_string(),
                field_name: field_name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.bindings.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bindings(&self) -> impl Iterator<Item = &ResolverBinding> {
        self.bindings.values().flat_map(IndexMap::values)
    }

    /// Check the registry against a schema: every object field is bound, every binding targets a
    /// declared field and accepts all of its declared arguments.
    pub(crate) fn validate(&self, schema: &Schema) -> Result<(), BindingError> {
        for binding in self.bindings() {
            let field = schema
                .get_object(&binding.type_name)
                .and_then(|object| object.fields.get(&binding.field_name))
                .ok_or_else(|| BindingError::UnknownField {
                    type_name: binding.type_name.clone(),
                    field_name: binding.field_name.clone(),
                })?;
            if let Some(argument) = field
                .arguments
                .keys()
                .find(|argument| !binding.arguments.contains(argument))
            {
                return Err(BindingError::MissingArgument {
                    type_name: binding.type_name.clone(),
                    field_name: binding.field_name.clone(),
                    argument: argument.clone(),
                });
            }
        }
        for object in schema.object_types() {
            for field in object.fields.keys() {
                self.lookup(&object.name, field)?;
            }
        }
        Ok(())
    }
}
