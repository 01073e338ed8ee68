//! Performance oriented JSON manipulation.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// Extension trait for [`serde_json_bytes::Value`].
pub(crate) trait ValueExt {
    /// Returns whether this value can be read as a GraphQL `Float`.
    fn is_valid_float_input(&self) -> bool;

    /// Returns the value as an `i32` if it is an integer in the GraphQL `Int` range (32 bits).
    ///
    /// Whole-number floats (`3.0`) are accepted as they come out of JSON decoders that do not
    /// distinguish the two.
    fn as_i32(&self) -> Option<i32>;

    /// Returns whether this value is an integer, of any width.
    fn is_integer(&self) -> bool;

    /// Compact, single line rendering used in error messages.
    fn to_compact_string(&self) -> String;
}

impl ValueExt for Value {
    fn is_valid_float_input(&self) -> bool {
        // All JSON numbers are valid floats; integers are coerced on read.
        self.as_f64().is_some()
    }

    fn as_i32(&self) -> Option<i32> {
        if let Some(i) = self.as_i64() {
            return i32::try_from(i).ok();
        }
        if self.is_u64() {
            return self.as_u64().and_then(|i| i32::try_from(i).ok());
        }
        match self.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX) => {
                Some(f as i32)
            }
            _ => None,
        }
    }

    fn is_integer(&self) -> bool {
        self.is_i64() || self.is_u64()
    }

    fn to_compact_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("<unprintable>"))
    }
}

/// A GraphQL path element that is composed of strings or numbers.
/// e.g `/book/3/name`
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => write!(f, "{key}"),
        }
    }
}

/// A path into the result document.
///
/// This can be composed of strings and numbers
#[derive(Clone, Debug, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn empty() -> Path {
        Path(Default::default())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    /// Returns a new path with `element` appended.
    pub fn join(&self, element: impl Into<PathElement>) -> Path {
        let mut elements = self.0.clone();
        elements.push(element.into());
        Path(elements)
    }
}

impl<T, U> From<T> for Path
where
    T: IntoIterator<Item = U>,
    U: Into<PathElement>,
{
    fn from(elements: T) -> Self {
        Path(elements.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.iter() {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn int_input() {
        assert_eq!(json!(12).as_i32(), Some(12));
        assert_eq!(json!(-12).as_i32(), Some(-12));
        assert_eq!(json!(12.0).as_i32(), Some(12));
        assert_eq!(json!(12.5).as_i32(), None);
        assert_eq!(json!(i64::from(i32::MAX) + 1).as_i32(), None);
        assert_eq!(json!("12").as_i32(), None);
    }

    #[test]
    fn float_input() {
        assert!(json!(12).is_valid_float_input());
        assert!(json!(1.5).is_valid_float_input());
        assert!(!json!(true).is_valid_float_input());
    }

    #[test]
    fn path_serializes_keys_and_indices() {
        let path = Path::from(vec![
            PathElement::from("users"),
            PathElement::from(2),
            PathElement::from("notes"),
        ]);
        assert_eq!(
            serde_json::to_string(&path).unwrap(),
            r#"["users",2,"notes"]"#
        );
        assert_eq!(path.to_string(), "/users/2/notes");
        let back: Path = serde_json::from_str(r#"["users",2,"notes"]"#).unwrap();
        assert_eq!(back, path);
    }
}
