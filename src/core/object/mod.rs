use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// An untyped (JSON) object from which [TypedParameters](TypedParameter) can be parsed.
///
/// Represents the parameters of an Authorization Response, regardless of
/// whether they arrived as a JSON body or as `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UntypedObject(pub(crate) Map<String, Json>);

/// A strongly typed parameter of an Authorization Response.
pub trait TypedParameter:
    TryFrom<Json, Error = anyhow::Error> + Into<Json> + Clone + std::fmt::Debug
{
    const KEY: &'static str;
}

impl UntypedObject {
    /// Get a [TypedParameter] from the object.
    ///
    /// Returns `None` when the parameter is absent or JSON `null`.
    pub fn get<T: TypedParameter>(&self) -> Option<Result<T>> {
        match self.0.get(T::KEY)? {
            Json::Null => None,
            value => Some(value.clone().try_into()),
        }
    }

    /// Insert a [TypedParameter], replacing any previous value.
    pub fn insert<T: TypedParameter>(&mut self, t: T) {
        self.0.insert(T::KEY.to_owned(), t.into());
    }

    /// Returns `true` if the parameter is present.
    pub fn contains<T: TypedParameter>(&self) -> bool {
        self.0.contains_key(T::KEY)
    }
}

impl From<Map<String, Json>> for UntypedObject {
    fn from(value: Map<String, Json>) -> Self {
        Self(value)
    }
}

impl From<UntypedObject> for Json {
    fn from(value: UntypedObject) -> Self {
        value.0.into()
    }
}

/// Parse an optional parameter, failing only when it is present but malformed.
pub trait OptionalParameter {
    type T: TypedParameter;

    fn optional(self) -> Result<Option<Self::T>>;
}

impl<T: TypedParameter> OptionalParameter for Option<Result<T>> {
    type T = T;

    fn optional(self) -> Result<Option<T>> {
        self.transpose()
            .context(format!("'{}' could not be parsed", T::KEY))
    }
}
