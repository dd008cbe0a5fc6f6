use crate::ServiceInfo;
use derive_more::Display;
use std::{
    any::Any,
    borrow::Cow,
    fmt::{Debug, Display, Formatter},
};

/// An opaque, value-comparable identifier. Qualifiers and scope tags are both
/// tokens: either a name, or a marker type standing in for an annotation.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Display)]
pub enum Token {
    /// A token identified by a name.
    #[display(fmt = "{:?}", _0)]
    Named(Cow<'static, str>),

    /// A token identified by a marker type.
    #[display(fmt = "{}", "_0.name()")]
    Marker(ServiceInfo),
}

/// Distinguishes several bindings of the same type from each other.
///
/// ```
/// use hierarchical_injector::{Key, Qualifier};
///
/// struct Primary;
///
/// let named = Key::of::<String>().qualified(Qualifier::named("greeting"));
/// let marked = Key::of::<String>().qualified(Qualifier::marker::<Primary>());
/// assert_ne!(named, marked);
/// assert_ne!(named, Key::of::<String>());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Qualifier(Token);

impl Qualifier {
    /// Creates a qualifier identified by a name.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Qualifier(Token::Named(name.into()))
    }

    /// Creates a qualifier identified by a marker type.
    #[must_use]
    pub fn marker<T: ?Sized + Any>() -> Self {
        Qualifier(Token::Marker(ServiceInfo::of::<T>()))
    }

    /// Gets the token identifying this qualifier.
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.0
    }
}

impl Display for Qualifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Token::Named(name) => write!(f, "@Named({name:?})"),
            Token::Marker(marker) => write!(f, "@{}", marker.name()),
        }
    }
}

/// Identity of a requested dependency: a service type and an optional
/// qualifier. Keys are the only handle used to look up bindings.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
    service_info: ServiceInfo,
    qualifier: Option<Qualifier>,
}

impl Key {
    /// Creates an unqualified key for the given type.
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        Key {
            service_info: ServiceInfo::of::<T>(),
            qualifier: None,
        }
    }

    /// Creates a key for the given type qualified with a name.
    #[must_use]
    pub fn named<T: ?Sized + Any>(name: impl Into<Cow<'static, str>>) -> Self {
        Key::of::<T>().qualified(Qualifier::named(name))
    }

    /// Replaces the qualifier of this key.
    #[must_use]
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// Creates a key for another type with the same qualifier as this one.
    #[must_use]
    pub fn with_type<T: ?Sized + Any>(&self) -> Self {
        Key {
            service_info: ServiceInfo::of::<T>(),
            qualifier: self.qualifier.clone(),
        }
    }

    /// Gets the type information of the service this key identifies.
    #[must_use]
    pub fn service_info(&self) -> ServiceInfo {
        self.service_info
    }

    /// Gets the qualifier of this key, if any.
    #[must_use]
    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(
                f,
                "{} annotated with {}",
                self.service_info.name(),
                qualifier
            ),
            None => f.write_str(self.service_info.name()),
        }
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key[{self}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Marker;

    #[test]
    fn keys_compare_by_type_and_qualifier() {
        let keys: HashSet<Key> = [
            Key::of::<String>(),
            Key::of::<String>(),
            Key::named::<String>("a"),
            Key::named::<String>("a"),
            Key::named::<String>("b"),
            Key::of::<String>().qualified(Qualifier::marker::<Marker>()),
        ]
        .into_iter()
        .collect();

        assert_eq!(4, keys.len());
    }

    #[test]
    fn with_type_keeps_qualifier() {
        let key = Key::named::<Vec<u8>>("payload");
        let string_key = key.with_type::<String>();
        assert_eq!(Key::named::<String>("payload"), string_key);
    }

    #[test]
    fn display_includes_qualifier() {
        assert_eq!("i32", Key::of::<i32>().to_string());
        assert_eq!(
            "i32 annotated with @Named(\"port\")",
            Key::named::<i32>("port").to_string()
        );
    }
}
