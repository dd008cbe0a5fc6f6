use derive_more::Display;
use std::{any::Any, panic::Location};

/// Where a binding, scope or converter was declared. Sources are carried by
/// every binding and show up in error messages so a misconfiguration can be
/// traced back to the module that caused it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum Source {
    /// A location in code, usually captured with `#[track_caller]`.
    #[display(fmt = "{}:{}:{}", file, line, column)]
    Code {
        /// Path of the source file.
        file: &'static str,
        /// Line in the source file.
        line: u32,
        /// Column in the source file.
        column: u32,
    },

    /// The declaration belongs to a type, for example an implicit binding
    /// declared through [`Injectable`](crate::Injectable).
    #[display(fmt = "{}", _0)]
    Type(&'static str),

    /// The declaration was made by the injector itself.
    #[display(fmt = "[builtin]")]
    Builtin,
}

impl Source {
    /// Captures the location of the caller.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        Location::caller().into()
    }

    /// Creates a source naming the given type.
    #[must_use]
    pub fn of_type<T: ?Sized + Any>() -> Self {
        Source::Type(std::any::type_name::<T>())
    }
}

impl From<&'static Location<'static>> for Source {
    fn from(location: &'static Location<'static>) -> Self {
        Source::Code {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_is_captured() {
        let first = Source::caller();
        let second = Source::caller();
        assert_ne!(first, second);
        assert!(first.to_string().starts_with(file!()));
    }

    #[test]
    fn type_source_names_type() {
        assert_eq!("u8", Source::of_type::<u8>().to_string());
    }
}
