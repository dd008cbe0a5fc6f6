#![allow(clippy::used_underscore_binding)]

use crate::{Key, ScopeTag, ServiceInfo, Source};
use derive_more::Display;
use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// A result from attempting to resolve a binding or provide an instance of a
/// service.
pub type InjectResult<T> = Result<T, InjectError>;

/// A boxed error raised by user code during construction of a service.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// One step of the dependency path attached to an error message.
#[derive(Clone, PartialEq, Eq, Debug, Display)]
pub enum Frame {
    /// The key that was being resolved when the error occurred.
    #[display(fmt = "while locating {}", _0)]
    Locating(Key),

    /// The declaration that was being processed when the error occurred.
    #[display(fmt = "at {}", _0)]
    At(Source),
}

/// The kind of problem an [`ErrorMessage`] describes.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A key was explicitly bound more than once on a single ancestor path.
    #[display(fmt = "{} was bound multiple times.", key)]
    DuplicateBinding {
        /// The key that was bound.
        key: Key,
        /// Every declaration of the key, outermost first.
        sources: Vec<Source>,
    },

    /// A child tried to bind a key that an ancestor already created a
    /// just-in-time binding for.
    #[display(
        fmt = "A just-in-time binding to {} was already configured on a parent injector.",
        key
    )]
    ParentBlocksChild {
        /// The key that was bound.
        key: Key,
        /// Where the ancestor's just-in-time binding was declared.
        jit_source: Source,
        /// Where the child's explicit binding was declared.
        source: Source,
    },

    /// A just-in-time binding could not be created because a live descendant
    /// already binds the key.
    #[display(
        fmt = "Unable to create binding for {} because it was already configured on one or more child injectors.",
        key
    )]
    ChildBlocksParent {
        /// The key that was requested.
        key: Key,
        /// Where the descendants' bindings were declared.
        sources: Vec<Source>,
    },

    /// A scope tag was used but no scope is registered for it.
    #[display(fmt = "No scope is bound to {}.", tag)]
    UnresolvedScope {
        /// The tag that could not be resolved.
        tag: ScopeTag,
    },

    /// A scope tag was registered more than once on a single injector.
    #[display(fmt = "Scope {} was bound multiple times.", tag)]
    DuplicateScope {
        /// The tag that was registered.
        tag: ScopeTag,
        /// Every registration of the tag.
        sources: Vec<Source>,
    },

    /// An instance binding was given a scope.
    #[display(
        fmt = "Setting the scope is not permitted when binding {} to a single instance.",
        key
    )]
    ScopedInstance {
        /// The key that was bound.
        key: Key,
    },

    /// An implementation binding points at its own key.
    #[display(fmt = "Binding of {} points to itself.", key)]
    SelfBinding {
        /// The key that was bound.
        key: Key,
    },

    /// A key that the injector binds itself was bound by a module.
    #[display(fmt = "Binding to the built-in key {} is not allowed.", key)]
    BuiltinKey {
        /// The key that was bound.
        key: Key,
    },

    /// No binding exists for a key and none can be created.
    #[display(fmt = "No implementation for {} was bound.", key)]
    UnresolvableDependency {
        /// The key that was requested.
        key: Key,
    },

    /// Just-in-time bindings are disabled for the injector.
    #[display(
        fmt = "Explicit bindings are required and {} is not explicitly bound.",
        key
    )]
    JitDisabled {
        /// The key that was requested.
        key: Key,
    },

    /// More than one converter accepts the requested key.
    #[display(fmt = "Multiple converters can convert {}.", key)]
    ConverterConflict {
        /// The key that was requested.
        key: Key,
        /// Where each matching converter was registered.
        sources: Vec<Source>,
    },

    /// A converter rejected the value it was given.
    #[display(fmt = "Error converting {:?} to {}: {}", value, key, reason)]
    ConversionFailed {
        /// The key that was requested.
        key: Key,
        /// The value that was converted.
        value: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// A service depends on itself while it is being provided.
    #[display(
        fmt = "A cycle was detected while providing {} [{}]",
        key,
        "fmt_cycle(path)"
    )]
    CycleDetected {
        /// The key that was requested.
        key: Key,
        /// The request path, ending with the repeated key.
        path: Vec<Key>,
    },

    /// A binding produced an instance of the wrong type.
    #[display(
        fmt = "The instance provided for {} is not a {}.",
        key,
        "expected.name()"
    )]
    InvalidInstance {
        /// The key that was requested.
        key: Key,
        /// The type that was expected.
        expected: ServiceInfo,
    },

    /// A constructor, provider or hook failed.
    #[display(fmt = "An error occurred while constructing {}: {}", key, inner)]
    ConstructionFailed {
        /// The key that was being constructed.
        key: Key,
        /// The error raised by user code.
        inner: BoxError,
    },
}

impl ErrorKind {
    /// The declarations this kind of error enumerates.
    #[must_use]
    pub fn sources(&self) -> Vec<Source> {
        match self {
            ErrorKind::DuplicateBinding { sources, .. }
            | ErrorKind::ChildBlocksParent { sources, .. }
            | ErrorKind::DuplicateScope { sources, .. }
            | ErrorKind::ConverterConflict { sources, .. } => sources.clone(),
            ErrorKind::ParentBlocksChild {
                jit_source, source, ..
            } => vec![*jit_source, *source],
            _ => Vec::new(),
        }
    }
}

fn fmt_cycle(path: &[Key]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// A single problem, along with the dependency path that led to it. The
/// path is ordered from the point of failure outward to the original request.
#[derive(Debug)]
pub struct ErrorMessage {
    kind: ErrorKind,
    trail: Vec<Frame>,
}

impl ErrorMessage {
    /// Creates a message without any dependency path.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        ErrorMessage {
            kind,
            trail: Vec::new(),
        }
    }

    /// Appends a step to the dependency path.
    #[must_use]
    pub fn within(mut self, frame: Frame) -> Self {
        self.trail.push(frame);
        self
    }

    /// Gets the kind of problem this message describes.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Gets the dependency path, innermost step first.
    #[must_use]
    pub fn trail(&self) -> &[Frame] {
        &self.trail
    }
}

impl Display for ErrorMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;

        let sources = self.kind.sources();
        if !sources.is_empty() {
            write!(f, "\n\n  Declared at:")?;
            for (index, source) in sources.iter().enumerate() {
                write!(f, "\n  {}  : {}", index + 1, source)?;
            }
        }

        if !self.trail.is_empty() {
            writeln!(f)?;
            for frame in &self.trail {
                write!(f, "\n  {frame}")?;
            }
        }

        Ok(())
    }
}

fn fmt_messages(
    f: &mut Formatter<'_>,
    heading: &str,
    messages: &[ErrorMessage],
) -> std::fmt::Result {
    write!(f, "{heading}, see the following errors:")?;
    for (index, message) in messages.iter().enumerate() {
        write!(f, "\n\n{}) {}", index + 1, message)?;
    }

    match messages.len() {
        1 => write!(f, "\n\n1 error"),
        count => write!(f, "\n\n{count} errors"),
    }
}

/// An error raised while resolving a binding or providing a service. These
/// errors surface lazily: only a request that reaches a misconfiguration
/// reports it.
#[derive(Debug)]
pub struct InjectError {
    messages: Vec<ErrorMessage>,
}

impl InjectError {
    /// Creates an error from a single problem.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        InjectError {
            messages: vec![ErrorMessage::new(kind)],
        }
    }

    /// Wraps an error raised by a constructor, provider or hook.
    #[must_use]
    pub fn construction_failed(key: Key, inner: impl Into<BoxError>) -> Self {
        InjectError::new(ErrorKind::ConstructionFailed {
            key,
            inner: inner.into(),
        })
    }

    /// Appends a step to the dependency path of every message.
    #[must_use]
    pub fn within(self, frame: Frame) -> Self {
        InjectError {
            messages: self
                .messages
                .into_iter()
                .map(|message| message.within(frame.clone()))
                .collect(),
        }
    }

    /// Gets the kind of the first problem.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        // Never empty: every constructor adds at least one message.
        &self.messages[0].kind
    }

    /// Gets every problem, in the order they were discovered.
    #[must_use]
    pub fn messages(&self) -> &[ErrorMessage] {
        &self.messages
    }
}

impl From<ErrorKind> for InjectError {
    fn from(kind: ErrorKind) -> Self {
        InjectError::new(kind)
    }
}

impl From<ErrorMessage> for InjectError {
    fn from(message: ErrorMessage) -> Self {
        InjectError {
            messages: vec![message],
        }
    }
}

impl Display for InjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_messages(f, "Unable to resolve the request", &self.messages)
    }
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.messages.iter().find_map(|message| match &message.kind {
            ErrorKind::ConstructionFailed { inner, .. } => {
                Some(inner.as_ref() as &(dyn Error + 'static))
            }
            _ => None,
        })
    }
}

/// Every problem found while creating an injector. Creation keeps validating
/// after the first failure so that all of an injector's configuration errors
/// are reported together.
#[derive(Debug)]
pub struct CreationError {
    messages: Vec<ErrorMessage>,
}

impl CreationError {
    /// Gets every problem, in the order they were discovered.
    #[must_use]
    pub fn messages(&self) -> &[ErrorMessage] {
        &self.messages
    }
}

impl Display for CreationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_messages(f, "Unable to create injector", &self.messages)
    }
}

impl Error for CreationError {}

/// Collects the problems found while creating an injector.
#[derive(Debug, Default)]
pub(crate) struct Errors {
    messages: Vec<ErrorMessage>,
}

impl Errors {
    pub fn push(&mut self, message: ErrorMessage) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_error(self) -> CreationError {
        CreationError {
            messages: self.messages,
        }
    }
}
