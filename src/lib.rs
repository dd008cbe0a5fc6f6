//! # Hierarchical dependency injection.
//!
//! Injectors form a tree. Each injector owns the bindings its modules
//! declared, from [`Key`]s (a type and an optional [`Qualifier`]) to the
//! strategy that creates instances of them. A child injector can use every
//! binding of its ancestors and add its own, but it never changes what its
//! ancestors resolve to.
//!
//! ## Bindings
//!
//! A binding is one of four strategies, described by a [`BindingSpec`]:
//!
//! - An instance, which is always provided as-is.
//! - An implementation, which delegates to the binding of another key.
//! - A [`Provider`], which is called with the injector that declared the
//!   binding.
//! - A constructor, whose parameters are resolved from the injector that
//!   declared the binding.
//!
//! Bindings declared by modules are *explicit*. A key that isn't bound
//! explicitly can still be requested if a module declared how to create it,
//! usually through an [`Injectable`] type. The binding is then created the
//! first time it is requested, and placed as close to the root as possible so
//! that it can be shared by as many injectors as possible.
//!
//! ## Conflicts
//!
//! Because a binding created on demand in an injector is shared with all of
//! its descendants, no descendant may bind the same key explicitly, and an
//! injector can't create such a binding if a live descendant already binds
//! the key. Both orders are detected:
//!
//! ```
//! use hierarchical_injector::{BindingSpec, ErrorKind, Injectable, Injector, Key, Module};
//!
//! struct Clock;
//! impl Injectable for Clock {
//!     fn implicit_binding() -> BindingSpec {
//!         BindingSpec::constructor(|| Clock)
//!     }
//! }
//!
//! let mut module = Module::default();
//! module.injectable::<Clock>();
//! let parent = Injector::create([module]).unwrap();
//!
//! // The parent creates a binding for `Clock` on demand...
//! parent.get::<Clock>().unwrap();
//!
//! // ...so a child can no longer bind it explicitly.
//! let mut builder = parent.child_builder();
//! builder.bind(Key::of::<Clock>(), BindingSpec::instance(Clock));
//! let error = builder.build().unwrap_err();
//! assert!(matches!(
//!     error.messages()[0].kind(),
//!     ErrorKind::ParentBlocksChild { .. }
//! ));
//! ```
//!
//! ## Scopes
//!
//! A binding can belong to a [`Scope`], identified by a [`ScopeTag`]. Scopes
//! registered on an injector apply to all of its descendants. Every root
//! injector registers the [`Singleton`] scope, which constructs a binding's
//! instance once and shares it with every injector that uses the binding.
//!
//! ## Interfaces
//!
//! Services can be requested through traits. The types that may stand
//! behind a `dyn Trait` are declared with [`interface!`]:
//!
//! ```
//! use hierarchical_injector::{interface, BindingSpec, Injector, Key, Service, Svc};
//!
//! trait DataService: Service {
//!     fn user(&self) -> Option<&'static str>;
//! }
//!
//! struct SqlDataService;
//! impl DataService for SqlDataService {
//!     fn user(&self) -> Option<&'static str> {
//!         None
//!     }
//! }
//!
//! struct MockDataService;
//! impl DataService for MockDataService {
//!     fn user(&self) -> Option<&'static str> {
//!         Some("john")
//!     }
//! }
//!
//! interface!(dyn DataService = [SqlDataService, MockDataService]);
//!
//! struct UserService(Svc<dyn DataService>);
//!
//! let mut builder = Injector::builder();
//! builder.bind(Key::of::<dyn DataService>(), BindingSpec::to::<SqlDataService>());
//! builder.bind(Key::of::<SqlDataService>(), BindingSpec::instance(SqlDataService));
//! builder.bind(Key::of::<UserService>(), BindingSpec::constructor(UserService));
//! let injector = builder.build().unwrap();
//!
//! // Tests can swap the implementation in a child injector.
//! let mut builder = injector.child_builder();
//! builder.bind(Key::of::<MockDataService>(), BindingSpec::instance(MockDataService));
//! let child = builder.build().unwrap();
//!
//! let users: Svc<UserService> = injector.get().unwrap();
//! let mock: Svc<dyn DataService> = child.get_with_key(&Key::of::<MockDataService>()).unwrap();
//! assert_eq!(None, users.0.user());
//! assert_eq!(Some("john"), mock.user());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::doc_markdown
)]

mod binding;
mod builder;
mod errors;
mod extensions;
mod implicit;
mod injector;
mod key;
mod module;
mod node;
mod registry;
mod requests;
mod resolver;
mod scopes;
mod services;
mod source;

pub use binding::*;
pub use builder::*;
pub use errors::*;
pub use extensions::*;
pub use implicit::*;
pub use injector::*;
pub use key::*;
pub use module::*;
pub use requests::*;
pub use scopes::*;
pub use services::*;
pub use source::*;
