use crate::{Key, Provider, Service, ServiceInfo, SingletonProvider, Svc, Token};
use std::{
    any::Any,
    borrow::Cow,
    fmt::{Display, Formatter},
};

/// Identifies a scope. Bindings name the scope they belong to by tag, and
/// each injector maps tags to [`Scope`] implementations. A tag registered on
/// an injector applies to that injector and all of its descendants unless a
/// descendant registers the same tag again.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ScopeTag(Token);

impl ScopeTag {
    /// Creates a tag identified by a name.
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        ScopeTag(Token::Named(name.into()))
    }

    /// Creates a tag identified by a marker type.
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ScopeTag(Token::Marker(ServiceInfo::of::<T>()))
    }

    /// The tag of the built-in [`Singleton`] scope, which every root injector
    /// registers.
    #[must_use]
    pub fn singleton() -> Self {
        ScopeTag::of::<Singleton>()
    }

    /// Gets the token identifying this tag.
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.0
    }
}

impl Display for ScopeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A lifecycle strategy for the instances of a binding. When a scoped binding
/// is created, its scope receives the binding's unscoped provider and returns
/// the provider the binding will actually use.
///
/// The scoped provider lives in the binding, which lives in the injector that
/// declared it. State cached by the provider is therefore shared by every
/// injector that resolves to the binding.
///
/// Scopes are applied while the injector tree is locked, so
/// [`Scope::scope`] must not request anything from an injector.
pub trait Scope: Service {
    /// Wraps the unscoped provider for `key`.
    fn scope(&self, key: &Key, unscoped: Svc<dyn Provider>) -> Svc<dyn Provider>;
}

/// Constructs each binding's instance once and reuses it for every request.
///
/// ```
/// use hierarchical_injector::{BindingSpec, Injector, Key, ScopeTag, Svc};
///
/// struct Database;
///
/// let mut builder = Injector::builder();
/// builder
///     .bind(Key::of::<Database>(), BindingSpec::constructor(|| Database))
///     .in_scope(ScopeTag::singleton());
///
/// let parent = builder.build().unwrap();
/// let child = parent.child_builder().build().unwrap();
///
/// let from_parent: Svc<Database> = parent.get().unwrap();
/// let from_child: Svc<Database> = child.get().unwrap();
/// assert!(Svc::ptr_eq(&from_parent, &from_child));
/// ```
#[derive(Clone, Copy, Default, Debug)]
pub struct Singleton;

impl Scope for Singleton {
    fn scope(&self, _key: &Key, unscoped: Svc<dyn Provider>) -> Svc<dyn Provider> {
        Svc::new(SingletonProvider::new(unscoped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DynSvc, InjectResult, Injector, RequestInfo};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Provider for Counting {
        fn provide(
            &self,
            _injector: &Injector,
            _request_info: &RequestInfo,
        ) -> InjectResult<DynSvc> {
            let count = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Svc::new(count))
        }
    }

    #[test]
    fn tags_compare_by_token() {
        assert_eq!(ScopeTag::named("request"), ScopeTag::named("request"));
        assert_ne!(ScopeTag::named("request"), ScopeTag::singleton());
        assert_eq!(ScopeTag::of::<Singleton>(), ScopeTag::singleton());
    }

    #[test]
    fn singleton_provides_first_instance() {
        let counting = Svc::new(Counting::default());
        let provider = Singleton.scope(&Key::of::<usize>(), counting.clone());

        let injector = Injector::builder().build().unwrap();
        let first = provider.provide(&injector, &RequestInfo::new()).unwrap();
        let second = provider.provide(&injector, &RequestInfo::new()).unwrap();

        assert!(Svc::ptr_eq(&first, &second));
        assert_eq!(1, counting.calls.load(Ordering::SeqCst));
    }
}
