use crate::{DynSvc, InjectResult, Injector, Interface, Key, Svc};

/// A parameter of a constructor. Each dependency names the key it is resolved
/// from and knows how to turn the provided instance into itself.
///
/// By default, service pointers to any [`Interface`] and the [`Injector`]
/// itself can be requested. A constructor that requests the injector receives
/// the injector its binding was declared in, which is not necessarily the one
/// the request was made to.
pub trait Dependency: Sized + 'static {
    /// The key this dependency is resolved from.
    fn key() -> Key;

    /// Converts the provided instance into this dependency.
    fn from_instance(instance: DynSvc) -> InjectResult<Self>;
}

/// Requests a service pointer to a service or interface.
impl<I: ?Sized + Interface> Dependency for Svc<I> {
    fn key() -> Key {
        Key::of::<I>()
    }

    fn from_instance(instance: DynSvc) -> InjectResult<Self> {
        I::downcast(instance)
    }
}

/// Requests the injector that declared the binding being constructed.
impl Dependency for Injector {
    fn key() -> Key {
        Key::of::<Injector>()
    }

    fn from_instance(instance: DynSvc) -> InjectResult<Self> {
        let injector: Svc<Injector> = Injector::downcast(instance)?;
        Ok(injector.as_ref().clone())
    }
}
