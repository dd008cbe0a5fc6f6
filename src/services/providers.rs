use crate::{
    Binding, DynSvc, Frame, InjectResult, Injector, Interface, RequestInfo,
    Service, Svc,
};
use std::{
    fmt::{Debug, Formatter},
    marker::PhantomData,
};

/// Weakly typed service provider. Given the injector that declared a binding,
/// this will provide an instance of the bound service.
///
/// Providers are the unit that scopes wrap: a [`Scope`](crate::Scope)
/// receives the unscoped provider of a binding and returns a provider that
/// decides when to delegate to it.
///
/// ## Example
///
/// ```
/// use hierarchical_injector::{
///     BindingSpec, DynSvc, InjectResult, Injector, Key, Provider,
///     RequestInfo, Svc,
/// };
///
/// struct Answer;
/// impl Provider for Answer {
///     fn provide(
///         &self,
///         _injector: &Injector,
///         _request_info: &RequestInfo,
///     ) -> InjectResult<DynSvc> {
///         Ok(Svc::new(42_i32))
///     }
/// }
///
/// let mut builder = Injector::builder();
/// builder.bind(Key::of::<i32>(), BindingSpec::Provider(Svc::new(Answer)));
///
/// let injector = builder.build().unwrap();
/// let answer: Svc<i32> = injector.get().unwrap();
/// assert_eq!(42, *answer);
/// ```
pub trait Provider: Service {
    /// Provides an instance of the service. The injector passed in is the one
    /// the binding was declared in and can be used to retrieve instances of
    /// any dependencies this service has.
    fn provide(
        &self,
        injector: &Injector,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc>;
}

/// A handle for providing instances of a bound service on demand. The binding
/// is resolved when the handle is created, so a configuration problem is
/// reported by [`Injector::get_provider`] rather than by [`get`].
///
/// [`get`]: ProviderHandle::get
pub struct ProviderHandle<I: ?Sized + Interface> {
    injector: Injector,
    binding: Svc<Binding>,
    marker: PhantomData<fn() -> Svc<I>>,
}

impl<I: ?Sized + Interface> ProviderHandle<I> {
    pub(crate) fn new(injector: Injector, binding: Svc<Binding>) -> Self {
        ProviderHandle {
            injector,
            binding,
            marker: PhantomData,
        }
    }

    /// Gets the binding this handle provides instances of.
    #[must_use]
    pub fn binding(&self) -> &Svc<Binding> {
        &self.binding
    }

    /// Provides an instance of the service.
    pub fn get(&self) -> InjectResult<Svc<I>> {
        let key = self.binding.key();
        let request_info = RequestInfo::new().with_request(key)?;
        let instance = self
            .binding
            .provision(&request_info)
            .map_err(|error| error.within(Frame::Locating(key.clone())))?;
        I::downcast(instance)
    }

    /// Gets the injector this handle was requested from.
    #[must_use]
    pub fn injector(&self) -> &Injector {
        &self.injector
    }
}

impl<I: ?Sized + Interface> Clone for ProviderHandle<I> {
    fn clone(&self) -> Self {
        ProviderHandle::new(self.injector.clone(), self.binding.clone())
    }
}

impl<I: ?Sized + Interface> Debug for ProviderHandle<I> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}
