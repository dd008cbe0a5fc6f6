use crate::{
    DynSvc, InjectError, InjectResult, Injector, Key, Provider, RequestInfo,
    Service, Svc,
};
use std::{error::Error, marker::PhantomData};

/// A provider that may fail during service creation with a custom error type.
/// On failure, an [`ErrorKind::ConstructionFailed`] error is returned with the
/// custom error as its source.
///
/// [`ErrorKind::ConstructionFailed`]: crate::ErrorKind::ConstructionFailed
///
/// ## Example
///
/// ```
/// use hierarchical_injector::{BindingSpec, ErrorKind, Injector, Key};
///
/// let mut builder = Injector::builder();
/// builder.bind(
///     Key::of::<u16>(),
///     BindingSpec::fallible_provider(|_| "eighty".parse::<u16>()),
/// );
///
/// let injector = builder.build().unwrap();
/// let error = injector.get::<u16>().unwrap_err();
/// assert!(matches!(error.kind(), ErrorKind::ConstructionFailed { .. }));
/// ```
pub struct FallibleProvider<F, R, E>
where
    F: Service + Fn(&Injector) -> Result<R, E>,
    R: Service,
    E: Error + Send + Sync + 'static,
{
    func: F,
    marker: PhantomData<fn() -> Result<R, E>>,
}

impl<F, R, E> FallibleProvider<F, R, E>
where
    F: Service + Fn(&Injector) -> Result<R, E>,
    R: Service,
    E: Error + Send + Sync + 'static,
{
    /// Creates a new [`FallibleProvider`].
    #[must_use]
    pub fn new(func: F) -> Self {
        FallibleProvider {
            func,
            marker: PhantomData,
        }
    }
}

impl<F, R, E> Provider for FallibleProvider<F, R, E>
where
    F: Service + Fn(&Injector) -> Result<R, E>,
    R: Service,
    E: Error + Send + Sync + 'static,
{
    fn provide(
        &self,
        injector: &Injector,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        match (self.func)(injector) {
            Ok(result) => Ok(Svc::new(result)),
            Err(error) => {
                let key = request_info
                    .current()
                    .cloned()
                    .unwrap_or_else(Key::of::<R>);
                Err(InjectError::construction_failed(key, error))
            }
        }
    }
}
