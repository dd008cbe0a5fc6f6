use crate::{DynSvc, InjectResult, Injector, Provider, RequestInfo, Svc};
use once_cell::sync::OnceCell;
use tracing::trace;

/// A service provider that only creates a single instance of the service.
/// The service is created only during its first request. Any subsequent
/// requests return service pointers to the same service.
///
/// Concurrent first requests are serialized: exactly one of them runs the
/// inner provider, and every caller receives the instance it created. A
/// failed construction is not cached, so the next request tries again.
pub struct SingletonProvider {
    inner: Svc<dyn Provider>,
    instance: OnceCell<DynSvc>,
}

impl SingletonProvider {
    /// Creates a new [`SingletonProvider`] wrapping an unscoped provider.
    #[must_use]
    pub fn new(inner: Svc<dyn Provider>) -> Self {
        SingletonProvider {
            inner,
            instance: OnceCell::new(),
        }
    }
}

impl Provider for SingletonProvider {
    fn provide(
        &self,
        injector: &Injector,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        self.instance
            .get_or_try_init(|| {
                trace!(
                    key = ?request_info.current(),
                    "constructing singleton instance"
                );
                self.inner.provide(injector, request_info)
            })
            .map(DynSvc::clone)
    }
}
