use crate::{DynSvc, InjectResult, Injector, Provider, RequestInfo};

/// A provider which returns a constant, predetermined value. Note that this is
/// technically a singleton service in that it does not recreate the value each
/// time it is requested.
///
/// While the service itself will never be exposed through a mutable
/// reference, if it supports interior mutability, its fields still can be
/// mutated. State can be stored in this manner.
pub struct ConstantProvider {
    instance: DynSvc,
}

impl ConstantProvider {
    /// Creates a new [`ConstantProvider`] using a predetermined value.
    #[must_use]
    pub fn new(instance: DynSvc) -> Self {
        ConstantProvider { instance }
    }
}

impl Provider for ConstantProvider {
    fn provide(
        &self,
        _injector: &Injector,
        _request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        Ok(self.instance.clone())
    }
}
