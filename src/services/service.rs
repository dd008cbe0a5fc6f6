use downcast_rs::{impl_downcast, DowncastSync};
use std::any::{Any, TypeId};

/// A reference-counted pointer holding a service. Services are shared between
/// every injector in a hierarchy, so this is always [`Arc<T>`](std::sync::Arc).
pub type Svc<T> = std::sync::Arc<T>;

/// A service pointer holding an instance of `dyn Service`.
pub type DynSvc = Svc<dyn Service>;

/// Implemented automatically on types that are capable of being a service.
pub trait Service: DowncastSync {}
impl<T: ?Sized + DowncastSync> Service for T {}

impl_downcast!(sync Service);

/// Type information about a service.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the type name of this service.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_info_compares_by_type() {
        assert_eq!(ServiceInfo::of::<i32>(), ServiceInfo::of::<i32>());
        assert_ne!(ServiceInfo::of::<i32>(), ServiceInfo::of::<u32>());
        assert_eq!("i32", ServiceInfo::of::<i32>().name());
    }

    #[test]
    fn dyn_svc_downcasts_to_concrete_type() {
        let service: DynSvc = Svc::new(42_u8);
        let value = service.downcast_arc::<u8>().ok().unwrap();
        assert_eq!(42, *value);
    }
}
