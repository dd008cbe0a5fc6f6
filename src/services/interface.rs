use crate::{DynSvc, ErrorKind, InjectError, InjectResult, Key, Service, ServiceInfo, Svc};

/// Indicates that a type can be requested from an injector. Every sized
/// service type is an interface for itself. Dynamic types (`dyn Trait`)
/// cannot be recovered from an erased service pointer on their own, so the
/// types that may stand behind them must be declared explicitly with the
/// [`interface!`] macro.
pub trait Interface: Service {
    /// Recovers a typed service pointer from an erased one.
    fn downcast(service: DynSvc) -> InjectResult<Svc<Self>>;
}

impl<T: Service> Interface for T {
    fn downcast(service: DynSvc) -> InjectResult<Svc<Self>> {
        service.downcast_arc::<T>().map_err(|_| {
            InjectError::new(ErrorKind::InvalidInstance {
                key: Key::of::<T>(),
                expected: ServiceInfo::of::<T>(),
            })
        })
    }
}

impl Interface for dyn Service {
    fn downcast(service: DynSvc) -> InjectResult<Svc<Self>> {
        Ok(service)
    }
}

/// Marks a trait as being an interface for many other types. This means that
/// a request for the given trait can resolve to any of the types indicated by
/// this macro invocation.
///
/// ## Example
///
/// ```
/// use hierarchical_injector::{interface, Service};
///
/// struct Bar;
/// #[cfg(test)]
/// struct MockBar;
///
/// trait Foo: Service {}
/// impl Foo for Bar {}
/// #[cfg(test)]
/// impl Foo for MockBar {}
///
/// // Requests for `dyn Foo` can resolve to either `Bar` or, in a test run,
/// // `MockBar`. Note that attributes are allowed on each of the listed types.
/// interface! {
///     dyn Foo = [
///         Bar,
///         #[cfg(test)]
///         MockBar,
///     ]
/// };
/// ```
#[macro_export]
macro_rules! interface {
    {
        $(
            $interface:ty = [
                $($(#[$attr:meta])* $impl:ty),*
                $(,)?
            ]
        ),*
        $(,)?
    } => {
        $(
            impl $crate::Interface for $interface {
                #[allow(unused_mut)]
                fn downcast(
                    mut service: $crate::DynSvc,
                ) -> $crate::InjectResult<$crate::Svc<Self>> {
                    $(
                        $(#[$attr])*
                        {
                            service = match service.downcast_arc::<$impl>() {
                                Ok(service) => return Ok(service as $crate::Svc<Self>),
                                Err(service) => service,
                            };
                        }
                    )*

                    ::std::mem::drop(service);
                    Err($crate::InjectError::new($crate::ErrorKind::InvalidInstance {
                        key: $crate::Key::of::<Self>(),
                        expected: $crate::ServiceInfo::of::<Self>(),
                    }))
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Service {
        fn sides(&self) -> u32;
    }

    struct Square;
    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    struct Triangle;
    impl Shape for Triangle {
        fn sides(&self) -> u32 {
            3
        }
    }

    interface!(dyn Shape = [Square, Triangle]);

    #[test]
    fn declared_implementations_downcast() {
        let square = <dyn Shape>::downcast(Svc::new(Square)).unwrap();
        let triangle = <dyn Shape>::downcast(Svc::new(Triangle)).unwrap();
        assert_eq!(4, square.sides());
        assert_eq!(3, triangle.sides());
    }

    #[test]
    fn undeclared_implementation_is_rejected() {
        let error = <dyn Shape>::downcast(Svc::new(5_i32)).err().unwrap();
        assert!(matches!(error.kind(), ErrorKind::InvalidInstance { .. }));
    }
}
