use crate::{BoxError, DynSvc, InjectResult, Key, Service, ServiceInfo, Svc};
use std::{error::Error, marker::PhantomData, str::FromStr};

/// Post-construction hook for constructor-injected bindings. After a
/// constructor builds an instance, the hooks registered on the declaring
/// injector and its ancestors are applied to it, root-most first. A hook may
/// return the instance it was given or a replacement for it.
pub trait InstanceHook: Service {
    /// Whether this hook applies to instances of `key`.
    fn matches(&self, key: &Key) -> bool {
        let _ = key;
        true
    }

    /// Processes a freshly constructed instance of `key`.
    fn intercept(&self, key: &Key, instance: DynSvc) -> InjectResult<DynSvc>;
}

/// Converts string constants into instances of other types. When a qualified
/// key has no binding but a string instance is bound under the same
/// qualifier, the one converter that accepts the key creates the instance.
///
/// ```
/// use hierarchical_injector::{BindingSpec, Injector, Key, Module, ParseConverter};
///
/// let mut module = Module::default();
/// module.bind(Key::named::<String>("port"), BindingSpec::instance("8080".to_string()));
/// module.convert_to_types(ParseConverter::<u16>::new());
///
/// let injector = Injector::create([module]).unwrap();
/// let port = injector.get_with_key::<u16>(&Key::named::<u16>("port")).unwrap();
/// assert_eq!(8080, *port);
/// ```
pub trait TypeConverter: Service {
    /// Whether this converter can produce instances of `key`.
    fn converts(&self, key: &Key) -> bool;

    /// Converts `value` into an instance of `key`.
    fn convert(&self, value: &str, key: &Key) -> Result<DynSvc, BoxError>;
}

/// Converts strings into any type implementing [`FromStr`].
pub struct ParseConverter<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> ParseConverter<T> {
    /// Creates a new [`ParseConverter`].
    #[must_use]
    pub fn new() -> Self {
        ParseConverter {
            marker: PhantomData,
        }
    }
}

impl<T> Default for ParseConverter<T> {
    fn default() -> Self {
        ParseConverter::new()
    }
}

impl<T> TypeConverter for ParseConverter<T>
where
    T: Service + FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    fn converts(&self, key: &Key) -> bool {
        key.service_info() == ServiceInfo::of::<T>()
    }

    fn convert(&self, value: &str, _key: &Key) -> Result<DynSvc, BoxError> {
        let parsed: T = value.parse()?;
        Ok(Svc::new(parsed))
    }
}
