use crate::{
    node::Node, ConstantProvider, ConstructorFn, DynSvc, ErrorKind,
    FallibleProvider, FnProvider, Frame, InjectError, InjectResult, Injector,
    Key, Provider, RequestInfo, Scope, ScopeTag, Service, Source, Svc,
};
use derive_more::Display;
use std::{
    any::Any,
    error::Error,
    fmt::{Debug, Formatter},
    sync::Weak,
};

type ConstructFn = dyn Fn(Vec<DynSvc>) -> InjectResult<DynSvc> + Send + Sync;

/// A constructor-injected construction strategy: the keys of the parameters,
/// and a function building the instance from the resolved parameters.
#[derive(Clone)]
pub struct Constructor {
    dependencies: Vec<Key>,
    construct: Svc<ConstructFn>,
}

impl Constructor {
    /// Creates a constructor from raw parameter keys. The arguments passed to
    /// `construct` are instances for each key, in the same order.
    pub fn new<F>(dependencies: Vec<Key>, construct: F) -> Self
    where
        F: Fn(Vec<DynSvc>) -> InjectResult<DynSvc> + Send + Sync + 'static,
    {
        Constructor {
            dependencies,
            construct: Svc::new(construct),
        }
    }

    /// Creates a constructor from a function whose parameters are all
    /// dependencies.
    pub fn from_fn<D, F>(func: F) -> Self
    where
        F: ConstructorFn<D>,
    {
        Constructor::new(F::dependencies(), move |arguments| {
            let instance = func.construct(arguments)?;
            Ok(Svc::new(instance) as DynSvc)
        })
    }

    /// Gets the keys this constructor is injected with.
    #[must_use]
    pub fn dependencies(&self) -> &[Key] {
        &self.dependencies
    }

    /// Builds an instance from resolved arguments.
    pub fn construct(&self, arguments: Vec<DynSvc>) -> InjectResult<DynSvc> {
        (self.construct)(arguments)
    }
}

impl Debug for Constructor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Constructor")
            .field(&self.dependencies)
            .finish()
    }
}

/// How instances of a key are created. Binding specifications are supplied
/// by modules, either as explicit bindings or as implicit declarations used
/// to create bindings on demand.
#[derive(Clone)]
pub enum BindingSpec {
    /// Always provides the same instance.
    Instance(DynSvc),

    /// Delegates to the binding of another key.
    Implementation(Key),

    /// Calls a provider, passing it the declaring injector.
    Provider(Svc<dyn Provider>),

    /// Resolves each parameter from the declaring injector and constructs
    /// the instance from them.
    Constructor(Constructor),
}

impl BindingSpec {
    /// Binds to a single, predetermined instance.
    #[must_use]
    pub fn instance<T: Service>(value: T) -> Self {
        BindingSpec::Instance(Svc::new(value))
    }

    /// Binds to the unqualified key of another type.
    #[must_use]
    pub fn to<T: ?Sized + Any>() -> Self {
        BindingSpec::Implementation(Key::of::<T>())
    }

    /// Binds to a function of the declaring injector.
    ///
    /// ```
    /// use hierarchical_injector::{BindingSpec, Injector, Key, Svc};
    ///
    /// let mut builder = Injector::builder();
    /// builder.bind(Key::of::<u32>(), BindingSpec::instance(20_u32));
    /// builder.bind(
    ///     Key::of::<u64>(),
    ///     BindingSpec::provider(|injector: &Injector| {
    ///         let half: Svc<u32> = injector.get()?;
    ///         Ok(u64::from(*half) * 2)
    ///     }),
    /// );
    ///
    /// let injector = builder.build().unwrap();
    /// assert_eq!(40, *injector.get::<u64>().unwrap());
    /// ```
    #[must_use]
    pub fn provider<F, R>(func: F) -> Self
    where
        F: Service + Fn(&Injector) -> InjectResult<R>,
        R: Service,
    {
        BindingSpec::Provider(Svc::new(FnProvider::new(func)))
    }

    /// Binds to a function of the declaring injector that fails with its own
    /// error type.
    #[must_use]
    pub fn fallible_provider<F, R, E>(func: F) -> Self
    where
        F: Service + Fn(&Injector) -> Result<R, E>,
        R: Service,
        E: Error + Send + Sync + 'static,
    {
        BindingSpec::Provider(Svc::new(FallibleProvider::new(func)))
    }

    /// Binds to a constructor function whose parameters are dependencies.
    #[must_use]
    pub fn constructor<D, F>(func: F) -> Self
    where
        F: ConstructorFn<D>,
    {
        BindingSpec::Constructor(Constructor::from_fn(func))
    }

    /// The keys that must be resolvable for this strategy to succeed.
    /// Dependencies of providers cannot be known in advance and are not
    /// included.
    #[must_use]
    pub fn dependencies(&self) -> Vec<Key> {
        match self {
            BindingSpec::Implementation(target) => vec![target.clone()],
            BindingSpec::Constructor(constructor) => {
                constructor.dependencies().to_vec()
            }
            BindingSpec::Instance(_) | BindingSpec::Provider(_) => Vec::new(),
        }
    }

    pub(crate) fn validate(
        &self,
        key: &Key,
        scope: Option<&ScopeTag>,
    ) -> Result<(), ErrorKind> {
        match self {
            BindingSpec::Instance(_) if scope.is_some() => {
                Err(ErrorKind::ScopedInstance { key: key.clone() })
            }
            BindingSpec::Implementation(target) if target == key => {
                Err(ErrorKind::SelfBinding { key: key.clone() })
            }
            _ => Ok(()),
        }
    }

    fn unscoped_provider(&self, key: &Key) -> Svc<dyn Provider> {
        match self {
            BindingSpec::Instance(instance) => {
                Svc::new(ConstantProvider::new(instance.clone()))
            }
            BindingSpec::Implementation(target) => Svc::new(LinkedProvider {
                target: target.clone(),
            }),
            BindingSpec::Provider(provider) => provider.clone(),
            BindingSpec::Constructor(constructor) => {
                Svc::new(ConstructorProvider {
                    key: key.clone(),
                    constructor: constructor.clone(),
                })
            }
        }
    }
}

impl Debug for BindingSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingSpec::Instance(_) => f.write_str("Instance"),
            BindingSpec::Implementation(target) => {
                f.debug_tuple("Implementation").field(target).finish()
            }
            BindingSpec::Provider(_) => f.write_str("Provider"),
            BindingSpec::Constructor(constructor) => constructor.fmt(f),
        }
    }
}

struct LinkedProvider {
    target: Key,
}

impl Provider for LinkedProvider {
    fn provide(
        &self,
        injector: &Injector,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        injector.instance_with(&self.target, request_info)
    }
}

struct ConstructorProvider {
    key: Key,
    constructor: Constructor,
}

impl Provider for ConstructorProvider {
    fn provide(
        &self,
        injector: &Injector,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        let arguments = self
            .constructor
            .dependencies()
            .iter()
            .map(|dependency| injector.instance_with(dependency, request_info))
            .collect::<InjectResult<Vec<_>>>()?;

        let mut instance = self.constructor.construct(arguments)?;
        for hook in injector.node().hooks_to_root() {
            if hook.matches(&self.key) {
                instance = hook.intercept(&self.key, instance)?;
            }
        }

        Ok(instance)
    }
}

struct InjectorProvider;

impl Provider for InjectorProvider {
    fn provide(
        &self,
        injector: &Injector,
        _request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        Ok(Svc::new(injector.clone()))
    }
}

/// How a binding came to exist.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
pub enum Origin {
    /// Declared by a module when its injector was created.
    #[display(fmt = "explicit")]
    Explicit,

    /// Created on first request from an implicit declaration.
    #[display(fmt = "just-in-time")]
    JustInTime,

    /// Created on first request by converting a string constant.
    #[display(fmt = "converted")]
    Converted,

    /// Provided by the injector itself.
    #[display(fmt = "built-in")]
    Builtin,
}

/// A key bound to a construction strategy in a specific injector. Bindings
/// are shared: every injector that resolves a key to a binding receives the
/// same binding, and scoped instances are cached within it.
pub struct Binding {
    key: Key,
    spec: BindingSpec,
    scope: Option<ScopeTag>,
    source: Source,
    origin: Origin,
    node: Weak<Node>,
    provider: Svc<dyn Provider>,
}

impl Binding {
    pub(crate) fn new(
        key: Key,
        spec: BindingSpec,
        scope: Option<(ScopeTag, Svc<dyn Scope>)>,
        source: Source,
        origin: Origin,
        node: Weak<Node>,
    ) -> Self {
        let unscoped = spec.unscoped_provider(&key);
        let (scope, provider) = match scope {
            Some((tag, scope)) => {
                let scoped = scope.scope(&key, unscoped);
                (Some(tag), scoped)
            }
            None => (None, unscoped),
        };

        Binding {
            key,
            spec,
            scope,
            source,
            origin,
            node,
            provider,
        }
    }

    pub(crate) fn builtin_injector(node: Weak<Node>) -> Self {
        Binding::new(
            Key::of::<Injector>(),
            BindingSpec::Provider(Svc::new(InjectorProvider)),
            None,
            Source::Builtin,
            Origin::Builtin,
            node,
        )
    }

    /// Gets the key this binding provides.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Gets the construction strategy of this binding.
    #[must_use]
    pub fn spec(&self) -> &BindingSpec {
        &self.spec
    }

    /// Gets the tag of the scope this binding belongs to, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&ScopeTag> {
        self.scope.as_ref()
    }

    /// Gets where this binding was declared.
    #[must_use]
    pub fn source(&self) -> Source {
        self.source
    }

    /// Gets how this binding came to exist.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Gets the injector this binding belongs to. This only returns
    /// [`None`] once that injector has been dropped.
    #[must_use]
    pub fn injector(&self) -> Option<Injector> {
        self.node.upgrade().map(Injector::from_node)
    }

    /// Provides an instance of the bound service from the binding's own
    /// injector.
    pub(crate) fn provision(
        &self,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        let injector = self.injector().ok_or_else(|| {
            InjectError::construction_failed(
                self.key.clone(),
                "the declaring injector was dropped",
            )
        })?;

        self.provider
            .provide(&injector, request_info)
            .map_err(|error| error.within(Frame::At(self.source)))
    }
}

impl Debug for Binding {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("spec", &self.spec)
            .field("scope", &self.scope)
            .field("source", &self.source)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Engine;
    struct Car(Svc<Engine>);

    #[test]
    fn constructor_dependencies_are_parameter_keys() {
        let spec = BindingSpec::constructor(Car);
        assert_eq!(vec![Key::of::<Engine>()], spec.dependencies());
    }

    #[test]
    fn implementation_depends_on_target() {
        let spec = BindingSpec::to::<Engine>();
        assert_eq!(vec![Key::of::<Engine>()], spec.dependencies());
        assert!(BindingSpec::instance(Engine).dependencies().is_empty());
    }

    #[test]
    fn scoped_instance_is_rejected() {
        let error = BindingSpec::instance(Engine)
            .validate(&Key::of::<Engine>(), Some(&ScopeTag::singleton()))
            .unwrap_err();
        assert!(matches!(error, ErrorKind::ScopedInstance { .. }));
    }

    #[test]
    fn self_implementation_is_rejected() {
        let error = BindingSpec::to::<Engine>()
            .validate(&Key::of::<Engine>(), None)
            .unwrap_err();
        assert!(matches!(error, ErrorKind::SelfBinding { .. }));
    }

    #[test]
    fn raw_constructor_receives_arguments_in_order() {
        let constructor = Constructor::new(
            vec![Key::of::<u8>(), Key::of::<u16>()],
            |arguments| Ok(Svc::new(arguments.len()) as DynSvc),
        );

        let instance = constructor
            .construct(vec![
                Svc::new(1_u8) as DynSvc,
                Svc::new(2_u16) as DynSvc,
            ])
            .unwrap();
        assert_eq!(2, *instance.downcast_arc::<usize>().ok().unwrap());
    }
}
