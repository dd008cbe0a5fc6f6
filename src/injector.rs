use crate::{
    node::Node, resolver, Binding, CreationError, DynSvc, Frame, InjectResult,
    InjectorBuilder, Interface, Key, Module, ProviderHandle, RequestInfo,
    Scope, ScopeTag, Svc,
};
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

/// An injector in a hierarchy of injectors. Each injector holds the bindings
/// its modules declared, the just-in-time bindings created in it, and the
/// scopes registered on it. A child injector sees everything its ancestors
/// bind; an ancestor never sees its descendants' bindings.
///
/// Cloning an injector produces another handle to the same injector. A child
/// keeps its ancestors alive, but ancestors do not keep their children alive.
///
/// # Injecting the injector
///
/// The injector can be requested as itself, and does not need to be bound
/// beforehand. A binding that requests the injector receives the injector the
/// binding was declared in.
///
/// Note that requesting the injector inside of your services is generally bad
/// practice, and is known as the service locator antipattern. This is mostly
/// useful for factories that create instances of your services on demand.
///
/// ```
/// use hierarchical_injector::{BindingSpec, InjectResult, Injector, Key, Svc};
///
/// struct FloatFactory(Injector);
///
/// impl FloatFactory {
///     pub fn get(&self) -> InjectResult<f32> {
///         let int: Svc<i32> = self.0.get()?;
///         Ok(*int as f32)
///     }
/// }
///
/// let mut builder = Injector::builder();
/// builder.bind(Key::of::<i32>(), BindingSpec::instance(2_i32));
/// builder.bind(Key::of::<FloatFactory>(), BindingSpec::constructor(FloatFactory));
///
/// let injector = builder.build().unwrap();
/// let factory: Svc<FloatFactory> = injector.get().unwrap();
/// assert_eq!(2.0, factory.get().unwrap());
/// assert_eq!(injector, factory.0);
/// ```
#[derive(Clone)]
pub struct Injector {
    node: Arc<Node>,
}

impl Injector {
    /// Creates a builder for a root injector.
    #[must_use]
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::new(None)
    }

    /// Creates a root injector from modules.
    pub fn create(
        modules: impl IntoIterator<Item = Module>,
    ) -> Result<Injector, CreationError> {
        let mut builder = Injector::builder();
        for module in modules {
            builder.add_module(module);
        }

        builder.build()
    }

    /// Creates a builder for a child of this injector.
    #[must_use]
    pub fn child_builder(&self) -> InjectorBuilder {
        InjectorBuilder::new(Some(self.clone()))
    }

    /// Creates a child of this injector from modules. Creation fails if the
    /// modules conflict with each other or with this injector's ancestry.
    pub fn create_child(
        &self,
        modules: impl IntoIterator<Item = Module>,
    ) -> Result<Injector, CreationError> {
        let mut builder = self.child_builder();
        for module in modules {
            builder.add_module(module);
        }

        builder.build()
    }

    pub(crate) fn from_node(node: Arc<Node>) -> Self {
        Injector { node }
    }

    pub(crate) fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// Gets an instance of the unqualified key of `I`.
    ///
    /// If `I` is a dynamic type (`dyn Trait`), the binding of `dyn Trait`
    /// provides the instance, and `I` must be declared with
    /// [`interface!`](crate::interface) for the instance to be recovered.
    pub fn get<I: ?Sized + Interface>(&self) -> InjectResult<Svc<I>> {
        self.get_with_key(&Key::of::<I>())
    }

    /// Gets an instance of `key` as an `I`.
    pub fn get_with_key<I: ?Sized + Interface>(
        &self,
        key: &Key,
    ) -> InjectResult<Svc<I>> {
        let instance = self.get_instance(key)?;
        I::downcast(instance).map_err(|error| error.within(Frame::Locating(key.clone())))
    }

    /// Gets a type-erased instance of `key`.
    pub fn get_instance(&self, key: &Key) -> InjectResult<DynSvc> {
        self.instance_with(key, &RequestInfo::new())
    }

    pub(crate) fn instance_with(
        &self,
        key: &Key,
        request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        let provide = || {
            let request_info = request_info.with_request(key)?;
            let binding = resolver::resolve(&self.node, key)?;
            binding.provision(&request_info)
        };

        provide().map_err(|error| error.within(Frame::Locating(key.clone())))
    }

    /// Gets a provider for the unqualified key of `I`.
    pub fn get_provider<I: ?Sized + Interface>(
        &self,
    ) -> InjectResult<ProviderHandle<I>> {
        self.get_provider_for(&Key::of::<I>())
    }

    /// Gets a provider for `key`. The key is resolved immediately, but no
    /// instance is provided until the handle is used.
    pub fn get_provider_for<I: ?Sized + Interface>(
        &self,
        key: &Key,
    ) -> InjectResult<ProviderHandle<I>> {
        let binding = resolver::resolve(&self.node, key)
            .map_err(|error| error.within(Frame::Locating(key.clone())))?;
        Ok(ProviderHandle::new(self.clone(), binding))
    }

    /// Gets the binding of `key` owned by this injector. Ancestors are not
    /// searched, and no binding is created.
    #[must_use]
    pub fn get_binding(&self, key: &Key) -> Option<Svc<Binding>> {
        self.node.local_binding(key)
    }

    /// Gets every binding owned by this injector, including the built-in
    /// binding of the injector itself.
    #[must_use]
    pub fn bindings(&self) -> Vec<Svc<Binding>> {
        self.node.bindings()
    }

    /// Gets the parent of this injector. Root injectors have no parent.
    #[must_use]
    pub fn parent(&self) -> Option<Injector> {
        self.node.parent().cloned().map(Injector::from_node)
    }

    /// Gets the scope this injector uses for `tag`: the nearest registration
    /// on this injector or its ancestors.
    #[must_use]
    pub fn scope(&self, tag: &ScopeTag) -> Option<Svc<dyn Scope>> {
        self.node.find_scope(tag).map(|entry| entry.scope)
    }
}

impl PartialEq for Injector {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl Eq for Injector {}

impl Debug for Injector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("id", &self.node.id())
            .field("depth", &self.node.depth())
            .finish_non_exhaustive()
    }
}
