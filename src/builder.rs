use crate::{
    registry, BindingSpec, CreationError, Declaration, Injector, Key, Module,
    Scope, ScopeTag,
};

/// A builder for an [`Injector`]. Builders are created with
/// [`Injector::builder`] for root injectors, or with
/// [`Injector::child_builder`] for children.
#[derive(Default)]
pub struct InjectorBuilder {
    parent: Option<Injector>,
    module: Module,
    require_explicit_bindings: bool,
}

impl InjectorBuilder {
    pub(crate) fn new(parent: Option<Injector>) -> Self {
        InjectorBuilder {
            parent,
            ..InjectorBuilder::default()
        }
    }

    /// Explicitly binds a key. The location of the caller is recorded as the
    /// source of the binding.
    #[track_caller]
    pub fn bind(&mut self, key: Key, spec: BindingSpec) -> &mut Declaration {
        self.module.bind(key, spec)
    }

    /// Registers a scope implementation for a tag.
    #[track_caller]
    pub fn bind_scope<S: Scope>(&mut self, tag: ScopeTag, scope: S) {
        self.module.bind_scope(tag, scope);
    }

    /// Adds all the declarations of a module to this builder.
    pub fn add_module(&mut self, module: Module) {
        self.module.install(module);
    }

    /// Disables just-in-time bindings for the injector and all of its
    /// descendants. Every requested key must then be bound explicitly, either
    /// on the injector or on one of its ancestors. Children of an injector
    /// with this option set always have it set as well.
    pub fn require_explicit_bindings(&mut self, require: bool) -> &mut Self {
        self.require_explicit_bindings = require;
        self
    }

    /// Builds the injector. Every problem with the configuration is reported
    /// together in the returned error.
    pub fn build(self) -> Result<Injector, CreationError> {
        let parent = self.parent.map(|parent| parent.node().clone());
        registry::create_node(parent, self.module, self.require_explicit_bindings)
            .map(Injector::from_node)
    }
}
