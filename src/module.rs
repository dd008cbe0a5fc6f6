use crate::{
    BindingSpec, InstanceHook, Injectable, Key, Scope, ScopeTag, Source, Svc,
    TypeConverter,
};

/// A key, the strategy it is bound to, and where it was declared.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub(crate) key: Key,
    pub(crate) spec: BindingSpec,
    pub(crate) scope: Option<ScopeTag>,
    pub(crate) source: Source,
}

impl Declaration {
    /// Places the binding in a scope. The scope is looked up from the
    /// injector the binding is created in.
    pub fn in_scope(&mut self, tag: ScopeTag) -> &mut Self {
        self.scope = Some(tag);
        self
    }

    /// Gets the declared key.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Gets where this declaration was made.
    #[must_use]
    pub fn source(&self) -> Source {
        self.source
    }
}

pub(crate) struct ScopeRegistration {
    pub tag: ScopeTag,
    pub scope: Svc<dyn Scope>,
    pub source: Source,
}

#[derive(Clone)]
pub(crate) struct ConverterRegistration {
    pub converter: Svc<dyn TypeConverter>,
    pub source: Source,
}

/// A collection of declarations that can be added all at once to an
/// [`InjectorBuilder`](crate::InjectorBuilder). Modules can be used to group
/// together related services and configure the injector in pieces rather than
/// all at once.
///
/// For creating a module easily via a domain specific language, see
/// [`define_module!`].
#[derive(Default)]
pub struct Module {
    pub(crate) bindings: Vec<Declaration>,
    pub(crate) implicit: Vec<Declaration>,
    pub(crate) scopes: Vec<ScopeRegistration>,
    pub(crate) hooks: Vec<Svc<dyn InstanceHook>>,
    pub(crate) converters: Vec<ConverterRegistration>,
}

impl Module {
    /// Explicitly binds a key. The location of the caller is recorded as the
    /// source of the binding.
    #[track_caller]
    pub fn bind(&mut self, key: Key, spec: BindingSpec) -> &mut Declaration {
        let source = Source::caller();
        push(
            &mut self.bindings,
            Declaration {
                key,
                spec,
                scope: None,
                source,
            },
        )
    }

    /// Registers a scope implementation for a tag.
    #[track_caller]
    pub fn bind_scope<S: Scope>(&mut self, tag: ScopeTag, scope: S) {
        self.scopes.push(ScopeRegistration {
            tag,
            scope: Svc::new(scope),
            source: Source::caller(),
        });
    }

    /// Declares how to create a binding for a key if it is requested without
    /// being bound. Declarations are visible to the injector and all of its
    /// descendants; a later declaration of the same key replaces an earlier
    /// one.
    #[track_caller]
    pub fn implicit(&mut self, key: Key, spec: BindingSpec) -> &mut Declaration {
        let source = Source::caller();
        push(
            &mut self.implicit,
            Declaration {
                key,
                spec,
                scope: None,
                source,
            },
        )
    }

    /// Declares an [`Injectable`] type.
    pub fn injectable<T: Injectable>(&mut self) -> &mut Declaration {
        push(
            &mut self.implicit,
            Declaration {
                key: Key::of::<T>(),
                spec: T::implicit_binding(),
                scope: T::scope(),
                source: Source::of_type::<T>(),
            },
        )
    }

    /// Registers a hook applied to constructed instances.
    pub fn intercept<H: InstanceHook>(&mut self, hook: H) {
        self.hooks.push(Svc::new(hook));
    }

    /// Registers a converter for string constants.
    #[track_caller]
    pub fn convert_to_types<C: TypeConverter>(&mut self, converter: C) {
        self.converters.push(ConverterRegistration {
            converter: Svc::new(converter),
            source: Source::caller(),
        });
    }

    /// Adds everything declared by another module to this one.
    pub fn install(&mut self, module: Module) {
        self.bindings.extend(module.bindings);
        self.implicit.extend(module.implicit);
        self.scopes.extend(module.scopes);
        self.hooks.extend(module.hooks);
        self.converters.extend(module.converters);
    }
}

fn push(declarations: &mut Vec<Declaration>, declaration: Declaration) -> &mut Declaration {
    declarations.push(declaration);
    let index = declarations.len() - 1;
    &mut declarations[index]
}

/// Defines a new module using a domain specific language.
///
/// # Example
///
/// ```
/// use hierarchical_injector::{
///     define_module, BindingSpec, Injectable, Injector, Key, Singleton, ScopeTag, Svc,
/// };
///
/// struct Config(&'static str);
/// struct Pool(Svc<Config>);
/// struct Handler(Svc<Pool>);
///
/// impl Injectable for Handler {
///     fn implicit_binding() -> BindingSpec {
///         BindingSpec::constructor(Handler)
///     }
/// }
///
/// let module = define_module! {
///     bindings = {
///         Key::of::<Config>() => BindingSpec::instance(Config("localhost")),
///     },
///     singletons = {
///         Key::of::<Pool>() => BindingSpec::constructor(Pool),
///     },
///     scopes = {
///         ScopeTag::named("session") => Singleton,
///     },
///     injectables = [Handler],
/// };
///
/// let injector = Injector::create([module]).unwrap();
/// let handler: Svc<Handler> = injector.get().unwrap();
/// let pool: Svc<Pool> = injector.get().unwrap();
/// assert!(Svc::ptr_eq(&handler.0, &pool));
/// assert_eq!("localhost", pool.0.0);
/// ```
#[macro_export]
macro_rules! define_module {
    {
        $($key:ident = $value:tt),*
        $(,)?
    } => {
        {
            #[allow(unused_mut)]
            let mut module = <$crate::Module as ::std::default::Default>::default();
            $($crate::define_module!(@declare module, $key = $value);)*
            module
        }
    };
    (
        @declare $module:expr,
        bindings = {
            $($bound:expr => $spec:expr),*
            $(,)?
        }
    ) => {
        $($module.bind($bound, $spec);)*
    };
    (
        @declare $module:expr,
        singletons = {
            $($bound:expr => $spec:expr),*
            $(,)?
        }
    ) => {
        $($module.bind($bound, $spec).in_scope($crate::ScopeTag::singleton());)*
    };
    (
        @declare $module:expr,
        scopes = {
            $($tag:expr => $scope:expr),*
            $(,)?
        }
    ) => {
        $($module.bind_scope($tag, $scope);)*
    };
    (
        @declare $module:expr,
        injectables = [
            $($injectable:ty),*
            $(,)?
        ]
    ) => {
        $($module.injectable::<$injectable>();)*
    };
    (
        @declare $module:expr,
        modules = [
            $($installed:expr),*
            $(,)?
        ]
    ) => {
        $($module.install($installed);)*
    };
}
