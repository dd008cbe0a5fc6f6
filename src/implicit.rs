use crate::{BindingSpec, ScopeTag, Service};

/// A type that knows how to construct itself. Registering an injectable type
/// on a module with [`Module::injectable`](crate::Module::injectable) lets
/// injectors create a binding for it the first time it is requested, without
/// binding it explicitly.
///
/// ```
/// use hierarchical_injector::{BindingSpec, Injectable, Injector, Module, Svc};
///
/// struct Clock;
/// struct Scheduler(Svc<Clock>);
///
/// impl Injectable for Clock {
///     fn implicit_binding() -> BindingSpec {
///         BindingSpec::constructor(|| Clock)
///     }
/// }
///
/// impl Injectable for Scheduler {
///     fn implicit_binding() -> BindingSpec {
///         BindingSpec::constructor(Scheduler)
///     }
/// }
///
/// let mut module = Module::default();
/// module.injectable::<Clock>();
/// module.injectable::<Scheduler>();
///
/// let injector = Injector::create([module]).unwrap();
/// let _scheduler: Svc<Scheduler> = injector.get().unwrap();
/// ```
pub trait Injectable: Service {
    /// How instances of this type are created.
    fn implicit_binding() -> BindingSpec;

    /// The scope created bindings belong to.
    fn scope() -> Option<ScopeTag> {
        None
    }
}
