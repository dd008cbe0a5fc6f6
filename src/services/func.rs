use crate::{
    Dependency, DynSvc, InjectError, InjectResult, Injector, Key, Provider,
    RequestInfo, Service, Svc,
};
use std::marker::PhantomData;

/// A function that constructs a service from its dependencies. All functions
/// of arity 12 or less are constructor functions if each of their arguments
/// is a valid [`Dependency`] and their return value is a valid service type.
///
/// ## Type parameters
/// * `D` - Tuple of this service's dependencies.
///
/// ## Example
///
/// ```
/// use hierarchical_injector::{ConstructorFn, Key, Svc};
///
/// struct Foo;
/// struct Bar(Svc<Foo>);
///
/// fn keys<D, F: ConstructorFn<D>>(_: &F) -> Vec<Key> {
///     F::dependencies()
/// }
///
/// assert_eq!(vec![Key::of::<Foo>()], keys(&Bar));
/// ```
pub trait ConstructorFn<D>: Service {
    /// The resulting service from invoking this function.
    type Result: Service;

    /// The keys of this function's parameters, in order.
    fn dependencies() -> Vec<Key>;

    /// Invokes this function with instances of its dependencies, given in
    /// the same order as [`ConstructorFn::dependencies`].
    fn construct(&self, arguments: Vec<DynSvc>) -> InjectResult<Self::Result>;
}

fn next_argument(
    arguments: &mut impl Iterator<Item = DynSvc>,
    key: impl FnOnce() -> Key,
) -> InjectResult<DynSvc> {
    arguments.next().ok_or_else(|| {
        InjectError::construction_failed(key(), "missing constructor argument")
    })
}

macro_rules! impl_constructor_fn {
    () => {
        impl_constructor_fn!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_constructor_fn!(@impl ($first $(, $rest)*));
        impl_constructor_fn!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl<F, R $(, $type_name)*> ConstructorFn<($($type_name,)*)> for F
        where
            F: Service + Fn($($type_name),*) -> R,
            R: Service,
            $($type_name: Dependency,)*
        {
            type Result = R;

            fn dependencies() -> Vec<Key> {
                vec![$(<$type_name as Dependency>::key()),*]
            }

            #[allow(unused_variables, unused_mut)]
            fn construct(&self, arguments: Vec<DynSvc>) -> InjectResult<R> {
                let mut arguments = arguments.into_iter();
                let result = self($(
                    <$type_name as Dependency>::from_instance(
                        next_argument(&mut arguments, Key::of::<R>)?,
                    )?
                ),*);
                Ok(result)
            }
        }
    };
}

impl_constructor_fn!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);

/// A provider backed by a function of the declaring injector.
pub struct FnProvider<F, R>
where
    F: Service + Fn(&Injector) -> InjectResult<R>,
    R: Service,
{
    func: F,
    marker: PhantomData<fn() -> R>,
}

impl<F, R> FnProvider<F, R>
where
    F: Service + Fn(&Injector) -> InjectResult<R>,
    R: Service,
{
    /// Creates a new [`FnProvider`].
    #[must_use]
    pub fn new(func: F) -> Self {
        FnProvider {
            func,
            marker: PhantomData,
        }
    }
}

impl<F, R> Provider for FnProvider<F, R>
where
    F: Service + Fn(&Injector) -> InjectResult<R>,
    R: Service,
{
    fn provide(
        &self,
        injector: &Injector,
        _request_info: &RequestInfo,
    ) -> InjectResult<DynSvc> {
        let result = (self.func)(injector)?;
        Ok(Svc::new(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo;
    struct Bar(Svc<Foo>);
    struct Baz(Svc<Foo>, Injector);

    fn dependencies_of<D, F: ConstructorFn<D>>(_: &F) -> Vec<Key> {
        F::dependencies()
    }

    #[test]
    fn dependencies_follow_parameter_order() {
        assert!(dependencies_of(&|| Foo).is_empty());
        assert_eq!(vec![Key::of::<Foo>()], dependencies_of(&Bar));
        assert_eq!(
            vec![Key::of::<Foo>(), Key::of::<Injector>()],
            dependencies_of(&Baz)
        );
    }

    #[test]
    fn construct_downcasts_arguments() {
        let foo = Svc::new(Foo);
        let bar = Bar.construct(vec![foo.clone() as DynSvc]).unwrap();
        assert!(Svc::ptr_eq(&foo, &bar.0));
    }

    #[test]
    fn construct_reports_missing_arguments() {
        assert!(Bar.construct(Vec::new()).is_err());
    }
}
