use crate::{
    node::{Node, NodeId},
    Binding, BindingSpec, ErrorKind, Frame, InjectError,
    InjectResult, Key, Origin, Source, Svc,
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, trace};

/// Resolves `key` from `node` to a binding, creating a just-in-time binding
/// if none exists yet.
pub(crate) fn resolve(node: &Arc<Node>, key: &Key) -> InjectResult<Svc<Binding>> {
    if let Some(binding) = node.lookup(key) {
        return Ok(binding);
    }

    let tree = node.tree().clone();
    let _guard = tree.lock();
    let mut transaction = Transaction::default();
    let binding = resolve_locked(&mut transaction, node, key)?;
    trace!(
        key = %key,
        attempts = transaction.attempts,
        "resolved just-in-time binding"
    );
    transaction.commit();
    Ok(binding)
}

struct Staged {
    node: Arc<Node>,
    key: Key,
    binding: Svc<Binding>,
}

/// Bindings created during one resolution. Nothing is published to the
/// tree until the whole resolution succeeds.
///
/// Placements that failed without running into another staged binding are
/// remembered, since they fail the same way for the rest of the resolution.
#[derive(Default)]
struct Transaction {
    staged: Vec<Staged>,
    failed: HashSet<(NodeId, Key)>,
    staged_conflicts: usize,
    attempts: usize,
}

impl Transaction {
    fn lookup(&self, node: &Arc<Node>, key: &Key) -> Option<Svc<Binding>> {
        node.path().find_map(|node| {
            self.staged
                .iter()
                .find(|staged| staged.node.id() == node.id() && staged.key == *key)
                .map(|staged| staged.binding.clone())
        })
    }

    /// Where bindings of `key` were staged below `node`.
    fn staged_below(&self, node: &Node, key: &Key) -> Vec<Source> {
        self.staged
            .iter()
            .filter(|staged| staged.key == *key && staged.node.is_descendant_of(node))
            .map(|staged| staged.binding.source())
            .collect()
    }

    fn stage(&mut self, node: &Arc<Node>, key: &Key, binding: Svc<Binding>) {
        self.staged.push(Staged {
            node: node.clone(),
            key: key.clone(),
            binding,
        });
    }

    fn has_failed(&self, node: &Node, key: &Key) -> bool {
        self.failed.contains(&(node.id(), key.clone()))
    }

    fn savepoint(&self) -> usize {
        self.staged.len()
    }

    fn rollback(&mut self, savepoint: usize) {
        self.staged.truncate(savepoint);
    }

    fn commit(self) {
        for Staged { node, key, binding } in self.staged {
            debug!(
                key = %key,
                node = %node.id(),
                origin = %binding.origin(),
                "created binding"
            );

            for ancestor in node.ancestors() {
                ancestor.claim(key.clone(), &node, binding.source());
            }

            node.insert_jit(key, binding);
        }
    }
}

fn resolve_locked(
    transaction: &mut Transaction,
    node: &Arc<Node>,
    key: &Key,
) -> InjectResult<Svc<Binding>> {
    if let Some(binding) = node.lookup(key) {
        return Ok(binding);
    }

    if let Some(binding) = transaction.lookup(node, key) {
        return Ok(binding);
    }

    create_jit(transaction, node, key)
}

/// Creates a binding for an unbound key. The binding is placed at the
/// root-most node on the path where it can be created in full; the attempt
/// at `node` itself comes last and decides the reported error.
fn create_jit(
    transaction: &mut Transaction,
    node: &Arc<Node>,
    key: &Key,
) -> InjectResult<Svc<Binding>> {
    if key.qualifier().is_some() {
        if let Some(converted) = convert(transaction, node, key) {
            return converted;
        }
    }

    if node.jit_disabled() {
        return Err(InjectError::new(ErrorKind::JitDisabled { key: key.clone() }));
    }

    let mut candidates: Vec<_> = node.ancestors().collect();
    candidates.reverse();
    for candidate in candidates {
        if transaction.has_failed(candidate, key) {
            continue;
        }

        match attempt(transaction, candidate, key) {
            Ok(binding) => return Ok(binding),
            Err(error) => {
                trace!(
                    key = %key,
                    node = %candidate.id(),
                    reason = %error.kind(),
                    "discarded just-in-time placement"
                );
            }
        }
    }

    attempt(transaction, node, key)
}

/// Tries to place `key` at `node`, undoing everything staged by the attempt
/// if it fails.
fn attempt(
    transaction: &mut Transaction,
    node: &Arc<Node>,
    key: &Key,
) -> InjectResult<Svc<Binding>> {
    transaction.attempts += 1;
    let savepoint = transaction.savepoint();
    let staged_conflicts = transaction.staged_conflicts;
    let result = create_jit_at(transaction, node, key);
    if result.is_err() {
        transaction.rollback(savepoint);
        if transaction.staged_conflicts == staged_conflicts {
            transaction.failed.insert((node.id(), key.clone()));
        }
    }

    result
}

fn check_unclaimed(
    transaction: &mut Transaction,
    node: &Node,
    key: &Key,
) -> InjectResult<()> {
    let mut sources = node.live_claims(key);
    let staged = transaction.staged_below(node, key);
    if !staged.is_empty() {
        transaction.staged_conflicts += 1;
    }

    sources.extend(staged);
    if sources.is_empty() {
        Ok(())
    } else {
        Err(InjectError::new(ErrorKind::ChildBlocksParent {
            key: key.clone(),
            sources,
        }))
    }
}

fn create_jit_at(
    transaction: &mut Transaction,
    node: &Arc<Node>,
    key: &Key,
) -> InjectResult<Svc<Binding>> {
    check_unclaimed(transaction, node, key)?;

    let declaration = node.implicit_declaration(key).ok_or_else(|| {
        InjectError::new(ErrorKind::UnresolvableDependency { key: key.clone() })
    })?;
    let source = declaration.source;

    declaration
        .spec
        .validate(key, declaration.scope.as_ref())
        .map_err(|kind| InjectError::new(kind).within(Frame::At(source)))?;

    let scope = match declaration.scope {
        Some(tag) => {
            let entry = node.find_scope(&tag).ok_or_else(|| {
                InjectError::new(ErrorKind::UnresolvedScope { tag: tag.clone() })
                    .within(Frame::At(source))
            })?;
            Some((tag, entry.scope))
        }
        None => None,
    };

    let binding = Svc::new(Binding::new(
        key.clone(),
        declaration.spec,
        scope,
        source,
        Origin::JustInTime,
        Arc::downgrade(node),
    ));

    // Staged before its dependencies so that cycles resolve to it.
    transaction.stage(node, key, binding.clone());
    for dependency in binding.spec().dependencies() {
        resolve_locked(transaction, node, &dependency).map_err(|error| {
            error
                .within(Frame::Locating(dependency.clone()))
                .within(Frame::At(source))
        })?;
    }

    Ok(binding)
}

/// Converts a string constant bound under the same qualifier as `key`.
/// Returns [`None`] if there is nothing to convert.
fn convert(
    transaction: &mut Transaction,
    node: &Arc<Node>,
    key: &Key,
) -> Option<InjectResult<Svc<Binding>>> {
    let string_binding = node.explicit_binding(&key.with_type::<String>())?;
    let BindingSpec::Instance(instance) = string_binding.spec() else {
        return None;
    };
    let value = instance.clone().downcast_arc::<String>().ok()?;

    let converters: Vec<_> = node
        .converters_to_root()
        .into_iter()
        .filter(|registration| registration.converter.converts(key))
        .collect();

    let converter = match converters.as_slice() {
        [] => return None,
        [converter] => converter,
        _ => {
            return Some(Err(InjectError::new(ErrorKind::ConverterConflict {
                key: key.clone(),
                sources: converters
                    .iter()
                    .map(|registration| registration.source)
                    .collect(),
            })))
        }
    };

    let result = converter
        .converter
        .convert(&value, key)
        .map_err(|reason| {
            InjectError::new(ErrorKind::ConversionFailed {
                key: key.clone(),
                value: value.to_string(),
                reason: reason.to_string(),
            })
            .within(Frame::At(converter.source))
        })
        .and_then(|converted| {
            check_unclaimed(transaction, node, key)?;
            let binding = Svc::new(Binding::new(
                key.clone(),
                BindingSpec::Instance(converted),
                None,
                string_binding.source(),
                Origin::Converted,
                Arc::downgrade(node),
            ));
            transaction.stage(node, key, binding.clone());
            Ok(binding)
        });

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BindingSpec, Injectable, Injector, Module};

    struct Context;

    struct Step1(#[allow(dead_code)] Svc<Step2>);
    struct Step2(#[allow(dead_code)] Svc<Step3>);
    struct Step3(#[allow(dead_code)] Svc<Context>);

    impl Injectable for Step1 {
        fn implicit_binding() -> BindingSpec {
            BindingSpec::constructor(Step1)
        }
    }

    impl Injectable for Step2 {
        fn implicit_binding() -> BindingSpec {
            BindingSpec::constructor(Step2)
        }
    }

    impl Injectable for Step3 {
        fn implicit_binding() -> BindingSpec {
            BindingSpec::constructor(Step3)
        }
    }

    fn steps() -> Module {
        let mut module = Module::default();
        module.injectable::<Step1>();
        module.injectable::<Step2>();
        module.injectable::<Step3>();
        module
    }

    #[test]
    fn failed_placements_are_not_retried() {
        let root = Injector::create([steps()]).unwrap();
        let first = root.child_builder().build().unwrap();
        let second = first.child_builder().build().unwrap();
        let mut builder = second.child_builder();
        builder.bind(Key::of::<Context>(), BindingSpec::instance(Context));
        let leaf = builder.build().unwrap();

        let mut transaction = Transaction::default();
        resolve_locked(&mut transaction, leaf.node(), &Key::of::<Step1>())
            .unwrap();

        // The steps and the context each fail once on every upper injector,
        // then the steps succeed on the leaf.
        assert_eq!(4 * 3 + 3, transaction.attempts);
        assert!(transaction.has_failed(root.node(), &Key::of::<Step3>()));
        assert!(transaction.has_failed(second.node(), &Key::of::<Step1>()));
        assert_eq!(3, transaction.staged.len());
        assert!(transaction
            .staged
            .iter()
            .all(|staged| staged.node.id() == leaf.node().id()));
    }

    #[test]
    fn conflicts_with_staged_bindings_are_not_remembered() {
        let root = Injector::builder().build().unwrap();
        let child = root.child_builder().build().unwrap();

        let mut transaction = Transaction::default();
        let binding = Svc::new(Binding::new(
            Key::of::<Context>(),
            BindingSpec::instance(Context),
            None,
            Source::caller(),
            Origin::JustInTime,
            Arc::downgrade(child.node()),
        ));
        transaction.stage(child.node(), &Key::of::<Context>(), binding);

        let error = attempt(&mut transaction, root.node(), &Key::of::<Context>())
            .unwrap_err();
        assert!(matches!(error.kind(), ErrorKind::ChildBlocksParent { .. }));
        assert!(!transaction.has_failed(root.node(), &Key::of::<Context>()));
        assert_eq!(1, transaction.staged.len());
    }
}
