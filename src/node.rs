use crate::{
    module::ConverterRegistration, Binding, Declaration, InstanceHook, Key,
    Origin, Scope, ScopeTag, ServiceInfo, Source, Svc, Injector,
};
use derive_more::Display;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::{
    collections::HashMap,
    iter::successors,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

/// Unique identity of an injector.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Display)]
#[display(fmt = "#{}", _0)]
pub(crate) struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// State shared by every injector in one hierarchy. Creating an injector and
/// creating just-in-time bindings both happen while holding the tree lock,
/// so conflict checks always see a consistent tree.
#[derive(Default)]
pub(crate) struct Tree {
    lock: Mutex<()>,
}

impl Tree {
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }
}

#[derive(Clone)]
pub(crate) struct ScopeEntry {
    pub scope: Svc<dyn Scope>,
    pub source: Source,
}

struct Claim {
    node: Weak<Node>,
    source: Source,
}

/// Everything a node is created from, already validated.
pub(crate) struct NodeParts {
    pub parent: Option<Arc<Node>>,
    pub tree: Arc<Tree>,
    pub jit_disabled: bool,
    pub explicit: Vec<(Declaration, Option<ScopeEntry>)>,
    pub scopes: HashMap<ScopeTag, ScopeEntry>,
    pub implicit: HashMap<Key, Declaration>,
    pub hooks: Vec<Svc<dyn InstanceHook>>,
    pub converters: Vec<ConverterRegistration>,
}

pub(crate) struct Node {
    id: NodeId,
    depth: usize,
    parent: Option<Arc<Node>>,
    tree: Arc<Tree>,
    jit_disabled: bool,
    explicit: HashMap<Key, Svc<Binding>>,
    jit: RwLock<HashMap<Key, Svc<Binding>>>,
    claims: Mutex<HashMap<Key, Vec<Claim>>>,
    scopes: HashMap<ScopeTag, ScopeEntry>,
    scope_cache: RwLock<HashMap<ScopeTag, ScopeEntry>>,
    implicit: HashMap<Key, Declaration>,
    hooks: Vec<Svc<dyn InstanceHook>>,
    converters: Vec<ConverterRegistration>,
    self_binding: Svc<Binding>,
}

impl Node {
    pub fn new(parts: NodeParts) -> Arc<Node> {
        let depth = parts.parent.as_ref().map_or(0, |parent| parent.depth + 1);
        Arc::new_cyclic(|weak: &Weak<Node>| {
            let explicit = parts
                .explicit
                .into_iter()
                .map(|(declaration, scope)| {
                    let scope = declaration
                        .scope
                        .clone()
                        .zip(scope.map(|entry| entry.scope));
                    let binding = Binding::new(
                        declaration.key.clone(),
                        declaration.spec,
                        scope,
                        declaration.source,
                        Origin::Explicit,
                        weak.clone(),
                    );
                    (declaration.key, Svc::new(binding))
                })
                .collect();

            Node {
                id: NodeId::next(),
                depth,
                parent: parts.parent,
                tree: parts.tree,
                jit_disabled: parts.jit_disabled,
                explicit,
                jit: RwLock::default(),
                claims: Mutex::default(),
                scopes: parts.scopes,
                scope_cache: RwLock::default(),
                implicit: parts.implicit,
                hooks: parts.hooks,
                converters: parts.converters,
                self_binding: Svc::new(Binding::builtin_injector(weak.clone())),
            }
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<&Arc<Node>> {
        self.parent.as_ref()
    }

    pub fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    pub fn jit_disabled(&self) -> bool {
        self.jit_disabled
    }

    /// This node followed by each of its ancestors, ending at the root.
    pub fn path(self: &Arc<Self>) -> impl Iterator<Item = &Arc<Node>> {
        successors(Some(self), |node| node.parent.as_ref())
    }

    /// Each ancestor of this node, starting with its parent.
    pub fn ancestors(&self) -> impl Iterator<Item = &Arc<Node>> {
        successors(self.parent.as_ref(), |node| node.parent.as_ref())
    }

    pub fn is_descendant_of(&self, ancestor: &Node) -> bool {
        self.ancestors().any(|node| node.id == ancestor.id)
    }

    /// A binding owned by this node, without searching ancestors.
    pub fn local_binding(&self, key: &Key) -> Option<Svc<Binding>> {
        if *key == Key::of::<Injector>() {
            return Some(self.self_binding.clone());
        }

        self.explicit
            .get(key)
            .cloned()
            .or_else(|| self.jit_binding(key))
    }

    pub fn jit_binding(&self, key: &Key) -> Option<Svc<Binding>> {
        self.jit.read().get(key).cloned()
    }

    /// The binding this node resolves `key` to, if one already exists.
    pub fn lookup(self: &Arc<Self>, key: &Key) -> Option<Svc<Binding>> {
        self.path().find_map(|node| node.local_binding(key))
    }

    /// The explicit binding of `key` on this node or an ancestor.
    pub fn explicit_binding(self: &Arc<Self>, key: &Key) -> Option<Svc<Binding>> {
        self.path().find_map(|node| node.explicit.get(key).cloned())
    }

    pub fn bindings(&self) -> Vec<Svc<Binding>> {
        let mut bindings = vec![self.self_binding.clone()];
        bindings.extend(self.explicit.values().cloned());
        bindings.extend(self.jit.read().values().cloned());
        bindings
    }

    pub fn explicit_bindings(&self) -> impl Iterator<Item = &Svc<Binding>> {
        self.explicit.values()
    }

    pub fn insert_jit(&self, key: Key, binding: Svc<Binding>) {
        self.jit.write().entry(key).or_insert(binding);
    }

    /// The nearest scope registered for `tag`, searching ancestors. Found
    /// scopes are cached on this node.
    pub fn find_scope(&self, tag: &ScopeTag) -> Option<ScopeEntry> {
        if let Some(entry) = self.scopes.get(tag) {
            return Some(entry.clone());
        }

        if let Some(entry) = self.scope_cache.read().get(tag) {
            return Some(entry.clone());
        }

        let entry = self.parent.as_ref()?.find_scope(tag)?;
        self.scope_cache
            .write()
            .entry(tag.clone())
            .or_insert_with(|| entry.clone());
        Some(entry)
    }

    /// The nearest implicit declaration of `key`.
    pub fn implicit_declaration(self: &Arc<Self>, key: &Key) -> Option<Declaration> {
        self.path()
            .find_map(|node| node.implicit.get(key).cloned())
    }

    /// Hooks registered on this node and its ancestors, root-most first.
    pub fn hooks_to_root(self: &Arc<Self>) -> Vec<Svc<dyn InstanceHook>> {
        let mut path: Vec<_> = self.path().collect();
        path.reverse();
        path.into_iter()
            .flat_map(|node| node.hooks.iter().cloned())
            .collect()
    }

    /// Converters registered on this node and its ancestors, nearest first.
    pub fn converters_to_root(self: &Arc<Self>) -> Vec<ConverterRegistration> {
        self.path()
            .flat_map(|node| node.converters.iter().cloned())
            .collect()
    }

    /// Records that `claimant`, a descendant of this node, binds `key`.
    pub fn claim(&self, key: Key, claimant: &Arc<Node>, source: Source) {
        self.claims.lock().entry(key).or_default().push(Claim {
            node: Arc::downgrade(claimant),
            source,
        });
    }

    /// Where live descendants of this node bind `key`. Claims of dropped
    /// descendants are discarded.
    pub fn live_claims(&self, key: &Key) -> Vec<Source> {
        let mut claims = self.claims.lock();
        let Some(entries) = claims.get_mut(key) else {
            return Vec::new();
        };

        entries.retain(|claim| claim.node.strong_count() > 0);
        let sources: Vec<_> = entries.iter().map(|claim| claim.source).collect();
        if sources.is_empty() {
            claims.remove(key);
        }

        sources
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if self.parent.is_none() {
            return;
        }

        // Every claim this node made is dead by now.
        let keys: Vec<Key> = self
            .explicit
            .keys()
            .chain(self.jit.get_mut().keys())
            .cloned()
            .collect();
        for ancestor in self.ancestors() {
            let mut claims = ancestor.claims.lock();
            for key in &keys {
                if let Some(entries) = claims.get_mut(key) {
                    entries.retain(|claim| claim.node.strong_count() > 0);
                    if entries.is_empty() {
                        claims.remove(key);
                    }
                }
            }
        }
    }
}

/// Whether `key` names the injector type, under any qualifier.
pub(crate) fn is_builtin(key: &Key) -> bool {
    key.service_info() == ServiceInfo::of::<Injector>()
}

#[cfg(test)]
mod tests {
    use crate::{BindingSpec, Injectable, Injector, Key, Svc};

    struct RequestContext;

    struct Handler(#[allow(dead_code)] Svc<RequestContext>);

    impl Injectable for Handler {
        fn implicit_binding() -> BindingSpec {
            BindingSpec::constructor(Handler)
        }
    }

    fn claim_count(injector: &Injector) -> usize {
        injector.node().claims.lock().values().map(Vec::len).sum()
    }

    #[test]
    fn dropped_children_release_explicit_claims() {
        let root = Injector::builder().build().unwrap();
        for _ in 0..1000 {
            let mut builder = root.child_builder();
            builder.bind(
                Key::of::<RequestContext>(),
                BindingSpec::instance(RequestContext),
            );
            let child = builder.build().unwrap();
            assert_eq!(1, claim_count(&root));
            drop(child);
        }

        assert_eq!(0, claim_count(&root));
    }

    #[test]
    fn dropped_grandchildren_release_claims_on_every_ancestor() {
        let root = Injector::builder().build().unwrap();
        let child = root.child_builder().build().unwrap();
        let mut builder = child.child_builder();
        builder.bind(
            Key::of::<RequestContext>(),
            BindingSpec::instance(RequestContext),
        );
        let grandchild = builder.build().unwrap();
        assert_eq!(1, claim_count(&root));
        assert_eq!(1, claim_count(&child));

        drop(grandchild);
        assert_eq!(0, claim_count(&root));
        assert_eq!(0, claim_count(&child));
    }

    #[test]
    fn dropped_children_release_just_in_time_claims() {
        let mut builder = Injector::builder();
        builder.add_module({
            let mut module = crate::Module::default();
            module.injectable::<Handler>();
            module
        });
        let root = builder.build().unwrap();

        let mut builder = root.child_builder();
        builder.bind(
            Key::of::<RequestContext>(),
            BindingSpec::instance(RequestContext),
        );
        let child = builder.build().unwrap();
        child.get::<Handler>().unwrap();
        assert!(child.get_binding(&Key::of::<Handler>()).is_some());
        assert_eq!(2, claim_count(&root));

        drop(child);
        assert_eq!(0, claim_count(&root));

        let mut builder = root.child_builder();
        builder.bind(
            Key::of::<RequestContext>(),
            BindingSpec::instance(RequestContext),
        );
        let child = builder.build().unwrap();
        child.get::<Handler>().unwrap();
        assert_eq!(2, claim_count(&root));
    }

    #[test]
    fn live_children_keep_their_claims() {
        let root = Injector::builder().build().unwrap();
        let mut builder = root.child_builder();
        builder.bind(
            Key::of::<RequestContext>(),
            BindingSpec::instance(RequestContext),
        );
        let kept = builder.build().unwrap();

        let mut builder = root.child_builder();
        builder.bind(
            Key::of::<RequestContext>(),
            BindingSpec::instance(RequestContext),
        );
        drop(builder.build().unwrap());

        assert_eq!(1, claim_count(&root));
        assert_eq!(1, root.node().live_claims(&Key::of::<RequestContext>()).len());
        drop(kept);
        assert_eq!(0, claim_count(&root));
    }
}
