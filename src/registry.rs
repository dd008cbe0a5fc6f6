use crate::{
    errors::Errors,
    module::ScopeRegistration,
    node::{is_builtin, Node, NodeParts, ScopeEntry, Tree},
    CreationError, Declaration, ErrorKind, ErrorMessage, Frame, Key, Module,
    ScopeTag, Singleton, Source, Svc,
};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

/// Validates a module against the tree and creates a node from it. Every
/// problem with the module is reported, not just the first one found.
pub(crate) fn create_node(
    parent: Option<Arc<Node>>,
    module: Module,
    require_explicit_bindings: bool,
) -> Result<Arc<Node>, CreationError> {
    let tree = parent
        .as_ref()
        .map_or_else(|| Arc::new(Tree::default()), |parent| parent.tree().clone());
    let _guard = tree.lock();

    let Module {
        bindings,
        implicit,
        scopes,
        hooks,
        converters,
    } = module;

    let mut errors = Errors::default();
    let scopes = register_scopes(parent.is_none(), scopes, &mut errors);
    let explicit = check_bindings(parent.as_ref(), bindings, &scopes, &mut errors);
    if !errors.is_empty() {
        return Err(errors.into_error());
    }

    let jit_disabled = require_explicit_bindings
        || parent.as_ref().map_or(false, |parent| parent.jit_disabled());
    let node = Node::new(NodeParts {
        parent,
        tree: tree.clone(),
        jit_disabled,
        explicit,
        scopes,
        implicit: implicit
            .into_iter()
            .map(|declaration| (declaration.key.clone(), declaration))
            .collect(),
        hooks,
        converters,
    });

    for binding in node.explicit_bindings() {
        for ancestor in node.ancestors() {
            ancestor.claim(binding.key().clone(), &node, binding.source());
        }
    }

    debug!(
        node = %node.id(),
        depth = node.depth(),
        bindings = node.explicit_bindings().count(),
        jit_disabled,
        "created injector"
    );
    Ok(node)
}

fn register_scopes(
    is_root: bool,
    registrations: Vec<ScopeRegistration>,
    errors: &mut Errors,
) -> HashMap<ScopeTag, ScopeEntry> {
    let mut order = Vec::new();
    let mut grouped: HashMap<ScopeTag, Vec<ScopeEntry>> = HashMap::new();

    let builtin = is_root.then(|| ScopeRegistration {
        tag: ScopeTag::singleton(),
        scope: Svc::new(Singleton),
        source: Source::Builtin,
    });

    for registration in builtin.into_iter().chain(registrations) {
        let entries = grouped.entry(registration.tag.clone()).or_default();
        if entries.is_empty() {
            order.push(registration.tag);
        }

        entries.push(ScopeEntry {
            scope: registration.scope,
            source: registration.source,
        });
    }

    let mut scopes = HashMap::new();
    for tag in order {
        let Some(entries) = grouped.remove(&tag) else {
            continue;
        };

        if entries.len() > 1 {
            errors.push(ErrorMessage::new(ErrorKind::DuplicateScope {
                tag: tag.clone(),
                sources: entries.iter().map(|entry| entry.source).collect(),
            }));
        }

        if let Some(first) = entries.into_iter().next() {
            scopes.insert(tag, first);
        }
    }

    scopes
}

fn check_bindings(
    parent: Option<&Arc<Node>>,
    declarations: Vec<Declaration>,
    scopes: &HashMap<ScopeTag, ScopeEntry>,
    errors: &mut Errors,
) -> Vec<(Declaration, Option<ScopeEntry>)> {
    let mut order: Vec<Key> = Vec::new();
    let mut grouped: HashMap<Key, Vec<Declaration>> = HashMap::new();
    for declaration in declarations {
        let entries = grouped.entry(declaration.key.clone()).or_default();
        if entries.is_empty() {
            order.push(declaration.key.clone());
        }

        entries.push(declaration);
    }

    let mut checked = Vec::new();
    for key in order {
        let Some(mut declarations) = grouped.remove(&key) else {
            continue;
        };

        if declarations.len() > 1 {
            errors.push(ErrorMessage::new(ErrorKind::DuplicateBinding {
                key,
                sources: declarations
                    .iter()
                    .map(|declaration| declaration.source)
                    .collect(),
            }));
            continue;
        }

        let Some(declaration) = declarations.pop() else {
            continue;
        };

        if let Some(message) = check_ancestors(parent, &declaration) {
            errors.push(message);
            continue;
        }

        if let Err(kind) = declaration
            .spec
            .validate(&declaration.key, declaration.scope.as_ref())
        {
            errors.push(
                ErrorMessage::new(kind).within(Frame::At(declaration.source)),
            );
        }

        let scope = match &declaration.scope {
            Some(tag) => {
                let entry = scopes.get(tag).cloned().or_else(|| {
                    parent.and_then(|parent| parent.find_scope(tag))
                });
                if entry.is_none() {
                    errors.push(
                        ErrorMessage::new(ErrorKind::UnresolvedScope {
                            tag: tag.clone(),
                        })
                        .within(Frame::At(declaration.source)),
                    );
                }

                entry
            }
            None => None,
        };

        checked.push((declaration, scope));
    }

    checked
}

/// Checks a declaration against the bindings of the new node's ancestors.
fn check_ancestors(
    parent: Option<&Arc<Node>>,
    declaration: &Declaration,
) -> Option<ErrorMessage> {
    let key = &declaration.key;
    if is_builtin(key) {
        return Some(
            ErrorMessage::new(ErrorKind::BuiltinKey { key: key.clone() })
                .within(Frame::At(declaration.source)),
        );
    }

    let parent = parent?;
    if let Some(existing) = parent.explicit_binding(key) {
        return Some(ErrorMessage::new(ErrorKind::DuplicateBinding {
            key: key.clone(),
            sources: vec![existing.source(), declaration.source],
        }));
    }

    parent
        .path()
        .find_map(|ancestor| ancestor.jit_binding(key))
        .map(|jit| {
            ErrorMessage::new(ErrorKind::ParentBlocksChild {
                key: key.clone(),
                jit_source: jit.source(),
                source: declaration.source,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BindingSpec;

    struct Foo;

    fn declaration(key: Key, spec: BindingSpec) -> Declaration {
        Declaration {
            key,
            spec,
            scope: None,
            source: Source::caller(),
        }
    }

    #[test]
    fn root_registers_singleton_scope() {
        let mut errors = Errors::default();
        let scopes = register_scopes(true, Vec::new(), &mut errors);
        assert!(errors.is_empty());
        assert!(scopes.contains_key(&ScopeTag::singleton()));

        let scopes = register_scopes(false, Vec::new(), &mut errors);
        assert!(scopes.is_empty());
    }

    #[test]
    fn duplicate_scope_is_reported_once() {
        let registration = || ScopeRegistration {
            tag: ScopeTag::named("request"),
            scope: Svc::new(Singleton),
            source: Source::caller(),
        };

        let mut errors = Errors::default();
        let scopes = register_scopes(
            false,
            vec![registration(), registration(), registration()],
            &mut errors,
        );

        assert_eq!(1, scopes.len());
        let error = errors.into_error();
        assert_eq!(1, error.messages().len());
        assert_eq!(3, error.messages()[0].kind().sources().len());
    }

    #[test]
    fn duplicate_bindings_are_grouped_by_key() {
        let mut errors = Errors::default();
        let checked = check_bindings(
            None,
            vec![
                declaration(Key::of::<Foo>(), BindingSpec::instance(Foo)),
                declaration(Key::of::<u8>(), BindingSpec::instance(1_u8)),
                declaration(Key::of::<Foo>(), BindingSpec::instance(Foo)),
            ],
            &HashMap::new(),
            &mut errors,
        );

        assert_eq!(1, checked.len());
        let error = errors.into_error();
        assert_eq!(1, error.messages().len());
        assert!(matches!(
            error.messages()[0].kind(),
            ErrorKind::DuplicateBinding { sources, .. } if sources.len() == 2
        ));
    }

    #[test]
    fn builtin_key_cannot_be_bound() {
        let mut errors = Errors::default();
        check_bindings(
            None,
            vec![declaration(
                Key::named::<crate::Injector>("other"),
                BindingSpec::to::<Foo>(),
            )],
            &HashMap::new(),
            &mut errors,
        );

        let error = errors.into_error();
        assert!(matches!(
            error.messages()[0].kind(),
            ErrorKind::BuiltinKey { .. }
        ));
    }
}
