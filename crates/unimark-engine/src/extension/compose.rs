use std::collections::{HashMap, HashSet};
use std::fmt;

use log::{debug, trace};

use super::{ExtensionRef, Payload, TransformRef, identity};
use crate::editor::{Grammar, GrammarBuilder, GrammarFragment};
use crate::error::ConfigurationError;
use crate::mdast::NodeKind;

/// Keymaps and input rules gathered from every composed extension.
#[derive(Clone, Default)]
pub struct AuxBindings {
    keymap: Vec<(String, Payload)>,
    input_rules: Vec<Payload>,
}

impl AuxBindings {
    /// The command bound to `key`, from the first extension that bound it.
    pub fn key(&self, key: &str) -> Option<&Payload> {
        self.keymap.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }

    /// Bound keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keymap.iter().map(|(k, _)| k.as_str())
    }

    pub fn input_rules(&self) -> &[Payload] {
        &self.input_rules
    }

    fn bind(&mut self, key: String, payload: Payload) -> bool {
        if self.key(&key).is_some() {
            return false;
        }
        self.keymap.push((key, payload));
        true
    }
}

impl fmt::Debug for AuxBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuxBindings")
            .field("keymap", &self.keys().collect::<Vec<_>>())
            .field("input_rules", &self.input_rules.len())
            .finish()
    }
}

/// Everything a set of extensions composes into. Read-only once built.
pub struct Composition {
    grammar: Grammar,
    down: HashMap<NodeKind, ExtensionRef>,
    up: HashMap<String, ExtensionRef>,
    bindings: AuxBindings,
    transforms: Vec<TransformRef>,
    extensions: Vec<ExtensionRef>,
}

impl Composition {
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The extension converting external nodes of `kind` down.
    pub fn down(&self, kind: &NodeKind) -> Option<&ExtensionRef> {
        self.down.get(kind)
    }

    /// The extension converting editor nodes or marks named `type_name` up.
    pub fn up(&self, type_name: &str) -> Option<&ExtensionRef> {
        self.up.get(type_name)
    }

    /// External kinds with a down converter, sorted.
    pub fn down_kinds(&self) -> Vec<&NodeKind> {
        let mut kinds: Vec<_> = self.down.keys().collect();
        kinds.sort();
        kinds
    }

    /// Editor type names with an up converter, sorted.
    pub fn up_types(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.up.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn bindings(&self) -> &AuxBindings {
        &self.bindings
    }

    /// Transforms in the order their extensions were visited.
    pub fn transforms(&self) -> &[TransformRef] {
        &self.transforms
    }

    /// Every composed extension, in visit order.
    pub fn extensions(&self) -> &[ExtensionRef] {
        &self.extensions
    }
}

impl fmt::Debug for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composition")
            .field("extensions", &self.extensions.iter().map(|e| e.name()).collect::<Vec<_>>())
            .field("down", &self.down_kinds())
            .field("up", &self.up_types())
            .field("bindings", &self.bindings)
            .field("transforms", &self.transforms.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Resolves the dependency closure of `requested` and merges it.
///
/// Traversal is depth-first and pre-order: an extension registers before its
/// dependencies, and requested extensions register in the order given. An
/// extension reached again (by identity) is skipped. Keymaps keep the first
/// binding of a key; input rules and transforms concatenate in visit order.
pub fn compose(requested: &[ExtensionRef]) -> Result<Composition, ConfigurationError> {
    let mut composer = Composer::default();
    for ext in requested {
        composer.visit(ext)?;
    }
    composer.finish()
}

#[derive(Default)]
struct Composer {
    visited: HashSet<usize>,
    stack: Vec<ExtensionRef>,
    order: Vec<ExtensionRef>,
    grammar: GrammarBuilder,
    down: HashMap<NodeKind, ExtensionRef>,
    up: HashMap<String, ExtensionRef>,
    bindings: AuxBindings,
    transforms: Vec<TransformRef>,
}

impl Composer {
    fn visit(&mut self, ext: &ExtensionRef) -> Result<(), ConfigurationError> {
        let id = identity(ext);
        if let Some(at) = self.stack.iter().position(|e| identity(e) == id) {
            let mut cycle: Vec<String> = self.stack[at..].iter().map(|e| e.name().to_string()).collect();
            cycle.push(ext.name().to_string());
            return Err(ConfigurationError::DependencyCycle { cycle });
        }
        if !self.visited.insert(id) {
            trace!("Extension '{}' already composed, skipping", ext.name());
            return Ok(());
        }

        self.register(ext)?;

        self.stack.push(ext.clone());
        for dep in ext.dependencies() {
            self.visit(&dep)?;
        }
        self.stack.pop();
        Ok(())
    }

    fn register(&mut self, ext: &ExtensionRef) -> Result<(), ConfigurationError> {
        let editor_type = ext.editor_type().map(str::to_string);
        let fragment = ext.grammar_fragment();
        let external_kind = ext.external_kind();

        if editor_type.is_some() != fragment.is_some() {
            return Err(ConfigurationError::MissingGrammarFragment {
                extension: ext.name().to_string(),
            });
        }

        if let Some(name) = &editor_type
            && let Some(owner) = self.up.get(name)
        {
            return Err(ConfigurationError::DuplicateEditorType {
                name: name.clone(),
                first: owner.name().to_string(),
                second: ext.name().to_string(),
            });
        }
        if let Some(kind) = &external_kind
            && let Some(owner) = self.down.get(kind)
        {
            return Err(ConfigurationError::DuplicateExternalType {
                kind: kind.clone(),
                first: owner.name().to_string(),
                second: ext.name().to_string(),
            });
        }

        if external_kind == Some(NodeKind::Root) {
            match (&editor_type, &fragment) {
                (Some(name), Some(GrammarFragment::Node(_))) => self.grammar.set_top(name.clone()),
                _ => {
                    return Err(ConfigurationError::MissingTopNode {
                        extension: ext.name().to_string(),
                    });
                }
            }
        }

        if let (Some(name), Some(fragment)) = (&editor_type, fragment) {
            match fragment {
                GrammarFragment::Node(spec) => self.grammar.add_node(name.clone(), spec),
                GrammarFragment::Mark(spec) => self.grammar.add_mark(name.clone(), spec),
            }
            self.up.insert(name.clone(), ext.clone());
        }
        if let Some(kind) = &external_kind {
            self.down.insert(kind.clone(), ext.clone());
        }

        for (key, payload) in ext.keymap() {
            if !self.bindings.bind(key.clone(), payload) {
                trace!("Key '{key}' from '{}' shadowed by an earlier binding", ext.name());
            }
        }
        self.bindings.input_rules.extend(ext.input_rules());
        self.transforms.extend(ext.transforms());

        debug!(
            "Registered extension '{}' (external: {}, editor: {})",
            ext.name(),
            external_kind.as_ref().map_or("-", NodeKind::as_str),
            editor_type.as_deref().unwrap_or("-"),
        );
        self.order.push(ext.clone());
        Ok(())
    }

    fn finish(self) -> Result<Composition, ConfigurationError> {
        let grammar = self.grammar.build()?;
        debug!(
            "Composed {} extensions: {} node types, {} mark types, {} transforms",
            self.order.len(),
            grammar.node_types().count(),
            grammar.mark_types().count(),
            self.transforms.len(),
        );
        Ok(Composition {
            grammar,
            down: self.down,
            up: self.up,
            bindings: self.bindings,
            transforms: self.transforms,
            extensions: self.order,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::editor::{MarkSpec, NodeSpec};
    use crate::extension::Extension;
    use pretty_assertions::assert_eq;

    /// Test extension with late-bound dependencies so cycles can be built.
    #[derive(Default)]
    struct Stub {
        name: &'static str,
        kind: Option<NodeKind>,
        editor: Option<&'static str>,
        fragment: Option<GrammarFragment>,
        deps: Mutex<Vec<ExtensionRef>>,
        keys: Vec<&'static str>,
    }

    impl Extension for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn external_kind(&self) -> Option<NodeKind> {
            self.kind.clone()
        }
        fn editor_type(&self) -> Option<&str> {
            self.editor
        }
        fn grammar_fragment(&self) -> Option<GrammarFragment> {
            self.fragment.clone()
        }
        fn dependencies(&self) -> Vec<ExtensionRef> {
            self.deps.lock().map(|d| d.clone()).unwrap_or_default()
        }
        fn keymap(&self) -> Vec<(String, Payload)> {
            self.keys
                .iter()
                .map(|k| (k.to_string(), Arc::new(self.name) as Payload))
                .collect()
        }
    }

    fn node(name: &'static str, kind: &str, content: Option<&str>) -> Arc<Stub> {
        let spec = match content {
            Some(expr) => NodeSpec::with_content(expr),
            None => NodeSpec::leaf(),
        };
        Arc::new(Stub {
            name,
            kind: Some(NodeKind::from(kind)),
            editor: Some(name),
            fragment: Some(GrammarFragment::Node(spec)),
            ..Stub::default()
        })
    }

    fn with_deps(ext: Arc<Stub>, deps: Vec<ExtensionRef>) -> ExtensionRef {
        if let Ok(mut d) = ext.deps.lock() {
            *d = deps;
        }
        ext
    }

    fn names(c: &Composition) -> Vec<&str> {
        c.extensions().iter().map(|e| e.name()).collect()
    }

    #[test]
    fn dependency_closure_is_idempotent() {
        let text: ExtensionRef = node("text", "text", None);
        let para = with_deps(node("paragraph", "paragraph", Some("text*")), vec![text.clone()]);

        let alone = compose(&[para.clone()]).unwrap();
        let both = compose(&[text.clone(), para.clone()]).unwrap();

        assert_eq!(alone.up_types(), both.up_types());
        assert_eq!(alone.down_kinds(), both.down_kinds());
        assert_eq!(names(&alone), ["paragraph", "text"]);
        assert_eq!(names(&both), ["text", "paragraph"]);
    }

    #[test]
    fn repeated_composition_is_deterministic() {
        let text: ExtensionRef = node("text", "text", None);
        let doc = with_deps(node("doc", "root", Some("text*")), vec![text]);
        let a = compose(&[doc.clone()]).unwrap();
        let b = compose(&[doc]).unwrap();
        assert_eq!(a.up_types(), b.up_types());
        assert_eq!(a.down_kinds(), b.down_kinds());
        assert_eq!(a.grammar().top_node().map(|t| t.name()), Some("doc"));
    }

    #[test]
    fn cycle_is_reported_with_names() {
        let a = node("a", "a", None);
        let b = node("b", "b", None);
        let a_ref: ExtensionRef = a.clone();
        let b_ref = with_deps(b, vec![a_ref.clone()]);
        with_deps(a, vec![b_ref]);

        assert_eq!(
            compose(&[a_ref]).unwrap_err(),
            ConfigurationError::DependencyCycle {
                cycle: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn distinct_instances_claiming_one_type_conflict() {
        let first: ExtensionRef = node("paragraph", "paragraph", Some(""));
        let second: ExtensionRef = node("paragraph", "paragraph", Some(""));
        assert!(matches!(
            compose(&[first.clone(), second]),
            Err(ConfigurationError::DuplicateEditorType { .. })
        ));
        assert!(compose(&[first.clone(), first]).is_ok());
    }

    #[test]
    fn external_kind_conflict_names_both_extensions() {
        let a: ExtensionRef = node("a", "html", None);
        let b: ExtensionRef = node("b", "html", None);
        assert_eq!(
            compose(&[a, b]).unwrap_err(),
            ConfigurationError::DuplicateExternalType {
                kind: NodeKind::Html,
                first: "a".into(),
                second: "b".into()
            }
        );
    }

    #[test]
    fn first_registered_key_binding_wins() {
        let first: ExtensionRef = Arc::new(Stub {
            name: "first",
            keys: vec!["Tab", "Mod-b"],
            ..Stub::default()
        });
        let second: ExtensionRef = Arc::new(Stub {
            name: "second",
            keys: vec!["Tab", "Shift-Tab"],
            ..Stub::default()
        });
        let c = compose(&[first, second]).unwrap();
        assert_eq!(c.bindings().keys().collect::<Vec<_>>(), ["Tab", "Mod-b", "Shift-Tab"]);
        let owner = c.bindings().key("Tab").and_then(|p| p.downcast_ref::<&'static str>());
        assert_eq!(owner, Some(&"first"));
    }

    #[test]
    fn editor_type_without_fragment_is_rejected() {
        let ext: ExtensionRef = Arc::new(Stub {
            name: "half",
            editor: Some("half"),
            ..Stub::default()
        });
        assert_eq!(
            compose(&[ext]).unwrap_err(),
            ConfigurationError::MissingGrammarFragment {
                extension: "half".into()
            }
        );
    }

    #[test]
    fn root_converter_needs_a_node_type() {
        let ext: ExtensionRef = Arc::new(Stub {
            name: "weird_root",
            kind: Some(NodeKind::Root),
            editor: Some("weird_root"),
            fragment: Some(GrammarFragment::Mark(MarkSpec::default())),
            ..Stub::default()
        });
        assert_eq!(
            compose(&[ext]).unwrap_err(),
            ConfigurationError::MissingTopNode {
                extension: "weird_root".into()
            }
        );
    }

    #[test]
    fn unknown_content_name_surfaces_at_composition() {
        let doc: ExtensionRef = node("doc", "root", Some("section+"));
        assert!(matches!(
            compose(&[doc]),
            Err(ConfigurationError::UnknownContentName { .. })
        ));
    }
}
