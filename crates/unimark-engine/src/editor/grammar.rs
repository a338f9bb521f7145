//! Node and mark specs, and the merged grammar they compose into.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_json::Value;

use super::{Attrs, ContentExpr, EditorNode, Mark};
use crate::error::{ConfigurationError, SchemaError};

/// Which marks a node allows on its children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MarkPolicy {
    #[default]
    All,
    None,
    Only(Vec<String>),
}

impl MarkPolicy {
    pub fn allows(&self, mark: &str) -> bool {
        match self {
            MarkPolicy::All => true,
            MarkPolicy::None => false,
            MarkPolicy::Only(names) => names.iter().any(|n| n == mark),
        }
    }
}

/// An attribute declaration. Without a default the attribute is required.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrSpec {
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSpec {
    /// Content expression; `None` declares a leaf.
    pub content: Option<String>,
    pub groups: Vec<String>,
    pub inline: bool,
    pub atom: bool,
    pub code: bool,
    pub defining: bool,
    pub marks: MarkPolicy,
    pub attrs: BTreeMap<String, AttrSpec>,
}

impl NodeSpec {
    pub fn leaf() -> Self {
        Self::default()
    }

    pub fn with_content(expr: impl Into<String>) -> Self {
        Self {
            content: Some(expr.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    #[must_use]
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    #[must_use]
    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    #[must_use]
    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    #[must_use]
    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    #[must_use]
    pub fn marks(mut self, policy: MarkPolicy) -> Self {
        self.marks = policy;
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.attrs.insert(
            name.into(),
            AttrSpec {
                default: Some(default.into()),
            },
        );
        self
    }

    #[must_use]
    pub fn required_attr(mut self, name: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), AttrSpec::default());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkSpec {
    pub attrs: BTreeMap<String, AttrSpec>,
    /// Whether typing at the end of the mark extends it.
    pub inclusive: bool,
}

impl Default for MarkSpec {
    fn default() -> Self {
        Self {
            attrs: BTreeMap::new(),
            inclusive: true,
        }
    }
}

impl MarkSpec {
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.attrs.insert(
            name.into(),
            AttrSpec {
                default: Some(default.into()),
            },
        );
        self
    }

    #[must_use]
    pub fn required_attr(mut self, name: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), AttrSpec::default());
        self
    }

    #[must_use]
    pub fn exclusive(mut self) -> Self {
        self.inclusive = false;
        self
    }
}

/// What an extension contributes to the grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum GrammarFragment {
    Node(NodeSpec),
    Mark(MarkSpec),
}

#[derive(Debug, Clone)]
pub struct NodeType {
    name: String,
    spec: NodeSpec,
    content: Option<ContentExpr>,
}

impl NodeType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    pub fn is_leaf(&self) -> bool {
        self.content.is_none()
    }

    pub fn is_inline(&self) -> bool {
        self.spec.inline
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.spec.groups.iter().any(|g| g == group)
    }
}

#[derive(Debug, Clone)]
pub struct MarkType {
    name: String,
    rank: usize,
    spec: MarkSpec,
}

impl MarkType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registration order. Lower ranks sit outermost.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn spec(&self) -> &MarkSpec {
        &self.spec
    }
}

/// Accumulates fragments in registration order, then compiles them.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    nodes: Vec<(String, NodeSpec)>,
    marks: Vec<(String, MarkSpec)>,
    top: Option<String>,
}

impl GrammarBuilder {
    pub fn add_node(&mut self, name: impl Into<String>, spec: NodeSpec) {
        self.nodes.push((name.into(), spec));
    }

    pub fn add_mark(&mut self, name: impl Into<String>, spec: MarkSpec) {
        self.marks.push((name.into(), spec));
    }

    pub fn set_top(&mut self, name: impl Into<String>) {
        self.top = Some(name.into());
    }

    /// Compiles every content expression and checks that each name in it
    /// resolves to a node type or a group.
    pub fn build(self) -> Result<Grammar, ConfigurationError> {
        let known: HashSet<&str> = self
            .nodes
            .iter()
            .flat_map(|(name, spec)| std::iter::once(name.as_str()).chain(spec.groups.iter().map(String::as_str)))
            .collect();

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (name, spec) in &self.nodes {
            let content = match &spec.content {
                None => None,
                Some(expr) => {
                    let parsed = ContentExpr::parse(expr).map_err(|reason| ConfigurationError::InvalidContentExpression {
                        node: name.clone(),
                        expression: expr.clone(),
                        reason,
                    })?;
                    if let Some(unknown) = parsed.names().into_iter().find(|n| !known.contains(n)) {
                        return Err(ConfigurationError::UnknownContentName {
                            node: name.clone(),
                            name: unknown.to_string(),
                        });
                    }
                    Some(parsed)
                }
            };
            nodes.push(NodeType {
                name: name.clone(),
                spec: spec.clone(),
                content,
            });
        }

        let node_index = nodes.iter().enumerate().map(|(i, n)| (n.name.clone(), i)).collect();
        let marks: Vec<MarkType> = self
            .marks
            .into_iter()
            .enumerate()
            .map(|(rank, (name, spec))| MarkType { name, rank, spec })
            .collect();
        let mark_index = marks.iter().enumerate().map(|(i, m)| (m.name.clone(), i)).collect();

        Ok(Grammar {
            nodes,
            node_index,
            marks,
            mark_index,
            top: self.top,
        })
    }
}

/// The merged grammar: every node and mark type of a composition.
#[derive(Debug, Clone)]
pub struct Grammar {
    nodes: Vec<NodeType>,
    node_index: HashMap<String, usize>,
    marks: Vec<MarkType>,
    mark_index: HashMap<String, usize>,
    top: Option<String>,
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.node_index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn mark_type(&self, name: &str) -> Option<&MarkType> {
        self.mark_index.get(name).map(|&i| &self.marks[i])
    }

    /// Node types in registration order.
    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes.iter()
    }

    /// Mark types in rank order.
    pub fn mark_types(&self) -> impl Iterator<Item = &MarkType> {
        self.marks.iter()
    }

    pub fn top_node(&self) -> Option<&NodeType> {
        self.top.as_deref().and_then(|name| self.node_type(name))
    }

    pub fn mark_rank(&self, name: &str) -> Option<usize> {
        self.mark_type(name).map(MarkType::rank)
    }

    /// True when a child of type `child` satisfies the content atom `atom`.
    pub fn is_a(&self, child: &str, atom: &str) -> bool {
        child == atom || self.node_type(child).is_some_and(|t| t.in_group(atom))
    }

    /// Builds a validated non-text node. Declared attributes missing from
    /// `attrs` take their default; undeclared ones are dropped.
    pub fn node(&self, type_name: &str, attrs: Attrs, content: Vec<EditorNode>) -> Result<EditorNode, SchemaError> {
        let node_type = self
            .node_type(type_name)
            .ok_or_else(|| SchemaError::UnknownNodeType(type_name.to_string()))?;
        if type_name == "text" {
            return Err(SchemaError::EmptyText);
        }
        let attrs = compute_attrs(type_name, &node_type.spec.attrs, attrs)?;

        match &node_type.content {
            None if !content.is_empty() => return Err(SchemaError::LeafWithContent(type_name.to_string())),
            None => {}
            Some(expr) => {
                let names: Vec<&str> = content.iter().map(|c| c.type_name.as_str()).collect();
                if !expr.matches(&names, |atom, child| self.is_a(child, atom)) {
                    return Err(SchemaError::InvalidContent {
                        node: type_name.to_string(),
                        expected: node_type.spec.content.clone().unwrap_or_default(),
                        found: names.into_iter().map(str::to_string).collect(),
                    });
                }
            }
        }

        for mark in content.iter().flat_map(|c| c.marks.iter()) {
            if !node_type.spec.marks.allows(&mark.type_name) {
                return Err(SchemaError::MarkNotAllowed {
                    node: type_name.to_string(),
                    mark: mark.type_name.clone(),
                });
            }
        }

        Ok(EditorNode {
            type_name: type_name.to_string(),
            attrs,
            content,
            text: None,
            marks: Vec::new(),
        })
    }

    /// Builds a non-empty text node carrying `marks`.
    pub fn text(&self, value: impl Into<String>, marks: Vec<Mark>) -> Result<EditorNode, SchemaError> {
        if self.node_type("text").is_none() {
            return Err(SchemaError::NoTextType);
        }
        let value = value.into();
        if value.is_empty() {
            return Err(SchemaError::EmptyText);
        }
        let mut node = EditorNode {
            type_name: "text".to_string(),
            attrs: Attrs::new(),
            content: Vec::new(),
            text: Some(value),
            marks: Vec::new(),
        };
        for mark in marks {
            node = self.add_mark(node, mark)?;
        }
        Ok(node)
    }

    pub fn mark(&self, type_name: &str, attrs: Attrs) -> Result<Mark, SchemaError> {
        let mark_type = self
            .mark_type(type_name)
            .ok_or_else(|| SchemaError::UnknownMarkType(type_name.to_string()))?;
        Ok(Mark {
            type_name: type_name.to_string(),
            attrs: compute_attrs(type_name, &mark_type.spec.attrs, attrs)?,
        })
    }

    /// Adds `mark` to the node's mark set, keeping rank order. A mark of the
    /// same type already present is replaced.
    pub fn add_mark(&self, mut node: EditorNode, mark: Mark) -> Result<EditorNode, SchemaError> {
        let rank = self
            .mark_rank(&mark.type_name)
            .ok_or_else(|| SchemaError::UnknownMarkType(mark.type_name.clone()))?;
        node.marks.retain(|m| m.type_name != mark.type_name);
        let at = node
            .marks
            .iter()
            .position(|m| self.mark_rank(&m.type_name).is_some_and(|r| r > rank))
            .unwrap_or(node.marks.len());
        node.marks.insert(at, mark);
        Ok(node)
    }
}

fn compute_attrs(owner: &str, specs: &BTreeMap<String, AttrSpec>, mut given: Attrs) -> Result<Attrs, SchemaError> {
    let mut attrs = Attrs::new();
    for (name, spec) in specs {
        let value = match (given.remove(name), &spec.default) {
            (Some(value), _) => value,
            (None, Some(default)) => default.clone(),
            (None, None) => {
                return Err(SchemaError::MissingAttribute {
                    node: owner.to_string(),
                    attr: name.clone(),
                });
            }
        };
        attrs.insert(name.clone(), value);
    }
    Ok(attrs)
}
