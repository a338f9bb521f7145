//! # Extensions
//!
//! An extension declares one node or mark type: its external kind, its
//! editor type and grammar fragment, the extensions it depends on, the
//! converters in both directions, and any auxiliary bindings.
//!
//! - **`compose`**: folds a requested list of extensions into one
//!   [`Composition`] (grammar, dispatch tables, bindings, transforms)
//!
//! Extensions are shared as [`ExtensionRef`] (`Arc<dyn Extension>`). Two
//! references name the same extension only if they point at the same
//! allocation; equal names are not enough.

pub mod compose;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::editor::{EditorNode, Grammar, GrammarFragment, Mark};
use crate::error::{ConvertError, Direction, EngineError};
use crate::mdast::{ExternalNode, NodeKind};

pub use compose::{AuxBindings, Composition, compose};

pub type ExtensionRef = Arc<dyn Extension>;

/// Opaque auxiliary payload (a command, an input rule). The engine only
/// stores and hands these back.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A whole-tree pass over the external tree, run between parsing and
/// down-conversion.
pub trait TreeTransform: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, tree: ExternalNode) -> Result<ExternalNode, EngineError>;
}

pub type TransformRef = Arc<dyn TreeTransform>;

pub trait Extension: Send + Sync {
    /// Human readable name, used in errors and logs.
    fn name(&self) -> &str;

    /// The external node kind this extension converts down.
    fn external_kind(&self) -> Option<NodeKind> {
        None
    }

    /// The editor node or mark type this extension converts up.
    fn editor_type(&self) -> Option<&str> {
        None
    }

    fn grammar_fragment(&self) -> Option<GrammarFragment> {
        None
    }

    fn dependencies(&self) -> Vec<ExtensionRef> {
        Vec::new()
    }

    /// Converts one external node whose children are already converted.
    fn to_editor(
        &self,
        _node: &ExternalNode,
        _children: Vec<EditorNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<EditorNode>, ConvertError> {
        Err(ConvertError::Unsupported {
            extension: self.name().to_string(),
            direction: Direction::Down,
        })
    }

    /// Converts one editor node whose children are already converted.
    fn to_external(
        &self,
        _node: &EditorNode,
        _children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Err(ConvertError::Unsupported {
            extension: self.name().to_string(),
            direction: Direction::Up,
        })
    }

    /// Wraps an already converted run of children in this mark's external form.
    fn mark_to_external(
        &self,
        _mark: &Mark,
        _children: Vec<ExternalNode>,
        _grammar: &Grammar,
        _cx: &mut ConvertContext,
    ) -> Result<Vec<ExternalNode>, ConvertError> {
        Err(ConvertError::Unsupported {
            extension: self.name().to_string(),
            direction: Direction::Up,
        })
    }

    /// Key bindings, as `(key, command)` pairs.
    fn keymap(&self) -> Vec<(String, Payload)> {
        Vec::new()
    }

    fn input_rules(&self) -> Vec<Payload> {
        Vec::new()
    }

    fn transforms(&self) -> Vec<TransformRef> {
        Vec::new()
    }
}

impl fmt::Debug for dyn Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name())
            .field("external_kind", &self.external_kind())
            .field("editor_type", &self.editor_type())
            .finish()
    }
}

/// Identity key of an extension: the address of its allocation.
pub(crate) fn identity(ext: &ExtensionRef) -> usize {
    Arc::as_ptr(ext) as *const () as usize
}

/// Pass-through state for one conversion call. The engine never reads it;
/// converters use it for things like numbering or id allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertContext {
    values: Map<String, Value>,
}

impl ConvertContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Increments an integer counter and returns its new value.
    pub fn next_counter(&mut self, key: &str) -> u64 {
        let next = self.values.get(key).and_then(Value::as_u64).unwrap_or(0) + 1;
        self.values.insert(key.to_string(), next.into());
        next
    }
}
