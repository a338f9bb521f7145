use thiserror::Error;

use crate::{mdast::NodeKind, position::Position};

/// Raised while composing a set of extensions. Always fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Extension dependency cycle: {}", .cycle.join(" -> "))]
    DependencyCycle { cycle: Vec<String> },

    #[error("Editor type '{name}' is claimed by both '{first}' and '{second}'")]
    DuplicateEditorType {
        name: String,
        first: String,
        second: String,
    },

    #[error("External type '{kind}' is claimed by both '{first}' and '{second}'")]
    DuplicateExternalType {
        kind: NodeKind,
        first: String,
        second: String,
    },

    #[error("Extension '{extension}' declares an editor type but no grammar fragment, or the reverse")]
    MissingGrammarFragment { extension: String },

    #[error("Invalid content expression '{expression}' on '{node}': {reason}")]
    InvalidContentExpression {
        node: String,
        expression: String,
        reason: String,
    },

    #[error("Content expression of '{node}' refers to unknown type or group '{name}'")]
    UnknownContentName { node: String, name: String },

    #[error("Root converter registered by '{extension}' has no node type to act as top node")]
    MissingTopNode { extension: String },
}

/// Raised when an editor node is constructed in violation of the grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unknown node type '{0}'")]
    UnknownNodeType(String),

    #[error("Unknown mark type '{0}'")]
    UnknownMarkType(String),

    #[error("Node type '{node}' is missing required attribute '{attr}'")]
    MissingAttribute { node: String, attr: String },

    #[error("Invalid content for '{node}': expected '{expected}', found [{}]", .found.join(", "))]
    InvalidContent {
        node: String,
        expected: String,
        found: Vec<String>,
    },

    #[error("Leaf node type '{0}' cannot have content")]
    LeafWithContent(String),

    #[error("Mark '{mark}' is not allowed inside '{node}'")]
    MarkNotAllowed { node: String, mark: String },

    #[error("Text nodes cannot be empty")]
    EmptyText,

    #[error("Grammar has no 'text' node type")]
    NoTextType,
}

/// Which way a conversion was running when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// External tree to editor tree.
    Down,
    /// Editor tree to external tree.
    Up,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Down => f.write_str("external -> editor"),
            Direction::Up => f.write_str("editor -> external"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("No converter registered for type '{name}' ({direction})")]
    UnknownType { name: String, direction: Direction },

    #[error("Root conversion produced {count} nodes, expected a single '{expected}'")]
    RootMismatch { expected: String, count: usize },

    #[error("Extension '{extension}' does not support {direction} conversion")]
    Unsupported {
        extension: String,
        direction: Direction,
    },

    #[error("Extension '{extension}' rejected node: {message}")]
    Rejected { extension: String, message: String },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Malformed HTML fragment '{value}'{}", at_position(.position))]
    MalformedFragment {
        value: String,
        position: Option<Position>,
    },
}

impl ReconcileError {
    /// Attaches the source position of the offending node.
    pub fn with_position(self, position: Option<Position>) -> Self {
        match self {
            ReconcileError::MalformedFragment { value, .. } => ReconcileError::MalformedFragment { value, position },
        }
    }
}

fn at_position(position: &Option<Position>) -> String {
    match position {
        Some(p) => format!(" at {}..{}", p.start, p.end),
        None => String::new(),
    }
}

/// Umbrella error for the engine facade.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl From<SchemaError> for EngineError {
    fn from(err: SchemaError) -> Self {
        EngineError::Convert(ConvertError::Schema(err))
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
