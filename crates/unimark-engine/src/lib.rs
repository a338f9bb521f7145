//! # unimark-engine
//!
//! A rich-text document model assembled at runtime from extensions, with
//! conversion to and from a markdown syntax tree.
//!
//! ## Pipeline
//!
//! ```text
//! source -> mdast::parse -> transforms (html reconcile, fixup)
//!        -> convert::to_editor -> EditorNode
//!        -> convert::to_external -> mdast::serialize -> source
//! ```
//!
//! ## Modules
//!
//! - **`position`**: byte ranges attached to external nodes
//! - **`mdast`**: the external tree plus the markdown parser and serializer adapters
//! - **`editor`**: the grammar-validated editor tree
//! - **`extension`**: the extension contract and the composer
//! - **`convert`**: post-order conversion in both directions
//! - **`reconcile`**: HTML tag pairing and block-level HTML fixup
//! - **`catalog`**: concrete CommonMark, GFM and HTML extensions
//! - **`engine`**: [`Engine`], one composition and the whole pipeline

pub mod catalog;
pub mod convert;
pub mod editor;
pub mod engine;
pub mod error;
pub mod extension;
pub mod mdast;
pub mod position;
pub mod reconcile;

pub use catalog::catalog;
pub use editor::{Attrs, EditorNode, Grammar, Mark};
pub use engine::Engine;
pub use error::{ConfigurationError, ConvertError, Direction, EngineError, ReconcileError, Result, SchemaError};
pub use extension::{Composition, ConvertContext, Extension, ExtensionRef, Payload, TreeTransform, compose};
pub use mdast::{ExternalNode, NodeKind};
pub use position::Position;
pub use reconcile::HtmlOptions;
