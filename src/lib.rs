//! Lexical-compatible editor state: a typed document tree, its versioned JSON
//! wire format, persistence, and exporters for HTML, Markdown, plain text,
//! JSON and Typst.

pub mod codec;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod import;
pub mod node;
pub mod store;
pub mod traverse;
mod validate;

pub use codec::{decode, encode};
pub use config::Config;
pub use editor::{Editor, Restored};
pub use error::{DocumentError, EncodeError, ExportError, PersistError, RestoreError, StoreError};
pub use export::{Converter, ExportFormat, Exporter};
pub use import::from_markdown;
pub use node::{EditorState, Node, NodeKind};
pub use store::{EDITOR_STATE_KEY, FileStore, MemoryStore, StateStore};

/// Convert Markdown to any export format, with default settings.
pub fn convert_markdown(markdown: &str, format: ExportFormat) -> anyhow::Result<String> {
    let state = from_markdown(markdown)?;
    Ok(export::export(&state, format)?)
}
