pub mod error;
pub mod markup_source;
pub mod prompt_loader;
pub mod renderer;
pub(crate) mod tpl;

#[doc(hidden)]
pub use ctor;
pub use poml_macros::prompt_assets;

pub use error::PomlError;
pub use tpl::ast::{Document, Node, NodeKind};
pub use tpl::engine::{remove_template, render, render_template};
pub use tpl::parser::{parse, parse_tree};
pub use tpl::render::{RenderBuffer, assemble, render_fragments};
pub use tpl::render_context::{Bindings, Context, FieldValue};

pub type Result<T> = std::result::Result<T, PomlError>;
