pub(crate) mod ast;
mod cache;
pub(crate) mod engine;
pub(crate) mod parser;
pub(crate) mod render;
pub(crate) mod render_context;
