use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PomlError {
    #[error("Invalid POML Text: input must start with the <poml> tag")]
    InvalidRoot,
    #[error("XML Syntax Error at position {position}: {message}")]
    XmlSyntax { position: u64, message: String },
    #[error("Missing Root Error: expected <poml> root tag, found <{0}>")]
    MissingRoot(String),
    #[error("Missing Attribute Error: <{tag}> requires attribute '{attribute}'")]
    MissingAttribute { tag: String, attribute: String },
    #[error("Prompt Load Error: {0}")]
    PromptLoadError(String),
    #[error("Prompt Not Found: {0}")]
    PromptNotFound(String),
    #[error("Markup Source Error: {0}")]
    MarkupSourceError(String),
    #[error("Envelope Error: {0}")]
    EnvelopeError(String),
}

impl PomlError {
    pub(crate) fn syntax(position: u64, message: impl std::fmt::Display) -> Self {
        PomlError::XmlSyntax {
            position,
            message: message.to_string(),
        }
    }

    /// Formats the error followed by the input that caused it, so a caller can
    /// show both without re-threading the original text.
    pub fn report(&self, input: &str) -> String {
        format!("{}\nReceived text:\n---\n{}", self, input)
    }
}
