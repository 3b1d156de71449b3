use crate::Result;
use crate::error::PomlError;
use crate::tpl::engine;
use crate::tpl::render_context::Bindings;
use serde::Deserialize;
use serde_json::Value;

/// A string-in, string-out prompt renderer.
///
/// The built-in engine is one implementation; an external document SDK can be
/// plugged in behind the same contract through [`EnvelopeRenderer`].
pub trait PromptRenderer: Send + Sync {
    fn name(&self) -> &str;

    fn render(&self, markup: &str, bindings: &dyn Bindings) -> Result<String>;
}

/// The rule-based POML engine of this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PomlRenderer;

impl PromptRenderer for PomlRenderer {
    fn name(&self) -> &str {
        "poml"
    }

    fn render(&self, markup: &str, bindings: &dyn Bindings) -> Result<String> {
        engine::render(markup, bindings)
    }
}

/// Adapts an external renderer whose raw output may be a JSON envelope.
pub struct EnvelopeRenderer<F> {
    name: String,
    render_raw: F,
}

impl<F> EnvelopeRenderer<F>
where
    F: Fn(&str, &dyn Bindings) -> Result<String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, render_raw: F) -> Self {
        Self {
            name: name.into(),
            render_raw,
        }
    }
}

impl<F> PromptRenderer for EnvelopeRenderer<F>
where
    F: Fn(&str, &dyn Bindings) -> Result<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, markup: &str, bindings: &dyn Bindings) -> Result<String> {
        let raw = (self.render_raw)(markup, bindings).map_err(|e| match e {
            PomlError::EnvelopeError(_) => e,
            other => PomlError::EnvelopeError(format!("{}: {}", self.name, other)),
        })?;
        Ok(unwrap_messages_envelope(raw))
    }
}

#[derive(Deserialize)]
struct Envelope {
    messages: Value,
}

/// Extracts the `messages` field when `raw` is a JSON object carrying one.
///
/// A string value is returned as-is and any other value as compact JSON.
/// Anything that is not such an envelope is already the prompt and is
/// returned unchanged.
pub fn unwrap_messages_envelope(raw: String) -> String {
    match serde_json::from_str::<Envelope>(&raw) {
        Ok(Envelope {
            messages: Value::String(s),
        }) => s,
        Ok(Envelope { messages }) => messages.to_string(),
        Err(_) => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_poml_renderer_behind_trait() {
        let renderer: Box<dyn PromptRenderer> = Box::new(PomlRenderer);
        let vars = HashMap::from([("who", "you")]);
        let out = renderer
            .render("<poml><field name=\"who\"/></poml>", &vars)
            .unwrap();
        assert_eq!(renderer.name(), "poml");
        assert_eq!(out, "- **who**: [you]\n");
    }

    #[test]
    fn test_unwrap_messages_envelope() {
        assert_eq!(
            unwrap_messages_envelope(r#"{"messages": "hello"}"#.to_string()),
            "hello"
        );
        assert_eq!(
            unwrap_messages_envelope(r#"{"messages": [{"speaker": "human"}]}"#.to_string()),
            r#"[{"speaker":"human"}]"#
        );
        // Not an envelope: returned untouched.
        assert_eq!(unwrap_messages_envelope("plain prompt".to_string()), "plain prompt");
        assert_eq!(
            unwrap_messages_envelope(r#"{"other": 1}"#.to_string()),
            r#"{"other": 1}"#
        );
        assert_eq!(unwrap_messages_envelope("[1, 2]".to_string()), "[1, 2]");
    }

    #[test]
    fn test_envelope_renderer() {
        let sdk = EnvelopeRenderer::new("sdk", |markup: &str, bindings: &dyn Bindings| {
            let who = bindings.binding("who").unwrap_or("nobody");
            Ok(format!(r#"{{"messages": "{} / {}"}}"#, markup.len(), who))
        });
        let vars = HashMap::from([("who", "me")]);
        assert_eq!(sdk.render("<poml/>", &vars).unwrap(), "7 / me");
        assert_eq!(sdk.name(), "sdk");
    }

    #[test]
    fn test_envelope_renderer_wraps_errors() {
        let sdk = EnvelopeRenderer::new("sdk", |_: &str, _: &dyn Bindings| {
            Err(PomlError::InvalidRoot)
        });
        match sdk.render("x", &()).unwrap_err() {
            PomlError::EnvelopeError(msg) => assert!(msg.starts_with("sdk: ")),
            other => panic!("Expected EnvelopeError, got {:?}", other),
        }
    }
}
