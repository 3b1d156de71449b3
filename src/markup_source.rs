use crate::Result;
use crate::error::PomlError;
use crate::tpl::parser::parse_tree;
use log::{debug, warn};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

/// Anything that turns a request prompt into candidate POML text, typically a
/// call to a text-generation model. The output is untrusted and may be
/// malformed.
pub trait MarkupSource {
    fn generate(&self, prompt: &str) -> Result<String>;
}

impl<F> MarkupSource for F
where
    F: Fn(&str) -> Result<String>,
{
    fn generate(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

/// A source that always answers with the same markup. Useful offline and in tests.
#[derive(Debug, Clone)]
pub struct FixedMarkup(pub String);

impl MarkupSource for FixedMarkup {
    fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Instructions sent ahead of the Markdown when asking a model for POML.
pub const CONVERSION_RULES: &str = r#"You are a highly skilled AI assistant specializing in prompt engineering. Your task is to convert a user's structured Markdown prompt into a machine-readable POML (Prompt Optimization Meta-Language) format.

**POML Conversion Rules:**
1. The root element must be `<poml>`.
2. Parse the general structure: `## Title` -> `<h2>Title</h2>`, paragraphs -> `<p>Text</p>`, `1. ...` -> `<list type="ordered"><item>...</item></list>`, etc.
3. Code blocks (```...```) become `<code><![CDATA[...]]></code>`. If "mermaid" is present, add `type="mermaid"`.
4. The content of an input template code block must be in an `<input_template>` tag. Inside it, `### ...` becomes `<h3>...</h3>`.
5. Inside `<input_template>`, convert fields: `- **Key**: [Value]` becomes `<field name="Key" type="text" default="Value"/>`.
6. For fields whose value is a nested bullet list, create a single `<field type="list" ...>` with newline-separated default values.

**Output Format:**
Your output must be ONLY the raw XML content, starting with `<poml>` and ending with `</poml>`. Do not include any other text or markdown fences.
---
Please convert the following Markdown text to POML:"#;

/// Builds the full request prompt for converting `markdown` into POML.
pub fn conversion_prompt(markdown: &str) -> String {
    format!("{}\n\n{}", CONVERSION_RULES, markdown)
}

/// Removes Markdown code fences a model may have wrapped its answer in.
///
/// Every "```" marker is dropped together with an optional `xml` language tag
/// and the newline right after it, wherever it appears.
pub fn strip_code_fences(response: &str) -> String {
    let mut out = String::with_capacity(response.len());
    let mut rest = response.trim();
    while let Some(idx) = rest.find("```") {
        out.push_str(&rest[..idx]);
        rest = &rest[idx + 3..];
        rest = rest.strip_prefix("xml").unwrap_or(rest);
        rest = rest.strip_prefix('\n').unwrap_or(rest);
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Re-indents well-formed markup with two spaces per level.
///
/// The XML declaration and whitespace-only text are dropped; other text,
/// CDATA and comments are written unchanged.
pub fn pretty_print(markup: &str) -> Result<String> {
    parse_tree(markup)?;

    let mut reader = Reader::from_str(markup);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(PomlError::syntax(reader.error_position(), e)),
        };
        match event {
            Event::Eof => break,
            Event::Decl(_) => {}
            Event::Text(ref t) if t.iter().all(u8::is_ascii_whitespace) => {}
            event => writer
                .write_event(event)
                .map_err(|e| PomlError::syntax(reader.buffer_position(), e))?,
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| PomlError::syntax(reader.buffer_position(), e))
}

/// Asks `source` to convert Markdown into POML and cleans up the answer.
pub fn convert_markdown(source: &dyn MarkupSource, markdown: &str) -> Result<String> {
    let prompt = conversion_prompt(markdown);
    debug!("requesting POML conversion ({} bytes of markdown)", markdown.len());

    let response = source.generate(&prompt)?;
    if response.trim().is_empty() {
        return Err(PomlError::MarkupSourceError(
            "markup source returned an empty response".to_string(),
        ));
    }

    let cleaned = strip_code_fences(&response);
    pretty_print(&cleaned).inspect_err(|e| {
        warn!("markup source returned invalid XML: {}", e);
    })
}
