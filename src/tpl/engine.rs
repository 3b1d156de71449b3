use crate::Result;
use crate::tpl::render_context::Bindings;
use crate::tpl::render::{assemble, render_fragments};
use crate::tpl::{cache, parser};
use log::debug;

/// Renders POML text into the final prompt string.
///
/// This is the whole pipeline in one call:
/// 1. Parse the markup (rejecting anything that does not start with `<poml>`)
/// 2. Walk the tree, resolving `<field>` values against `bindings`
/// 3. Concatenate the produced fragments
///
/// The function is pure: the same input always yields the same output.
pub fn render<B: Bindings + ?Sized>(markup: &str, bindings: &B) -> Result<String> {
    let doc = parser::parse(markup)?;
    let fragments = render_fragments(&doc, bindings)?;
    Ok(assemble(&fragments))
}

/// Like [`render`], but keeps the parsed document under `template_name` so
/// later calls with unchanged content skip parsing.
pub fn render_template<B: Bindings + ?Sized>(
    template_name: &str,
    template_content: &str,
    bindings: &B,
) -> Result<String> {
    let doc = cache::get_document(template_name, template_content)?;
    let fragments = render_fragments(&doc, bindings)?;
    debug!(
        "rendered template '{}' into {} fragments",
        template_name,
        fragments.len()
    );
    Ok(assemble(&fragments))
}

pub fn remove_template(template_name: &str) {
    cache::TEMPLATE_CACHE.remove(template_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PomlError;
    use std::collections::HashMap;

    const TPL: &str =
        r#"<poml><h1>Title</h1><field name="X" type="list" default="a&#10;b"/></poml>"#;

    #[test]
    fn test_render_with_defaults() {
        let out = render(TPL, &()).unwrap();
        assert_eq!(out, "# Title\n\n- **X**:\n  - [a]\n  - [b]\n");
    }

    #[test]
    fn test_render_with_bindings() {
        let vars = HashMap::from([("X".to_string(), "c\nd".to_string())]);
        let out = render(TPL, &vars).unwrap();
        assert_eq!(out, "# Title\n\n- **X**:\n  - [c]\n  - [d]\n");
    }

    #[test]
    fn test_render_is_idempotent() {
        let vars = HashMap::from([("X", "1\n2\n3")]);
        assert_eq!(render(TPL, &vars).unwrap(), render(TPL, &vars).unwrap());
    }

    #[test]
    fn test_render_template_matches_render() {
        let vars = HashMap::from([("X", "q")]);
        let cached = render_template("engine.match", TPL, &vars).unwrap();
        assert_eq!(cached, render(TPL, &vars).unwrap());
        // Second call is served from the cache.
        assert_eq!(render_template("engine.match", TPL, &vars).unwrap(), cached);
        remove_template("engine.match");
        assert!(!cache::TEMPLATE_CACHE.contains_key("engine.match"));
    }

    #[test]
    fn test_render_errors() {
        assert_eq!(render("nope", &()).unwrap_err(), PomlError::InvalidRoot);
        assert!(matches!(
            render("<poml><p></poml>", &()).unwrap_err(),
            PomlError::XmlSyntax { .. }
        ));
    }
}
