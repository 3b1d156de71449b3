use crate::Result;
use crate::error::PomlError;
use crate::tpl::engine::render_template;
use crate::tpl::parser::parse;
use crate::tpl::render_context::Bindings;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use glob::glob;
use log::{debug, error};
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// A registered POML prompt.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Lookup key: the file stem of `source`.
    pub id: String,
    /// Where the prompt came from (a file path, or the path an asset was embedded from).
    pub source: String,
    /// Raw POML text.
    pub content: String,
}

/// Prompt store: ID -> template.
pub type PromptStore = DashMap<String, Arc<PromptTemplate>>;

static PROMPTS: OnceLock<PromptStore> = OnceLock::new();

/// Loads every prompt file matching a glob pattern, e.g. `"prompts/**/*.poml"`.
pub fn load(pattern: &str) -> Result<()> {
    let paths = glob(pattern).map_err(|e| {
        PomlError::PromptLoadError(format!("Invalid glob pattern '{}': {}", pattern, e))
    })?;
    for entry in paths {
        let path = entry.map_err(|e| {
            PomlError::PromptLoadError(format!("Cannot read path for '{}': {}", pattern, e))
        })?;
        if path.is_file() {
            load_file(&path)?;
        }
    }
    Ok(())
}

/// Registers prompts embedded in the binary as `(source, content)` pairs.
/// This is what `prompt_assets!` calls at startup.
pub fn load_assets(assets: Vec<(&str, &str)>) -> Result<()> {
    for (source, content) in assets {
        if let Err(e) = parse_and_register(content, source) {
            error!("failed to register prompt asset '{}': {}", source, e);
            return Err(e);
        }
    }
    Ok(())
}

pub fn find_prompt(id: &str) -> Option<Arc<PromptTemplate>> {
    PROMPTS.get()?.get(id).map(|v| v.value().clone())
}

/// Renders a registered prompt. Parsed documents are cached per prompt ID.
pub fn render_prompt<B: Bindings + ?Sized>(id: &str, bindings: &B) -> Result<String> {
    let prompt = find_prompt(id).ok_or_else(|| PomlError::PromptNotFound(id.to_string()))?;
    render_template(&prompt.id, &prompt.content, bindings)
}

/// Removes every registered prompt (mainly for resetting state in tests).
pub fn clear() {
    if let Some(store) = PROMPTS.get() {
        store.clear();
    }
}

fn load_file(path: &Path) -> Result<()> {
    let content = fs::read_to_string(path).map_err(|e| {
        PomlError::PromptLoadError(format!("Failed to read '{}': {}", path.display(), e))
    })?;
    parse_and_register(&content, &path.display().to_string())
}

fn parse_and_register(content: &str, source: &str) -> Result<()> {
    // Reject broken prompts at load time rather than at first render.
    parse(content)
        .map_err(|e| PomlError::PromptLoadError(format!("Invalid POML in '{}': {}", source, e)))?;

    let id = Path::new(source)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            PomlError::PromptLoadError(format!("Cannot derive a prompt ID from '{}'", source))
        })?;

    let store = PROMPTS.get_or_init(DashMap::new);
    match store.entry(id.clone()) {
        Entry::Occupied(existing) => Err(PomlError::PromptLoadError(format!(
            "Duplicate prompt ID '{}' (Source: '{}', already loaded from '{}')",
            id,
            source,
            existing.get().source
        ))),
        Entry::Vacant(slot) => {
            debug!("registered prompt '{}' from {}", id, source);
            slot.insert(Arc::new(PromptTemplate {
                id,
                source: source.to_string(),
                content: content.to_string(),
            }));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit tests use IDs with a per-test prefix since the store is global.

    #[test]
    fn test_assets_round_trip() {
        load_assets(vec![(
            "embedded/unit_greeting.poml",
            "<poml><p>Hi</p><field name=\"who\" default=\"there\"/></poml>",
        )])
        .unwrap();

        let prompt = find_prompt("unit_greeting").unwrap();
        assert_eq!(prompt.source, "embedded/unit_greeting.poml");

        let out = render_prompt("unit_greeting", &()).unwrap();
        assert_eq!(out, "Hi\n\n- **who**: [there]\n");
    }

    #[test]
    fn test_invalid_asset_is_rejected() {
        let err = load_assets(vec![("embedded/unit_broken.poml", "<poml><p></poml>")]).unwrap_err();
        assert!(matches!(err, PomlError::PromptLoadError(_)));
        assert!(find_prompt("unit_broken").is_none());
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        load_assets(vec![("a/unit_dup.poml", "<poml></poml>")]).unwrap();
        let err = load_assets(vec![("b/unit_dup.poml", "<poml></poml>")]).unwrap_err();
        match err {
            PomlError::PromptLoadError(msg) => assert!(msg.contains("unit_dup")),
            other => panic!("Expected PromptLoadError, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_prompt() {
        assert_eq!(
            render_prompt("unit_missing", &()).unwrap_err(),
            PomlError::PromptNotFound("unit_missing".to_string())
        );
    }
}
