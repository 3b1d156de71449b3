use crate::Result;
use crate::tpl::ast::Document;
use crate::tpl::parser::parse;
use dashmap::DashMap;
use log::debug;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

#[derive(Clone)]
pub struct CachedTemplate {
    pub doc: Arc<Document>,
    pub content_hash: u64,
}

/// Parsed documents keyed by template name.
pub(crate) static TEMPLATE_CACHE: LazyLock<DashMap<String, CachedTemplate>> =
    LazyLock::new(DashMap::new);

/// Returns the parsed document for `template_name`, reparsing only when the
/// content changed since the last call. Parse failures are not cached.
pub(crate) fn get_document(template_name: &str, template_content: &str) -> Result<Arc<Document>> {
    let mut hasher = DefaultHasher::new();
    template_content.hash(&mut hasher);
    let new_hash = hasher.finish();

    if let Some(cached) = TEMPLATE_CACHE.get(template_name)
        && cached.content_hash == new_hash
    {
        return Ok(cached.doc.clone());
    }

    debug!("parsing template '{}'", template_name);
    let doc = Arc::new(parse(template_content)?);
    TEMPLATE_CACHE.insert(
        template_name.to_string(),
        CachedTemplate {
            doc: doc.clone(),
            content_hash: new_hash,
        },
    );
    Ok(doc)
}
