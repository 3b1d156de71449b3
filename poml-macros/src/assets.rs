use glob::glob;
use proc_macro::TokenStream;
use quote::{format_ident, quote};
use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::env;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use syn::{LitStr, parse_macro_input};

/// Must match `poml::tpl::parser::ROOT_MARKER`.
const ROOT_MARKER: &str = "<poml>";

pub fn prompt_assets_impl(input: TokenStream) -> TokenStream {
    let pattern = parse_macro_input!(input as LitStr);
    match expand(&pattern) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(pattern: &LitStr) -> syn::Result<proc_macro2::TokenStream> {
    let pattern_str = pattern.value();
    let files = matching_files(pattern, &pattern_str)?;
    check_prompts(pattern, &files)?;

    // `include_str!` also makes cargo rebuild when an embedded file changes.
    let assets = files.iter().map(|f| {
        let f = f.to_string_lossy().into_owned();
        quote! { (#f, include_str!(#f)) }
    });

    // One registration function per pattern, so the macro can be invoked
    // several times in the same scope.
    let mut hasher = DefaultHasher::new();
    pattern_str.hash(&mut hasher);
    let fn_name = format_ident!("__poml_auto_register_assets_{}", hasher.finish());

    Ok(quote! {
        #[poml::ctor::ctor]
        fn #fn_name() {
            let assets = vec![
                #(#assets),*
            ];

            // The loader logs failures; there is no caller to return them to.
            let _ = poml::prompt_loader::load_assets(assets);
        }
    })
}

/// Files matching `pattern_str` relative to the invoking crate's manifest
/// directory, sorted so the expansion is stable.
fn matching_files(pattern: &LitStr, pattern_str: &str) -> syn::Result<Vec<PathBuf>> {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR")
        .map_err(|_| syn::Error::new(pattern.span(), "CARGO_MANIFEST_DIR is not set"))?;
    let full_pattern = PathBuf::from(manifest_dir).join(pattern_str);

    let mut files: Vec<PathBuf> = glob(&full_pattern.to_string_lossy())
        .map_err(|e| syn::Error::new(pattern.span(), format!("Invalid glob pattern: {}", e)))?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(syn::Error::new(
            pattern.span(),
            format!("No prompt files match '{}'", pattern_str),
        ));
    }
    Ok(files)
}

/// Rejects files the loader would refuse at startup: text without the root
/// marker, and two files mapping to the same prompt id.
fn check_prompts(pattern: &LitStr, files: &[PathBuf]) -> syn::Result<()> {
    let mut ids: BTreeMap<String, &Path> = BTreeMap::new();
    for file in files {
        let content = fs::read_to_string(file).map_err(|e| {
            syn::Error::new(
                pattern.span(),
                format!("Cannot read '{}': {}", file.display(), e),
            )
        })?;
        if !content.trim().starts_with(ROOT_MARKER) {
            return Err(syn::Error::new(
                pattern.span(),
                format!("'{}' does not start with {}", file.display(), ROOT_MARKER),
            ));
        }

        let id = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(previous) = ids.insert(id.clone(), file) {
            return Err(syn::Error::new(
                pattern.span(),
                format!(
                    "Duplicate prompt ID '{}' ('{}' and '{}')",
                    id,
                    previous.display(),
                    file.display()
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proc_macro2::Span;

    fn resource(rel: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../tests/resources")
            .join(rel)
    }

    fn pattern() -> LitStr {
        LitStr::new("tests/resources/**/*.poml", Span::call_site())
    }

    #[test]
    fn test_valid_prompts_pass() {
        let files = vec![
            resource("prompts/greeting.poml"),
            resource("prompts/incident_analysis.poml"),
        ];
        assert!(check_prompts(&pattern(), &files).is_ok());
    }

    #[test]
    fn test_missing_root_marker_fails() {
        let files = vec![resource("unmarked/plain.poml")];
        let err = check_prompts(&pattern(), &files).unwrap_err();
        assert!(err.to_string().contains("plain.poml"), "{}", err);
    }

    #[test]
    fn test_duplicate_stem_fails() {
        let file = resource("prompts/greeting.poml");
        let err = check_prompts(&pattern(), &[file.clone(), file]).unwrap_err();
        assert!(err.to_string().contains("Duplicate prompt ID 'greeting'"), "{}", err);
    }
}
