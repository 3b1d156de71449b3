mod assets;

use proc_macro::TokenStream;

/// Embeds every file matching a glob pattern (relative to the crate root) and
/// registers it with `poml::prompt_loader` before `main` runs.
///
/// ```ignore
/// poml::prompt_assets!["prompts/**/*.poml"];
/// ```
#[proc_macro]
pub fn prompt_assets(input: TokenStream) -> TokenStream {
    assets::prompt_assets_impl(input)
}
