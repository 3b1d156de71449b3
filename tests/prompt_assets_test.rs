use poml::prompt_assets;
use poml::prompt_loader;

// Registered by a constructor before the test harness starts.
prompt_assets!["tests/resources/prompts/*.poml"];

#[test]
fn test_macro_assets() {
    let prompt = prompt_loader::find_prompt("greeting")
        .expect("Assets were not loaded automatically. The ctor-based registration failed.");
    assert!(prompt.content.contains("<field name=\"name\""));

    let out = prompt_loader::render_prompt("incident_analysis", &()).unwrap();
    assert!(out.starts_with("# Root Cause Analysis\n\n"));
}
