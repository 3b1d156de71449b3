use poml::PomlError;
use poml::prompt_loader;
use std::collections::HashMap;
use std::sync::Once;

static INIT: Once = Once::new();

fn init() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
        prompt_loader::load("tests/resources/prompts/*.poml").unwrap();
    });
}

#[test]
fn test_load_from_glob() {
    init();
    let prompt = prompt_loader::find_prompt("greeting").expect("greeting should be loaded");
    assert!(prompt.source.ends_with("greeting.poml"));
    assert!(prompt_loader::find_prompt("incident_analysis").is_some());
}

#[test]
fn test_render_loaded_prompt() {
    init();
    let out = prompt_loader::render_prompt("greeting", &()).unwrap();
    assert_eq!(out, "Hello\n\n- **name**: [world]\n");

    let vars = HashMap::from([("name", "POML")]);
    let out = prompt_loader::render_prompt("greeting", &vars).unwrap();
    assert_eq!(out, "Hello\n\n- **name**: [POML]\n");
}

#[test]
fn test_invalid_prompt_file() {
    init();
    let err = prompt_loader::load("tests/resources/invalid/*.poml").unwrap_err();
    match err {
        PomlError::PromptLoadError(msg) => assert!(msg.contains("broken.poml"), "{}", msg),
        other => panic!("Expected PromptLoadError, got {:?}", other),
    }
    assert!(prompt_loader::find_prompt("broken").is_none());
}

#[test]
fn test_invalid_glob() {
    let err = prompt_loader::load("tests/resources/[").unwrap_err();
    assert!(matches!(err, PomlError::PromptLoadError(_)));
}
