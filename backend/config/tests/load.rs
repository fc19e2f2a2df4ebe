use std::collections::HashMap;

use encore_config::{config_file_path, load_and_prepare_with, load_resolved_with};
use encore_core::BusyPolicy;

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[tokio::test]
async fn token_from_env_reference() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_file_path(dir.path());
    std::fs::write(
        &path,
        "discord:\n  token: ${BOT_SECRET}\nvoice:\n  busyPolicy: queue\n",
    )
    .unwrap();

    let cfg = load_and_prepare_with(&path, &env(&[("BOT_SECRET", "abc.def.ghi")]))
        .await
        .unwrap();
    assert_eq!(cfg.token(), Some("abc.def.ghi"));
    assert_eq!(cfg.busy_policy(), BusyPolicy::Queue);
    assert_eq!(cfg.prefix(), "e.");
}

#[tokio::test]
async fn no_file_and_token_in_env_is_enough() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_file_path(dir.path());
    let cfg = load_and_prepare_with(&path, &env(&[("DISCORD_TOKEN", "abc.def.ghi")]))
        .await
        .unwrap();
    assert_eq!(cfg.token(), Some("abc.def.ghi"));
    assert_eq!(cfg.encoder_binary(), "dca");
}

#[tokio::test]
async fn missing_token_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_file_path(dir.path());
    std::fs::write(&path, "discord:\n  prefix: \"e.\"\n").unwrap();

    let err = load_and_prepare_with(&path, &HashMap::new()).await.unwrap_err();
    assert!(err.to_string().contains("discord.token"));

    // Still loadable for display.
    let cfg = load_resolved_with(&path, &HashMap::new()).await.unwrap();
    assert_eq!(cfg.token(), None);
}

#[tokio::test]
async fn unset_reference_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = config_file_path(dir.path());
    std::fs::write(&path, "discord:\n  token: ${UNSET_TOKEN_VAR}\n").unwrap();

    let err = load_and_prepare_with(&path, &HashMap::new()).await.unwrap_err();
    assert!(format!("{err:#}").contains("UNSET_TOKEN_VAR"));
}
