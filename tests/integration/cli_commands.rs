use std::fs;
use std::sync::Arc;

use mythfs::backend::MemoryBackend;
use mythfs::config::MythfsConfig;
use mythfs::tooling::cli::{CliContext, Commands};
use tempfile::TempDir;

use crate::support::recording;

fn memory_context() -> (Arc<MemoryBackend>, CliContext) {
    let backend = Arc::new(MemoryBackend::with_records(vec![
        recording("1", "Quiz", "Final", 0),
        recording("2", "Quiz", "Final", 1),
        recording("3", "Docs", "Bees", 2),
    ]));
    let ctx = CliContext::with_backend(MythfsConfig::default(), backend.clone());
    (backend, ctx)
}

#[test]
fn ls_shows_deduplicated_names() {
    let (_backend, ctx) = memory_context();
    let output = ctx
        .execute(&Commands::Ls {
            path: "/Quiz".to_string(),
            long: false,
        })
        .unwrap();
    assert_eq!(output, "Quiz - Final\nQuiz - Final (1)");
}

#[test]
fn stat_json_contract_has_required_fields() {
    let (_backend, ctx) = memory_context();
    let output = ctx
        .execute(&Commands::Stat {
            path: "/Docs".to_string(),
            format: "json".to_string(),
        })
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["kind"], "directory");
    assert_eq!(parsed["mode"], "40500");
    for field in ["size", "nlink", "atime", "mtime", "ctime", "crtime"] {
        assert!(parsed.get(field).is_some(), "missing {field}");
    }
}

#[test]
fn stat_rejects_unknown_format() {
    let (_backend, ctx) = memory_context();
    assert!(ctx
        .execute(&Commands::Stat {
            path: "/".to_string(),
            format: "yaml".to_string(),
        })
        .is_err());
}

#[test]
fn missing_path_is_reported() {
    let (_backend, ctx) = memory_context();
    let err = ctx
        .execute(&Commands::Ls {
            path: "/Nope".to_string(),
            long: false,
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "not found: /Nope");
}

#[test]
fn context_from_config_reads_manifest_dir() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("recordings.json"),
        r#"[{"id": "7", "title": "Film", "size": 3,
            "start": "2024-05-01T20:00:00Z", "end": "2024-05-01T22:00:00Z",
            "file": "7.mpg"}]"#,
    )
    .unwrap();
    fs::write(temp.path().join("7.mpg"), b"abc").unwrap();

    let mut config = MythfsConfig::default();
    config.namespace.template = "{title}".to_string();
    config.backend.manifest_dir = Some(temp.path().to_path_buf());
    let ctx = CliContext::from_config(config, None).unwrap();

    assert_eq!(ctx.execute(&Commands::Tree).unwrap(), "/\n  Film\n\n1 recordings, 3 bytes");
    let mut out = Vec::new();
    ctx.cat("/Film", &mut out).unwrap();
    assert_eq!(out, b"abc");
}

#[test]
fn context_without_manifest_dir_fails() {
    assert!(CliContext::from_config(MythfsConfig::default(), None).is_err());
}
