use std::fs;
use std::path::Path;
use std::sync::Arc;

use mythfs::backend::ManifestBackend;
use mythfs::cache::TreeCache;
use mythfs::config::MythfsConfig;
use mythfs::{FsError, RecordingFs};
use tempfile::TempDir;

const MANIFEST: &str = r#"[
  {
    "id": "1001",
    "title": "Evening News",
    "subtitle": "Storms: what's next?",
    "channel": "BBC One",
    "size": 11,
    "start": "2024-02-10T18:00:00Z",
    "end": "2024-02-10T18:30:00Z",
    "file": "1001.ts"
  },
  {
    "id": "1002",
    "title": "Evening News",
    "channel": "BBC One",
    "size": 6,
    "start": "2024-02-11T18:00:00Z",
    "end": "2024-02-11T18:30:00Z",
    "file": "1002.ts"
  }
]"#;

fn recordings_dir() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("recordings.json"), MANIFEST).unwrap();
    fs::write(temp.path().join("1001.ts"), b"storm front").unwrap();
    fs::write(temp.path().join("1002.ts"), b"sunny!").unwrap();
    temp
}

fn filesystem(root: &Path, template: &str, allow_delete: bool) -> RecordingFs {
    let mut config = MythfsConfig::default();
    config.namespace.template = template.to_string();
    config.mutation.allow_delete = allow_delete;
    let cache = TreeCache::new(
        Arc::new(ManifestBackend::new(root)),
        config.tree_builder().unwrap(),
        config.ttl(),
    );
    RecordingFs::new(Arc::new(cache), config.fs_options())
}

#[test]
fn default_template_over_manifest() {
    let temp = recordings_dir();
    let fs = filesystem(temp.path(), "{title}/{title} - {subtitle}", false);

    assert_eq!(fs.list_directory("/").unwrap(), vec!["Evening News"]);
    assert_eq!(
        fs.list_directory("/Evening News").unwrap(),
        vec!["Evening News - Storms_ what_s next_", "Evening News - "]
    );

    let attrs = fs
        .get_attributes("/Evening News/Evening News - Storms_ what_s next_")
        .unwrap();
    assert_eq!(attrs.size, 11);
    assert_eq!(attrs.perm, 0o400);
}

#[test]
fn custom_template_with_dates() {
    let temp = recordings_dir();
    let fs = filesystem(temp.path(), "{channel}/{start:%Y-%m-%d} {title}", false);

    assert_eq!(fs.list_directory("/").unwrap(), vec!["BBC One"]);
    assert_eq!(
        fs.list_directory("/BBC One").unwrap(),
        vec!["2024-02-10 Evening News", "2024-02-11 Evening News"]
    );
}

#[test]
fn read_and_delete_through_filesystem() {
    let temp = recordings_dir();
    let fs = filesystem(temp.path(), "{title}/{id}", true);

    let handle = fs.open_for_read("/Evening News/1001").unwrap();
    assert_eq!(fs.read_at(handle, 6, 5).unwrap(), b"front");
    fs.close_handle(handle).unwrap();

    fs.unlink("/Evening News/1001").unwrap();
    assert!(!temp.path().join("1001.ts").exists());
    assert_eq!(fs.list_directory("/Evening News").unwrap(), vec!["1002"]);

    let manifest = fs::read_to_string(temp.path().join("recordings.json")).unwrap();
    assert!(!manifest.contains("1001"));
}

#[test]
fn missing_manifest_is_a_fetch_error() {
    let temp = TempDir::new().unwrap();
    let fs = filesystem(temp.path(), "{title}", false);
    let err = fs.list_directory("/").unwrap_err();
    assert!(matches!(err, FsError::Fetch(_)));
    assert_eq!(err.errno(), libc::EIO);
}
