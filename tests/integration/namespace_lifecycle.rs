use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mythfs::{FsError, FsOptions};

use crate::support::{harness, recording};

#[test]
fn listing_follows_backend_after_ttl() {
    let h = harness(
        vec![recording("1", "News", "Monday", 0)],
        FsOptions::default(),
    );
    assert_eq!(h.fs.list_directory("/News").unwrap(), vec!["News - Monday"]);

    h.backend
        .insert(recording("2", "News", "Monday", 24), b"rerun".to_vec());
    h.clock.advance(Duration::from_secs(10));
    assert_eq!(h.fs.list_directory("/News").unwrap(), vec!["News - Monday"]);
    assert_eq!(h.backend.fetch_calls(), 1);

    h.clock.advance(Duration::from_secs(25));
    assert_eq!(
        h.fs.list_directory("/News").unwrap(),
        vec!["News - Monday", "News - Monday (1)"]
    );
    assert_eq!(h.backend.fetch_calls(), 2);
}

#[test]
fn delete_is_visible_immediately() {
    let h = harness(
        vec![
            recording("1", "News", "Monday", 0),
            recording("2", "News", "Tuesday", 24),
        ],
        FsOptions {
            allow_delete: true,
            ..Default::default()
        },
    );
    assert!(h.fs.get_attributes("/News").unwrap().writable());

    h.fs.unlink("/News/News - Monday").unwrap();
    assert_eq!(h.fs.list_directory("/News").unwrap(), vec!["News - Tuesday"]);
    assert!(matches!(
        h.fs.get_attributes("/News/News - Monday"),
        Err(FsError::NotFound { .. })
    ));
    assert!(matches!(
        h.fs.unlink("/News"),
        Err(FsError::NotSupported { .. })
    ));
    assert!(h.backend.contains("2"));
}

#[test]
fn failed_delete_keeps_listing() {
    let h = harness(
        vec![recording("1", "News", "Monday", 0)],
        FsOptions {
            allow_delete: true,
            ..Default::default()
        },
    );
    h.fs.list_directory("/").unwrap();
    h.backend.set_fail_delete(true);

    let err = h.fs.unlink("/News/News - Monday").unwrap_err();
    assert_eq!(err.errno(), libc::EIO);
    assert_eq!(h.fs.list_directory("/News").unwrap(), vec!["News - Monday"]);
    assert_eq!(h.backend.fetch_calls(), 1);
}

#[test]
fn open_handle_outlives_rebuild() {
    let h = harness(
        vec![recording("1", "News", "Monday", 0)],
        FsOptions {
            allow_delete: true,
            ..Default::default()
        },
    );
    let handle = h.fs.open_for_read("/News/News - Monday").unwrap();
    h.fs.unlink("/News/News - Monday").unwrap();
    h.clock.advance(Duration::from_secs(60));
    assert!(h.fs.list_directory("/").unwrap().is_empty());

    let data = h.fs.read_at(handle, 0, 16).unwrap();
    assert_eq!(data.len(), 16);
    h.fs.close_handle(handle).unwrap();
    assert_eq!(h.backend.open_streams(), 0);
}

#[test]
fn concurrent_readers_share_one_rebuild() {
    let records = (0..50)
        .map(|i| recording(&i.to_string(), "Show", "Episode", i))
        .collect();
    let h = Arc::new(harness(records, FsOptions::default()));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                for _ in 0..20 {
                    let names = h.fs.list_directory("/Show").unwrap();
                    assert_eq!(names.len(), 50);
                    assert_eq!(names[1], "Show - Episode (1)");
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(h.backend.fetch_calls(), 1);
}

#[test]
fn fetch_failure_surfaces_unless_stale_allowed() {
    let h = harness(
        vec![recording("1", "News", "Monday", 0)],
        FsOptions::default(),
    );
    h.backend.set_fail_fetch(true);
    assert!(matches!(h.fs.list_directory("/"), Err(FsError::Fetch(_))));

    h.backend.set_fail_fetch(false);
    assert_eq!(h.fs.list_directory("/").unwrap(), vec!["News"]);

    let h = harness(
        vec![recording("1", "News", "Monday", 0)],
        FsOptions {
            serve_stale_on_error: true,
            ..Default::default()
        },
    );
    h.fs.list_directory("/").unwrap();
    h.backend.set_fail_fetch(true);
    h.clock.advance(Duration::from_secs(31));
    assert_eq!(h.fs.list_directory("/").unwrap(), vec!["News"]);
    assert_eq!(h.fs.cache().stats().failures, 1);
}
