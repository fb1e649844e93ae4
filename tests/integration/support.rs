use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use mythfs::backend::MemoryBackend;
use mythfs::cache::{ManualClock, TreeCache, DEFAULT_TTL};
use mythfs::tree::TreeBuilder;
use mythfs::{FsOptions, Record, RecordingFs};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 5, 19, 30, 0).unwrap()
}

/// A one-hour recording starting `hours` after the base time.
pub fn recording(id: &str, title: &str, subtitle: &str, hours: i64) -> Record {
    let start = base_time() + Duration::hours(hours);
    Record::new(id, 1024 * (hours as u64 + 1), start, start + Duration::hours(1))
        .with_title(title)
        .with_subtitle(subtitle)
}

pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub clock: Arc<ManualClock>,
    pub fs: RecordingFs,
}

pub fn harness(records: Vec<Record>, options: FsOptions) -> Harness {
    let backend = Arc::new(MemoryBackend::with_records(records));
    let clock = Arc::new(ManualClock::new());
    let cache = TreeCache::with_clock(
        backend.clone(),
        TreeBuilder::default().deletable(options.allow_delete),
        DEFAULT_TTL,
        clock.clone(),
    );
    let fs = RecordingFs::new(Arc::new(cache), options);
    Harness { backend, clock, fs }
}
