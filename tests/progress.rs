//! Tests for extraction progress reporting.
//!
//! The reporting thread publishes `Start`, then `Handling` at the poll
//! interval, then exactly one terminal `Completed` or `Error` event.

mod common;

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use zipvault::progress::{self, INTERRUPTED_MESSAGE};
use zipvault::{ExtractOptions, ProgressEvent, ProgressMonitor, WriteOptions};

use common::{random_bytes, write_tree};

fn archive_of(temp: &TempDir, size: usize) -> PathBuf {
    let source = temp.path().join("src");
    write_tree(
        &source,
        &[
            ("first.bin", &random_bytes(size, 1)),
            ("second.bin", &random_bytes(size, 2)),
        ],
    );
    zipvault::create_archive(&source, "", true, &WriteOptions::new())
        .unwrap()
        .archive_path
}

fn assert_well_formed(events: &[ProgressEvent]) {
    assert_eq!(events.first(), Some(&ProgressEvent::Start));
    let terminal = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminal, 1, "{events:?}");
    assert!(events.last().is_some_and(ProgressEvent::is_terminal), "{events:?}");
}

#[test]
fn test_successful_extraction_events() {
    let temp = TempDir::new().unwrap();
    let archive = archive_of(&temp, 2 * 1024 * 1024);

    let (tx, rx) = progress::channel();
    let options = ExtractOptions::new()
        .progress(tx)
        .poll_interval(Duration::from_millis(5));
    zipvault::extract(&archive, temp.path().join("out"), &options).unwrap();

    let events: Vec<ProgressEvent> = rx.try_iter().collect();
    assert_well_formed(&events);
    assert_eq!(events.last(), Some(&ProgressEvent::Completed));

    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Handling { percent } => Some(*percent),
            _ => None,
        })
        .collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert_eq!(percents.last(), Some(&100));
    assert_eq!(percents.iter().filter(|p| **p == 100).count(), 1);
    assert_eq!(
        events[events.len() - 2],
        ProgressEvent::Handling { percent: 100 }
    );
}

#[test]
fn test_decode_failure_is_published() {
    let temp = TempDir::new().unwrap();
    let archive = archive_of(&temp, 64 * 1024);

    // Corrupt the first entry's payload; the structure stays valid
    let mut data = fs::read(&archive).unwrap();
    data[30 + "first.bin".len() + 1000] ^= 0xFF;
    fs::write(&archive, &data).unwrap();

    let (tx, rx) = progress::channel();
    let options = ExtractOptions::new()
        .progress(tx)
        .poll_interval(Duration::from_millis(5));
    let err = zipvault::extract(&archive, temp.path().join("out"), &options).unwrap_err();

    let events: Vec<ProgressEvent> = rx.try_iter().collect();
    assert_well_formed(&events);
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::Error {
            message: err.to_string()
        })
    );
}

#[test]
fn test_interrupted_reporting_does_not_stop_extraction() {
    let temp = TempDir::new().unwrap();
    let archive = archive_of(&temp, 256 * 1024);

    let monitor = ProgressMonitor::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let monitor = monitor.clone();
        let events = Arc::clone(&events);
        move |event: ProgressEvent| {
            if event == ProgressEvent::Start {
                monitor.interrupt_reporting();
            }
            events.lock().unwrap().push(event);
        }
    };

    let options = ExtractOptions::new()
        .progress(sink)
        .monitor(monitor.clone())
        .poll_interval(Duration::from_millis(5));
    let out = temp.path().join("out");
    let result = zipvault::extract(&archive, &out, &options).unwrap();
    assert_eq!(result.entries_extracted, 2);
    assert_eq!(fs::read(out.join("second.bin")).unwrap(), random_bytes(256 * 1024, 2));

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            ProgressEvent::Start,
            ProgressEvent::Error {
                message: INTERRUPTED_MESSAGE.to_string()
            }
        ]
    );
}

#[test]
fn test_interrupt_before_extraction_is_kept() {
    let temp = TempDir::new().unwrap();
    let archive = archive_of(&temp, 64 * 1024);

    let monitor = ProgressMonitor::new();
    monitor.interrupt_reporting();
    let (tx, rx) = progress::channel();
    let options = ExtractOptions::new()
        .progress(tx)
        .monitor(monitor)
        .poll_interval(Duration::from_millis(5));
    let result = zipvault::extract(&archive, temp.path().join("out"), &options).unwrap();
    assert_eq!(result.entries_extracted, 2);

    let events: Vec<ProgressEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            ProgressEvent::Start,
            ProgressEvent::Error {
                message: INTERRUPTED_MESSAGE.to_string()
            }
        ]
    );
}

#[test]
fn test_monitor_reflects_finished_extraction() {
    let temp = TempDir::new().unwrap();
    let archive = archive_of(&temp, 10_000);

    let monitor = ProgressMonitor::new();
    let options = ExtractOptions::new().monitor(monitor.clone());
    zipvault::extract(&archive, temp.path().join("out"), &options).unwrap();

    assert!(monitor.is_finished());
    assert_eq!(monitor.percent(), 100);
    assert_eq!(monitor.consumed(), 20_000);
    assert_eq!(monitor.total(), 20_000);
    assert_eq!(monitor.snapshot().error, None);
}

#[test]
fn test_open_failure_is_single_error_event() {
    let temp = TempDir::new().unwrap();
    let (tx, rx) = progress::channel();
    let options = ExtractOptions::new().progress(tx);

    let err = zipvault::extract(temp.path().join("absent.zip"), temp.path(), &options).unwrap_err();
    let events: Vec<ProgressEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![ProgressEvent::Error {
            message: err.to_string()
        }]
    );
}

#[test]
fn test_empty_archive_completes() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("empty");
    fs::create_dir(&source).unwrap();
    let archive = zipvault::create_archive(&source, "", true, &WriteOptions::new())
        .unwrap()
        .archive_path;

    let (tx, rx) = progress::channel();
    let options = ExtractOptions::new()
        .progress(tx)
        .poll_interval(Duration::from_millis(5));
    zipvault::extract(&archive, temp.path().join("out"), &options).unwrap();

    let events: Vec<ProgressEvent> = rx.try_iter().collect();
    assert_eq!(events.first(), Some(&ProgressEvent::Start));
    assert_eq!(events.last(), Some(&ProgressEvent::Completed));
}
