use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sense_logger::config::{AppConfig, DatabaseConfig, StorageBackend};
use sense_logger::database::DatabaseStore;
use sense_logger::{parse_export, DataPointStore, MemoryStore, TelemetryEngine, TickOutcome};
use tempfile::TempDir;

fn memory_engine() -> TelemetryEngine {
    TelemetryEngine::new(Arc::new(MemoryStore::new()), 10)
}

#[test]
fn rate_requests_are_clamped() {
    let engine = memory_engine();

    assert_eq!(engine.set_rate(0), 1);
    assert_eq!(engine.rate(), 1);
    assert_eq!(engine.set_rate(50), 30);
    assert_eq!(engine.rate(), 30);

    for requested in -3..40 {
        engine.set_rate(requested);
        assert_eq!(i64::from(engine.rate()), requested.clamp(1, 30));
    }
}

#[test]
fn single_location_update_marks_exactly_one_record() {
    let engine = memory_engine();
    engine.set_logging_enabled(true);

    engine.update_acceleration(0.0, 0.0, 9.8);
    assert!(engine.tick().is_appended());

    engine.update_location(1.0, 2.0, 3.0, 4);
    assert!(engine.tick().is_appended());

    engine.update_rotation(0.1, 0.1, 0.1);
    assert!(engine.tick().is_appended());

    let text = engine.export().unwrap();
    let body: Vec<&str> = text.lines().skip(4).collect();
    assert_eq!(body.len(), 4);
    assert!(!body[0].starts_with('+'));
    assert!(!body[1].starts_with('+'));
    assert_eq!(body[2], "+ 3 4 1 2");
    assert!(!body[3].starts_with('+'));
    assert_eq!(text.matches("+ 3 4 1 2").count(), 1);
}

#[test]
fn disabled_logging_records_nothing() {
    let engine = memory_engine();
    engine.set_logging_enabled(false);

    for i in 0..10 {
        engine.update_acceleration(i as f64, 1.0, 2.0);
        engine.update_compass(0.0, i as f64, 0.0);
        assert_eq!(engine.tick(), TickOutcome::Skipped);
    }

    assert_eq!(engine.count().unwrap(), 0);
}

#[test]
fn count_tracks_ticks_and_clear_is_idempotent() {
    let engine = memory_engine();
    engine.clear().unwrap();
    assert_eq!(engine.count().unwrap(), 0);

    engine.set_logging_enabled(true);
    for _ in 0..7 {
        engine.tick();
    }
    assert_eq!(engine.count().unwrap(), 7);

    engine.clear().unwrap();
    engine.clear().unwrap();
    assert_eq!(engine.count().unwrap(), 0);
}

#[test]
fn export_parses_back_to_stored_records() {
    let store = Arc::new(MemoryStore::new());
    let engine = TelemetryEngine::new(store.clone(), 10);
    engine.set_logging_enabled(true);

    for i in 0..6 {
        let v = i as f64 / 3.0;
        engine.update_acceleration(v, -v, 9.81 + v);
        engine.update_rotation(v * 0.1, 0.0, -v);
        engine.update_compass(100.0 - v, v, 0.5);
        if i % 2 == 1 {
            engine.update_location(37.0 + v, -122.0 - v, 10.0 * v, i);
        }
        engine.tick();
    }
    engine.set_rate(17);

    let parsed = parse_export(&engine.export().unwrap()).unwrap();
    assert_eq!(parsed.rate, 17);
    assert_eq!(parsed.data_points, store.all().unwrap());
    assert_eq!(
        parsed.data_points.iter().filter(|p| p.location_changed).count(),
        3
    );
}

#[test]
fn timestamps_are_non_decreasing_in_store_order() {
    let engine = memory_engine();
    engine.set_logging_enabled(true);
    for _ in 0..20 {
        engine.tick();
    }

    let parsed = parse_export(&engine.export().unwrap()).unwrap();
    assert!(parsed
        .data_points
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
}

#[test]
fn concurrent_feeds_and_timer_report_each_location_at_most_once() {
    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(TelemetryEngine::new(store.clone(), 30));
    engine.set_logging_enabled(true);
    engine.set_rate(30);

    let feeds: Vec<_> = (0..3)
        .map(|channel| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..200 {
                    let v = i as f64;
                    match channel {
                        0 => engine.update_acceleration(v, v, v),
                        1 => engine.update_rotation(v, v, v),
                        _ => engine.update_compass(v, v, v),
                    }
                    thread::sleep(Duration::from_micros(200));
                }
            })
        })
        .collect();

    let location_updates = 5;
    for i in 0..location_updates {
        engine.update_location(i as f64, i as f64, 0.0, i);
        // 人工 tick 与定时器 tick 互斥执行
        engine.tick();
    }
    for feed in feeds {
        feed.join().unwrap();
    }

    let changed = store
        .all()
        .unwrap()
        .iter()
        .filter(|p| p.location_changed)
        .count();
    assert_eq!(changed, location_updates as usize);
}

#[test]
fn timer_driven_engine_with_duckdb_store() {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.database = DatabaseConfig {
        backend: StorageBackend::Duckdb,
        path: dir.path().join("db/telemetry.db").to_string_lossy().into_owned(),
        ..DatabaseConfig::default()
    };
    config.sampling.rate = 30;
    config.sampling.logging_enabled = true;

    let engine = TelemetryEngine::from_config(&config).unwrap();
    engine.update_location(10.0, 20.0, 30.0, 2);

    let deadline = Instant::now() + Duration::from_secs(5);
    while engine.count().unwrap() < 5 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    engine.set_logging_enabled(false);
    // 等待可能正在进行的 tick 完成
    thread::sleep(Duration::from_millis(100));

    let count = engine.count().unwrap();
    assert!(count >= 5);

    let export_path = dir.path().join("out/export.txt");
    engine.export_to_file(&export_path).unwrap();
    let parsed = parse_export(&std::fs::read_to_string(&export_path).unwrap()).unwrap();
    assert_eq!(parsed.rate, 30);
    assert_eq!(parsed.data_points.len(), count);
    assert_eq!(
        parsed.data_points.iter().filter(|p| p.location_changed).count(),
        1
    );
}

#[test]
fn duckdb_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        path: dir.path().join("telemetry.db").to_string_lossy().into_owned(),
        ..DatabaseConfig::default()
    };

    {
        let store: Arc<dyn DataPointStore> = Arc::new(DatabaseStore::open(&config).unwrap());
        let engine = TelemetryEngine::new(store, 5);
        engine.set_logging_enabled(true);
        engine.update_compass(1.0, 2.0, 3.0);
        engine.tick();
        engine.tick();
    }

    let reopened = DatabaseStore::open(&config).unwrap();
    let records = reopened.all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].compass.z, 3.0);
}
