// End-to-end tests: synthetic log files through the full analyzer pipeline
mod common;

use common::{entry, exit, SyntheticLog};
use perf_log_decoder::{
    AnalysisConfig, Analyzer, DecoderError, Endianness, LoadMode, PerformanceIdentifier, Rgb,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn analyzer(dir: &TempDir) -> Analyzer {
    let _ = env_logger::builder().is_test(true).try_init();
    Analyzer::with_config(AnalysisConfig::new().with_notes_dir(dir.path()))
}

fn load(dir: &TempDir, paths: &[PathBuf]) -> Analyzer {
    let mut analyzer = analyzer(dir);
    analyzer.load_logs(paths, LoadMode::Replace).unwrap();
    analyzer
}

#[test]
fn test_id_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let ids_path = dir.path().join("ids.txt");

    let mut original = analyzer(&dir);
    original
        .add_identifier(
            PerformanceIdentifier::new(0x10)
                .with_name("SCH_MAIN")
                .with_color(Rgb(0x123456))
                .with_expected_frequency(1.0 / 3.0)
                .with_notes("runs, every minor frame"),
        )
        .unwrap();
    original.add_identifier(PerformanceIdentifier::new(0x11)).unwrap();
    original
        .add_identifier(PerformanceIdentifier::new(0x7fff_fffe).with_name("TO").with_expected_frequency(10.0))
        .unwrap();
    original.save_ids(&ids_path).unwrap();

    let mut reloaded = analyzer(&dir);
    let summary = reloaded.load_ids(&ids_path).unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.added, 3);

    for expected in original.registry().iter() {
        let actual = reloaded.identifier(expected.id).unwrap();
        assert_eq!(actual.color, expected.color);
        assert_eq!(actual.expected_frequency.to_bits(), expected.expected_frequency.to_bits());
        assert_eq!(actual.notes, expected.notes);
        assert_eq!(actual.name, expected.name);
    }

    // Loading never overwrites a name that is already set
    let mut named = analyzer(&dir);
    named.add_identifier(PerformanceIdentifier::new(0x10).with_name("mine")).unwrap();
    named.add_identifier(PerformanceIdentifier::new(0x11).with_name("local")).unwrap();
    named.load_ids(&ids_path).unwrap();
    assert_eq!(named.identifier(0x10).unwrap().name, "mine");
    assert_eq!(named.identifier(0x11).unwrap().name, "local");
}

#[test]
fn test_malformed_id_file_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let ids_path = dir.path().join("ids.txt");
    std::fs::write(&ids_path, "A,0x1,0x00ff00,0.000000,\nB,0x2\n").unwrap();

    let mut analyzer = analyzer(&dir);
    assert!(matches!(analyzer.load_ids(&ids_path), Err(DecoderError::Format { .. })));
    assert!(analyzer.registry().is_empty());
}

#[test]
fn test_gap_toggle_restores_exact_time_stamps() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        SyntheticLog::new(1, 0)
            .records(&[entry(1, 1234), exit(1, 1377)])
            .write(dir.path(), "a.dat"),
        SyntheticLog::new(2, 0)
            .records(&[entry(1, 7331), exit(1, 7919)])
            .write(dir.path(), "b.dat"),
        SyntheticLog::new(3, 0)
            .records(&[entry(2, 12_345), exit(2, 13_001)])
            .write(dir.path(), "c.dat"),
    ];
    let mut analyzer = load(&dir, &paths);

    let bits = |a: &Analyzer| -> Vec<u64> { a.events().iter().map(|e| e.time_stamp.to_bits()).collect() };
    let original = bits(&analyzer);
    let original_max = analyzer.maximum_time_stamp().to_bits();

    analyzer.set_show_gaps(false);
    assert_ne!(bits(&analyzer), original);
    assert!(analyzer.maximum_time_stamp() < f64::from_bits(original_max));

    analyzer.set_show_gaps(true);
    assert_eq!(bits(&analyzer), original);
    assert_eq!(analyzer.maximum_time_stamp().to_bits(), original_max);
}

#[test]
fn test_hidden_gaps_keep_durations() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        SyntheticLog::new(1, 0)
            .ticks_per_second(1024)
            .records(&[entry(1, 0), exit(1, 512)])
            .write(dir.path(), "a.dat"),
        SyntheticLog::new(9, 0)
            .ticks_per_second(1024)
            .records(&[entry(1, 8192), exit(1, 8704)])
            .write(dir.path(), "b.dat"),
    ];
    let mut analyzer = load(&dir, &paths);
    let shown = analyzer.identifier(1).unwrap().stats;

    analyzer.set_show_gaps(false);
    let hidden = analyzer.identifier(1).unwrap().stats;

    assert_eq!(shown.total_active, 1.0);
    assert_eq!(hidden.total_active, 1.0);
    assert_eq!(shown.avg_frequency, hidden.avg_frequency);
    assert_eq!(analyzer.statistics().total_active, 1.0);
}

#[test]
fn test_extremum_keeps_first_occurrence() {
    let dir = TempDir::new().unwrap();
    // Active durations 2, 1, 3, 1 and 3 seconds
    let path = SyntheticLog::new(1, 0)
        .records(&[
            entry(1, 0),
            exit(1, 2000),
            entry(1, 10_000),
            exit(1, 11_000),
            entry(1, 20_000),
            exit(1, 23_000),
            entry(1, 30_000),
            exit(1, 31_000),
            entry(1, 40_000),
            exit(1, 43_000),
        ])
        .write(dir.path(), "a.dat");
    let analyzer = load(&dir, &[path]);

    let stats = analyzer.identifier(1).unwrap().stats;
    let min = stats.active.min.unwrap();
    let max = stats.active.max.unwrap();
    assert_eq!((min.value, min.time_stamp), (1.0, 10.0));
    assert_eq!((max.value, max.time_stamp), (3.0, 20.0));

    let aggregate = analyzer.statistics().active.max.unwrap();
    assert_eq!((aggregate.value, aggregate.time_stamp, aggregate.id), (3.0, 20.0, 1));
}

#[test]
fn test_overlapping_activity_counted_once() {
    let dir = TempDir::new().unwrap();
    let path = SyntheticLog::new(1, 0)
        .records(&[entry(1, 0), entry(2, 5000), exit(1, 10_000), exit(2, 15_000)])
        .write(dir.path(), "a.dat");
    let analyzer = load(&dir, &[path]);

    let a = analyzer.identifier(1).unwrap().stats.total_active;
    let b = analyzer.identifier(2).unwrap().stats.total_active;
    assert_eq!(a + b, 20.0);
    assert_eq!(analyzer.statistics().total_active, 15.0);
    assert_eq!(analyzer.statistics().total_inactive(), 0.0);
}

#[test]
fn test_sequence_error_excluded_from_durations() {
    let dir = TempDir::new().unwrap();
    let path = SyntheticLog::new(1, 0)
        .records(&[entry(1, 0), entry(1, 1000), exit(1, 2000)])
        .write(dir.path(), "a.dat");
    let analyzer = load(&dir, &[path]);

    let flags: Vec<bool> = analyzer.events().iter().map(|e| e.sequence_error).collect();
    assert_eq!(flags, vec![false, true, false]);
    assert_eq!(analyzer.consistency().consecutive_events, 1);

    let stats = analyzer.identifier(1).unwrap().stats;
    assert_eq!(stats.entry_count, 2);
    assert_eq!(stats.exit_count, 1);
    assert_eq!(stats.interval.min, None);
    assert_eq!(stats.total_active, 2.0);
    let active = stats.active.max.unwrap();
    assert_eq!((active.value, active.time_stamp), (2.0, 0.0));
}

#[test]
fn test_overrun_against_expected_frequency() {
    let dir = TempDir::new().unwrap();
    let path = SyntheticLog::new(1, 0)
        .records(&[entry(1, 0), exit(1, 200), entry(1, 1000), exit(1, 1100)])
        .write(dir.path(), "a.dat");

    let mut analyzer = analyzer(&dir);
    analyzer
        .add_identifier(PerformanceIdentifier::new(1).with_expected_frequency(2.0))
        .unwrap();
    analyzer.load_logs(&[path], LoadMode::Replace).unwrap();

    let overruns: Vec<f64> = analyzer.events().iter().map(|e| e.overrun).collect();
    assert_eq!(overruns, vec![0.0, 0.0, 0.5, 0.0]);
    assert!(analyzer.statistics().overrun_detected);

    let stats = analyzer.identifier(1).unwrap().stats;
    let max = stats.overrun.max.unwrap();
    assert_eq!((max.value, max.time_stamp), (0.5, 1.0));
    let interval = stats.interval.min.unwrap();
    assert_eq!((interval.value, interval.time_stamp), (1.0, 0.0));
}

#[test]
fn test_active_at_end_runs_to_last_event() {
    let dir = TempDir::new().unwrap();
    let path = SyntheticLog::new(1, 0)
        .records(&[entry(1, 0), entry(2, 1000), exit(2, 3000)])
        .write(dir.path(), "a.dat");
    let analyzer = load(&dir, &[path]);

    assert_eq!(analyzer.identifier(1).unwrap().stats.total_active, 3.0);
    assert_eq!(analyzer.statistics().total_active, 3.0);
}

#[test]
fn test_little_endian_metadata() {
    let dir = TempDir::new().unwrap();
    let path = SyntheticLog::new(1, 0)
        .little_endian()
        .ticks_per_second(0x0102_0304)
        .records(&[entry(1, 0), exit(1, 0x0102_0304)])
        .write(dir.path(), "le.dat");
    let analyzer = load(&dir, &[path]);

    let header = analyzer.headers().next().unwrap();
    assert_eq!(header.endianness, Endianness::Little);
    assert_eq!(header.ticks_per_second, 0x0102_0304);
    assert_ne!(header.ticks_per_second, 0x0403_0201);
    assert_eq!(analyzer.events()[1].time_stamp, 1.0);
    assert_eq!(analyzer.time_precision(), 8);
}

#[test]
fn test_merge_follows_capture_time() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        SyntheticLog::new(10, 0)
            .records(&[entry(1, 10_000), exit(1, 10_500)])
            .write(dir.path(), "first.dat"),
        SyntheticLog::new(5, 0)
            .records(&[entry(2, 5000), exit(2, 5200)])
            .write(dir.path(), "second.dat"),
        SyntheticLog::new(20, 0)
            .records(&[entry(3, 20_000)])
            .write(dir.path(), "third.dat"),
    ];
    let analyzer = load(&dir, &paths);

    let ids: Vec<u32> = analyzer.events().iter().map(|e| e.perf_id).collect();
    assert_eq!(ids, vec![2, 2, 1, 1, 3]);
    let gaps: Vec<usize> = analyzer.gaps().iter().map(|g| g.index).collect();
    assert_eq!(gaps, vec![2, 4]);
    assert_eq!(analyzer.events()[2].time_stamp, 5.0);
    assert_eq!(analyzer.gaps()[0].duration, 5.0 - 0.2 - 0.001);

    let files: Vec<String> = analyzer.headers().map(|h| h.file_name()).collect();
    assert_eq!(files, vec!["second.dat", "first.dat", "third.dat"]);
}

#[test]
fn test_capacity_boundary() {
    let dir = TempDir::new().unwrap();
    let path = SyntheticLog::new(1, 0)
        .mask_words(1)
        .records(&[entry(31, 0), entry(32, 100), exit(31, 200), exit(32, 300)])
        .write(dir.path(), "cap.dat");

    let mut analyzer = analyzer(&dir);
    let report = analyzer.load_logs(&[path], LoadMode::Replace).unwrap();

    assert_eq!(analyzer.maximum_ids(), 32);
    assert_eq!(report.excluded_events, 2);
    assert_eq!(report.distinct_ids, 1);
    assert!(analyzer.events().iter().all(|e| e.perf_id == 31));
    assert!(analyzer.identifier(32).is_none());
}

#[test]
fn test_no_readable_file() {
    let dir = TempDir::new().unwrap();
    let empty = SyntheticLog::new(1, 0).write(dir.path(), "empty.dat");
    let missing = dir.path().join("missing.dat");

    let mut analyzer = analyzer(&dir);
    match analyzer.load_logs(&[empty, missing], LoadMode::Replace) {
        Err(DecoderError::NoLogData(failures)) => assert_eq!(failures.len(), 1),
        other => panic!("expected NoLogData, got {:?}", other.map(|r| r.event_count)),
    }
    assert!(!analyzer.has_log_data());
}
