//! Repeated random corruption of one sorted table

use crate::common::*;
use fracture::{OffsetSource, Scenario, ScenarioRunner};

#[test]
fn test_random_sweep_never_returns_wrong_values() {
    for (family, engine) in engines() {
        let config = config_for(family).with_key_count(300).with_seed(0xfeed);
        let report = ScenarioRunner::new(engine, config).run(&Scenario::random_sweep(8));

        assert_fail_closed(&report);
        if report.passed() {
            assert_eq!(report.sweep.len(), 8, "{family}");
            assert!(report.sweep.iter().all(|c| c.source == OffsetSource::Random));
            assert!(report.sweep.iter().all(|c| c.offset < c.original_len));
        }
    }
}

#[test]
fn test_same_seed_picks_same_offsets() {
    for (family, engine) in engines() {
        let config = config_for(family).with_key_count(300).with_seed(42);
        let runner = ScenarioRunner::new(engine, config);
        let first = runner.run(&Scenario::random_sweep(3));
        let second = runner.run(&Scenario::random_sweep(3));

        assert!(first.corruption.is_some(), "{family}: {first:?}");
        let offset = |r: &fracture::ScenarioReport| r.corruption.as_ref().map(|c| c.offset);
        assert_eq!(offset(&first), offset(&second), "{family}");

        let sweep = |r: &fracture::ScenarioReport| {
            r.sweep.iter().map(|c| c.offset).collect::<Vec<_>>()
        };
        assert!(!first.sweep.is_empty(), "{family}: {first:?}");
        assert_eq!(sweep(&first), sweep(&second), "{family}");
        assert_ne!(first.run_id, second.run_id);
    }
}
