// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scenario file integration tests
//!
//! Loads TOML scenarios from disk and runs them end to end.

use commwait_sim::{run, ConfigError, Outcome, ScenarioConfig};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_scenario(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write scenario");
    file
}

#[test]
fn test_generated_example_loads_and_runs() {
    let file = write_scenario(&ScenarioConfig::example().to_toml().unwrap());

    let config = ScenarioConfig::from_file(file.path()).unwrap();
    let report = run(&config).unwrap();

    assert_eq!(
        report.outcome,
        Outcome::Completed {
            index: 1,
            name: "b".into()
        }
    );
    assert_eq!(report.resumed_at, Duration::from_secs(2));
}

#[test]
fn test_timeout_scenario_from_file() {
    let file = write_scenario(
        r#"
name = "neither"
timeout_secs = 3.0

[[activities]]
name = "a"
state = "never"

[[activities]]
name = "b"
state = "never"
"#,
    );

    let config = ScenarioConfig::from_file(file.path()).unwrap();
    let report = run(&config).unwrap();

    assert_eq!(report.outcome, Outcome::NoCompletion);
    assert_eq!(report.resumed_at, Duration::from_secs(3));
}

#[test]
fn test_same_instant_tie_reports_lowest_index() {
    let file = write_scenario(
        r#"
timeout_secs = 10.0

[[activities]]
name = "slow"
state = "done"
at_secs = 5.0

[[activities]]
name = "left"
state = "cancelled"
at_secs = 1.0

[[activities]]
name = "right"
state = "done"
at_secs = 1.0
"#,
    );

    let report = run(&ScenarioConfig::from_file(file.path()).unwrap()).unwrap();
    assert_eq!(
        report.outcome,
        Outcome::Completed {
            index: 1,
            name: "left".into()
        }
    );
    assert_eq!(report.resumed_at, Duration::from_secs(1));
}

#[test]
fn test_malformed_file_reports_toml_error() {
    let file = write_scenario("timeout_secs = [not toml");
    assert!(matches!(
        ScenarioConfig::from_file(file.path()),
        Err(ConfigError::Toml(_))
    ));
}

#[test]
fn test_missing_file_reports_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    assert!(matches!(
        ScenarioConfig::from_file(missing),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn test_unknown_state_rejected() {
    let file = write_scenario(
        r#"
[[activities]]
name = "a"
state = "exploded"
"#,
    );
    assert!(ScenarioConfig::from_file(file.path()).is_err());
}
