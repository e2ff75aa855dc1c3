use lineforge::config::{Config, CycleTimeRule, Method};
use lineforge::error::LineError;
use lineforge::optimizer::{LocalSearchMode, SelectionWeighting};
use lineforge::pool::OutLimit;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_settings(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", body).unwrap();
    file
}

#[test]
fn shipped_settings_file_loads_and_validates() {
    let cfg = Config::load_from_file("data/settings.json").unwrap();
    assert_eq!(cfg.line.cycle_time, Some(12.0));
    assert_eq!(cfg.search.method, Method::Comsoal);
    assert_eq!(cfg.search.out, OutLimit::Count(4));
    assert_eq!(cfg.search.seed, Some(42));
    assert_eq!(cfg.genetic.generation, 50);
    assert!(cfg.validate().is_ok());
}

#[test]
fn every_section_round_trips_through_a_file() {
    let file = write_settings(
        r#"{
            "line": { "cycle_time_rule": "station_estimate", "u_shaped": true },
            "search": {
                "method": "hb",
                "local_search": "genetics",
                "out": "all",
                "weighting": "positional_weight",
                "time_limit": 3
            },
            "genetic": { "elites": 4, "tournament": 5 }
        }"#,
    );
    let cfg = Config::load_from_file(file.path()).unwrap();
    assert_eq!(cfg.line.cycle_time, None);
    assert_eq!(cfg.line.cycle_time_rule, CycleTimeRule::StationEstimate);
    assert!(cfg.line.u_shaped);
    assert_eq!(cfg.search.method, Method::Hb);
    assert_eq!(cfg.search.local_search, Some(LocalSearchMode::Genetics));
    assert_eq!(cfg.search.out, OutLimit::All);
    assert_eq!(cfg.search.weighting, SelectionWeighting::PositionalWeight);
    assert_eq!(cfg.search.time_limit, Some(3));
    assert_eq!(cfg.genetic.elites, 4);
    assert_eq!(cfg.genetic.tournament, 5);
    assert!(cfg.validate().is_ok());
}

#[test]
fn unknown_method_is_a_json_error() {
    let file = write_settings(r#"{ "search": { "method": "simulated_annealing" } }"#);
    assert!(matches!(
        Config::load_from_file(file.path()),
        Err(LineError::Json(_))
    ));
}

#[test]
fn zero_out_is_rejected_while_parsing() {
    let file = write_settings(r#"{ "search": { "out": 0 } }"#);
    assert!(Config::load_from_file(file.path()).is_err());
}

#[test]
fn validation_catches_bad_values() {
    let mut cfg = Config::default();
    cfg.line.cycle_time = Some(-1.0);
    assert!(matches!(cfg.validate(), Err(LineError::Config(_))));

    let mut cfg = Config::default();
    cfg.search.iteration = 0;
    assert!(matches!(cfg.validate(), Err(LineError::Config(_))));

    let mut cfg = Config::default();
    cfg.genetic.size = 0;
    assert!(matches!(cfg.validate(), Err(LineError::Config(_))));
}
