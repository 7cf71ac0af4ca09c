//! The shipped example configuration must always resolve.

use bench_core::{BenchConfig, ValueRule};
use bench_generator::BatchGenerator;
use schema_bench::{check, CheckArgs};
use std::path::PathBuf;
use tokio_test::assert_ok;

fn example_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs/example.yaml")
}

#[test]
fn test_example_config_resolves() {
    let config = assert_ok!(BenchConfig::from_file(example_path()));
    assert_eq!(config.scenario_names(), vec!["events_layouts", "smoke"]);

    let scenario = assert_ok!(config.scenario("events_layouts"));
    assert_eq!(scenario.schemas.len(), 3);
    assert_eq!(scenario.params.batch_count(), 20);

    let projection = &scenario.schemas[2];
    assert_eq!(projection.post_create.len(), 1);
    assert_eq!(
        projection.post_create[0].render("t"),
        vec![
            "ALTER TABLE t ADD PROJECTION by_user (SELECT * ORDER BY user_id)".to_string(),
            "ALTER TABLE t MATERIALIZE PROJECTION by_user".to_string(),
        ]
    );

    let ordered: Vec<bool> = scenario.queries.iter().map(|q| q.ordered).collect();
    assert_eq!(ordered, vec![true, false, false]);

    let amount = &scenario.dataset.columns[4];
    assert!(matches!(
        amount.rule,
        ValueRule::Nullable { null_probability, .. } if null_probability == 0.7
    ));
}

#[test]
fn test_example_dataset_generates() {
    let config = assert_ok!(BenchConfig::from_file(example_path()));
    let scenario = assert_ok!(config.scenario("smoke"));
    let params = &scenario.params;

    let mut generator =
        BatchGenerator::new(scenario.dataset.clone(), params.seed, params.row_count, params.batch_size);
    let mut rows = 0;
    while let Some(batch) = generator.next_batch() {
        assert!(batch
            .rows
            .iter()
            .all(|row| row.len() == scenario.dataset.columns.len()));
        rows += batch.rows.len();
    }
    assert_eq!(rows as u64, params.row_count);
}

#[test]
fn test_check_command_accepts_example() {
    let status = assert_ok!(check(CheckArgs {
        config: example_path(),
        scenario: None,
    }));
    assert!(status.is_success());
}

#[test]
fn test_smoke_runs_every_example_query() {
    let config = assert_ok!(BenchConfig::from_file(example_path()));
    let names = |scenario: &str| -> Vec<String> {
        config
            .scenario(scenario)
            .map(|s| s.queries.iter().map(|q| q.name.clone()).collect())
            .unwrap_or_default()
    };
    assert_eq!(names("smoke"), names("events_layouts"));

    // Cells are compared exactly, so no aggregate may sum the Float64 column.
    let scenario = assert_ok!(config.scenario("events_layouts"));
    for query in &scenario.queries {
        assert!(!query.template.contains("sum(amount)"), "{}", query.name);
    }
}
