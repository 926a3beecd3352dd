//! Builds driven by a TOML config file.

use anyhow::Result;
use pathstore::config::load_build_config;
use pathstore::{build, EmptyEntityPolicy, EntityKey, MatrixStore, Value};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_build_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("lab.csv"),
        "test_code,practice_code,month,result_category,count\n\
         ALT,P1,2019-01-01,0,5\n\
         ALT,P2,2019-02-01,1,1-5\n",
    )?;
    fs::write(
        dir.path().join("stats.csv"),
        "month,practice,total_list_size\n2019-02-01,P2,950\n",
    )?;
    fs::write(dir.path().join("practices.txt"), "# practices\nP1\nP2\nP3\n")?;
    fs::write(dir.path().join("tests.txt"), "ALT\nTSH\n")?;

    let config_path = dir.path().join("build.toml");
    fs::write(
        &config_path,
        r#"
[build]
output = "out/store.sqlite"
end_date = "2019-02"
months = 2
empty_entities = "retain"
practice_list = "practices.txt"
test_code_list = "tests.txt"

[sources]
test_results = ["lab.csv"]
practice_statistics = ["stats.csv"]
"#,
    )?;

    let config = load_build_config(&config_path)?;
    assert_eq!(config.empty_entities, EmptyEntityPolicy::Retain);
    assert_eq!(config.jobs.len(), 2);

    let summary = build(&config)?;
    assert_eq!(summary.output, dir.path().join("out/store.sqlite"));
    assert_eq!(summary.practices, 3);
    assert_eq!(summary.dates, 2);

    let store = MatrixStore::open(&summary.output)?;
    assert_eq!(store.entity_keys()?.len(), 20);
    assert_eq!(store.fetch(&EntityKey::new("ALT", 0), "P1", "2019-01-01")?, Value::Int(5));
    assert_eq!(store.fetch(&EntityKey::new("ALT", 1), "P2", "2019-02-01")?, Value::Int(3));
    assert_eq!(store.fetch(&EntityKey::new("TSH", 0), "P3", "2019-02-01")?, Value::Int(0));
    assert_eq!(store.statistic("total_list_size", "P2", "2019-02-01")?, Value::Int(950));
    Ok(())
}

#[test]
fn test_config_rejects_existing_output() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("lab.csv"), "test_code,practice_code,month,result_category,count\n")?;
    fs::write(dir.path().join("store.sqlite"), b"existing")?;

    let config_path = dir.path().join("build.toml");
    fs::write(
        &config_path,
        r#"
[build]
output = "store.sqlite"
end_date = "2019-02"

[sources]
test_results = ["lab.csv"]
"#,
    )?;

    let err = load_build_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert_eq!(fs::read(dir.path().join("store.sqlite"))?, b"existing");
    Ok(())
}

#[test]
fn test_config_missing_list_file() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("lab.csv"), "test_code,practice_code,month,result_category,count\n")?;

    let config_path = dir.path().join("build.toml");
    fs::write(
        &config_path,
        r#"
[build]
output = "store.sqlite"
end_date = "2019-02"
practice_list = "nowhere.txt"

[sources]
test_results = ["lab.csv"]
"#,
    )?;

    let err = load_build_config(&config_path).unwrap_err();
    assert!(err.to_string().contains("nowhere.txt"));
    Ok(())
}
