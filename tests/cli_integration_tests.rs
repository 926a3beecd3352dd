//! Integration tests for the pathstore command-line interface.

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn pathstore(args: &[&str]) -> Result<Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_pathstore")).args(args).output()?)
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn write_lab(dir: &Path) -> Result<std::path::PathBuf> {
    let path = dir.join("lab.csv");
    fs::write(
        &path,
        "test_code,practice_code,month,result_category,count\n\
         ALT,A81001,2019-01-01,-1,4\n\
         ALT,A81001,2019-02-01,0,12\n\
         FBC,A81002,2019-02-01,0,1-5\n",
    )?;
    Ok(path)
}

#[test]
fn test_build_then_fetch() -> Result<()> {
    let dir = tempdir()?;
    let lab = write_lab(dir.path())?;
    let store = dir.path().join("store.sqlite");

    let output = pathstore(&[
        "build",
        "-o",
        path_arg(&store),
        "-e",
        "2019-02",
        "-m",
        "2",
        "-s",
        path_arg(&lab),
    ])?;
    assert!(output.status.success(), "build failed: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 x 2"), "unexpected summary: {}", stdout);
    assert!(store.exists());

    let output = pathstore(&[
        "fetch", path_arg(&store), "-t", "ALT", "-c", "-1", "-p", "A81001", "-d", "2019-01-01",
    ])?;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "4");

    let output = pathstore(&[
        "fetch", path_arg(&store), "-t", "FBC", "-p", "A81002", "-d", "2019-02-01",
    ])?;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "3");

    let output = pathstore(&[
        "fetch", path_arg(&store), "-t", "ALT", "-p", "A81002", "-d", "2019-02-01",
    ])?;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "0");
    Ok(())
}

#[test]
fn test_fetch_unknown_practice_fails() -> Result<()> {
    let dir = tempdir()?;
    let lab = write_lab(dir.path())?;
    let store = dir.path().join("store.sqlite");
    let output = pathstore(&[
        "build", "-o", path_arg(&store), "-e", "2019-02", "-m", "2", "-s", path_arg(&lab),
    ])?;
    assert!(output.status.success());

    let output = pathstore(&[
        "fetch", path_arg(&store), "-t", "ALT", "-p", "Z99999", "-d", "2019-02-01",
    ])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Z99999"));
    Ok(())
}

#[test]
fn test_build_refuses_existing_output() -> Result<()> {
    let dir = tempdir()?;
    let lab = write_lab(dir.path())?;
    let store = dir.path().join("store.sqlite");
    fs::write(&store, b"keep me")?;

    let output = pathstore(&[
        "build", "-o", path_arg(&store), "-e", "2019-02", "-s", path_arg(&lab),
    ])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
    assert_eq!(fs::read(&store)?, b"keep me");
    Ok(())
}

#[test]
fn test_inspect_summary_and_test_code() -> Result<()> {
    let dir = tempdir()?;
    let lab = write_lab(dir.path())?;
    let store = dir.path().join("store.sqlite");
    let output = pathstore(&[
        "build", "-o", path_arg(&store), "-e", "2019-02", "-m", "2", "-s", path_arg(&lab),
    ])?;
    assert!(output.status.success());

    let output = pathstore(&["inspect", path_arg(&store)])?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Shape:       2x2"), "unexpected output: {}", stdout);
    assert!(stdout.contains("across 2 test codes"));
    assert!(stdout.contains("Statistics:  none"));

    let output = pathstore(&["inspect", path_arg(&store), "-t", "ALT"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 nonzero cells"));
    assert!(stdout.contains("absent"));

    let output = pathstore(&["inspect", path_arg(&store), "--dump"])?;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l == "practice|0|A81001"));
    assert!(stdout.lines().any(|l| l == "date|1|2019-02-01"));
    Ok(())
}

#[test]
fn test_build_from_config() -> Result<()> {
    let dir = tempdir()?;
    write_lab(dir.path())?;
    let config = dir.path().join("build.toml");
    fs::write(
        &config,
        r#"
[build]
output = "store.sqlite"
end_date = "2019-02"
months = 2

[sources]
test_results = ["lab.csv"]
"#,
    )?;

    let output = pathstore(&["build-from-config", path_arg(&config)])?;
    assert!(output.status.success(), "build failed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("store.sqlite").exists());
    Ok(())
}

#[test]
fn test_fetch_requires_test_code_or_statistic() -> Result<()> {
    let output = pathstore(&["fetch", "store.sqlite", "-p", "A81001", "-d", "2019-01-01"])?;
    assert!(!output.status.success());
    Ok(())
}
