use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::build::{BuildConfig, EmptyEntityPolicy};
use crate::dimensions::{read_code_list, PracticeSelection};
use crate::import::ImportJob;

#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub build: BuildSettings,
    #[serde(default)]
    pub sources: SourceSettings,
}

#[derive(Debug, Deserialize)]
pub struct BuildSettings {
    pub output: PathBuf,
    pub end_date: String,
    pub months: Option<u32>,
    #[serde(default)]
    pub empty_entities: EmptyEntityPolicy,
    /// File of practice codes to use instead of scanning the sources
    pub practice_list: Option<PathBuf>,
    /// File of canonical test codes whose entities are always created
    pub test_code_list: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceSettings {
    #[serde(default)]
    pub test_results: Vec<PathBuf>,
    #[serde(default)]
    pub practice_statistics: Vec<PathBuf>,
}

pub fn parse_build_config(path: &Path) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path)
        .context(format!("Failed to read config file: {}", path.display()))?;

    let config: ConfigFile = toml::from_str(&contents)
        .context("Failed to parse TOML config")?;

    if config.sources.test_results.is_empty() && config.sources.practice_statistics.is_empty() {
        return Err(anyhow!("Config must list at least one source file in [sources]"));
    }

    if config.build.months == Some(0) {
        return Err(anyhow!("Config error: months must be positive"));
    }

    Ok(config)
}

pub fn validate_build_config(config: &ConfigFile, config_dir: &Path) -> Result<()> {
    let output = resolve_path(config_dir, &config.build.output);
    if output.exists() {
        return Err(anyhow!("Output already exists: {}", output.display()));
    }

    let sources = config
        .sources
        .test_results
        .iter()
        .chain(&config.sources.practice_statistics);
    let lists = config
        .build
        .practice_list
        .iter()
        .chain(&config.build.test_code_list);

    for file_path in sources.chain(lists) {
        let abs_path = resolve_path(config_dir, file_path);
        if !abs_path.exists() {
            return Err(anyhow!("File not found: {}", abs_path.display()));
        }
    }

    Ok(())
}

/// Turn a parsed config file into a [`BuildConfig`], resolving every path
/// against `config_dir` and reading any code lists it names.
pub fn to_build_config(config: &ConfigFile, config_dir: &Path) -> Result<BuildConfig> {
    let resolve_all = |paths: &[PathBuf]| -> Vec<PathBuf> {
        paths.iter().map(|p| resolve_path(config_dir, p)).collect()
    };

    let practices = match &config.build.practice_list {
        Some(list) => {
            let path = resolve_path(config_dir, list);
            let codes = read_code_list(&path)
                .with_context(|| format!("Failed to read practice list: {}", path.display()))?;
            PracticeSelection::Listed(codes)
        }
        None => PracticeSelection::ObservedInWindow,
    };

    let test_codes = match &config.build.test_code_list {
        Some(list) => {
            let path = resolve_path(config_dir, list);
            read_code_list(&path)
                .with_context(|| format!("Failed to read test code list: {}", path.display()))?
        }
        None => Vec::new(),
    };

    let mut build = BuildConfig::new(
        resolve_path(config_dir, &config.build.output),
        config.build.end_date.clone(),
    )
    .with_practices(practices)
    .with_empty_entities(config.build.empty_entities);
    build.months = config.build.months;

    if !config.sources.test_results.is_empty() || !test_codes.is_empty() {
        build = build.with_job(ImportJob::TestResults {
            sources: resolve_all(&config.sources.test_results),
            test_codes,
        });
    }
    if !config.sources.practice_statistics.is_empty() {
        build = build.with_job(ImportJob::PracticeStatistics {
            sources: resolve_all(&config.sources.practice_statistics),
        });
    }
    Ok(build)
}

/// Parse, validate and convert a config file in one step.
pub fn load_build_config(path: &Path) -> Result<BuildConfig> {
    let config = parse_build_config(path)?;
    let config_dir = path
        .parent()
        .ok_or_else(|| anyhow!("Invalid config path"))?;
    validate_build_config(&config, config_dir)?;
    to_build_config(&config, config_dir)
}

pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join("config.toml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        config_path
    }

    #[test]
    fn test_parse_valid_config() {
        let dir = tempdir().unwrap();
        let config_path = write_config(
            dir.path(),
            r#"
[build]
output = "store.sqlite"
end_date = "2019-02"
months = 15
empty_entities = "retain"

[sources]
test_results = ["lab_a.csv", "lab_b.csv.gz"]
"#,
        );

        let config = parse_build_config(&config_path).unwrap();
        assert_eq!(config.build.end_date, "2019-02");
        assert_eq!(config.build.months, Some(15));
        assert_eq!(config.build.empty_entities, EmptyEntityPolicy::Retain);
        assert_eq!(config.sources.test_results.len(), 2);
        assert!(config.sources.practice_statistics.is_empty());
    }

    #[test]
    fn test_parse_defaults() {
        let dir = tempdir().unwrap();
        let config_path = write_config(
            dir.path(),
            r#"
[build]
output = "store.sqlite"
end_date = "2019-02"

[sources]
practice_statistics = ["stats.csv"]
"#,
        );

        let config = parse_build_config(&config_path).unwrap();
        assert_eq!(config.build.months, None);
        assert_eq!(config.build.empty_entities, EmptyEntityPolicy::Prune);
        assert!(config.build.practice_list.is_none());
    }

    #[test]
    fn test_parse_no_sources() {
        let dir = tempdir().unwrap();
        let config_path = write_config(
            dir.path(),
            r#"
[build]
output = "store.sqlite"
end_date = "2019-02"
"#,
        );
        assert!(parse_build_config(&config_path).is_err());
    }

    #[test]
    fn test_parse_unknown_policy() {
        let dir = tempdir().unwrap();
        let config_path = write_config(
            dir.path(),
            r#"
[build]
output = "store.sqlite"
end_date = "2019-02"
empty_entities = "sometimes"

[sources]
test_results = ["lab.csv"]
"#,
        );
        assert!(parse_build_config(&config_path).is_err());
    }

    #[test]
    fn test_validate_missing_source() {
        let dir = tempdir().unwrap();
        let config_path = write_config(
            dir.path(),
            r#"
[build]
output = "store.sqlite"
end_date = "2019-02"

[sources]
test_results = ["missing.csv"]
"#,
        );
        let config = parse_build_config(&config_path).unwrap();
        let err = validate_build_config(&config, dir.path()).unwrap_err();
        assert!(err.to_string().contains("missing.csv"));
    }

    #[test]
    fn test_to_build_config_resolves_paths_and_lists() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("lab.csv"), "").unwrap();
        std::fs::write(dir.path().join("practices.txt"), "P2\nP1\n").unwrap();
        std::fs::write(dir.path().join("tests.txt"), "ALT\n# retired\nFBC\n").unwrap();
        let config_path = write_config(
            dir.path(),
            r#"
[build]
output = "out/store.sqlite"
end_date = "2019-02"
practice_list = "practices.txt"
test_code_list = "tests.txt"

[sources]
test_results = ["lab.csv"]
"#,
        );

        let build = load_build_config(&config_path).unwrap();
        assert_eq!(build.output, dir.path().join("out/store.sqlite"));
        assert_eq!(
            build.practices,
            PracticeSelection::Listed(vec!["P2".to_string(), "P1".to_string()])
        );
        assert_eq!(
            build.jobs,
            vec![ImportJob::TestResults {
                sources: vec![dir.path().join("lab.csv")],
                test_codes: vec!["ALT".to_string(), "FBC".to_string()],
            }]
        );
    }

    #[test]
    fn test_resolve_path() {
        let base = Path::new("/home/user");

        let relative = Path::new("file.txt");
        assert_eq!(resolve_path(base, relative), PathBuf::from("/home/user/file.txt"));

        let absolute = Path::new("/tmp/file.txt");
        assert_eq!(resolve_path(base, absolute), PathBuf::from("/tmp/file.txt"));
    }
}
