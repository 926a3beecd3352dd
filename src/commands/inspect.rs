//! Query command handlers: fetching single values and summarising stores.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;

use pathstore::{EntityKey, MatrixStore, ResultCategory};

fn open_store(path: &Path) -> Result<MatrixStore> {
    MatrixStore::open(path).with_context(|| format!("Failed to open store: {}", path.display()))
}

/// Print the value of one cell.
pub fn fetch_value(
    store_path: &Path,
    test_code: Option<&str>,
    category: i32,
    practice: &str,
    date: &str,
    statistic: Option<&str>,
) -> Result<()> {
    let store = open_store(store_path)?;
    let value = match (statistic, test_code) {
        (Some(name), _) => store.statistic(name, practice, date)?,
        (None, Some(code)) => {
            if ResultCategory::from_code(category).is_none() {
                anyhow::bail!("Unknown result category: {}", category);
            }
            store.fetch(&EntityKey::new(code, category), practice, date)?
        }
        (None, None) => anyhow::bail!("Either --test-code or --statistic is required"),
    };
    println!("{}", value);
    Ok(())
}

fn describe_range(values: &[String]) -> String {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) => format!("{} ({} .. {})", values.len(), first, last),
        _ => "0".to_string(),
    }
}

/// Print a summary of a store, per-category counts for one test code, or a
/// full table dump.
pub fn inspect_store(store_path: &Path, test_code: Option<&str>, dump: bool) -> Result<()> {
    let store = open_store(store_path)?;

    if dump {
        for line in store.dump()? {
            println!("{}", line);
        }
        return Ok(());
    }

    if let Some(code) = test_code {
        println!("Test code: {}", code);
        for category in ResultCategory::ALL {
            let key = EntityKey::new(code, category.code());
            match store.count_nonzero(&key) {
                Ok(n) => println!("  {:<30} {} nonzero cells", category.to_string(), n),
                Err(pathstore::StoreError::UnknownEntity(_)) => {
                    println!("  {:<30} absent", category.to_string())
                }
                Err(e) => return Err(e.into()),
            }
        }
        return Ok(());
    }

    let keys = store.entity_keys()?;
    let test_codes: BTreeSet<&str> = keys.iter().map(|k| k.test_code.as_str()).collect();
    let statistics = store.statistic_names()?;

    println!("Store:       {}", store.path().display());
    println!("Shape:       {}", store.shape());
    println!("Practices:   {}", describe_range(store.practices()));
    println!("Dates:       {}", describe_range(store.dates()));
    println!(
        "Entities:    {} ({} empty) across {} test codes",
        keys.len(),
        store.empty_entity_count()?,
        test_codes.len()
    );
    if statistics.is_empty() {
        println!("Statistics:  none");
    } else {
        println!("Statistics:  {}", statistics.join(", "));
    }
    Ok(())
}
