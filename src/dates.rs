//! Month-window generation for the date dimension.

use chrono::{Months, NaiveDate};

use crate::constants::DEFAULT_NUM_MONTHS;
use crate::error::{Result, StoreError};

/// Parse an end date given as `YYYY-MM` (or `YYYY_MM`, or a longer date whose
/// first two fields are year and month) into the first day of that month.
pub fn parse_year_month(value: &str) -> Result<NaiveDate> {
    let normalised = value.trim().replace('_', "-");
    let mut parts = normalised.split('-');
    let (year_str, month_str) = match (parts.next(), parts.next()) {
        (Some(y), Some(m)) => (y, m),
        _ => {
            return Err(StoreError::validation(format!(
                "expected date in YYYY-MM format, got '{}'",
                value
            )))
        }
    };
    if year_str.len() != 4 || month_str.len() != 2 {
        return Err(StoreError::validation(format!(
            "expected date in YYYY-MM format, got '{}'",
            value
        )));
    }
    let year: i32 = year_str
        .parse()
        .map_err(|_| StoreError::validation(format!("invalid year in '{}'", value)))?;
    let month: u32 = month_str
        .parse()
        .map_err(|_| StoreError::validation(format!("invalid month in '{}'", value)))?;
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| StoreError::validation(format!("invalid month in '{}'", value)))
}

/// Return `months` consecutive month-start strings (`YYYY-MM-01`), ascending,
/// with the month of `end_date` as the final member.
///
/// `months` defaults to [`DEFAULT_NUM_MONTHS`].
pub fn generate_dates(end_date: &str, months: Option<u32>) -> Result<Vec<String>> {
    let months = months.unwrap_or(DEFAULT_NUM_MONTHS);
    if months == 0 {
        return Err(StoreError::validation("number of months must be positive"));
    }
    let end = parse_year_month(end_date)?;
    (0..months)
        .rev()
        .map(|back| {
            end.checked_sub_months(Months::new(back))
                .map(|d| d.format("%Y-%m-%d").to_string())
                .ok_or_else(|| {
                    StoreError::validation(format!(
                        "{} months before {} is out of range",
                        back, end_date
                    ))
                })
        })
        .collect()
}
