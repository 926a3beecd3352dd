//! Table layout of a store file.

/// Dimension tables, one blob per (test code, result category), and one blob
/// per practice statistic.
pub const SCHEMA_SQL: &str = "
CREATE TABLE practice (
    offset INTEGER PRIMARY KEY,
    code TEXT UNIQUE
);

CREATE TABLE date (
    offset INTEGER PRIMARY KEY,
    date TEXT UNIQUE
);

CREATE TABLE entity (
    test_code TEXT,
    result_category INTEGER,
    value BLOB,
    PRIMARY KEY (test_code, result_category)
);

CREATE TABLE statistic (
    name TEXT PRIMARY KEY,
    value BLOB
);
";

/// Tables in a store, in dump order.
pub const TABLES: [&str; 4] = ["practice", "date", "entity", "statistic"];
