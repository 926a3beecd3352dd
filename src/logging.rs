use std::io::Write;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Format elapsed time as `HH:MM:SS`.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Initialize the logger with custom formatting showing elapsed time.
///
/// If verbose is true, sets log level to Info, otherwise to Warn. An explicit
/// `RUST_LOG` takes precedence over both.
/// Output format: [HH:MM:SS] LEVEL: message
/// All output goes to stderr.
pub fn init_logger(verbose: bool) {
    let start = *START_TIME.get_or_init(Instant::now);

    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder
        .format(move |buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                format_elapsed(start.elapsed()),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr);

    // A second initialisation (e.g. from tests) keeps the first logger
    builder.try_init().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(61)), "00:01:01");
        assert_eq!(format_elapsed(Duration::from_secs(3 * 3600 + 25 * 60 + 9)), "03:25:09");
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_logger(false);
        init_logger(true);
    }
}
