use env_logger::{Builder, Env};
use log::LevelFilter;
use std::io::Write;

/// Map `-v` occurrences to a level for this crate's own modules
const fn log_level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}

/// Initialize the logging system with the given verbosity level.
pub(crate) fn init_logging(verbose: u8) {
    // RUST_LOG, if set, wins over the verbosity flag
    let env = Env::default().filter_or("RUST_LOG", "warn");

    let mut builder = Builder::from_env(env);
    builder
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false);

    if std::env::var("RUST_LOG").is_err() {
        let level_filter = log_level_filter(verbose);
        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("external_links", level_filter)
            .filter_module("check_external_links", level_filter);
    }

    builder.format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()));
    builder.init();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_log_level_filter() {
        assert_eq!(log_level_filter(0), LevelFilter::Warn);
        assert_eq!(log_level_filter(1), LevelFilter::Info);
        assert_eq!(log_level_filter(5), LevelFilter::Debug);
    }
}
