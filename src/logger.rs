use log::LevelFilter;

/// 初始化日志，RUST_LOG 优先于传入的默认级别
pub fn setup_logging(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .init();
}

/// 由 -v / -q 次数得到日志级别
pub fn level_from_flags(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_flags() {
        assert_eq!(level_from_flags(0, false), LevelFilter::Info);
        assert_eq!(level_from_flags(1, false), LevelFilter::Debug);
        assert_eq!(level_from_flags(3, false), LevelFilter::Trace);
        assert_eq!(level_from_flags(2, true), LevelFilter::Error);
    }
}
