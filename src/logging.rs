use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `starter=debug`.
pub const LOG_ENV: &str = "STARTER_LOG";

/// Installs a stderr subscriber filtered by [`LOG_ENV`], or `default_filter`
/// when that is unset or invalid. Without `verbose`, lines carry no timestamp
/// or target.
///
/// Returns false if a global subscriber was already installed, in which case
/// that one keeps receiving the events.
pub fn init(default_filter: &str, verbose: bool) -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = if verbose {
        builder.try_init()
    } else {
        builder.without_time().with_target(false).try_init()
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        init("info", false);
        assert!(!init("debug", true));
    }
}
