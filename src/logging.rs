/// Logs go to stderr so stdout stays free for spell output.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
