use log::LevelFilter;

const WORKSPACE_TARGETS: [&str; 3] = ["datachat", "datachat_client", "datachat_core"];

/// `RUST_LOG` wins when set. Otherwise `debug` selects the level for the
/// workspace crates and everything else stays at `warn`.
pub fn init_logging(debug: bool) {
    if std::env::var_os("RUST_LOG").is_some() {
        env_logger::init();
        return;
    }

    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn);
    for target in WORKSPACE_TARGETS {
        builder.filter_module(target, level);
    }
    builder.format_timestamp_millis().init();
}
