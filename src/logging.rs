use env_logger::Builder;
use log::LevelFilter;

/// Initialise the global logger. `RUST_LOG` takes precedence; the `--debug`
/// flag bumps the default level for this crate only.
pub fn init(debug: bool) {
    let default_level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::from_default_env()
        .filter_level(default_level)
        .format_timestamp_secs()
        .try_init()
        .ok();
}
