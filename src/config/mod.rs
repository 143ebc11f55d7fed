mod settings;

use config::{Config, ConfigError, Environment, File};
use tracing::warn;

use settings::PartialSettings;

pub use settings::{GeoSettings, RoomSettings, ServerSettings, Settings};

/// Prefix of environment variables read by [`load_config`], e.g. `GLOBE_SERVER__PORT`.
pub const ENV_PREFIX: &str = "GLOBE";

/// Loads the configuration from a file and environment variables.
///
/// Without an explicit `path` the optional `config/default` file is used.
/// Environment variables override file values, and anything still missing
/// is taken from `Settings::default()`.
pub fn load_config(path: Option<&str>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => File::with_name(path).required(true),
        None => File::with_name("config/default").required(false),
    };

    let builder = Config::builder().add_source(file).add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_with_defaults())
}

/// Location header names for client-side use.
///
/// Clients only need the header names, so a configuration that fails to
/// load falls back to the defaults instead of failing.
pub fn geo_settings_or_default(path: Option<&str>) -> GeoSettings {
    match load_config(path) {
        Ok(settings) => settings.geo,
        Err(e) => {
            warn!("Ignoring configuration, using default location headers: {e}");
            Settings::default().geo
        }
    }
}
