//! Layered configuration loading.
//!
//! Layers, lowest precedence first: `configuration/base.*`, the optional
//! `configuration/<environment>.*`, then `APP_`-prefixed environment variables where nested keys
//! are joined with double underscores (`APP_PIPELINE__RECEIVERS=4`).

use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory holding configuration files, relative to the working directory.
pub const CONFIGURATION_DIR: &str = "configuration";

/// Extensions tried, in order, for every configuration layer.
const CONFIG_FILE_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Stem of the mandatory configuration file.
const BASE_FILE_STEM: &str = "base";

const ENV_PREFIX: &str = "APP";
const ENV_PREFIX_SEPARATOR: &str = "_";
const ENV_SEPARATOR: &str = "__";

/// Errors raised while loading layered configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("configuration directory `{0}` does not exist")]
    MissingConfigurationDirectory(PathBuf),

    /// None of the base file candidates exists.
    #[error(
        "no base configuration in `{}`, tried {}",
        .directory.display(),
        display_paths(.attempted)
    )]
    BaseFileMissing {
        directory: PathBuf,
        attempted: Vec<PathBuf>,
    },

    /// `APP_ENVIRONMENT` holds an unsupported value.
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),

    /// A layer could not be read or parsed.
    #[error("failed to read configuration layers: {0}")]
    Build(#[source] config::ConfigError),

    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads configuration from the `configuration` directory of the working directory.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    load_config_from(&base_path)
}

/// Loads configuration from `<base_path>/configuration`, selecting the environment layer from
/// `APP_ENVIRONMENT`.
pub fn load_config_from<T>(base_path: &Path) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let directory = base_path.join(CONFIGURATION_DIR);
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingConfigurationDirectory(directory));
    }

    let environment = Environment::load()?;
    load_layers(&directory, environment)
}

fn load_layers<T>(directory: &Path, environment: Environment) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let base_file = find_layer(directory, BASE_FILE_STEM).ok_or_else(|| {
        LoadConfigError::BaseFileMissing {
            directory: directory.to_path_buf(),
            attempted: layer_candidates(directory, BASE_FILE_STEM).collect(),
        }
    })?;

    let mut builder = config::Config::builder().add_source(config::File::from(base_file));
    if let Some(environment_file) = find_layer(directory, environment.as_str()) {
        builder = builder.add_source(config::File::from(environment_file));
    }

    let overrides = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    builder
        .add_source(overrides)
        .build()
        .map_err(LoadConfigError::Build)?
        .try_deserialize()
        .map_err(LoadConfigError::Deserialization)
}

fn layer_candidates<'a>(directory: &'a Path, stem: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    CONFIG_FILE_EXTENSIONS
        .iter()
        .map(move |extension| directory.join(format!("{stem}.{extension}")))
}

fn find_layer(directory: &Path, stem: &str) -> Option<PathBuf> {
    layer_candidates(directory, stem).find(|path| path.is_file())
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}
