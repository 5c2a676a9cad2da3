//! Configuration types and loading for recpipe services.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{CONFIGURATION_DIR, LoadConfigError, load_config, load_config_from};
