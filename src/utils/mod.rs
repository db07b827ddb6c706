/// TOML configuration and hot reloading.
pub mod toml_config;
