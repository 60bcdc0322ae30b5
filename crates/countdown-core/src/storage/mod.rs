pub mod config;

pub use config::ConfigStorage;

use std::path::PathBuf;

use crate::{Error, Result};

const APP_DIR: &str = "countdown";

pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(Error::MissingDirectory("config"))
}

pub fn init_config_dir() -> Result<PathBuf> {
    let config_dir = get_config_dir()?;
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}
