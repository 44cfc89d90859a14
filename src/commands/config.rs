//! Config command implementations

use crate::config::settings::{LOCAL_CONFIG_FILE, Settings};
use anyhow::{Result, bail};
use std::path::PathBuf;

/// Print the effective settings and where they came from
pub fn show() -> Result<()> {
    match Settings::find_config_file() {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No config file found, showing defaults"),
    }
    let settings = Settings::load();
    print!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}

/// Write an example config file to the project or user location
pub fn init(local: bool, force: bool) -> Result<()> {
    let path = if local {
        PathBuf::from(LOCAL_CONFIG_FILE)
    } else {
        match Settings::user_config_path() {
            Some(path) => path,
            None => bail!("Unable to determine the user config directory; use --local"),
        }
    };

    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, Settings::example_config()?)?;
    crate::log_info!("Wrote {}", path.display());
    println!("{}", path.display());
    Ok(())
}

/// Print the config file locations in priority order
pub fn path() -> Result<()> {
    println!("{}", LOCAL_CONFIG_FILE);
    if let Some(user) = Settings::user_config_path() {
        println!("{}", user.display());
    }
    Ok(())
}
