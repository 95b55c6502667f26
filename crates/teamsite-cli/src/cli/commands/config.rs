//! Config command handlers.

use anyhow::{Context, Result};
use teamsite_core::config;
use teamsite_types::Lang;

pub fn path() {
    println!("{}", config::paths::config_path().display());
}

pub fn init() -> Result<()> {
    let config_path = config::paths::config_path();
    config::Config::init(&config_path)
        .with_context(|| format!("init config at {}", config_path.display()))?;
    println!("Created config at {}", config_path.display());
    Ok(())
}

pub fn generate() -> Result<()> {
    let toml = config::Config::generate()?;
    print!("{toml}");
    Ok(())
}

pub fn set_lang(lang: Lang) -> Result<()> {
    config::Config::save_lang(lang).context("save language")?;
    println!("✓ Default language set to {lang}");
    Ok(())
}
