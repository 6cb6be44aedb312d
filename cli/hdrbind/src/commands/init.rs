//! `hdrbind init`: write a starter `hdrbind.toml`.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::config::{HdrbindConfig, CONFIG_FILE};

pub fn run(dir: &Path) -> Result<()> {
    create_config(dir)?;
    println!("Created {CONFIG_FILE}");
    Ok(())
}

pub(crate) fn create_config(dir: &Path) -> Result<()> {
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        bail!("'{}' already exists", path.display());
    }
    fs::write(&path, HdrbindConfig::template()).with_context(|| format!("writing {}", path.display()))
}
