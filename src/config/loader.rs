// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::config::model::{ProjectFile, RawProjectFile};
use crate::config::validate::validate_project;
use crate::errors::Result;

/// Load a project manifest from a given path and return the raw file.
///
/// This only performs TOML deserialization; it does **not** normalize task
/// definitions or check the graph. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawProjectFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading project manifest at {:?}", path))?;

    let raw: RawProjectFile = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML project manifest from {:?}", path))?;

    Ok(raw)
}

/// Parse a project manifest from a string and validate it.
pub fn parse_and_validate(contents: &str) -> Result<ProjectFile> {
    let raw: RawProjectFile = toml::from_str(contents)?;
    let project = ProjectFile::try_from(raw)?;
    validate_project(&project)?;
    Ok(project)
}

/// Load a project manifest from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults from `[config]` to every task.
/// - Normalizes `after` (string or list) into descriptors.
/// - Checks for unknown `after` references, duplicate tasks and cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ProjectFile> {
    let raw = load_from_path(&path)?;
    let project = ProjectFile::try_from(raw)?;
    validate_project(&project)?;
    Ok(project)
}
