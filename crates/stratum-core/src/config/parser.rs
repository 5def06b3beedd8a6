//! TOML parser with helpful error messages

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use super::schema::{ProjectConfig, RootConfig, ScopeDataConfig};

/// Parse a project file with detailed error messages
pub fn parse_project_toml(path: &Path) -> Result<ProjectConfig> {
    let config: ProjectConfig = parse_toml_file(path)?;
    config
        .validate()
        .with_context(|| format!("Invalid project config: {}", path.display()))?;
    Ok(config)
}

/// Parse project file content from string
pub fn parse_project_toml_str(content: &str) -> Result<ProjectConfig> {
    let config: ProjectConfig = parse_toml_str(content)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_scope_data_toml(path: &Path) -> Result<ScopeDataConfig> {
    parse_toml_file(path)
}

pub fn parse_root_toml(path: &Path) -> Result<RootConfig> {
    parse_toml_file(path)
}

fn parse_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse any stratum TOML document from a string
pub fn parse_toml_str<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| enhance_toml_error(e, content))
}

/// Enhance TOML parsing errors with helpful context
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error.span().map(|span| {
        content.as_bytes()[..span.start.min(content.len())]
            .iter()
            .filter(|b| **b == b'\n')
            .count()
            + 1
    });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2).min(lines.len());
    let end = (line_num + 2).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
