//! Traffic replay input: one hex-encoded identifier per line.

use anyhow::{Context, Result};
use std::path::Path;

/// Decode identifier lines, skipping blanks and `#` comments
pub fn parse_traffic(text: &str) -> Result<Vec<Vec<u8>>> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_number, line)| {
            hex::decode(line).with_context(|| format!("line {line_number}: bad hex {line:?}"))
        })
        .collect()
}

pub async fn load_traffic(path: &Path) -> Result<Vec<Vec<u8>>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read traffic file {}", path.display()))?;
    parse_traffic(&text).with_context(|| format!("Invalid traffic file {}", path.display()))
}
