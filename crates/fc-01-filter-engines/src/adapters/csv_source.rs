//! CSV subscription source
//!
//! One subscription per record: `report_uri,pattern[,weight]`. Blank lines
//! and lines starting with `#` are skipped. Weight defaults to 0.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::Subscriptions;
use crate::error::{FilterError, SourceError};
use crate::ports::SubscriptionSource;

pub struct CsvSubscriptionSource {
    path: PathBuf,
}

impl CsvSubscriptionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse CSV text; errors carry 1-based line numbers
    pub fn parse(text: &str) -> Result<Subscriptions, FilterError> {
        let mut subscriptions = Subscriptions::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parse_error = |reason: String| SourceError::Parse {
                line: index + 1,
                reason,
            };

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let (report_uri, pattern, weight) = match fields.as_slice() {
                [uri, pattern] => (*uri, *pattern, 0.0),
                [uri, pattern, weight] => {
                    let weight = weight
                        .parse::<f64>()
                        .map_err(|e| parse_error(format!("bad weight {weight:?}: {e}")))?;
                    (*uri, *pattern, weight)
                }
                _ => {
                    return Err(parse_error(format!(
                        "expected 2 or 3 fields, found {}",
                        fields.len()
                    ))
                    .into())
                }
            };

            if report_uri.is_empty() {
                return Err(parse_error("empty report URI".to_string()).into());
            }
            if pattern.is_empty() {
                return Err(parse_error("empty pattern".to_string()).into());
            }

            subscriptions.insert(pattern, report_uri, weight)?;
        }

        Ok(subscriptions)
    }
}

#[async_trait]
impl SubscriptionSource for CsvSubscriptionSource {
    async fn load(&self) -> Result<Subscriptions, FilterError> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(SourceError::from)?;
        let subscriptions = Self::parse(&text)?;

        info!(
            path = %self.path.display(),
            subscriptions = subscriptions.len(),
            "Subscriptions loaded"
        );
        Ok(subscriptions)
    }
}
