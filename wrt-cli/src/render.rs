//! Output formats for command results

use crate::error::AppError;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
    /// Rust debug representation
    Debug,
}

impl OutputFormat {
    pub fn render<T>(self, value: &T) -> Result<String, AppError>
    where
        T: Serialize + Debug + ?Sized,
    {
        match self {
            OutputFormat::Yaml => {
                serde_yaml::to_string(value).map_err(|e| AppError::Render(e.to_string()))
            }
            OutputFormat::Json => serde_json::to_string_pretty(value)
                .map(|mut json| {
                    json.push('\n');
                    json
                })
                .map_err(|e| AppError::Render(e.to_string())),
            OutputFormat::Debug => Ok(format!("{:#?}\n", value)),
        }
    }
}
