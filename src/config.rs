use anyhow::Context;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

use crate::validate::{Category, ReportMode};

pub const CONFIG_FILENAME: &str = "fmpak.yaml";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryConfig {
    pub valid_unused_files: Vec<String>,
    pub valid_unused_identifiers: Vec<String>,
    pub mode: Option<ReportMode>,
}

/// Per category overrides read from the mission's `fmpak.yaml`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(transparent)]
pub struct AuditConfig {
    pub categories: BTreeMap<Category, CategoryConfig>,
}

impl AuditConfig {
    pub fn load(mission_path: &Path) -> Result<Self, anyhow::Error> {
        let path = mission_path.join(CONFIG_FILENAME);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let str = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file {}", path.to_string_lossy()))?;
        Self::parse(&str).with_context(|| {
            format!(
                "Failed to deserialise AuditConfig from file {}",
                path.to_string_lossy()
            )
        })
    }

    pub fn parse(str: &str) -> Result<Self, serde_yaml::Error> {
        if str.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(str)
    }

    pub fn category(&self, category: Category) -> Option<&CategoryConfig> {
        self.categories.get(&category)
    }
}
