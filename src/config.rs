//! Export profiles: reusable field mappings stored as TOML.
//!
//! ```toml
//! table = "customers"
//! filename = "customers_2024"
//! output_dir = "exports"
//!
//! [[fields]]
//! name = "id"
//!
//! [[fields]]
//! name = "name"
//! output = "Customer"
//!
//! [[fields]]
//! name = "avatar"
//! include = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::export::FieldMapping;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ExportProfile {
    pub table: Option<String>,
    pub filename: Option<String>,
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub fields: Vec<ProfileField>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProfileField {
    pub name: String,
    pub output: Option<String>,
    #[serde(default = "default_include")]
    pub include: bool,
}

fn default_include() -> bool {
    true
}

impl From<&ProfileField> for FieldMapping {
    fn from(field: &ProfileField) -> Self {
        FieldMapping {
            original_name: field.name.clone(),
            output_name: field.output.clone().unwrap_or_else(|| field.name.clone()),
            included: field.include,
        }
    }
}

impl ExportProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read export profile {}", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Failed to parse export profile {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Field mappings for a table with `columns`.
    ///
    /// Fields listed in the profile come first, in profile order. Columns the
    /// profile does not mention follow as identity mappings.
    pub fn mappings(&self, columns: &[String]) -> Vec<FieldMapping> {
        let mut mappings: Vec<FieldMapping> = self.fields.iter().map(FieldMapping::from).collect();
        for column in columns {
            if self.fields.iter().all(|f| &f.name != column) {
                mappings.push(FieldMapping::identity(column.as_str()));
            }
        }
        mappings
    }
}
