use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::{
    definition::ObjectDefinition, error::Result, rank::EmptyKeyPolicy,
    store::Field,
};

/// Analysis configuration that can be read from a file
///
/// Cuts, identification predicates and ranking functions are code and
/// are attached to the [crate::engine::AnalysisBuilder] created from
/// these settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalysisSettings {
    /// Analysis name, used in log messages
    pub name: String,
    /// Final-state categories to process; all if empty
    #[serde(default)]
    pub categories: Vec<String>,
    /// Shape of the main candidate
    pub definition: ObjectDefinition,
    /// Additional objects handed to the row projector
    #[serde(default)]
    pub auxiliary: Vec<ObjectDefinition>,
    /// Tie-break policy for empty ranking keys
    #[serde(default)]
    pub empty_key_policy: EmptyKeyPolicy,
    /// Quantities (role, field) the analysis reads from each candidate
    #[serde(default)]
    pub required_fields: Vec<(usize, Field)>,
}

impl AnalysisSettings {
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether events in `category` should be processed
    pub fn accepts_category(&self, category: &str) -> bool {
        self.categories.is_empty() || self.categories.iter().any(|c| c == category)
    }
}
