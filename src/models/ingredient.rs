use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub name: String,
    pub unit: String,
}

/// A catalog entry to import. Seed files use `measurement_unit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIngredient {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "measurement_unit")]
    pub unit: String,
}

impl NewIngredient {
    pub fn new(name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
        }
    }

    /// Rows with a blank name or unit are not importable.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.unit.trim().is_empty()
    }
}

/// Parse a JSON array of catalog entries.
pub fn parse_seed(json: &str) -> crate::error::Result<Vec<NewIngredient>> {
    Ok(serde_json::from_str(json)?)
}
