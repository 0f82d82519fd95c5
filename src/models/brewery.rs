use serde::{Deserialize, Serialize};
use std::fmt;

/// A producer at the festival, keyed by the id the feed assigns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Brewery {
    pub festival_id: String,
    pub name: String,
    pub description: String,
}

impl Brewery {
    pub fn new(festival_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            festival_id: festival_id.into(),
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl fmt::Display for Brewery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "ID: {}", self.festival_id)?;
        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        Ok(())
    }
}
