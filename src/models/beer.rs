use serde::{Deserialize, Serialize};
use std::fmt;

use super::brewery::Brewery;

/// A single beer on the festival list.
///
/// Equality compares every field, including the owning brewery, so two
/// records read at different times are equal only if nothing changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Beer {
    pub festival_id: String,
    pub name: String,
    /// Alcohol by volume, in percent.
    pub abv: f64,
    pub description: String,
    pub style: String,
    pub status: String,
    pub dispense_method: String,
    pub brewery: Brewery,
}

impl Beer {
    pub fn new(festival_id: impl Into<String>, name: impl Into<String>, abv: f64, brewery: Brewery) -> Self {
        Self {
            festival_id: festival_id.into(),
            name: name.into(),
            abv,
            description: String::new(),
            style: String::new(),
            status: String::new(),
            dispense_method: String::new(),
            brewery,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_dispense_method(mut self, dispense_method: impl Into<String>) -> Self {
        self.dispense_method = dispense_method.into();
        self
    }
}

impl fmt::Display for Beer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({:.1}%)", self.name, self.abv)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "ID: {}", self.festival_id)?;
        writeln!(f, "Brewery: {}", self.brewery.name)?;

        if !self.style.is_empty() {
            writeln!(f, "Style: {}", self.style)?;
        }
        if !self.dispense_method.is_empty() {
            writeln!(f, "Dispense: {}", self.dispense_method)?;
        }
        if !self.status.is_empty() {
            writeln!(f, "Status: {}", self.status)?;
        }
        if !self.description.is_empty() {
            writeln!(f, "\n{}", self.description)?;
        }

        Ok(())
    }
}
