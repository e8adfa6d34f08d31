//! Caller-supplied preference profile and its boundary validation.
//!
//! The wire shape (`RawProfile`) carries plain strings; `validate` turns it
//! into the typed profile or rejects it with a `ValidationError`. Unknown
//! category or flag names are never silently dropped.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::event::{AccessibilityFlag, Category};

/// Filter/interest criteria for one aggregation call. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPreferenceProfile {
    /// Empty = all categories.
    pub categories: BTreeSet<Category>,
    /// `None` = unbounded budget.
    pub budget_max: Option<f32>,
    /// Empty = anywhere. Matched against neighborhood or borough.
    pub neighborhoods: BTreeSet<String>,
    /// Every flag here must be present on a matching event.
    pub accessibility_required: BTreeSet<AccessibilityFlag>,
    /// Optional keywords for lightweight affinity scoring. No NLU.
    pub free_text_interest: Option<String>,
}

/// Untyped profile as it arrives from the chat/UI layer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProfile {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub budget_max: Option<f32>,
    #[serde(default)]
    pub neighborhoods: Vec<String>,
    #[serde(default)]
    pub accessibility_required: Vec<String>,
    #[serde(default)]
    pub free_text_interest: Option<String>,
}

impl RawProfile {
    pub fn validate(self) -> Result<UserPreferenceProfile, ValidationError> {
        let mut categories = BTreeSet::new();
        for c in &self.categories {
            if c.trim().is_empty() {
                continue;
            }
            categories.insert(Category::parse(c)?);
        }

        let mut accessibility_required = BTreeSet::new();
        for f in &self.accessibility_required {
            if f.trim().is_empty() {
                continue;
            }
            accessibility_required.insert(AccessibilityFlag::parse(f)?);
        }

        if let Some(b) = self.budget_max {
            if b < 0.0 {
                return Err(ValidationError::NegativeBudget(b));
            }
        }

        let neighborhoods = self
            .neighborhoods
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(|n| n.to_string())
            .collect();

        let free_text_interest = self
            .free_text_interest
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(UserPreferenceProfile {
            categories,
            budget_max: self.budget_max,
            neighborhoods,
            accessibility_required,
            free_text_interest,
        })
    }
}
