//! Declarative facet descriptors and the ordered registry holding them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{GeofacetError, Result};

/// Toggle and render semantics of a facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FacetKind {
    /// Set semantics: every value toggles independently.
    Categorical,
    /// At most one `>=` floor; the ladder lists the selectable floors in
    /// display order.
    Threshold { candidate_values: Vec<f64> },
}

/// A filterable dimension bound to a field of the search records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetDescriptor {
    /// Identifier used by the presentation surface (e.g. `"cuisine"`).
    pub id: String,
    /// Record field the facet filters on (e.g. `"food_type"`).
    pub source_field: String,
    #[serde(flatten)]
    pub kind: FacetKind,
}

impl FacetDescriptor {
    /// Create a categorical facet.
    pub fn categorical<I: Into<String>, F: Into<String>>(id: I, source_field: F) -> Self {
        FacetDescriptor {
            id: id.into(),
            source_field: source_field.into(),
            kind: FacetKind::Categorical,
        }
    }

    /// Create a threshold facet with its candidate ladder.
    pub fn threshold<I: Into<String>, F: Into<String>>(
        id: I,
        source_field: F,
        candidate_values: Vec<f64>,
    ) -> Self {
        FacetDescriptor {
            id: id.into(),
            source_field: source_field.into(),
            kind: FacetKind::Threshold { candidate_values },
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, FacetKind::Categorical)
    }

    pub fn is_threshold(&self) -> bool {
        matches!(self.kind, FacetKind::Threshold { .. })
    }
}

/// Fixed, ordered set of facet descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FacetDescriptor>", into = "Vec<FacetDescriptor>")]
pub struct FacetRegistry {
    descriptors: Vec<FacetDescriptor>,
}

impl FacetRegistry {
    /// Create a registry, rejecting duplicate ids or fields and empty ladders.
    pub fn new(descriptors: Vec<FacetDescriptor>) -> Result<Self> {
        let mut ids = HashSet::new();
        let mut fields = HashSet::new();
        for descriptor in &descriptors {
            if descriptor.id.is_empty() || descriptor.source_field.is_empty() {
                return Err(GeofacetError::invalid_config(
                    "facet id and source field must not be empty",
                ));
            }
            if !ids.insert(descriptor.id.as_str()) {
                return Err(GeofacetError::invalid_config(format!(
                    "duplicate facet id {:?}",
                    descriptor.id
                )));
            }
            if !fields.insert(descriptor.source_field.as_str()) {
                return Err(GeofacetError::invalid_config(format!(
                    "facet field {:?} registered twice",
                    descriptor.source_field
                )));
            }
            if let FacetKind::Threshold { candidate_values } = &descriptor.kind {
                if candidate_values.is_empty() {
                    return Err(GeofacetError::invalid_config(format!(
                        "threshold facet {:?} has no candidate values",
                        descriptor.id
                    )));
                }
                if candidate_values.iter().any(|v| !v.is_finite()) {
                    return Err(GeofacetError::invalid_config(format!(
                        "threshold facet {:?} has a non-finite candidate",
                        descriptor.id
                    )));
                }
            }
        }
        Ok(FacetRegistry { descriptors })
    }

    /// The restaurant facets: cuisine, minimum rating and payment method.
    pub fn restaurants() -> Self {
        FacetRegistry {
            descriptors: vec![
                FacetDescriptor::categorical("cuisine", "food_type"),
                FacetDescriptor::threshold(
                    "rating",
                    "stars_count",
                    vec![5.0, 4.0, 3.0, 2.0, 1.0],
                ),
                FacetDescriptor::categorical("payment", "payment_options"),
            ],
        }
    }

    /// Look up a facet by id.
    pub fn get(&self, facet_id: &str) -> Result<&FacetDescriptor> {
        self.descriptors
            .iter()
            .find(|d| d.id == facet_id)
            .ok_or_else(|| GeofacetError::unknown_facet(facet_id))
    }

    /// Look up a facet by id or, failing that, by source field.
    pub fn resolve(&self, name: &str) -> Result<&FacetDescriptor> {
        self.get(name).or_else(|_| {
            self.descriptors
                .iter()
                .find(|d| d.source_field == name)
                .ok_or_else(|| GeofacetError::unknown_facet(name))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &FacetDescriptor> {
        self.descriptors.iter()
    }

    /// Source fields in registry order, as requested from the service.
    pub fn source_fields(&self) -> Vec<String> {
        self.descriptors
            .iter()
            .map(|d| d.source_field.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for FacetRegistry {
    fn default() -> Self {
        Self::restaurants()
    }
}

impl TryFrom<Vec<FacetDescriptor>> for FacetRegistry {
    type Error = GeofacetError;

    fn try_from(descriptors: Vec<FacetDescriptor>) -> Result<Self> {
        FacetRegistry::new(descriptors)
    }
}

impl From<FacetRegistry> for Vec<FacetDescriptor> {
    fn from(registry: FacetRegistry) -> Self {
        registry.descriptors
    }
}
