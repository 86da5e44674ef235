//! Active refinements and their toggle semantics.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{GeofacetError, Result};
use crate::facet::descriptor::{FacetDescriptor, FacetKind, FacetRegistry};
use crate::service::{FacetFilter, NumericFilter};

/// The active value(s) of one facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementValue {
    /// Every active value of a categorical facet. Never empty.
    Categorical(BTreeSet<String>),
    /// The single active floor of a threshold facet.
    Threshold(f64),
}

/// Refinements keyed by facet id. A facet without an entry is not filtered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Refinements {
    by_facet: BTreeMap<String, RefinementValue>,
}

impl Refinements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, facet_id: &str) -> Option<&RefinementValue> {
        self.by_facet.get(facet_id)
    }

    pub fn is_empty(&self) -> bool {
        self.by_facet.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RefinementValue)> {
        self.by_facet.iter()
    }

    /// Whether `value` is an active refinement of the facet.
    pub fn is_refined(&self, facet_id: &str, value: &str) -> bool {
        match self.by_facet.get(facet_id) {
            Some(RefinementValue::Categorical(values)) => values.contains(value),
            Some(RefinementValue::Threshold(active)) => {
                parse_threshold(value).is_ok_and(|v| v == *active)
            }
            None => false,
        }
    }

    /// The active floor of a threshold facet, if any.
    pub fn active_threshold(&self, facet_id: &str) -> Option<f64> {
        match self.by_facet.get(facet_id) {
            Some(RefinementValue::Threshold(value)) => Some(*value),
            _ => None,
        }
    }

    /// Drop every refinement of one facet.
    pub fn clear_facet(&mut self, facet_id: &str) -> bool {
        self.by_facet.remove(facet_id).is_some()
    }

    pub fn clear(&mut self) {
        self.by_facet.clear();
    }

    /// Toggle `value` on the facet, following the facet's kind.
    ///
    /// Categorical: membership of `value` flips. Threshold: clicking the
    /// active floor clears it, clicking another value replaces it.
    pub fn toggle(&mut self, descriptor: &FacetDescriptor, value: &str) -> Result<()> {
        match &descriptor.kind {
            FacetKind::Categorical => {
                self.toggle_categorical(&descriptor.id, value);
                Ok(())
            }
            FacetKind::Threshold { .. } => self.toggle_threshold(&descriptor.id, value),
        }
    }

    fn toggle_categorical(&mut self, facet_id: &str, value: &str) {
        let mut values = match self.by_facet.remove(facet_id) {
            Some(RefinementValue::Categorical(values)) => values,
            _ => BTreeSet::new(),
        };

        if !values.remove(value) {
            values.insert(value.to_string());
        }
        if !values.is_empty() {
            self.by_facet
                .insert(facet_id.to_string(), RefinementValue::Categorical(values));
        }
    }

    fn toggle_threshold(&mut self, facet_id: &str, value: &str) -> Result<()> {
        let floor = parse_threshold(value)?;
        if self.active_threshold(facet_id) == Some(floor) {
            self.by_facet.remove(facet_id);
        } else {
            self.by_facet
                .insert(facet_id.to_string(), RefinementValue::Threshold(floor));
        }
        Ok(())
    }

    /// Translate into service filters, in registry order.
    ///
    /// Each categorical value becomes its own conjunctive facet filter; a
    /// threshold becomes a `>=` numeric filter.
    pub fn to_filters(&self, registry: &FacetRegistry) -> (Vec<FacetFilter>, Vec<NumericFilter>) {
        let mut facet_filters = Vec::new();
        let mut numeric_filters = Vec::new();

        for descriptor in registry.iter() {
            match self.by_facet.get(&descriptor.id) {
                Some(RefinementValue::Categorical(values)) => {
                    facet_filters.extend(
                        values
                            .iter()
                            .map(|v| FacetFilter::new(&descriptor.source_field, v)),
                    );
                }
                Some(RefinementValue::Threshold(floor)) => {
                    numeric_filters.push(NumericFilter::at_least(&descriptor.source_field, *floor));
                }
                None => {}
            }
        }

        (facet_filters, numeric_filters)
    }
}

fn parse_threshold(value: &str) -> Result<f64> {
    let floor = value.trim().parse::<f64>().map_err(|e| {
        GeofacetError::invalid_argument(format!("Invalid threshold value {value:?}: {e}"))
    })?;
    if !floor.is_finite() {
        return Err(GeofacetError::invalid_argument(format!(
            "Threshold value must be finite, got {value:?}"
        )));
    }
    Ok(floor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FacetRegistry {
        FacetRegistry::restaurants()
    }

    #[test]
    fn test_categorical_toggle_twice_restores_state() {
        let registry = registry();
        let cuisine = registry.get("cuisine").unwrap();
        let mut refinements = Refinements::new();
        refinements.toggle(cuisine, "Sushi").unwrap();
        let before = refinements.clone();

        refinements.toggle(cuisine, "Italian").unwrap();
        assert!(refinements.is_refined("cuisine", "Italian"));
        assert!(refinements.is_refined("cuisine", "Sushi"));

        refinements.toggle(cuisine, "Italian").unwrap();
        assert_eq!(refinements, before);

        refinements.toggle(cuisine, "Sushi").unwrap();
        assert!(refinements.is_empty());
    }

    #[test]
    fn test_threshold_reselect_clears() {
        let registry = registry();
        let rating = registry.get("rating").unwrap();
        let mut refinements = Refinements::new();

        refinements.toggle(rating, "4").unwrap();
        assert_eq!(refinements.active_threshold("rating"), Some(4.0));

        refinements.toggle(rating, "4").unwrap();
        assert_eq!(refinements.active_threshold("rating"), None);
        assert!(refinements.is_empty());
    }

    #[test]
    fn test_threshold_other_value_replaces() {
        let registry = registry();
        let rating = registry.get("rating").unwrap();
        let mut refinements = Refinements::new();

        refinements.toggle(rating, "4").unwrap();
        refinements.toggle(rating, "3").unwrap();
        assert_eq!(refinements.active_threshold("rating"), Some(3.0));
        assert!(refinements.is_refined("rating", "3.0"));
        assert!(!refinements.is_refined("rating", "4"));

        let (_, numeric) = refinements.to_filters(&registry);
        assert_eq!(numeric.len(), 1);
    }

    #[test]
    fn test_threshold_rejects_non_numeric() {
        let registry = registry();
        let rating = registry.get("rating").unwrap();
        let mut refinements = Refinements::new();
        assert!(refinements.toggle(rating, "lots").is_err());
        assert!(refinements.toggle(rating, "inf").is_err());
        assert!(refinements.is_empty());
    }

    #[test]
    fn test_to_filters_follows_registry_order() {
        let registry = registry();
        let mut refinements = Refinements::new();
        refinements
            .toggle(registry.get("payment").unwrap(), "Visa")
            .unwrap();
        refinements
            .toggle(registry.get("cuisine").unwrap(), "Thai")
            .unwrap();
        refinements
            .toggle(registry.get("rating").unwrap(), "2")
            .unwrap();

        let (facet_filters, numeric_filters) = refinements.to_filters(&registry);
        let facet_filters: Vec<String> = facet_filters.iter().map(|f| f.to_string()).collect();
        assert_eq!(facet_filters, vec!["food_type:Thai", "payment_options:Visa"]);
        assert_eq!(numeric_filters[0].to_string(), "stars_count>=2");
    }
}
