//! Facet list rendering.
//!
//! Categorical facets list every counted value, most frequent first.
//! Threshold facets show the full candidate ladder while nothing is
//! selected, and only the selected floor once one is.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::distance::{StarRating, rating_to_stars};
use crate::facet::descriptor::{FacetDescriptor, FacetKind, FacetRegistry};
use crate::facet::refinement::{RefinementValue, Refinements};
use crate::service::FacetCounts;

/// One value of a categorical facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetEntry {
    pub name: String,
    pub count: u64,
    pub is_refined: bool,
}

/// One rung of a threshold ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    pub value: f64,
    pub stars: StarRating,
    /// Accessible label, e.g. `"4 & up"`.
    pub label: String,
    pub is_active: bool,
}

impl ThresholdEntry {
    fn new(value: f64, is_active: bool) -> Self {
        ThresholdEntry {
            value,
            stars: rating_to_stars(value),
            label: format!("{value} & up"),
            is_active,
        }
    }

    /// The value to send back when this entry is clicked.
    pub fn toggle_value(&self) -> String {
        self.value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entries", rename_all = "snake_case")]
pub enum FacetEntries {
    Categorical(Vec<FacetEntry>),
    Threshold(Vec<ThresholdEntry>),
}

impl FacetEntries {
    pub fn len(&self) -> usize {
        match self {
            FacetEntries::Categorical(entries) => entries.len(),
            FacetEntries::Threshold(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rendered list for one facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetList {
    pub facet_id: String,
    pub source_field: String,
    pub entries: FacetEntries,
}

impl FacetList {
    /// Render one facet from the service's counts and the active refinements.
    pub fn render(
        descriptor: &FacetDescriptor,
        counts: Option<&BTreeMap<String, u64>>,
        refinements: &Refinements,
    ) -> Self {
        let entries = match &descriptor.kind {
            FacetKind::Categorical => {
                FacetEntries::Categorical(categorical_entries(&descriptor.id, counts, refinements))
            }
            FacetKind::Threshold { candidate_values } => {
                let entries = match refinements.active_threshold(&descriptor.id) {
                    Some(active) => vec![ThresholdEntry::new(active, true)],
                    None => candidate_values
                        .iter()
                        .map(|value| ThresholdEntry::new(*value, false))
                        .collect(),
                };
                FacetEntries::Threshold(entries)
            }
        };

        FacetList {
            facet_id: descriptor.id.clone(),
            source_field: descriptor.source_field.clone(),
            entries,
        }
    }
}

/// Render every registered facet, in registry order.
pub fn render_facets(
    registry: &FacetRegistry,
    facet_counts: &FacetCounts,
    refinements: &Refinements,
) -> Vec<FacetList> {
    registry
        .iter()
        .map(|descriptor| {
            FacetList::render(
                descriptor,
                facet_counts.get(&descriptor.source_field),
                refinements,
            )
        })
        .collect()
}

/// Entries for a categorical facet.
///
/// This is not just the service's count list: refined values the service
/// did not count are added with count 0, so the listing can hold more
/// values than the service returned.
fn categorical_entries(
    facet_id: &str,
    counts: Option<&BTreeMap<String, u64>>,
    refinements: &Refinements,
) -> Vec<FacetEntry> {
    let mut entries: Vec<FacetEntry> = counts
        .into_iter()
        .flatten()
        .map(|(name, count)| FacetEntry {
            name: name.clone(),
            count: *count,
            is_refined: refinements.is_refined(facet_id, name),
        })
        .collect();

    // Keeps every active refinement clickable.
    if let Some(RefinementValue::Categorical(active)) = refinements.get(facet_id) {
        for name in active {
            if !entries.iter().any(|e| &e.name == name) {
                entries.push(FacetEntry {
                    name: name.clone(),
                    count: 0,
                    is_refined: true,
                });
            }
        }
    }

    entries.sort_by(|a, b| match b.count.cmp(&a.count) {
        Ordering::Equal => a.name.cmp(&b.name),
        other => other,
    });
    entries
}
