//! Facet registry, refinement state and facet list rendering.
//!
//! A facet is a filterable dimension over the result set. Each registered
//! facet is either [`FacetKind::Categorical`] (any number of values active
//! at once) or [`FacetKind::Threshold`] (at most one "greater or equal"
//! floor). Toggle and render behavior is dispatched on that tag, so adding
//! a new kind fails to compile until every match handles it.

pub mod descriptor;
pub mod display;
pub mod refinement;

pub use self::descriptor::{FacetDescriptor, FacetKind, FacetRegistry};
pub use self::display::{FacetEntries, FacetEntry, FacetList, ThresholdEntry, render_facets};
pub use self::refinement::{RefinementValue, Refinements};
