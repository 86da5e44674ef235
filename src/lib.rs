//! # Geofacet
//!
//! Client-side coordination for a faceted, location-biased search
//! experience.
//!
//! ## Features
//!
//! - Explicit search state with page-reset rules
//! - Categorical and threshold facets with exclusive toggle-clear
//! - Device and IP geolocation racing through one arbiter
//! - Replace and append rendering with stale-response discarding
//! - Hosted (HTTP) and in-memory search services

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod distance;
pub mod error;
pub mod facet;
pub mod geolocation;
pub mod render;
pub mod service;
pub mod session;

pub mod prelude {
    pub use crate::config::GeofacetConfig;
    pub use crate::coordinator::{RenderMode, RequestId, SearchRequest, SearchState, SearchStateCoordinator};
    pub use crate::distance::{GeoPoint, distance, format_distance, rating_to_stars};
    pub use crate::error::{GeofacetError, Result};
    pub use crate::facet::{FacetDescriptor, FacetKind, FacetRegistry};
    pub use crate::geolocation::{GeolocationResolver, GeolocationResult, GeolocationSource};
    pub use crate::render::{RenderOutcome, ResultRenderer, ResultView, ResultsBody};
    pub use crate::service::{InMemorySearchService, ResultPage, SearchParameters, SearchService};
    pub use crate::session::{SearchSession, SessionHandle, UiEvent};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
