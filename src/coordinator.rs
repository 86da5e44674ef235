//! Canonical search state and the requests it produces.
//!
//! [`SearchStateCoordinator`] owns the [`SearchState`]. Every mutation goes
//! through one of its operations and yields a [`SearchRequest`] describing
//! what to send to the search service and how the answer must be rendered.
//! Nothing here awaits a response; issuing a request and applying its
//! result are decoupled, and each request carries a [`RequestId`] so the
//! renderer can tell stale answers apart.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MAX_VALUES_PER_FACET, GeofacetConfig};
use crate::distance::GeoPoint;
use crate::error::Result;
use crate::facet::{FacetRegistry, Refinements};
use crate::geolocation::GeolocationResult;
use crate::service::SearchParameters;

/// Monotonically increasing identifier of an issued search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(value: u64) -> Self {
        RequestId(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How the answer to a request is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Page 0: a new result set replaces whatever is shown.
    Replace,
    /// Page > 0: hits are appended to the current result set.
    Append,
}

/// A search ready to be sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub id: RequestId,
    pub parameters: SearchParameters,
    pub mode: RenderMode,
    /// Refinements in effect when the request was issued.
    pub refinements: Refinements,
}

impl SearchRequest {
    pub fn page(&self) -> u32 {
        self.parameters.page
    }

    /// Whether this request starts a new result set, making any
    /// "more pages" control on screen meaningless.
    pub fn invalidates_pagination(&self) -> bool {
        self.mode == RenderMode::Replace
    }
}

/// The state every search is built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    /// Free text; empty matches everything.
    pub query: String,
    pub refinements: Refinements,
    /// Geo bias; `None` until a location is known.
    pub location: Option<GeoPoint>,
    pub page: u32,
}

/// Mediates every state mutation into a search request.
#[derive(Debug, Clone)]
pub struct SearchStateCoordinator {
    registry: Arc<FacetRegistry>,
    state: SearchState,
    max_values_per_facet: usize,
    hits_per_page: Option<usize>,
    next_id: u64,
    last_request: Option<SearchRequest>,
}

impl SearchStateCoordinator {
    pub fn new(registry: Arc<FacetRegistry>) -> Self {
        SearchStateCoordinator {
            registry,
            state: SearchState::default(),
            max_values_per_facet: DEFAULT_MAX_VALUES_PER_FACET,
            hits_per_page: None,
            next_id: 1,
            last_request: None,
        }
    }

    /// Coordinator seeded with the configured facets, limits and the
    /// default location.
    pub fn from_config(config: &GeofacetConfig) -> Self {
        let mut coordinator = Self::new(Arc::new(config.facets.clone()))
            .with_max_values_per_facet(config.max_values_per_facet);
        coordinator.hits_per_page = config.hits_per_page;
        coordinator.state.location = Some(config.default_location);
        coordinator
    }

    pub fn with_max_values_per_facet(mut self, max_values_per_facet: usize) -> Self {
        self.max_values_per_facet = max_values_per_facet;
        self
    }

    pub fn with_hits_per_page(mut self, hits_per_page: usize) -> Self {
        self.hits_per_page = Some(hits_per_page);
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.state.location = Some(location);
        self
    }

    pub fn registry(&self) -> &Arc<FacetRegistry> {
        &self.registry
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn last_request(&self) -> Option<&SearchRequest> {
        self.last_request.as_ref()
    }

    /// Search the current state from page 0. Used for the first search.
    pub fn search(&mut self) -> SearchRequest {
        self.state.page = 0;
        self.issue(RenderMode::Replace)
    }

    pub fn set_query(&mut self, text: &str) -> SearchRequest {
        self.state.query = text.to_string();
        self.state.page = 0;
        self.issue(RenderMode::Replace)
    }

    /// Toggle `value` on facet `facet_id` with the facet kind's semantics.
    ///
    /// Unknown facets and unparsable threshold values leave the state
    /// untouched.
    pub fn toggle_facet_refinement(&mut self, facet_id: &str, value: &str) -> Result<SearchRequest> {
        let descriptor = self.registry.get(facet_id)?;
        self.state.refinements.toggle(descriptor, value)?;
        self.state.page = 0;
        Ok(self.issue(RenderMode::Replace))
    }

    /// Bias further searches to `location`. Refinements and query stay.
    pub fn apply_location(&mut self, location: &GeolocationResult) -> SearchRequest {
        self.state.location = Some(location.point);
        self.state.page = 0;
        self.issue(RenderMode::Replace)
    }

    /// Advance one page; nothing else changes.
    pub fn next_page(&mut self) -> SearchRequest {
        self.state.page += 1;
        self.issue(RenderMode::Append)
    }

    /// Drop query and refinements; the location is kept.
    pub fn clear_search(&mut self) -> SearchRequest {
        self.state.query.clear();
        self.state.refinements.clear();
        self.state.page = 0;
        self.issue(RenderMode::Replace)
    }

    /// Undo the page advance of an append that failed.
    ///
    /// Returns `false` when `request` is not the append the state currently
    /// points at.
    pub fn abandon_append(&mut self, request: &SearchRequest) -> bool {
        if request.mode != RenderMode::Append
            || request.page() == 0
            || self.state.page != request.page()
        {
            return false;
        }
        self.state.page = request.page() - 1;
        log::debug!(
            "search {} failed, page back to {}",
            request.id,
            self.state.page
        );
        true
    }

    /// Re-issue `failed` under a fresh id.
    ///
    /// Query, refinements and location are untouched; the page moves to the
    /// failed request's page again.
    pub fn retry(&mut self, failed: &SearchRequest) -> SearchRequest {
        self.state.page = failed.page();
        let request = SearchRequest {
            id: self.allocate_id(),
            ..failed.clone()
        };
        log::debug!(
            "retrying search {} as {} (page {}, query {:?})",
            failed.id,
            request.id,
            request.page(),
            request.parameters.query
        );
        self.last_request = Some(request.clone());
        request
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        id
    }

    fn issue(&mut self, mode: RenderMode) -> SearchRequest {
        let (facet_filters, numeric_filters) = self.state.refinements.to_filters(&self.registry);
        let parameters = SearchParameters {
            query: self.state.query.clone(),
            facets: self.registry.source_fields(),
            facet_filters,
            numeric_filters,
            around: self.state.location,
            page: self.state.page,
            max_values_per_facet: self.max_values_per_facet,
            hits_per_page: self.hits_per_page,
        };
        let request = SearchRequest {
            id: self.allocate_id(),
            parameters,
            mode,
            refinements: self.state.refinements.clone(),
        };
        log::debug!(
            "issuing search {} (page {}, query {:?}, {} refinement(s))",
            request.id,
            request.page(),
            request.parameters.query,
            request.parameters.facet_filters.len() + request.parameters.numeric_filters.len()
        );
        self.last_request = Some(request.clone());
        request
    }
}
