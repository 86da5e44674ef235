//! Contract with the hosted search service.
//!
//! The coordinator builds [`SearchParameters`]; a [`SearchService`]
//! executes them and answers with a [`ResultPage`]. Query execution,
//! ranking, highlighting and facet counting all happen behind this trait.
//!
//! Two implementations ship with the crate:
//! - [`http::HttpSearchService`] talks to an Algolia-compatible REST endpoint.
//! - [`memory::InMemorySearchService`] runs the same contract over records
//!   held in memory, for tests, demos and offline use.

pub mod http;
pub mod memory;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::distance::GeoPoint;
use crate::error::{GeofacetError, Result};

pub use self::http::HttpSearchService;
pub use self::memory::{InMemorySearchService, Restaurant};

/// Per-facet value counts: source field -> value -> count.
pub type FacetCounts = BTreeMap<String, BTreeMap<String, u64>>;

/// Conjunctive equality filter on a facet field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacetFilter {
    pub field: String,
    pub value: String,
}

impl FacetFilter {
    pub fn new(field: &str, value: &str) -> Self {
        FacetFilter {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

impl fmt::Display for FacetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.value)
    }
}

/// Comparison used by a numeric filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericOperator {
    GreaterOrEqual,
}

impl NumericOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumericOperator::GreaterOrEqual => ">=",
        }
    }
}

/// Numeric filter such as `stars_count>=4`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFilter {
    pub field: String,
    pub operator: NumericOperator,
    pub value: f64,
}

impl NumericFilter {
    /// `field >= value`.
    pub fn at_least(field: &str, value: f64) -> Self {
        NumericFilter {
            field: field.to_string(),
            operator: NumericOperator::GreaterOrEqual,
            value,
        }
    }

    /// Whether a record value passes this filter.
    pub fn accepts(&self, candidate: f64) -> bool {
        match self.operator {
            NumericOperator::GreaterOrEqual => candidate >= self.value,
        }
    }
}

impl fmt::Display for NumericFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.operator.as_str(), self.value)
    }
}

/// Everything the service needs to run one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParameters {
    /// Free-text query; empty matches everything.
    pub query: String,
    /// Fields to count facet values for.
    pub facets: Vec<String>,
    pub facet_filters: Vec<FacetFilter>,
    pub numeric_filters: Vec<NumericFilter>,
    /// Geo bias center.
    pub around: Option<GeoPoint>,
    pub page: u32,
    pub max_values_per_facet: usize,
    /// Page size; `None` leaves it to the service.
    pub hits_per_page: Option<usize>,
}

/// One search result.
///
/// The `highlighted_*` fields carry the service's query highlighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub id: String,
    pub image_url: String,
    pub name: String,
    pub highlighted_name: String,
    pub food_type: String,
    pub highlighted_food_type: String,
    pub neighborhood: String,
    pub highlighted_neighborhood: String,
    pub price_range: String,
    pub highlighted_price_range: String,
    pub stars_rating: f64,
    pub reviews_count: u64,
    pub geoloc: GeoPoint,
    /// 1-based position across all pages.
    pub rank_position: usize,
}

/// One page of results as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    pub hits: Vec<Hit>,
    pub nb_hits: u64,
    pub page: u32,
    pub nb_pages: u32,
    pub server_time_ms: u64,
    /// The query this page answers, verbatim.
    pub query: String,
    pub facet_counts: FacetCounts,
}

impl ResultPage {
    /// Whether another page follows this one.
    pub fn has_more(&self) -> bool {
        self.page.saturating_add(1) < self.nb_pages
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn server_time_seconds(&self) -> f64 {
        self.server_time_ms as f64 / 1000.0
    }

    /// Reject pages that cannot come from a well-behaved service.
    pub fn validate(&self) -> Result<()> {
        if !self.hits.is_empty() && self.page >= self.nb_pages {
            return Err(GeofacetError::search_failed(format!(
                "page {} returned hits but the result set has {} pages",
                self.page, self.nb_pages
            )));
        }
        if self.hits.len() as u64 > self.nb_hits {
            return Err(GeofacetError::search_failed(format!(
                "page carries {} hits but nbHits is {}",
                self.hits.len(),
                self.nb_hits
            )));
        }
        for hit in &self.hits {
            if !hit.geoloc.is_valid() {
                return Err(GeofacetError::search_failed(format!(
                    "hit {} has an invalid location {}",
                    hit.id, hit.geoloc
                )));
            }
            if !hit.stars_rating.is_finite() {
                return Err(GeofacetError::search_failed(format!(
                    "hit {} has a non-finite rating",
                    hit.id
                )));
            }
            if hit.rank_position == 0 {
                return Err(GeofacetError::search_failed(format!(
                    "hit {} has no rank position",
                    hit.id
                )));
            }
        }
        Ok(())
    }
}

/// A hosted search service.
#[async_trait]
pub trait SearchService: Send + Sync + fmt::Debug {
    /// Execute one search.
    ///
    /// Implementations return [`GeofacetError::SearchRequestFailed`] for
    /// transport failures and malformed responses alike.
    async fn search(&self, params: &SearchParameters) -> Result<ResultPage>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "search"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_hit(id: &str, rank_position: usize) -> Hit {
        Hit {
            id: id.to_string(),
            image_url: format!("https://img.example/{id}.jpg"),
            name: format!("Restaurant {id}"),
            highlighted_name: format!("Restaurant {id}"),
            food_type: "Sushi".to_string(),
            highlighted_food_type: "Sushi".to_string(),
            neighborhood: "Midtown".to_string(),
            highlighted_neighborhood: "Midtown".to_string(),
            price_range: "$30 and under".to_string(),
            highlighted_price_range: "$30 and under".to_string(),
            stars_rating: 4.2,
            reviews_count: 120,
            geoloc: GeoPoint {
                lat: 40.75,
                lng: -73.99,
            },
            rank_position,
        }
    }

    pub(crate) fn sample_page(page: u32, nb_pages: u32, hits: Vec<Hit>) -> ResultPage {
        ResultPage {
            nb_hits: (nb_pages as u64 * 20).max(hits.len() as u64),
            hits,
            page,
            nb_pages,
            server_time_ms: 3,
            query: String::new(),
            facet_counts: FacetCounts::new(),
        }
    }

    #[test]
    fn test_has_more() {
        assert!(sample_page(0, 2, vec![sample_hit("1", 1)]).has_more());
        assert!(!sample_page(1, 2, vec![sample_hit("1", 21)]).has_more());
        assert!(!sample_page(0, 0, vec![]).has_more());
        assert!(!sample_page(0, 1, vec![sample_hit("1", 1)]).has_more());
    }

    #[test]
    fn test_validate_rejects_impossible_pages() {
        assert!(sample_page(0, 1, vec![sample_hit("1", 1)]).validate().is_ok());
        assert!(sample_page(0, 0, vec![]).validate().is_ok());

        let err = sample_page(3, 2, vec![sample_hit("1", 61)])
            .validate()
            .unwrap_err();
        assert!(matches!(err, GeofacetError::SearchRequestFailed(_)));

        let mut hit = sample_hit("1", 1);
        hit.geoloc.lat = f64::NAN;
        assert!(sample_page(0, 1, vec![hit]).validate().is_err());

        assert!(sample_page(0, 1, vec![sample_hit("1", 0)]).validate().is_err());
    }

    #[test]
    fn test_filter_display() {
        assert_eq!(FacetFilter::new("food_type", "Thai").to_string(), "food_type:Thai");
        let filter = NumericFilter::at_least("stars_count", 3.5);
        assert_eq!(filter.to_string(), "stars_count>=3.5");
        assert!(filter.accepts(3.5));
        assert!(!filter.accepts(3.4));
    }

    #[test]
    fn test_server_time_seconds() {
        let mut page = sample_page(0, 1, vec![]);
        page.server_time_ms = 1500;
        assert_eq!(page.server_time_seconds(), 1.5);
    }
}
