//! Data contracts handed to the presentation layer.

use serde::{Deserialize, Serialize};

use crate::coordinator::RequestId;
use crate::distance::{GeoPoint, StarRating, distance, format_distance, rating_to_stars};
use crate::facet::FacetList;
use crate::service::{Hit, ResultPage};

/// "N results found in T seconds".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsBanner {
    pub nb_hits: u64,
    pub server_time_seconds: f64,
}

impl StatsBanner {
    pub fn from_page(page: &ResultPage) -> Self {
        StatsBanner {
            nb_hits: page.nb_hits,
            server_time_seconds: page.server_time_seconds(),
        }
    }
}

/// One rendered hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitCard {
    pub id: String,
    pub image_url: String,
    pub name: String,
    pub highlighted_name: String,
    pub rating: f64,
    pub stars: StarRating,
    pub reviews_count: u64,
    pub highlighted_food_type: String,
    pub highlighted_neighborhood: String,
    pub highlighted_price_range: String,
    /// Miles from the location the search was biased to.
    pub distance_miles: f64,
    pub distance_label: String,
    /// Top-ranked hit of the whole result set.
    pub is_first: bool,
}

impl HitCard {
    pub fn from_hit(hit: &Hit, origin: GeoPoint) -> Self {
        let miles = distance(origin, hit.geoloc);
        HitCard {
            id: hit.id.clone(),
            image_url: hit.image_url.clone(),
            name: hit.name.clone(),
            highlighted_name: hit.highlighted_name.clone(),
            rating: hit.stars_rating,
            stars: rating_to_stars(hit.stars_rating),
            reviews_count: hit.reviews_count,
            highlighted_food_type: hit.highlighted_food_type.clone(),
            highlighted_neighborhood: hit.highlighted_neighborhood.clone(),
            highlighted_price_range: hit.highlighted_price_range.clone(),
            distance_miles: miles,
            distance_label: format_distance(miles),
            is_first: hit.rank_position == 1,
        }
    }
}

/// "Show more" affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationControl {
    pub next_page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearSearchAction {
    pub label: String,
}

impl Default for ClearSearchAction {
    fn default() -> Self {
        ClearSearchAction {
            label: "Clear search".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryAction {
    /// The request that failed.
    pub request_id: RequestId,
    pub label: String,
}

impl RetryAction {
    pub fn new(request_id: RequestId) -> Self {
        RetryAction {
            request_id,
            label: "Retry".to_string(),
        }
    }
}

/// Transient notice shown over the current results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBanner {
    pub message: String,
    pub retry: RetryAction,
}

/// Main result area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResultsBody {
    /// Nothing has been rendered yet.
    #[default]
    Pending,
    NoResults {
        /// The query exactly as the user typed it.
        query: String,
        clear_action: ClearSearchAction,
    },
    Results {
        stats: StatsBanner,
        hits: Vec<HitCard>,
        pagination: Option<PaginationControl>,
    },
}

/// Everything the presentation layer shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultView {
    pub body: ResultsBody,
    pub facet_lists: Vec<FacetList>,
    pub error_banner: Option<ErrorBanner>,
    /// Newest request whose response is on screen.
    pub applied_request: Option<RequestId>,
}

impl ResultView {
    pub fn hits(&self) -> &[HitCard] {
        match &self.body {
            ResultsBody::Results { hits, .. } => hits,
            _ => &[],
        }
    }

    pub fn pagination(&self) -> Option<&PaginationControl> {
        match &self.body {
            ResultsBody::Results { pagination, .. } => pagination.as_ref(),
            _ => None,
        }
    }

    pub fn stats(&self) -> Option<&StatsBanner> {
        match &self.body {
            ResultsBody::Results { stats, .. } => Some(stats),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.body, ResultsBody::Pending)
    }

    pub fn is_no_results(&self) -> bool {
        matches!(self.body, ResultsBody::NoResults { .. })
    }

    pub fn facet_list(&self, facet_id: &str) -> Option<&FacetList> {
        self.facet_lists.iter().find(|list| list.facet_id == facet_id)
    }
}
