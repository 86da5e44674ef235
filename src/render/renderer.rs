//! Applies search responses to the [`ResultView`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::coordinator::{RenderMode, RequestId, SearchRequest};
use crate::distance::GeoPoint;
use crate::error::GeofacetError;
use crate::facet::{FacetRegistry, render_facets};
use crate::render::view::{
    ClearSearchAction, ErrorBanner, HitCard, PaginationControl, ResultView, ResultsBody,
    RetryAction, StatsBanner,
};
use crate::service::ResultPage;

/// What a call to [`ResultRenderer::apply`] or
/// [`ResultRenderer::render_failure`] did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderOutcome {
    Replaced,
    Appended,
    /// The response was older than what is already on screen.
    Discarded,
    /// An error banner is now shown.
    Failed,
}

impl RenderOutcome {
    /// Whether the view changed.
    pub fn is_visible(&self) -> bool {
        !matches!(self, RenderOutcome::Discarded)
    }
}

/// Keeps the result view in sync with issued requests and their responses.
///
/// Requests must be announced with [`begin`](Self::begin) before their
/// responses are applied. A response is discarded when a newer page-0
/// request has been issued since, or when a newer response is already
/// shown.
#[derive(Debug, Clone)]
pub struct ResultRenderer {
    registry: Arc<FacetRegistry>,
    default_location: GeoPoint,
    view: ResultView,
    latest_replace: Option<RequestId>,
    last_applied: Option<RequestId>,
    pending_append: Option<RequestId>,
    failed: Option<SearchRequest>,
}

impl ResultRenderer {
    pub fn new(registry: Arc<FacetRegistry>, default_location: GeoPoint) -> Self {
        ResultRenderer {
            registry,
            default_location,
            view: ResultView::default(),
            latest_replace: None,
            last_applied: None,
            pending_append: None,
            failed: None,
        }
    }

    pub fn view(&self) -> &ResultView {
        &self.view
    }

    /// Whether a "show more" click can be honoured right now.
    pub fn can_append(&self) -> bool {
        self.view.pagination().is_some() && self.pending_append.is_none()
    }

    /// The failed request behind the error banner, if one is shown.
    pub fn failed_request(&self) -> Option<&SearchRequest> {
        let banner = self.view.error_banner.as_ref()?;
        self.failed
            .as_ref()
            .filter(|failed| failed.id == banner.retry.request_id)
    }

    /// Announce an issued request.
    ///
    /// Any error banner is dropped: the new request supersedes the failed
    /// one. A page-0 request invalidates the pagination control
    /// immediately; the hits already shown stay until its response arrives.
    pub fn begin(&mut self, request: &SearchRequest) {
        self.view.error_banner = None;
        self.failed = None;
        match request.mode {
            RenderMode::Replace => {
                self.latest_replace = Some(request.id);
                self.pending_append = None;
                if let ResultsBody::Results { pagination, .. } = &mut self.view.body {
                    *pagination = None;
                }
            }
            RenderMode::Append => {
                self.pending_append = Some(request.id);
            }
        }
    }

    /// Paint the response to `request`.
    ///
    /// A page that fails validation is rendered as a search failure.
    pub fn apply(&mut self, request: &SearchRequest, page: &ResultPage) -> RenderOutcome {
        if self.is_stale(request.id) {
            log::debug!(
                "discarding stale response to search {} (page {})",
                request.id,
                request.page()
            );
            return RenderOutcome::Discarded;
        }
        if let Err(e) = page.validate() {
            return self.render_failure(request, &e);
        }
        if self.pending_append == Some(request.id) {
            self.pending_append = None;
        }

        let origin = request.parameters.around.unwrap_or(self.default_location);
        let outcome = match request.mode {
            RenderMode::Replace => {
                self.replace(request, page, origin);
                RenderOutcome::Replaced
            }
            RenderMode::Append => match self.append(page, origin) {
                Some(outcome) => outcome,
                None => {
                    log::debug!(
                        "dropping page {} of search {}: no result list to extend",
                        page.page,
                        request.id
                    );
                    return RenderOutcome::Discarded;
                }
            },
        };

        self.view.error_banner = None;
        self.failed = None;
        self.view.applied_request = Some(request.id);
        self.last_applied = Some(request.id);
        outcome
    }

    /// Show a failed request as an error banner; the results stay.
    ///
    /// A failed append leaves the pagination control in place, still
    /// pointing at the page that failed.
    pub fn render_failure(&mut self, request: &SearchRequest, error: &GeofacetError) -> RenderOutcome {
        if self.is_stale(request.id) {
            log::debug!("ignoring failure of stale search {}: {error}", request.id);
            return RenderOutcome::Discarded;
        }
        if self.pending_append == Some(request.id) {
            self.pending_append = None;
        }

        log::warn!("search {} failed: {error}", request.id);
        self.view.error_banner = Some(ErrorBanner {
            message: error.to_string(),
            retry: RetryAction::new(request.id),
        });
        self.failed = Some(request.clone());
        RenderOutcome::Failed
    }

    fn is_stale(&self, id: RequestId) -> bool {
        self.latest_replace.is_some_and(|latest| id < latest)
            || self.last_applied.is_some_and(|applied| id <= applied)
    }

    fn replace(&mut self, request: &SearchRequest, page: &ResultPage, origin: GeoPoint) {
        self.view.body = if page.is_empty() {
            ResultsBody::NoResults {
                query: request.parameters.query.clone(),
                clear_action: ClearSearchAction::default(),
            }
        } else {
            ResultsBody::Results {
                stats: StatsBanner::from_page(page),
                hits: page
                    .hits
                    .iter()
                    .map(|hit| HitCard::from_hit(hit, origin))
                    .collect(),
                pagination: next_page_control(page),
            }
        };
        self.view.facet_lists =
            render_facets(&self.registry, &page.facet_counts, &request.refinements);
    }

    // Facet lists are left alone while paging.
    fn append(&mut self, page: &ResultPage, origin: GeoPoint) -> Option<RenderOutcome> {
        let ResultsBody::Results {
            hits, pagination, ..
        } = &mut self.view.body
        else {
            return None;
        };
        hits.extend(page.hits.iter().map(|hit| HitCard::from_hit(hit, origin)));
        *pagination = next_page_control(page);
        Some(RenderOutcome::Appended)
    }
}

fn next_page_control(page: &ResultPage) -> Option<PaginationControl> {
    page.has_more().then(|| PaginationControl {
        next_page: page.page + 1,
    })
}
