use std::collections::HashSet;
use std::sync::Arc;

use geofacet::config::GeofacetConfig;
use geofacet::coordinator::{RenderMode, SearchRequest, SearchStateCoordinator};
use geofacet::distance::GeoPoint;
use geofacet::error::{GeofacetError, Result};
use geofacet::facet::FacetEntries;
use geofacet::geolocation::GeolocationResult;
use geofacet::render::{RenderOutcome, ResultRenderer, ResultsBody};
use geofacet::service::{InMemorySearchService, SearchService};

#[tokio::test]
async fn zero_hit_query_renders_no_results_with_literal_query() -> Result<()> {
    let mut harness = Harness::new(20)?;

    let request = harness.coordinator.set_query("sushi");
    assert_eq!(harness.run(&request).await?, RenderOutcome::Replaced);

    match &harness.renderer.view().body {
        ResultsBody::NoResults { query, .. } => assert!(query.contains("sushi")),
        other => panic!("expected no-results block, got {other:?}"),
    }
    assert!(harness.renderer.view().pagination().is_none());
    Ok(())
}

#[tokio::test]
async fn two_pages_append_then_drop_pagination() -> Result<()> {
    let mut harness = Harness::new(3)?;

    let request = harness.coordinator.search();
    harness.run(&request).await?;
    let view = harness.renderer.view();
    assert_eq!(view.hits().len(), 3);
    assert_eq!(view.stats().map(|s| s.nb_hits), Some(5));
    assert!(view.pagination().is_some());
    let facets_before = view.facet_lists.clone();

    let more = harness.coordinator.next_page();
    assert_eq!(more.mode, RenderMode::Append);
    assert_eq!(more.page(), 1);
    assert_eq!(harness.run(&more).await?, RenderOutcome::Appended);

    let view = harness.renderer.view();
    assert_eq!(view.hits().len(), 5);
    assert!(view.pagination().is_none());
    assert_eq!(view.facet_lists, facets_before);
    assert!(!harness.renderer.can_append());

    // Ranks continue across pages.
    let first: Vec<bool> = view.hits().iter().map(|h| h.is_first).collect();
    assert_eq!(first, vec![true, false, false, false, false]);
    Ok(())
}

#[tokio::test]
async fn results_are_ordered_by_distance_to_location() -> Result<()> {
    let mut harness = Harness::new(20)?;
    let brooklyn = GeoPoint::new(40.6782, -73.9442)?;

    let request = harness
        .coordinator
        .apply_location(&GeolocationResult::device(brooklyn));
    harness.run(&request).await?;

    let view = harness.renderer.view();
    assert_eq!(view.hits()[0].id, "5");
    let distances: Vec<f64> = view.hits().iter().map(|h| h.distance_miles).collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    assert!(view.hits()[0].distance_label.ends_with(" mi"));
    Ok(())
}

#[tokio::test]
async fn categorical_refinements_filter_and_mark_entries() -> Result<()> {
    let mut harness = Harness::new(20)?;

    let request = harness
        .coordinator
        .toggle_facet_refinement("cuisine", "Italian")?;
    harness.run(&request).await?;

    let view = harness.renderer.view();
    assert_eq!(view.hits().len(), 2);
    match &view.facet_list("cuisine").map(|l| &l.entries) {
        Some(FacetEntries::Categorical(entries)) => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].name, "Italian");
            assert!(entries[0].is_refined);
        }
        other => panic!("unexpected cuisine entries {other:?}"),
    }

    // Toggling the same value again restores the unfiltered result set.
    let request = harness
        .coordinator
        .toggle_facet_refinement("cuisine", "Italian")?;
    harness.run(&request).await?;
    assert_eq!(harness.renderer.view().hits().len(), 5);
    assert!(harness.coordinator.state().refinements.is_empty());
    Ok(())
}

#[tokio::test]
async fn threshold_refinement_replaces_and_clears() -> Result<()> {
    let mut harness = Harness::new(20)?;

    let request = harness.coordinator.toggle_facet_refinement("rating", "4")?;
    harness.run(&request).await?;
    assert_eq!(harness.renderer.view().hits().len(), 3);

    let request = harness.coordinator.toggle_facet_refinement("rating", "3")?;
    harness.run(&request).await?;
    assert_eq!(harness.renderer.view().hits().len(), 4);
    match &harness.renderer.view().facet_list("rating").map(|l| &l.entries) {
        Some(FacetEntries::Threshold(entries)) => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].value, 3.0);
            assert_eq!(entries[0].label, "3 & up");
        }
        other => panic!("unexpected rating entries {other:?}"),
    }

    let request = harness.coordinator.toggle_facet_refinement("rating", "3")?;
    harness.run(&request).await?;
    assert_eq!(harness.renderer.view().hits().len(), 5);
    match &harness.renderer.view().facet_list("rating").map(|l| &l.entries) {
        Some(FacetEntries::Threshold(entries)) => {
            let ladder: Vec<f64> = entries.iter().map(|e| e.value).collect();
            assert_eq!(ladder, vec![5.0, 4.0, 3.0, 2.0, 1.0]);
        }
        other => panic!("unexpected rating entries {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn later_keystroke_wins_over_slow_earlier_response() -> Result<()> {
    let mut harness = Harness::new(20)?;

    let early = harness.coordinator.set_query("p");
    harness.renderer.begin(&early);
    let late = harness.coordinator.set_query("pizza");
    harness.renderer.begin(&late);

    let late_page = harness.service.search(&late.parameters).await?;
    let early_page = harness.service.search(&early.parameters).await?;
    assert_eq!(harness.renderer.apply(&late, &late_page), RenderOutcome::Replaced);
    assert_eq!(
        harness.renderer.apply(&early, &early_page),
        RenderOutcome::Discarded
    );
    assert_eq!(harness.renderer.view().applied_request, Some(late.id));
    Ok(())
}

#[tokio::test]
async fn failed_search_shows_banner_and_retry_recovers() -> Result<()> {
    let mut harness = Harness::new(20)?;

    let request = harness.coordinator.search();
    harness.run(&request).await?;

    let failing = harness.coordinator.set_query("pizza");
    harness.renderer.begin(&failing);
    let err = GeofacetError::search_failed("503 Service Unavailable");
    assert_eq!(
        harness.renderer.render_failure(&failing, &err),
        RenderOutcome::Failed
    );
    assert_eq!(harness.renderer.view().hits().len(), 5);
    assert!(harness.renderer.view().error_banner.is_some());

    let failed = harness
        .renderer
        .failed_request()
        .cloned()
        .expect("the banner names the failed search");
    let retry = harness.coordinator.retry(&failed);
    assert_eq!(retry.parameters.query, "pizza");
    harness.run(&retry).await?;
    assert!(harness.renderer.view().error_banner.is_none());
    assert_eq!(harness.renderer.view().hits().len(), 1);
    assert!(harness.renderer.view().hits()[0].highlighted_name.contains("<em>"));
    Ok(())
}

#[tokio::test]
async fn show_more_after_failed_append_loads_the_missing_page() -> Result<()> {
    let mut harness = Harness::new(2)?;
    let request = harness.coordinator.search();
    harness.run(&request).await?;

    let more = harness.coordinator.next_page();
    harness.fail(&more);
    assert_eq!(harness.coordinator.state().page, 0);
    assert!(harness.renderer.can_append());
    assert_eq!(
        harness.renderer.view().pagination().map(|p| p.next_page),
        Some(1)
    );

    let again = harness.coordinator.next_page();
    assert_eq!(again.page(), 1);
    assert_eq!(harness.run(&again).await?, RenderOutcome::Appended);
    assert!(harness.renderer.view().error_banner.is_none());
    assert_eq!(distinct_hits(&harness), 4);
    assert_eq!(
        harness.renderer.view().pagination().map(|p| p.next_page),
        Some(2)
    );
    Ok(())
}

#[tokio::test]
async fn retry_after_failed_append_loads_the_page_once() -> Result<()> {
    let mut harness = Harness::new(2)?;
    let request = harness.coordinator.search();
    harness.run(&request).await?;

    let more = harness.coordinator.next_page();
    harness.fail(&more);

    let failed = harness
        .renderer
        .failed_request()
        .cloned()
        .expect("the banner names the failed append");
    assert_eq!(failed.id, more.id);
    let retry = harness.coordinator.retry(&failed);
    assert_eq!(retry.mode, RenderMode::Append);
    assert_eq!(retry.page(), 1);
    assert_eq!(harness.run(&retry).await?, RenderOutcome::Appended);

    assert_eq!(distinct_hits(&harness), 4);
    assert_eq!(harness.renderer.view().hits().len(), 4);
    assert_eq!(harness.coordinator.state().page, 1);
    assert!(harness.renderer.failed_request().is_none());
    Ok(())
}

#[tokio::test]
async fn nothing_to_retry_after_successful_pages() -> Result<()> {
    let mut harness = Harness::new(2)?;
    let request = harness.coordinator.search();
    harness.run(&request).await?;
    let more = harness.coordinator.next_page();
    harness.run(&more).await?;

    assert!(harness.renderer.view().error_banner.is_none());
    assert!(harness.renderer.failed_request().is_none());
    assert_eq!(distinct_hits(&harness), 4);
    Ok(())
}

fn distinct_hits(harness: &Harness) -> usize {
    let view = harness.renderer.view();
    let ids: HashSet<&str> = view.hits().iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids.len(), view.hits().len(), "duplicate hits on screen");
    ids.len()
}

struct Harness {
    coordinator: SearchStateCoordinator,
    renderer: ResultRenderer,
    service: Arc<InMemorySearchService>,
}

impl Harness {
    fn new(hits_per_page: usize) -> Result<Self> {
        let config = GeofacetConfig::default();
        let coordinator = SearchStateCoordinator::from_config(&config);
        let renderer = ResultRenderer::new(coordinator.registry().clone(), config.default_location);
        let service = InMemorySearchService::from_json_str(DATASET)?.with_hits_per_page(hits_per_page);
        Ok(Harness {
            coordinator,
            renderer,
            service: Arc::new(service),
        })
    }

    async fn run(&mut self, request: &SearchRequest) -> Result<RenderOutcome> {
        self.renderer.begin(request);
        let page = self.service.search(&request.parameters).await?;
        Ok(self.renderer.apply(request, &page))
    }

    /// Fail `request` the way the session does: banner plus page rollback.
    fn fail(&mut self, request: &SearchRequest) {
        self.renderer.begin(request);
        let err = GeofacetError::search_failed("502 Bad Gateway");
        assert_eq!(
            self.renderer.render_failure(request, &err),
            RenderOutcome::Failed
        );
        self.coordinator.abandon_append(request);
    }
}

const DATASET: &str = r#"[
    {"objectID": "1", "name": "Joe's Pizza", "food_type": "Italian", "neighborhood": "Greenwich Village",
     "price_range": "$30 and under", "stars_count": 4.4, "reviews_count": 1200,
     "payment_options": ["Visa", "MasterCard"], "image_url": "https://img.example/1.jpg",
     "_geoloc": {"lat": 40.7306, "lng": -74.0021}},
    {"objectID": "2", "name": "Lucali", "food_type": "Italian", "neighborhood": "Carroll Gardens",
     "price_range": "$30 and under", "stars_count": 4.7, "reviews_count": 800,
     "payment_options": ["Cash Only"], "image_url": "https://img.example/2.jpg",
     "_geoloc": {"lat": 40.6818, "lng": -74.0003}},
    {"objectID": "3", "name": "Katz's Delicatessen", "food_type": "Deli", "neighborhood": "Lower East Side",
     "price_range": "$30 and under", "stars_count": 3.6, "reviews_count": 5000,
     "payment_options": ["Visa", "AMEX"], "image_url": "https://img.example/3.jpg",
     "_geoloc": {"lat": 40.7223, "lng": -73.9874}},
    {"objectID": "4", "name": "Le Bernardin", "food_type": "French", "neighborhood": "Midtown West",
     "price_range": "$50 and over", "stars_count": 4.9, "reviews_count": 2100,
     "payment_options": ["AMEX", "Diners Club"], "image_url": "https://img.example/4.jpg",
     "_geoloc": {"lat": 40.7615, "lng": -73.9818}},
    {"objectID": "5", "name": "Peter Luger", "food_type": "Steak", "neighborhood": "Williamsburg",
     "price_range": "$50 and over", "stars_count": 2.9, "reviews_count": 3000,
     "payment_options": ["Cash Only"], "image_url": "https://img.example/5.jpg",
     "_geoloc": {"lat": 40.7099, "lng": -73.9623}}
]"#;
