//! The running search experience.
//!
//! [`SearchSession::init`] wires the coordinator, the renderer, the
//! geolocation resolver and the search service into a single event loop
//! task. UI events, accepted locations and completed searches are handled
//! one at a time in arrival order; searches themselves run as separate
//! tasks so the loop never waits on the network.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::config::GeofacetConfig;
use crate::coordinator::{SearchRequest, SearchState, SearchStateCoordinator};
use crate::error::{GeofacetError, Result};
use crate::geolocation::{GeolocationResolver, GeolocationResult, ResolverHandle};
use crate::render::{RenderOutcome, ResultRenderer, ResultView};
use crate::service::{ResultPage, SearchService};

/// Input from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiEvent {
    QueryChanged(String),
    FacetClicked { facet_id: String, value: String },
    ShowMore,
    ClearSearch,
    Retry,
}

/// Entry point of the search experience.
pub struct SearchSession;

impl SearchSession {
    /// Start a session on the current tokio runtime.
    ///
    /// The first search goes out immediately with the configured default
    /// location; geolocation resolves concurrently and every accepted
    /// position triggers another search.
    pub fn init(
        config: &GeofacetConfig,
        service: Arc<dyn SearchService>,
        resolver: GeolocationResolver,
    ) -> SessionHandle {
        let coordinator = SearchStateCoordinator::from_config(config);
        let renderer = ResultRenderer::new(coordinator.registry().clone(), config.default_location);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (locations_tx, locations_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(renderer.view().clone());
        let (state_tx, state_rx) = watch::channel(coordinator.state().clone());
        let cancel = CancellationToken::new();

        let resolver = resolver.spawn(locations_tx);
        let event_loop = EventLoop {
            coordinator,
            renderer,
            service,
            searches: JoinSet::new(),
            view_tx,
            state_tx,
        };
        let task = tokio::spawn(event_loop.run(events_rx, locations_rx, resolver, cancel.clone()));

        SessionHandle {
            events: events_tx,
            view: view_rx,
            state: state_rx,
            cancel,
            task,
        }
    }
}

/// Handle to a running session.
#[derive(Debug)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<UiEvent>,
    view: watch::Receiver<ResultView>,
    state: watch::Receiver<SearchState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn send(&self, event: UiEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| GeofacetError::cancelled("session has shut down"))
    }

    /// The view as last published.
    pub fn view(&self) -> ResultView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResultView> {
        self.view.clone()
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Stop the event loop, in-flight searches and geolocation.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.task
            .await
            .map_err(|e| GeofacetError::cancelled(format!("session task ended abnormally: {e}")))
    }
}

type Completed = (SearchRequest, Result<ResultPage>);

struct EventLoop {
    coordinator: SearchStateCoordinator,
    renderer: ResultRenderer,
    service: Arc<dyn SearchService>,
    searches: JoinSet<Completed>,
    view_tx: watch::Sender<ResultView>,
    state_tx: watch::Sender<SearchState>,
}

impl EventLoop {
    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<UiEvent>,
        mut locations: mpsc::UnboundedReceiver<GeolocationResult>,
        resolver: ResolverHandle,
        cancel: CancellationToken,
    ) {
        let initial = self.coordinator.search();
        self.dispatch(initial);

        let mut locations_open = true;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                location = locations.recv(), if locations_open => match location {
                    Some(location) => {
                        let request = self.coordinator.apply_location(&location);
                        self.dispatch(request);
                    }
                    None => locations_open = false,
                },
                Some(joined) = self.searches.join_next(), if !self.searches.is_empty() => {
                    match joined {
                        Ok((request, outcome)) => self.complete(request, outcome),
                        Err(e) => log::warn!("search task ended abnormally: {e}"),
                    }
                }
            }
        }

        resolver.cancel();
        self.searches.abort_all();
        if let Err(e) = resolver.finished().await {
            log::debug!("{e}");
        }
        log::debug!("search session stopped");
    }

    fn handle_event(&mut self, event: UiEvent) {
        let request = match event {
            UiEvent::QueryChanged(text) => Some(self.coordinator.set_query(&text)),
            UiEvent::FacetClicked { facet_id, value } => {
                match self.coordinator.toggle_facet_refinement(&facet_id, &value) {
                    Ok(request) => Some(request),
                    Err(e) => {
                        log::warn!("ignoring facet click: {e}");
                        None
                    }
                }
            }
            UiEvent::ShowMore if self.renderer.can_append() => Some(self.coordinator.next_page()),
            UiEvent::ShowMore => {
                log::debug!("ignoring show-more: no pagination control available");
                None
            }
            UiEvent::ClearSearch => Some(self.coordinator.clear_search()),
            UiEvent::Retry => match self.renderer.failed_request().cloned() {
                Some(failed) => Some(self.coordinator.retry(&failed)),
                None => {
                    log::debug!("ignoring retry: no failed search on screen");
                    None
                }
            },
        };
        if let Some(request) = request {
            self.dispatch(request);
        }
    }

    fn dispatch(&mut self, request: SearchRequest) {
        self.renderer.begin(&request);
        self.publish();
        self.state_tx.send_replace(self.coordinator.state().clone());

        let service = self.service.clone();
        self.searches.spawn(async move {
            let outcome = service.search(&request.parameters).await;
            (request, outcome)
        });
    }

    fn complete(&mut self, request: SearchRequest, outcome: Result<ResultPage>) {
        let rendered = match outcome {
            Ok(page) => self.renderer.apply(&request, &page),
            Err(e) => self.renderer.render_failure(&request, &e),
        };
        // The pagination control still points at the page that failed.
        if rendered == RenderOutcome::Failed && self.coordinator.abandon_append(&request) {
            self.state_tx.send_replace(self.coordinator.state().clone());
        }
        if rendered.is_visible() {
            self.publish();
        }
    }

    fn publish(&self) {
        let view = self.renderer.view();
        self.view_tx.send_if_modified(|current| {
            if *current == *view {
                false
            } else {
                *current = view.clone();
                true
            }
        });
    }
}
