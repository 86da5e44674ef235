//! Command implementations for the geofacet CLI.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::GeofacetConfig;
use crate::coordinator::{SearchRequest, SearchStateCoordinator};
use crate::distance::GeoPoint;
use crate::error::{GeofacetError, Result};
use crate::geolocation::{
    DeviceLocator, FixedDeviceLocator, GeolocationResolver, UnavailableDevice,
};
use crate::render::{RenderOutcome, ResultRenderer};
use crate::service::{HttpSearchService, InMemorySearchService, SearchService};
use crate::session::{SearchSession, UiEvent};

/// Execute a CLI command.
pub async fn execute_command(args: GeofacetArgs) -> Result<()> {
    match &args.command {
        Command::Search(search_args) => run_search(search_args.clone(), &args).await,
        Command::Interactive(interactive_args) => {
            run_interactive(interactive_args.clone(), &args).await
        }
    }
}

/// Load the configuration file if given, then apply environment overrides.
fn load_config(path: Option<&Path>, hits_per_page: Option<usize>) -> Result<GeofacetConfig> {
    let mut config = match path {
        Some(path) => GeofacetConfig::from_file(path)?,
        None => GeofacetConfig::default(),
    }
    .with_env_overrides();
    if hits_per_page.is_some() {
        config.hits_per_page = hits_per_page;
    }
    config.validate()?;
    Ok(config)
}

fn load_dataset(path: &Path, config: &GeofacetConfig) -> Result<InMemorySearchService> {
    let service = InMemorySearchService::from_json_file(path)?;
    Ok(match config.hits_per_page {
        Some(hits_per_page) => service.with_hits_per_page(hits_per_page),
        None => service,
    })
}

fn user_position(lat: Option<f64>, lng: Option<f64>) -> Result<Option<GeoPoint>> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => GeoPoint::new(lat, lng).map(Some),
        _ => Ok(None),
    }
}

/// Run one search and page through it without a session.
async fn run_search(args: SearchArgs, cli_args: &GeofacetArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.hits_per_page)?;
    let service = load_dataset(&args.dataset, &config)?;
    if cli_args.verbosity() > 1 {
        println!(
            "Loaded {} restaurants from {}",
            service.len(),
            args.dataset.display()
        );
    }

    let mut coordinator = SearchStateCoordinator::from_config(&config);
    let mut renderer = ResultRenderer::new(coordinator.registry().clone(), config.default_location);

    if let Some(point) = user_position(args.lat, args.lng)? {
        coordinator = coordinator.with_location(point);
    }
    let mut request = coordinator.set_query(&args.query);
    for refinement in &args.refinements {
        let facet_id = coordinator.registry().resolve(&refinement.facet)?.id.clone();
        request = coordinator.toggle_facet_refinement(&facet_id, &refinement.value)?;
    }

    let mut pages_shown = 0;
    loop {
        let outcome = execute_request(&service, &mut renderer, &request).await;
        pages_shown += 1;
        output_view(
            &format!("Page {} of \"{}\"", request.page() + 1, request.parameters.query),
            renderer.view(),
            cli_args,
        )?;

        if outcome == RenderOutcome::Failed {
            return Err(renderer
                .view()
                .error_banner
                .as_ref()
                .map(|banner| GeofacetError::search_failed(banner.message.clone()))
                .unwrap_or_else(|| GeofacetError::search_failed("search failed")));
        }
        if pages_shown >= args.pages || !renderer.can_append() {
            break;
        }
        request = coordinator.next_page();
    }

    Ok(())
}

async fn execute_request(
    service: &dyn SearchService,
    renderer: &mut ResultRenderer,
    request: &SearchRequest,
) -> RenderOutcome {
    renderer.begin(request);
    match service.search(&request.parameters).await {
        Ok(page) => renderer.apply(request, &page),
        Err(e) => renderer.render_failure(request, &e),
    }
}

/// One line of interactive input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractiveInput {
    Event(UiEvent),
    Quit,
}

/// Parse an interactive command line. Blank lines yield `None`.
pub fn parse_interactive_line(line: &str) -> Result<Option<InteractiveInput>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    let input = match command {
        "q" | "query" => InteractiveInput::Event(UiEvent::QueryChanged(rest.to_string())),
        "f" | "facet" => {
            let (facet_id, value) = rest
                .split_once(char::is_whitespace)
                .map(|(facet, value)| (facet, value.trim()))
                .filter(|(_, value)| !value.is_empty())
                .ok_or_else(|| GeofacetError::invalid_argument("usage: f <facet> <value>"))?;
            InteractiveInput::Event(UiEvent::FacetClicked {
                facet_id: facet_id.to_string(),
                value: value.to_string(),
            })
        }
        "more" => InteractiveInput::Event(UiEvent::ShowMore),
        "clear" => InteractiveInput::Event(UiEvent::ClearSearch),
        "retry" => InteractiveInput::Event(UiEvent::Retry),
        "quit" | "exit" => InteractiveInput::Quit,
        other => {
            return Err(GeofacetError::invalid_argument(format!(
                "unknown command {other:?} (expected q, f, more, clear, retry or quit)"
            )));
        }
    };
    Ok(Some(input))
}

/// Run a full session fed from stdin.
async fn run_interactive(args: InteractiveArgs, cli_args: &GeofacetArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref(), args.hits_per_page)?;
    if args.no_ip_lookup {
        config.geolocation.enable_ip_lookup = false;
    }

    let service: Arc<dyn SearchService> = match &args.dataset {
        Some(path) => Arc::new(load_dataset(path, &config)?),
        None => Arc::new(HttpSearchService::new(&config.service)?),
    };
    let device: Arc<dyn DeviceLocator> = match user_position(args.lat, args.lng)? {
        Some(point) => Arc::new(FixedDeviceLocator::new(point)),
        None => Arc::new(UnavailableDevice),
    };
    let resolver = GeolocationResolver::from_config(&config, device);
    let session = SearchSession::init(&config, service, resolver);

    let mut views = session.subscribe();
    let printer_args = cli_args.clone();
    let printer = tokio::spawn(async move {
        while views.changed().await.is_ok() {
            let view = views.borrow_and_update().clone();
            if let Err(e) = output_view("", &view, &printer_args) {
                log::warn!("failed to print view: {e}");
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_interactive_line(&line) {
            Ok(Some(InteractiveInput::Event(event))) => session.send(event)?,
            Ok(Some(InteractiveInput::Quit)) => break,
            Ok(None) => {}
            Err(e) => eprintln!("{e}"),
        }
    }

    session.shutdown().await?;
    if let Err(e) = printer.await {
        log::debug!("view printer ended abnormally: {e}");
    }
    Ok(())
}
