//! Output formatting for CLI commands.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::cli::args::{GeofacetArgs, OutputFormat};
use crate::error::Result;
use crate::facet::{FacetEntries, FacetList};
use crate::render::{HitCard, ResultView, ResultsBody};

static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?em>").expect("valid regex"));

/// Output a rendered view in the selected format.
pub fn output_view(message: &str, view: &ResultView, args: &GeofacetArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 0 && !message.is_empty() {
                println!("{message}");
                println!();
            }
            print!("{}", format_view_human(view));
            Ok(())
        }
        OutputFormat::Json => output_json(view, args.pretty),
    }
}

fn output_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

/// Human-readable rendering of a view.
pub fn format_view_human(view: &ResultView) -> String {
    let mut out = String::new();

    if let Some(banner) = &view.error_banner {
        let _ = writeln!(out, "! {} [{}]", banner.message, banner.retry.label);
    }

    match &view.body {
        ResultsBody::Pending => {
            let _ = writeln!(out, "Searching...");
        }
        ResultsBody::NoResults {
            query,
            clear_action,
        } => {
            let _ = writeln!(out, "No results found matching \"{query}\". [{}]", clear_action.label);
        }
        ResultsBody::Results {
            stats,
            hits,
            pagination,
        } => {
            let _ = writeln!(
                out,
                "{} results found in {} seconds",
                stats.nb_hits, stats.server_time_seconds
            );
            let _ = writeln!(out);
            for hit in hits {
                format_hit(&mut out, hit);
            }
            if let Some(control) = pagination {
                let _ = writeln!(out, "[Show more: page {}]", control.next_page + 1);
            }
        }
    }

    for list in &view.facet_lists {
        format_facet_list(&mut out, list);
    }
    out
}

fn format_hit(out: &mut String, hit: &HitCard) {
    let marker = if hit.is_first { "*" } else { "-" };
    let _ = writeln!(
        out,
        "{marker} {} {} {} ({} reviews)  {}",
        plain(&hit.highlighted_name),
        hit.stars,
        hit.rating,
        hit.reviews_count,
        hit.distance_label
    );
    let _ = writeln!(
        out,
        "    {} | {} | {}",
        plain(&hit.highlighted_food_type),
        plain(&hit.highlighted_neighborhood),
        plain(&hit.highlighted_price_range)
    );
}

fn format_facet_list(out: &mut String, list: &FacetList) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{}:", list.facet_id);
    match &list.entries {
        FacetEntries::Categorical(entries) => {
            for entry in entries {
                let mark = if entry.is_refined { "[x]" } else { "[ ]" };
                let _ = writeln!(out, "  {mark} {} ({})", entry.name, entry.count);
            }
        }
        FacetEntries::Threshold(entries) => {
            for entry in entries {
                let mark = if entry.is_active { "[x]" } else { "[ ]" };
                let _ = writeln!(out, "  {mark} {} {}", entry.stars, entry.label);
            }
        }
    }
}

/// Highlight tags shown as `*emphasis*`.
fn plain(highlighted: &str) -> String {
    EMPHASIS.replace_all(highlighted, "*").into_owned()
}
