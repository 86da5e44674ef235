//! Result rendering.
//!
//! [`ResultRenderer`] turns result pages into a [`ResultView`], a plain
//! data description of what the presentation layer shows. Page-0
//! responses replace the view; later pages are appended in front of the
//! pagination control and leave the facet lists as they were.

pub mod renderer;
pub mod view;

pub use self::renderer::{RenderOutcome, ResultRenderer};
pub use self::view::{
    ClearSearchAction, ErrorBanner, HitCard, PaginationControl, ResultView, ResultsBody,
    RetryAction, StatsBanner,
};
