use tracing::debug;

use crate::error::Result;
use crate::point::Point;
use crate::render::Frame;
use crate::session::Shared;
use crate::wire::InitMethod;

/// What happened to a click on the plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Not in manual mode; the click means nothing.
    Ignored,
    /// Added as pick number `count`.
    Captured { count: usize },
}

/// Record a clicked point as a manual centroid.
///
/// The cap is the cluster-count input and is checked against the number of
/// picks before this click. Each capture re-renders the dataset with all
/// picks so far as centroids.
pub(crate) fn on_point_clicked(shared: &Shared, p: Point) -> Result<Selection> {
    let mut guard = shared.state.lock();
    let state = &mut *guard;
    if state.init_method != InitMethod::Manual {
        return Ok(Selection::Ignored);
    }

    let count = state.selected.push_capped(p, state.cluster_count)?;
    debug!(x = p.x, y = p.y, count, "centroid picked");

    shared.render(Frame {
        points: state.dataset.points(),
        centroids: state.selected.points(),
        labels: &[],
    });
    Ok(Selection::Captured { count })
}
