//! Two-phase overlap detection.
//!
//! A caller-supplied lookup returns same-scope candidates whose bounding
//! boxes intersect the target's box. Each candidate is then tested exactly:
//! two plots overlap when their interiors meet, so plots that only share an
//! edge or a corner are not in conflict. Detection returns the state writes
//! for the target and every overlapping neighbor; it never touches storage.

use crate::compute::reason::{self, PlotRef};
use crate::config::Config;
use geo::{Polygon, Relate};
use plotguard_types::bbox::BoundingBox;
use plotguard_types::state::GeometryState;
use serde::{Deserialize, Serialize};

/// Plot whose fresh geometry is checked against its neighbors.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapTarget {
    pub id: String,
    pub scope: String,
    pub reference: PlotRef,
    pub polygon: Polygon<f64>,
    pub bbox: BoundingBox,
}

/// Neighbor returned by the bounding-box pre-filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: String,
    pub reference: PlotRef,
    pub polygon: Option<Polygon<f64>>,
    pub state: GeometryState,
}

/// New state for one plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateWrite {
    pub id: String,
    pub state: GeometryState,
}

/// Every write produced by one detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapOutcome {
    pub target: StateWrite,
    pub neighbors: Vec<StateWrite>,
}

impl OverlapOutcome {
    pub fn is_flagged(&self) -> bool {
        self.target.state.is_flagged()
    }

    pub fn overlap_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Target write first, then neighbors in candidate order.
    pub fn writes(&self) -> impl Iterator<Item = &StateWrite> {
        std::iter::once(&self.target).chain(self.neighbors.iter())
    }

    pub fn into_writes(self) -> Vec<StateWrite> {
        let mut writes = Vec::with_capacity(self.neighbors.len() + 1);
        writes.push(self.target);
        writes.extend(self.neighbors);
        writes
    }
}

/// Whether two polygons share interior area.
///
/// Intersecting but merely touching (shared edge or vertex) is not an overlap;
/// containment and proper crossing are.
///
/// # Examples
///
/// ```
/// use geo::polygon;
/// use plotguard::compute::overlap::polygons_overlap;
///
/// let a = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)];
/// let b = polygon![(x: 0.5, y: 0.5), (x: 1.5, y: 0.5), (x: 1.5, y: 1.5), (x: 0.5, y: 1.5)];
/// let edge = polygon![(x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 1.0, y: 1.0)];
///
/// assert!(polygons_overlap(&a, &b));
/// assert!(!polygons_overlap(&a, &edge));
/// ```
pub fn polygons_overlap(a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
    let matrix = a.relate(b);
    matrix.is_intersects() && !matrix.is_touches()
}

/// Overlap detection with configurable reason limits.
#[derive(Debug, Clone, Default)]
pub struct OverlapEngine {
    config: Config,
}

impl OverlapEngine {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run detection with an infallible candidate lookup.
    ///
    /// The lookup receives `(scope, bbox, exclude_id)`.
    pub fn detect<F>(&self, target: &OverlapTarget, lookup: F) -> OverlapOutcome
    where
        F: FnOnce(&str, &BoundingBox, &str) -> Vec<Candidate>,
    {
        let candidates = lookup(&target.scope, &target.bbox, &target.id);
        self.evaluate(target, candidates)
    }

    /// Run detection with a lookup that may fail; its error is returned as is.
    pub fn try_detect<F, E>(&self, target: &OverlapTarget, lookup: F) -> Result<OverlapOutcome, E>
    where
        F: FnOnce(&str, &BoundingBox, &str) -> Result<Vec<Candidate>, E>,
    {
        let candidates = lookup(&target.scope, &target.bbox, &target.id)?;
        Ok(self.evaluate(target, candidates))
    }

    /// Exact phase: test pre-filtered candidates and compute the writes.
    pub fn evaluate<I>(&self, target: &OverlapTarget, candidates: I) -> OverlapOutcome
    where
        I: IntoIterator<Item = Candidate>,
    {
        let overlapping: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| c.id != target.id)
            .filter(|c| {
                c.polygon
                    .as_ref()
                    .is_some_and(|polygon| polygons_overlap(&target.polygon, polygon))
            })
            .collect();

        if overlapping.is_empty() {
            log::debug!("Plot {} has no overlaps in scope {}", target.id, target.scope);
            return OverlapOutcome {
                target: StateWrite {
                    id: target.id.clone(),
                    state: GeometryState::Clean,
                },
                neighbors: Vec::new(),
            };
        }

        let refs: Vec<PlotRef> = overlapping.iter().map(|c| c.reference.clone()).collect();
        let target_reason = reason::build_with(&refs, self.config.max_reason_len);

        let neighbors = overlapping
            .iter()
            .map(|c| StateWrite {
                id: c.id.clone(),
                state: GeometryState::Flagged(reason::append_with(
                    c.state.reason(),
                    &target.reference.name,
                    &target.reference.instance,
                    self.config.max_reason_len,
                )),
            })
            .collect();

        log::debug!(
            "Plot {} overlaps {} plot(s) in scope {}",
            target.id,
            overlapping.len(),
            target.scope
        );

        OverlapOutcome {
            target: StateWrite {
                id: target.id.clone(),
                state: GeometryState::Flagged(target_reason),
            },
            neighbors,
        }
    }
}

/// [`OverlapEngine::detect`] with the default configuration.
pub fn detect_overlaps<F>(target: &OverlapTarget, lookup: F) -> OverlapOutcome
where
    F: FnOnce(&str, &BoundingBox, &str) -> Vec<Candidate>,
{
    OverlapEngine::default().detect(target, lookup)
}

/// [`OverlapEngine::try_detect`] with the default configuration.
pub fn try_detect_overlaps<F, E>(target: &OverlapTarget, lookup: F) -> Result<OverlapOutcome, E>
where
    F: FnOnce(&str, &BoundingBox, &str) -> Result<Vec<Candidate>, E>,
{
    OverlapEngine::default().try_detect(target, lookup)
}
