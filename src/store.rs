//! Plot storage abstraction and the in-memory reference store.
//!
//! Overlap detection needs only two query shapes from storage: a
//! bounding-box candidate lookup within one scope, and a batched state
//! update. [`ScopeStore`] captures those plus the record upserts used by the
//! scope drivers in [`crate::sync`].
//!
//! [`MemoryStore`] keeps one lock per scope. A caller holds a scope for the
//! whole of a batch, so every candidate query observes the writes of the
//! plots processed before it, while other scopes proceed independently.

use crate::compute::overlap::{Candidate, OverlapTarget, StateWrite};
use crate::compute::reason::PlotRef;
use crate::error::{PlotError, Result};
use crate::extract::{PlotAttributes, UNKNOWN_PLOT_NAME};
use crate::mapping::RawRecord;
use geo::Polygon;
use parking_lot::{Mutex, RwLock};
use plotguard_types::bbox::BoundingBox;
use plotguard_types::state::GeometryState;
use rstar::{AABB, RTree, RTreeObject};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Raw submission a plot was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: String,
    pub raw: RawRecord,
}

/// A stored plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRecord {
    pub id: String,
    pub scope: String,
    pub plot_name: Option<String>,
    pub instance_name: Option<String>,
    pub region: String,
    pub sub_region: String,
    pub polygon: Option<Polygon<f64>>,
    /// Present iff `polygon` is present.
    pub bbox: Option<BoundingBox>,
    pub state: GeometryState,
    pub polygon_source_field: Option<String>,
    pub source: Option<SourceRecord>,
}

impl PlotRecord {
    /// Empty plot with a fresh UUID v4 identifier.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scope: scope.into(),
            plot_name: None,
            instance_name: None,
            region: String::new(),
            sub_region: String::new(),
            polygon: None,
            bbox: None,
            state: GeometryState::NotApplicable,
            polygon_source_field: None,
            source: None,
        }
    }

    /// New plot carrying derived attributes.
    pub fn from_attributes(scope: impl Into<String>, attrs: PlotAttributes) -> Self {
        let mut record = Self::new(scope);
        record.apply_attributes(attrs);
        record
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_instance_name(mut self, name: impl Into<String>) -> Self {
        self.instance_name = Some(name.into());
        self
    }

    pub fn with_source(mut self, source: SourceRecord) -> Self {
        self.source = Some(source);
        self
    }

    /// Replace every derived field; identity, scope and source are kept.
    pub fn apply_attributes(&mut self, attrs: PlotAttributes) {
        self.plot_name = attrs.plot_name;
        self.region = attrs.region;
        self.sub_region = attrs.sub_region;
        self.polygon = attrs.polygon;
        self.bbox = attrs.bounding_box;
        self.polygon_source_field = attrs.polygon_source_field;
        self.state = attrs.state;
    }

    pub fn display_name(&self) -> &str {
        self.plot_name.as_deref().unwrap_or(UNKNOWN_PLOT_NAME)
    }

    /// Instance name, or the plot id when the submission had none.
    pub fn instance(&self) -> &str {
        self.instance_name.as_deref().unwrap_or(&self.id)
    }

    pub fn reference(&self) -> PlotRef {
        PlotRef::new(self.display_name(), self.instance())
    }

    /// Detection input, if the plot has geometry.
    pub fn overlap_target(&self) -> Option<OverlapTarget> {
        Some(OverlapTarget {
            id: self.id.clone(),
            scope: self.scope.clone(),
            reference: self.reference(),
            polygon: self.polygon.clone()?,
            bbox: self.bbox?,
        })
    }

    pub fn as_candidate(&self) -> Candidate {
        Candidate {
            id: self.id.clone(),
            reference: self.reference(),
            polygon: self.polygon.clone(),
            state: self.state.clone(),
        }
    }
}

/// Storage operations within a single scope.
///
/// Implementations must make writes visible to subsequent reads on the same
/// value; the scope drivers rely on that ordering.
pub trait ScopeStore {
    /// Scope served by this store
    fn scope(&self) -> &str;

    /// Get a plot by id
    fn get(&self, id: &str) -> Result<Option<PlotRecord>>;

    /// Find the plot derived from a source record
    fn find_by_source(&self, source_id: &str) -> Result<Option<PlotRecord>>;

    /// Insert a new plot
    fn insert(&mut self, record: PlotRecord) -> Result<()>;

    /// Replace an existing plot
    fn update(&mut self, record: PlotRecord) -> Result<()>;

    /// Plots whose bounding box intersects `bbox`, except `exclude_id`
    fn candidates(&self, bbox: &BoundingBox, exclude_id: &str) -> Result<Vec<Candidate>>;

    /// Apply state writes as one batch; nothing is written if any id is unknown
    fn apply(&mut self, writes: &[StateWrite]) -> Result<()>;

    /// Plot ids in insertion order
    fn plot_ids(&self) -> Result<Vec<String>>;
}

/// Plot bounding box for the R*-tree.
#[derive(Debug, Clone, PartialEq)]
struct IndexedBBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    seq: u64,
    id: String,
}

impl IndexedBBox {
    fn new(bbox: &BoundingBox, seq: u64, id: &str) -> Self {
        Self {
            min_x: bbox.min_lon,
            min_y: bbox.min_lat,
            max_x: bbox.max_lon,
            max_y: bbox.max_lat,
            seq,
            id: id.to_string(),
        }
    }
}

impl RTreeObject for IndexedBBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_x, self.min_y], [self.max_x, self.max_y])
    }
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    record: PlotRecord,
}

/// Plots of one scope with their bounding-box index.
#[derive(Debug)]
pub struct ScopeShard {
    scope: String,
    entries: FxHashMap<String, Entry>,
    sources: FxHashMap<String, String>,
    index: RTree<IndexedBBox>,
    next_seq: u64,
}

impl ScopeShard {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            entries: FxHashMap::default(),
            sources: FxHashMap::default(),
            index: RTree::new(),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_scope(&self, record: &PlotRecord) -> Result<()> {
        if record.scope != self.scope {
            return Err(PlotError::ScopeMismatch {
                plot: record.id.clone(),
                expected: self.scope.clone(),
                actual: record.scope.clone(),
            });
        }
        Ok(())
    }

    fn index_record(&mut self, seq: u64, record: &PlotRecord) {
        if let Some(bbox) = &record.bbox {
            self.index.insert(IndexedBBox::new(bbox, seq, &record.id));
        }
    }

    fn unindex_record(&mut self, seq: u64, record: &PlotRecord) {
        if let Some(bbox) = &record.bbox {
            self.index.remove(&IndexedBBox::new(bbox, seq, &record.id));
        }
    }
}

impl ScopeStore for ScopeShard {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn get(&self, id: &str) -> Result<Option<PlotRecord>> {
        Ok(self.entries.get(id).map(|e| e.record.clone()))
    }

    fn find_by_source(&self, source_id: &str) -> Result<Option<PlotRecord>> {
        match self.sources.get(source_id) {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    fn insert(&mut self, record: PlotRecord) -> Result<()> {
        self.check_scope(&record)?;
        if self.entries.contains_key(&record.id) {
            return Err(PlotError::DuplicatePlot(record.id));
        }
        if let Some(source) = &record.source
            && self.sources.contains_key(&source.id)
        {
            return Err(PlotError::DuplicatePlot(source.id.clone()));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.index_record(seq, &record);
        if let Some(source) = &record.source {
            self.sources.insert(source.id.clone(), record.id.clone());
        }
        self.entries.insert(record.id.clone(), Entry { seq, record });
        Ok(())
    }

    fn update(&mut self, record: PlotRecord) -> Result<()> {
        self.check_scope(&record)?;
        let Some(old) = self.entries.get(&record.id).cloned() else {
            return Err(PlotError::UnknownPlot(record.id));
        };

        self.unindex_record(old.seq, &old.record);
        self.index_record(old.seq, &record);

        if let Some(source) = &old.record.source {
            self.sources.remove(&source.id);
        }
        if let Some(source) = &record.source {
            self.sources.insert(source.id.clone(), record.id.clone());
        }

        self.entries.insert(record.id.clone(), Entry { seq: old.seq, record });
        Ok(())
    }

    fn candidates(&self, bbox: &BoundingBox, exclude_id: &str) -> Result<Vec<Candidate>> {
        if !bbox.is_finite() {
            log::warn!("Rejecting bounding box query with non-finite coordinates");
            return Ok(Vec::new());
        }

        let envelope = AABB::from_corners([bbox.min_lon, bbox.min_lat], [bbox.max_lon, bbox.max_lat]);
        let mut hits: Vec<&IndexedBBox> = self
            .index
            .locate_in_envelope_intersecting(&envelope)
            .filter(|hit| hit.id != exclude_id)
            .collect();
        hits.sort_by_key(|hit| hit.seq);

        Ok(hits
            .into_iter()
            .filter_map(|hit| self.entries.get(&hit.id))
            .map(|entry| entry.record.as_candidate())
            .collect())
    }

    fn apply(&mut self, writes: &[StateWrite]) -> Result<()> {
        if let Some(unknown) = writes.iter().find(|w| !self.entries.contains_key(&w.id)) {
            return Err(PlotError::UnknownPlot(unknown.id.clone()));
        }
        for write in writes {
            if let Some(entry) = self.entries.get_mut(&write.id) {
                entry.record.state = write.state.clone();
            }
        }
        Ok(())
    }

    fn plot_ids(&self) -> Result<Vec<String>> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        Ok(entries.into_iter().map(|e| e.record.id.clone()).collect())
    }
}

/// In-memory plot store with one lock per scope.
///
/// # Example
///
/// ```rust
/// use plotguard::store::{MemoryStore, PlotRecord, ScopeStore};
///
/// let store = MemoryStore::new();
/// store.with_scope("form-1", |plots| {
///     plots.insert(PlotRecord::new("form-1"))
/// })?;
/// assert_eq!(store.plot_count(), 1);
/// # Ok::<(), plotguard::PlotError>(())
/// ```
#[derive(Default)]
pub struct MemoryStore {
    scopes: RwLock<FxHashMap<String, Arc<Mutex<ScopeShard>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shard(&self, scope: &str) -> Arc<Mutex<ScopeShard>> {
        if let Some(shard) = self.scopes.read().get(scope) {
            return Arc::clone(shard);
        }
        let mut scopes = self.scopes.write();
        Arc::clone(
            scopes
                .entry(scope.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(ScopeShard::new(scope)))),
        )
    }

    /// Run `f` with exclusive access to one scope.
    ///
    /// The scope stays locked for the duration of `f`; other scopes are not
    /// blocked.
    pub fn with_scope<R>(&self, scope: &str, f: impl FnOnce(&mut ScopeShard) -> R) -> R {
        let shard = self.shard(scope);
        let mut guard = shard.lock();
        f(&mut guard)
    }

    /// Known scopes, sorted.
    pub fn scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self.scopes.read().keys().cloned().collect();
        scopes.sort();
        scopes
    }

    /// Total number of plots across all scopes.
    pub fn plot_count(&self) -> usize {
        let shards: Vec<Arc<Mutex<ScopeShard>>> = self.scopes.read().values().cloned().collect();
        shards.iter().map(|shard| shard.lock().len()).sum()
    }
}
