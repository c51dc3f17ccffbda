//! Scope drivers: ingest, re-derivation, manual edits and review resolution.
//!
//! Every driver takes one scope's store by `&mut` and processes plots in
//! order, so each candidate query sees the writes of the plots before it.
//! Geometry derivation is delegated to [`crate::extract`] and overlap
//! evaluation to [`OverlapEngine`].

use crate::compute::geoshape::{parse_polygon_text, to_vertex_format};
use crate::compute::overlap::{OverlapEngine, StateWrite};
use crate::config::Config;
use crate::error::{PlotError, Result};
use crate::extract::{GeometryIssue, extract_with, geometry_from_ring, reset_geometry_with};
use crate::mapping::{MappedFields, RawRecord};
use crate::store::{PlotRecord, ScopeStore, SourceRecord};
use plotguard_types::mapping::FieldMappingConfig;
use plotguard_types::state::GeometryState;
use serde::{Deserialize, Serialize};

/// One raw submission from the survey platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: String,
    pub instance_name: Option<String>,
    pub raw: RawRecord,
}

impl Submission {
    pub fn new(id: impl Into<String>, raw: RawRecord) -> Self {
        Self {
            id: id.into(),
            instance_name: None,
            raw,
        }
    }

    pub fn with_instance_name(mut self, name: impl Into<String>) -> Self {
        self.instance_name = Some(name.into());
        self
    }
}

/// Counts from one ingest batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub synced: usize,
    pub created: usize,
    pub updated: usize,
    /// Plots of the batch that ended flagged.
    pub flagged: usize,
}

/// Edited geometry to send back to the survey platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryPush {
    pub source_id: String,
    pub field: String,
    /// Vertex-format text.
    pub value: String,
}

/// Result of a manual geometry edit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryEdit {
    pub state: GeometryState,
    /// `None` when the edit was rejected or there is nothing to push.
    pub push: Option<GeometryPush>,
}

/// Workflow driver with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct ScopeDriver {
    config: Config,
    engine: OverlapEngine,
}

impl ScopeDriver {
    pub fn new(config: Config) -> Self {
        Self {
            engine: OverlapEngine::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Upsert submissions by source id and check each new geometry.
    pub fn ingest_submissions<S, I>(
        &self,
        store: &mut S,
        mapping: &FieldMappingConfig,
        submissions: I,
    ) -> Result<SyncReport>
    where
        S: ScopeStore,
        I: IntoIterator<Item = Submission>,
    {
        let mut report = SyncReport::default();
        let mut touched = Vec::new();

        for submission in submissions {
            let attrs = extract_with(&submission.raw, mapping, &self.config);
            let source = SourceRecord {
                id: submission.id,
                raw: submission.raw,
            };

            let id = match store.find_by_source(&source.id)? {
                Some(mut record) => {
                    record.apply_attributes(attrs);
                    record.instance_name = submission.instance_name;
                    record.source = Some(source);
                    let id = record.id.clone();
                    store.update(record)?;
                    report.updated += 1;
                    id
                }
                None => {
                    let mut record = PlotRecord::from_attributes(store.scope(), attrs).with_source(source);
                    record.instance_name = submission.instance_name;
                    let id = record.id.clone();
                    store.insert(record)?;
                    report.created += 1;
                    id
                }
            };

            self.check_plot(store, &id)?;
            touched.push(id);
            report.synced += 1;
        }

        for id in &touched {
            if store.get(id)?.is_some_and(|r| r.state.is_flagged()) {
                report.flagged += 1;
            }
        }

        log::info!(
            "Synced {} submissions for scope {}: {} created, {} updated, {} flagged",
            report.synced,
            store.scope(),
            report.created,
            report.updated,
            report.flagged
        );
        Ok(report)
    }

    /// Run detection for one plot if it is unchecked.
    ///
    /// Returns the plot's state afterwards.
    pub fn check_plot<S: ScopeStore>(&self, store: &mut S, id: &str) -> Result<GeometryState> {
        let record = store
            .get(id)?
            .ok_or_else(|| PlotError::UnknownPlot(id.to_string()))?;
        if !record.state.needs_check() {
            return Ok(record.state);
        }
        self.detect(store, record)
    }

    /// Run detection for a plot whatever its current state.
    ///
    /// Plots without geometry are returned unchanged.
    fn detect<S: ScopeStore>(&self, store: &mut S, record: PlotRecord) -> Result<GeometryState> {
        let Some(target) = record.overlap_target() else {
            return Ok(record.state);
        };

        let outcome = self
            .engine
            .try_detect(&target, |_, bbox, exclude| store.candidates(bbox, exclude))?;
        let state = outcome.target.state.clone();
        store.apply(&outcome.into_writes())?;
        Ok(state)
    }

    /// Recompute every plot from its source record, then re-run detection.
    ///
    /// Every re-derived plot with geometry is tested, including plots an
    /// earlier neighbor flagged during the same pass. Plots without a source
    /// record are left untouched. Returns the number of re-derived plots.
    pub fn rederive_scope<S: ScopeStore>(&self, store: &mut S, mapping: &FieldMappingConfig) -> Result<usize> {
        let mut rederived = Vec::new();

        for id in store.plot_ids()? {
            let Some(mut record) = store.get(&id)? else {
                continue;
            };
            let Some(source) = &record.source else {
                continue;
            };
            let attrs = extract_with(&source.raw, mapping, &self.config);
            record.apply_attributes(attrs);
            store.update(record)?;
            rederived.push(id);
        }

        // Plots flagged earlier in this pass are tested too.
        for id in &rederived {
            if let Some(record) = store.get(id)? {
                self.detect(store, record)?;
            }
        }

        log::info!("Re-derived {} plots for scope {}", rederived.len(), store.scope());
        Ok(rederived.len())
    }

    /// Replace a plot's geometry with edited polygon text.
    ///
    /// Rejected edits flag the plot and clear its stored geometry. Accepted
    /// edits are checked for overlaps and, when the plot came from a
    /// submission, come back with the vertex-format push for the survey
    /// platform.
    pub fn update_geometry<S: ScopeStore>(
        &self,
        store: &mut S,
        id: &str,
        polygon_text: &str,
        mapping: &FieldMappingConfig,
    ) -> Result<GeometryEdit> {
        let mut record = store
            .get(id)?
            .ok_or_else(|| PlotError::UnknownPlot(id.to_string()))?;

        let geometry = if polygon_text.trim().is_empty() {
            Err(GeometryIssue::MissingSourceData)
        } else {
            geometry_from_ring(parse_polygon_text(polygon_text), &self.config)
        };

        match geometry {
            Ok(geometry) => {
                record.polygon = Some(geometry.polygon);
                record.bbox = Some(geometry.bbox);
                record.state = GeometryState::Unchecked;
            }
            Err(issue) => {
                log::debug!("Rejected geometry edit for plot {}: {:?}", id, issue);
                record.polygon = None;
                record.bbox = None;
                record.state = issue.state();
                store.update(record)?;
                return Ok(GeometryEdit {
                    state: issue.state(),
                    push: None,
                });
            }
        }

        store.update(record)?;
        let state = self.check_plot(store, id)?;

        let push = match store.get(id)? {
            Some(record) => match prepare_geometry_push(&record, mapping) {
                Ok(push) => Some(push),
                Err(e) => {
                    log::debug!("Skipping geometry push for plot {}: {}", id, e);
                    None
                }
            },
            None => None,
        };

        Ok(GeometryEdit { state, push })
    }

    /// Regenerate a plot from its source record, discarding manual edits.
    pub fn reset_plot<S: ScopeStore>(
        &self,
        store: &mut S,
        id: &str,
        mapping: &FieldMappingConfig,
    ) -> Result<GeometryState> {
        let mut record = store
            .get(id)?
            .ok_or_else(|| PlotError::UnknownPlot(id.to_string()))?;
        let source = record
            .source
            .as_ref()
            .ok_or_else(|| PlotError::MissingSource(id.to_string()))?;

        let attrs = reset_geometry_with(&source.raw, mapping, &self.config);
        record.apply_attributes(attrs);
        store.update(record)?;
        self.check_plot(store, id)
    }
}

/// Mark a plot as reviewed: state becomes `Clean` and the reason is cleared.
pub fn resolve_review<S: ScopeStore>(store: &mut S, id: &str) -> Result<()> {
    let record = store
        .get(id)?
        .ok_or_else(|| PlotError::UnknownPlot(id.to_string()))?;
    store.apply(&[StateWrite {
        id: record.id,
        state: record.state.resolved(),
    }])
}

/// Build the push-back of a plot's current geometry.
///
/// The target field is the one the polygon was read from, or the first
/// configured polygon field for plots whose provenance is unknown.
pub fn prepare_geometry_push(record: &PlotRecord, mapping: &FieldMappingConfig) -> Result<GeometryPush> {
    let source = record
        .source
        .as_ref()
        .ok_or_else(|| PlotError::MissingSource(record.id.clone()))?;
    let polygon = record
        .polygon
        .as_ref()
        .ok_or_else(|| PlotError::MissingGeometry(record.id.clone()))?;

    let configured = MappedFields::from_config(mapping).polygon;
    let first_configured = configured.into_iter().next().ok_or(PlotError::NoPolygonMapping)?;
    let field = record.polygon_source_field.clone().unwrap_or(first_configured);

    Ok(GeometryPush {
        source_id: source.id.clone(),
        field,
        value: to_vertex_format(&polygon.exterior().0),
    })
}

/// [`ScopeDriver::ingest_submissions`] with the default configuration.
pub fn ingest_submissions<S, I>(store: &mut S, mapping: &FieldMappingConfig, submissions: I) -> Result<SyncReport>
where
    S: ScopeStore,
    I: IntoIterator<Item = Submission>,
{
    ScopeDriver::default().ingest_submissions(store, mapping, submissions)
}

/// [`ScopeDriver::check_plot`] with the default configuration.
pub fn check_plot<S: ScopeStore>(store: &mut S, id: &str) -> Result<GeometryState> {
    ScopeDriver::default().check_plot(store, id)
}

/// [`ScopeDriver::rederive_scope`] with the default configuration.
pub fn rederive_scope<S: ScopeStore>(store: &mut S, mapping: &FieldMappingConfig) -> Result<usize> {
    ScopeDriver::default().rederive_scope(store, mapping)
}

/// [`ScopeDriver::update_geometry`] with the default configuration.
pub fn update_geometry<S: ScopeStore>(
    store: &mut S,
    id: &str,
    polygon_text: &str,
    mapping: &FieldMappingConfig,
) -> Result<GeometryEdit> {
    ScopeDriver::default().update_geometry(store, id, polygon_text, mapping)
}

/// [`ScopeDriver::reset_plot`] with the default configuration.
pub fn reset_plot<S: ScopeStore>(store: &mut S, id: &str, mapping: &FieldMappingConfig) -> Result<GeometryState> {
    ScopeDriver::default().reset_plot(store, id, mapping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{NO_POLYGON_DATA, PARSE_FAILURE};
    use crate::store::ScopeShard;
    use serde_json::json;

    const SQUARE: &str = "0.0 0.0 0 0; 0.001 0.0 0 0; 0.001 0.001 0 0; 0.0 0.001 0 0";
    const FAR: &str = "0.01 0.01 0 0; 0.011 0.01 0 0; 0.011 0.011 0 0; 0.01 0.011 0 0";
    const SHIFTED: &str = "0.0005 0.0005 0 0; 0.0015 0.0005 0 0; 0.0015 0.0015 0 0; 0.0005 0.0015 0 0";

    fn mapping() -> FieldMappingConfig {
        FieldMappingConfig::default()
            .with_polygon_field("boundary")
            .with_plot_name_field("farmer")
    }

    fn submission(id: &str, farmer: &str, boundary: &str) -> Submission {
        let raw = json!({"boundary": boundary, "farmer": farmer});
        Submission::new(id, raw.as_object().cloned().unwrap()).with_instance_name(format!("inst-{}", id))
    }

    fn plot_for(store: &ScopeShard, source: &str) -> PlotRecord {
        store.find_by_source(source).unwrap().unwrap()
    }

    #[test]
    fn test_ingest_creates_and_checks() {
        let mut store = ScopeShard::new("form");
        let report = ingest_submissions(&mut store, &mapping(), vec![submission("s1", "Abebe", SQUARE)]).unwrap();
        assert_eq!(
            report,
            SyncReport {
                synced: 1,
                created: 1,
                updated: 0,
                flagged: 0
            }
        );
        let plot = plot_for(&store, "s1");
        assert_eq!(plot.state, GeometryState::Clean);
        assert_eq!(plot.instance(), "inst-s1");
    }

    #[test]
    fn test_reingest_updates_without_self_overlap() {
        let mut store = ScopeShard::new("form");
        ingest_submissions(&mut store, &mapping(), vec![submission("s1", "Abebe", SQUARE)]).unwrap();
        let report = ingest_submissions(&mut store, &mapping(), vec![submission("s1", "Abebe K", SQUARE)]).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 0);
        assert_eq!(store.len(), 1);
        let plot = plot_for(&store, "s1");
        assert_eq!(plot.state, GeometryState::Clean);
        assert_eq!(plot.display_name(), "Abebe K");
    }

    #[test]
    fn test_check_plot_skips_settled_plots() {
        let mut store = ScopeShard::new("form");
        ingest_submissions(&mut store, &mapping(), vec![submission("s1", "Abebe", SQUARE)]).unwrap();
        let id = plot_for(&store, "s1").id;
        resolve_review(&mut store, &id).unwrap();
        assert_eq!(check_plot(&mut store, &id).unwrap(), GeometryState::Clean);
        assert!(matches!(check_plot(&mut store, "missing"), Err(PlotError::UnknownPlot(_))));
    }

    #[test]
    fn test_update_geometry_rejections() {
        let mut store = ScopeShard::new("form");
        ingest_submissions(&mut store, &mapping(), vec![submission("s1", "Abebe", SQUARE)]).unwrap();
        let id = plot_for(&store, "s1").id;

        let edit = update_geometry(&mut store, &id, "  ", &mapping()).unwrap();
        assert_eq!(edit.state, GeometryState::Flagged(NO_POLYGON_DATA.to_string()));
        assert!(edit.push.is_none());
        assert!(store.get(&id).unwrap().unwrap().bbox.is_none());

        let edit = update_geometry(&mut store, &id, "POLYGON((broken", &mapping()).unwrap();
        assert_eq!(edit.state, GeometryState::Flagged(PARSE_FAILURE.to_string()));

        let edit = update_geometry(&mut store, &id, "POLYGON((0 0, 1 1, 1 0, 0 1, 0 0))", &mapping()).unwrap();
        assert!(edit.state.reason().unwrap().contains("intersect"));
    }

    #[test]
    fn test_update_geometry_pushes_vertex_format() {
        let mut store = ScopeShard::new("form");
        ingest_submissions(&mut store, &mapping(), vec![submission("s1", "Abebe", SQUARE)]).unwrap();
        let id = plot_for(&store, "s1").id;

        let edit = update_geometry(
            &mut store,
            &id,
            "POLYGON((0 0, 0.002 0, 0.002 0.002, 0 0.002, 0 0))",
            &mapping(),
        )
        .unwrap();
        assert_eq!(edit.state, GeometryState::Clean);
        let push = edit.push.unwrap();
        assert_eq!(push.source_id, "s1");
        assert_eq!(push.field, "boundary");
        assert!(push.value.starts_with("0 0 0 0; 0 0.002 0 0"));
    }

    #[test]
    fn test_push_requires_source_and_mapping() {
        let mut record = PlotRecord::new("form");
        assert!(matches!(
            prepare_geometry_push(&record, &mapping()),
            Err(PlotError::MissingSource(_))
        ));
        record.source = Some(SourceRecord {
            id: "s1".to_string(),
            raw: RawRecord::new(),
        });
        assert!(matches!(
            prepare_geometry_push(&record, &mapping()),
            Err(PlotError::MissingGeometry(_))
        ));
        record.polygon = parse_polygon_text("POLYGON((0 0, 1 0, 1 1, 0 0))").map(|r| geo::Polygon::new(r, vec![]));
        assert!(matches!(
            prepare_geometry_push(&record, &FieldMappingConfig::default()),
            Err(PlotError::NoPolygonMapping)
        ));
        let push = prepare_geometry_push(&record, &mapping().with_polygon_field("a, b")).unwrap();
        assert_eq!(push.field, "a");
        record.polygon_source_field = Some("b".to_string());
        let push = prepare_geometry_push(&record, &mapping().with_polygon_field("a, b")).unwrap();
        assert_eq!(push.field, "b");
    }

    #[test]
    fn test_reset_restores_source_geometry() {
        let mut store = ScopeShard::new("form");
        ingest_submissions(
            &mut store,
            &mapping(),
            vec![submission("s1", "Abebe", SQUARE), submission("s2", "Kebede", FAR)],
        )
        .unwrap();
        let id = plot_for(&store, "s2").id;

        // Move s2 onto s1, then reset it back.
        let onto_s1 = "POLYGON((0.0005 0.0005, 0.0015 0.0005, 0.0015 0.0015, 0.0005 0.0015, 0.0005 0.0005))";
        update_geometry(&mut store, &id, onto_s1, &mapping()).unwrap();
        assert!(store.get(&id).unwrap().unwrap().state.is_flagged());

        let state = reset_plot(&mut store, &id, &mapping()).unwrap();
        assert_eq!(state, GeometryState::Clean);

        let manual = PlotRecord::new("form").with_id("manual");
        store.insert(manual).unwrap();
        assert!(matches!(
            reset_plot(&mut store, "manual", &mapping()),
            Err(PlotError::MissingSource(_))
        ));
    }

    #[test]
    fn test_driver_uses_configured_area() {
        let driver = ScopeDriver::new(Config::default().with_min_area(1e9));
        let mut store = ScopeShard::new("form");
        let report = driver
            .ingest_submissions(&mut store, &mapping(), vec![submission("s1", "Abebe", SHIFTED)])
            .unwrap();
        assert_eq!(report.flagged, 1);
        assert!(plot_for(&store, "s1").state.reason().unwrap().contains("small"));
    }
}
