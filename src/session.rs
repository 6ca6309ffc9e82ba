use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::cache::DatasetCache;
use crate::error::{PainelError, Result};
use crate::models::Identity;
use crate::registry::ReportRegistry;
use crate::reports::{Controls, RenderedReport, ReportDefinition, ReportKind, ALL_REPORTS};
use crate::warehouse::{DataSource, DatasetKind};

/// A dataset that could not be fetched, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub dataset: DatasetKind,
    pub message: String,
}

/// One logged-in user's view: their datasets, the reports built on them and the
/// page currently selected.
pub struct Session {
    identity: Identity,
    today: NaiveDate,
    cache: DatasetCache,
    registry: ReportRegistry,
    failures: Vec<FetchFailure>,
    selected: Option<ReportKind>,
}

impl Session {
    pub fn start(
        identity: Identity,
        source: Box<dyn DataSource>,
        ttl: Duration,
        today: NaiveDate,
        now: NaiveDateTime,
    ) -> Self {
        let mut session = Self {
            registry: ReportRegistry::new(&identity),
            identity,
            today,
            cache: DatasetCache::new(source, ttl),
            failures: Vec::new(),
            selected: None,
        };
        session.build(now);
        session
    }

    /// (Re)register every report from the cache. Datasets still within the TTL are
    /// reused; a dataset that fails is reported once and its reports are left out.
    fn build(&mut self, now: NaiveDateTime) {
        let mut registry = ReportRegistry::new(&self.identity);
        let mut failures: Vec<FetchFailure> = Vec::new();

        for kind in ALL_REPORTS {
            let dataset = kind.dataset();
            if failures.iter().any(|f| f.dataset == dataset) {
                continue;
            }
            match self.cache.get(dataset, now) {
                Ok(table) => {
                    let def = ReportDefinition::new(*kind, table, &self.identity, self.today);
                    registry.register(def, kind.allowed());
                }
                Err(e) => {
                    tracing::warn!(dataset = dataset.key(), error = %e, "dataset unavailable");
                    failures.push(FetchFailure {
                        dataset,
                        message: e.to_string(),
                    });
                }
            }
        }

        self.registry = registry;
        self.failures = failures;
        if let Some(kind) = self.selected {
            if self.registry.get_kind(kind).is_none() {
                self.selected = None;
            }
        }
    }

    /// Pick up datasets whose cache entry has expired.
    pub fn refresh(&mut self, now: NaiveDateTime) {
        self.build(now);
    }

    /// Drop every cached dataset and fetch again.
    pub fn reload(&mut self, now: NaiveDateTime) {
        self.cache.clear();
        self.build(now);
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn registry(&self) -> &ReportRegistry {
        &self.registry
    }

    pub fn failures(&self) -> &[FetchFailure] {
        &self.failures
    }

    pub fn source_description(&self) -> String {
        self.cache.source().describe()
    }

    pub fn select(&mut self, name: &str) -> Result<&ReportDefinition> {
        let kind = self.registry.get(name)?.kind();
        self.selected = Some(kind);
        self.registry.get(name)
    }

    pub fn selected(&self) -> Option<&ReportDefinition> {
        self.selected.and_then(|kind| self.registry.get_kind(kind))
    }

    pub fn render_selected(&self, controls: &Controls) -> Result<RenderedReport> {
        self.selected()
            .ok_or_else(|| PainelError::Other("nenhum relatório selecionado".into()))?
            .render(controls)
    }
}
