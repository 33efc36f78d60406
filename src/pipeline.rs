// 🏭 Pipeline - classify → resolve cohorts → merge, computed once per snapshot
//
// The output (FactTables) is an immutable value. Aggregations are pure reads
// over it, so any number of callers can query one Arc<FactTables> at once.
// FactCache guarantees the classify/merge pass runs once per snapshot even
// when several callers ask for the same uncached snapshot concurrently.

use crate::aggregate::{aggregate, filter_options, Aggregation, Filters, GroupShare};
use crate::cohort::CohortResolver;
use crate::config::PipelineConfig;
use crate::diagnostics::{summarize, PipelineWarning};
use crate::entities::{Deal, Founder, StartupRow};
use crate::error::{PipelineError, Result};
use crate::loader::{SnapshotId, SourceSnapshot};
use crate::merge::{
    merge_founder_startup, merge_full, merge_startup_deal, FounderStartupRow, FullRow, StartupDealRow,
};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

// ============================================================================
// TABLE SELECTOR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactTableKind {
    /// Founder ⨝ Startup (left, unexploded startups)
    FounderStartup,
    /// Startup ⨝ Deal (left, exploded startups)
    StartupDeal,
    /// Founder ⨝ Startup ⨝ Deal (inner, then left)
    Full,
}

impl FactTableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactTableKind::FounderStartup => "founder-startup",
            FactTableKind::StartupDeal => "startup-deal",
            FactTableKind::Full => "full",
        }
    }
}

impl fmt::Display for FactTableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactTableKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "founder-startup" => Ok(FactTableKind::FounderStartup),
            "startup-deal" => Ok(FactTableKind::StartupDeal),
            "full" => Ok(FactTableKind::Full),
            other => Err(format!(
                "unknown table '{}' (expected founder-startup, startup-deal or full)",
                other
            )),
        }
    }
}

// ============================================================================
// FACT TABLES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct FactTables {
    pub snapshot_id: SnapshotId,
    /// Founders with faculty normalized
    pub founders: Vec<Founder>,
    /// One row per startup, status classified
    pub startups: Vec<StartupRow>,
    /// One row per startup industry tag
    pub startup_industries: Vec<StartupRow>,
    /// Deals with cohort ordinal and year resolved
    pub deals: Vec<Deal>,
    pub founder_startup: Vec<FounderStartupRow>,
    pub startup_deal: Vec<StartupDealRow>,
    pub full: Vec<FullRow>,
    pub warnings: Vec<PipelineWarning>,
}

impl FactTables {
    pub fn row_count(&self, table: FactTableKind) -> usize {
        match table {
            FactTableKind::FounderStartup => self.founder_startup.len(),
            FactTableKind::StartupDeal => self.startup_deal.len(),
            FactTableKind::Full => self.full.len(),
        }
    }

    pub fn aggregate(&self, table: FactTableKind, group_by: &[&str], filters: &Filters) -> Result<Aggregation> {
        match table {
            FactTableKind::FounderStartup => aggregate(&self.founder_startup, group_by, filters),
            FactTableKind::StartupDeal => aggregate(&self.startup_deal, group_by, filters),
            FactTableKind::Full => aggregate(&self.full, group_by, filters),
        }
    }

    pub fn filter_options(&self, table: FactTableKind, dimension: &str) -> Result<Vec<String>> {
        match table {
            FactTableKind::FounderStartup => filter_options(&self.founder_startup, dimension),
            FactTableKind::StartupDeal => filter_options(&self.startup_deal, dimension),
            FactTableKind::Full => filter_options(&self.full, dimension),
        }
    }

    // ========================================================================
    // STANDING DASHBOARD VIEWS
    // ========================================================================

    /// Founders per (program track, status, faculty)
    pub fn faculty_distribution(&self, filters: &Filters) -> Result<Aggregation> {
        self.aggregate(
            FactTableKind::FounderStartup,
            &["Startup Path", "Status", "Faculty"],
            filters,
        )
    }

    /// Startup industry rows per (year, industry); deals without a year drop out
    pub fn industry_trend(&self, filters: &Filters) -> Result<Aggregation> {
        self.aggregate(FactTableKind::StartupDeal, &["Year", "Industry"], filters)
    }

    /// Share of each gender's founders in each status
    pub fn gender_by_status(&self, filters: &Filters) -> Result<Vec<GroupShare>> {
        self.aggregate(FactTableKind::Full, &["Status", "Gender"], filters)?
            .shares(&["Gender"])
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    resolver: CohortResolver,
}

impl Pipeline {
    /// Fails on any configuration error, before a single row is touched
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let resolver = CohortResolver::new(config.cohort.clone())?;
        Ok(Pipeline { config, resolver })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Full classify/resolve/merge pass. Row-level problems never fail it.
    pub fn run(&self, snapshot: &SourceSnapshot) -> FactTables {
        let founders: Vec<Founder> = snapshot
            .founders
            .iter()
            .cloned()
            .map(|mut founder| {
                founder.normalize_faculty(&self.config.faculty);
                founder
            })
            .collect();

        let startups: Vec<StartupRow> = snapshot
            .startups
            .iter()
            .map(|startup| startup.classify(&self.config.status))
            .collect();

        let startup_industries: Vec<StartupRow> = snapshot
            .startups
            .iter()
            .flat_map(|startup| startup.explode(&self.config.industry, &self.config.status))
            .collect();

        let deals: Vec<Deal> = snapshot
            .deals
            .iter()
            .cloned()
            .map(|mut deal| {
                deal.resolve_cohort(&self.resolver);
                deal
            })
            .collect();

        let undated = deals.iter().filter(|d| d.year.is_none()).count();
        if undated > 0 {
            debug!(undated, "deals without a cohort year are excluded from yearly views");
        }

        let founder_startup = merge_founder_startup(&founders, &startups);
        let startup_deal = merge_startup_deal(&startup_industries, &deals);
        let full = merge_full(&founders, &startups, &deals);

        if !snapshot.warnings.is_empty() {
            warn!(snapshot = %snapshot.id.short(), "{}", summarize(&snapshot.warnings));
        }

        info!(
            snapshot = %snapshot.id.short(),
            founder_startup = founder_startup.len(),
            startup_deal = startup_deal.len(),
            full = full.len(),
            "fact tables built"
        );

        FactTables {
            snapshot_id: snapshot.id.clone(),
            founders,
            startups,
            startup_industries,
            deals,
            founder_startup,
            startup_deal,
            full,
            warnings: snapshot.warnings.clone(),
        }
    }
}

// ============================================================================
// MEMOIZED FACT CACHE
// ============================================================================

/// Compute-once cache of fact tables keyed by snapshot identity.
///
/// Concurrent callers for the same uncached snapshot block on one cell while
/// a single caller runs the pipeline. Past `capacity` snapshots the least
/// recently used finished entry is dropped; a cell still being computed is
/// never dropped, so its waiters and late arrivals share the one result.
pub struct FactCache {
    pipeline: Pipeline,
    capacity: usize,
    state: Mutex<CacheState>,
    computations: AtomicUsize,
}

type TablesCell = Arc<OnceCell<Arc<FactTables>>>;

struct CacheEntry {
    cell: TablesCell,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<SnapshotId, CacheEntry>,
    clock: u64,
}

impl CacheState {
    fn touch(&mut self, id: &SnapshotId) -> TablesCell {
        self.clock += 1;
        let clock = self.clock;
        let entry = self.entries.entry(id.clone()).or_insert_with(|| CacheEntry {
            cell: Arc::new(OnceCell::new()),
            last_used: clock,
        });
        entry.last_used = clock;
        Arc::clone(&entry.cell)
    }

    /// Drop finished entries other than `keep`, least recently used first,
    /// down to `capacity`
    fn evict_over(&mut self, capacity: usize, keep: Option<&SnapshotId>) -> usize {
        let mut evicted = 0;
        while self.entries.len() > capacity {
            let victim = self
                .entries
                .iter()
                .filter(|(id, entry)| Some(*id) != keep && entry.cell.get().is_some())
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone());

            match victim {
                Some(id) => {
                    self.entries.remove(&id);
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}

impl FactCache {
    /// Keeps only the latest snapshot: a new load invalidates the previous one
    pub fn new(pipeline: Pipeline) -> Self {
        FactCache::with_capacity(pipeline, 1)
    }

    pub fn with_capacity(pipeline: Pipeline, capacity: usize) -> Self {
        FactCache {
            pipeline,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
            computations: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: PipelineConfig) -> std::result::Result<Self, PipelineError> {
        Ok(FactCache::new(Pipeline::new(config)?))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get_or_compute(&self, snapshot: &SourceSnapshot) -> Arc<FactTables> {
        let cell = {
            let mut state = self.lock();
            let cell = state.touch(&snapshot.id);
            let evicted = state.evict_over(self.capacity, Some(&snapshot.id));
            if evicted > 0 {
                debug!(snapshot = %snapshot.id.short(), evicted, "evicting older fact tables");
            }
            cell
        };

        let tables = Arc::clone(cell.get_or_init(|| {
            self.computations.fetch_add(1, Ordering::SeqCst);
            debug!(snapshot = %snapshot.id.short(), "cache miss; running pipeline");
            Arc::new(self.pipeline.run(snapshot))
        }));

        // entries kept while in flight can be dropped now that this one is done
        self.lock().evict_over(self.capacity, None);
        tables
    }

    /// Cached tables for `id`, without computing
    pub fn get(&self, id: &SnapshotId) -> Option<Arc<FactTables>> {
        self.lock()
            .entries
            .get(id)
            .and_then(|entry| entry.cell.get().cloned())
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of full pipeline passes run so far
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }
}

// ============================================================================
// TESTS
// ============================================================================
