//! Periodic validation and self-healing of territorial state.
//!
//! The [`ErrorRecoveryManager`] runs a validation pass on its own timer.
//! Each pass, in order:
//!
//! 1. finds overlapping territory bounds and schedules a delayed realign,
//! 2. checks every queen for lifecycle corruption and schedules a delayed
//!    repair,
//! 3. checks hives for construction timeouts and queens for missing hives
//!    and schedules a delayed repair,
//! 4. checks every live parasite's control relationship and repairs it
//!    inline,
//! 5. clears pending records whose drift has gone away and re-attempts
//!    pending overlap corrections.
//!
//! Delayed repairs are retried up to `max_retry_attempts` times and then
//! abandoned with a warning, leaving the drift in place. Nothing here
//! returns an error to the frame loop.

pub mod correct;
pub mod detect;
pub mod records;

use std::collections::{BTreeMap, BTreeSet};

use hivefall_colony::{ColonyError, ParasiteSource};
use hivefall_types::{ParasiteId, QueenId};
use serde::Deserialize;
use tracing::{info, warn};

use crate::clock::TaskQueue;
use crate::territory_manager::TerritoryManager;

pub use correct::CorrectionOutcome;
pub use detect::HIVE_TIMEOUT_GRACE_SECS;
pub use records::{
    HiveConstructionError, HiveFailureKind, ParasiteControlError, ParasiteControlKind,
    QueenCorruptionError, QueenCorruptionKind, TerritoryOverlapError,
};

/// Errors raised by a correction attempt that could not run.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    /// A repair call on the territory manager failed.
    #[error("repair failed: {source}")]
    Colony {
        /// The underlying colony error.
        #[from]
        source: ColonyError,
    },
}

/// Recovery timing and retry limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecoveryConfig {
    /// Correction attempts per record before giving up.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Delay before a scheduled correction runs, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Time between validation passes, in milliseconds.
    #[serde(default = "default_validation_interval_ms")]
    pub validation_interval_ms: u64,

    /// Log detections and successful corrections at `info`.
    #[serde(default = "default_true")]
    pub enable_logging: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: default_max_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            validation_interval_ms: default_validation_interval_ms(),
            enable_logging: true,
        }
    }
}

const fn default_max_retry_attempts() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    5000
}

const fn default_validation_interval_ms() -> u64 {
    10_000
}

const fn default_true() -> bool {
    true
}

/// A partial [`RecoveryConfig`] update. `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryConfigPatch {
    /// New retry cap.
    pub max_retry_attempts: Option<u32>,
    /// New retry delay.
    pub retry_delay_ms: Option<u64>,
    /// New validation interval.
    pub validation_interval_ms: Option<u64>,
    /// New logging flag.
    pub enable_logging: Option<bool>,
}

/// Running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Validation passes run.
    pub validations_run: u64,
    /// Drift records created.
    pub errors_detected: u64,
    /// Correction attempts made.
    pub corrections_attempted: u64,
    /// Records cleared, by a correction or because the drift went away.
    pub corrections_succeeded: u64,
    /// Attempts that left the drift in place or could not run.
    pub corrections_failed: u64,
    /// Records dropped after exhausting their retries.
    pub corrections_abandoned: u64,
    /// Time of the last validation pass.
    pub last_validation_ms: Option<u64>,
}

/// Pending records per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurrentErrors {
    /// Overlapping territory pairs.
    pub territory_overlaps: usize,
    /// Corrupted queens.
    pub queen_corruptions: usize,
    /// Hive construction failures.
    pub hive_construction_failures: usize,
    /// Parasite control mismatches.
    pub parasite_control_errors: usize,
}

impl CurrentErrors {
    /// Sum over all categories.
    pub const fn total(&self) -> usize {
        self.territory_overlaps
            .saturating_add(self.queen_corruptions)
            .saturating_add(self.hive_construction_failures)
            .saturating_add(self.parasite_control_errors)
    }
}

/// New records found by one validation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Newly tracked overlaps.
    pub overlaps: usize,
    /// Newly tracked queen corruptions.
    pub queen_corruptions: usize,
    /// Newly tracked hive failures.
    pub hive_failures: usize,
    /// Parasite problems found (and corrected inline).
    pub parasite_errors: usize,
    /// Pending records cleared by the reconciliation step.
    pub reconciled: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RecoveryTask {
    Validate,
    CorrectOverlap(String),
    CorrectQueen(QueenId),
    CorrectHive(String),
}

/// How an attempt left a record.
enum Settled {
    Resolved,
    Retry,
    Abandoned,
}

/// Detects drift in territorial state and schedules bounded-retry
/// corrections.
#[derive(Debug)]
pub struct ErrorRecoveryManager {
    config: RecoveryConfig,
    queue: TaskQueue<RecoveryTask>,
    overlaps: BTreeMap<String, TerritoryOverlapError>,
    queens: BTreeMap<QueenId, QueenCorruptionError>,
    hives: BTreeMap<String, HiveConstructionError>,
    parasites: BTreeMap<ParasiteId, ParasiteControlError>,
    stats: RecoveryStats,
    now_ms: u64,
    disposed: bool,
}

impl ErrorRecoveryManager {
    /// A manager whose first validation pass is due one interval after
    /// time zero.
    pub fn new(config: RecoveryConfig) -> Self {
        let mut queue = TaskQueue::new();
        queue.schedule(config.validation_interval_ms.max(1), RecoveryTask::Validate);
        Self {
            config,
            queue,
            overlaps: BTreeMap::new(),
            queens: BTreeMap::new(),
            hives: BTreeMap::new(),
            parasites: BTreeMap::new(),
            stats: RecoveryStats::default(),
            now_ms: 0,
            disposed: false,
        }
    }

    /// Current configuration.
    pub const fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Running totals.
    pub const fn stats(&self) -> RecoveryStats {
        self.stats
    }

    /// Pending records per category.
    pub fn current_errors(&self) -> CurrentErrors {
        CurrentErrors {
            territory_overlaps: self.overlaps.len(),
            queen_corruptions: self.queens.len(),
            hive_construction_failures: self.hives.len(),
            parasite_control_errors: self.parasites.len(),
        }
    }

    /// Pending overlap records.
    pub fn overlap_errors(&self) -> impl Iterator<Item = &TerritoryOverlapError> {
        self.overlaps.values()
    }

    /// Pending queen records.
    pub fn queen_errors(&self) -> impl Iterator<Item = &QueenCorruptionError> {
        self.queens.values()
    }

    /// Pending hive records.
    pub fn hive_errors(&self) -> impl Iterator<Item = &HiveConstructionError> {
        self.hives.values()
    }

    /// Pending parasite records.
    pub fn parasite_errors(&self) -> impl Iterator<Item = &ParasiteControlError> {
        self.parasites.values()
    }

    /// Scheduled tasks, the validation timer included.
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Latest time seen by [`Self::advance`].
    pub const fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Run every task due at `now_ms`: validation passes and scheduled
    /// corrections.
    pub fn advance(
        &mut self,
        now_ms: u64,
        territories: &mut TerritoryManager,
        parasites: &dyn ParasiteSource,
    ) {
        if self.disposed {
            return;
        }
        self.now_ms = self.now_ms.max(now_ms);
        for task in self.queue.drain_due(self.now_ms) {
            match task {
                RecoveryTask::Validate => {
                    self.perform_system_validation(territories, parasites);
                    self.arm_validation();
                }
                RecoveryTask::CorrectOverlap(key) => self.run_overlap_correction(&key, territories),
                RecoveryTask::CorrectQueen(id) => self.run_queen_correction(id, territories),
                RecoveryTask::CorrectHive(key) => self.run_hive_correction(&key, territories),
            }
        }
    }

    /// Run a validation pass now and restart the validation timer.
    pub fn force_validation(
        &mut self,
        territories: &mut TerritoryManager,
        parasites: &dyn ParasiteSource,
    ) -> ValidationReport {
        if self.disposed {
            return ValidationReport::default();
        }
        let report = self.perform_system_validation(territories, parasites);
        self.queue.retain(|t| *t != RecoveryTask::Validate);
        self.arm_validation();
        report
    }

    /// Run one validation pass at the current time.
    pub fn perform_system_validation(
        &mut self,
        territories: &mut TerritoryManager,
        parasites: &dyn ParasiteSource,
    ) -> ValidationReport {
        if self.disposed {
            return ValidationReport::default();
        }
        self.stats.validations_run = self.stats.validations_run.saturating_add(1);
        self.stats.last_validation_ms = Some(self.now_ms);

        let report = ValidationReport {
            overlaps: self.detect_overlaps(territories),
            queen_corruptions: self.detect_queen_corruption(territories),
            hive_failures: self.detect_hive_failures(territories),
            parasite_errors: self.check_parasites(territories, parasites),
            reconciled: self.process_recovery_attempts(territories),
        };
        if self.config.enable_logging && report != ValidationReport::default() {
            info!(
                overlaps = report.overlaps,
                queen_corruptions = report.queen_corruptions,
                hive_failures = report.hive_failures,
                parasite_errors = report.parasite_errors,
                reconciled = report.reconciled,
                "System validation found drift"
            );
        }
        report
    }

    /// Forget every pending record and scheduled correction. The
    /// validation timer keeps running.
    pub fn clear_errors(&mut self) {
        self.overlaps.clear();
        self.queens.clear();
        self.hives.clear();
        self.parasites.clear();
        self.queue.retain(|t| *t == RecoveryTask::Validate);
    }

    /// Apply a partial config update. A new validation interval restarts
    /// the validation timer from now.
    pub fn update_config(&mut self, patch: RecoveryConfigPatch) {
        if let Some(max) = patch.max_retry_attempts {
            self.config.max_retry_attempts = max;
        }
        if let Some(delay) = patch.retry_delay_ms {
            self.config.retry_delay_ms = delay;
        }
        if let Some(enabled) = patch.enable_logging {
            self.config.enable_logging = enabled;
        }
        if let Some(interval) = patch.validation_interval_ms {
            self.config.validation_interval_ms = interval;
            if !self.disposed {
                self.queue.retain(|t| *t != RecoveryTask::Validate);
                self.arm_validation();
            }
        }
    }

    /// Drop every record and scheduled task. Later calls do nothing.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.queue.clear();
        self.overlaps.clear();
        self.queens.clear();
        self.hives.clear();
        self.parasites.clear();
    }

    /// Whether [`Self::dispose`] has been called.
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    // -----------------------------------------------------------------------
    // Detection
    // -----------------------------------------------------------------------

    fn detect_overlaps(&mut self, territories: &TerritoryManager) -> usize {
        let mut found = 0_usize;
        for overlap in territories.store().overlaps() {
            let key = records::overlap_key(overlap.first, overlap.second);
            if self.overlaps.contains_key(&key) {
                continue;
            }
            if self.config.enable_logging {
                info!(key = %key, area = overlap.area, "Territory overlap detected");
            }
            self.overlaps.insert(
                key.clone(),
                TerritoryOverlapError {
                    first: overlap.first,
                    second: overlap.second,
                    area: overlap.area,
                    detected_at_ms: self.now_ms,
                    attempts: 0,
                },
            );
            self.schedule_correction(RecoveryTask::CorrectOverlap(key));
            found = found.saturating_add(1);
        }
        self.count_detected(found);
        found
    }

    fn detect_queen_corruption(&mut self, territories: &TerritoryManager) -> usize {
        let mut found = 0_usize;
        for queen in territories.all_queens() {
            if self.queens.contains_key(&queen.id()) {
                continue;
            }
            let Some(kind) = detect::queen_corruption(queen, territories) else {
                continue;
            };
            if self.config.enable_logging {
                info!(queen_id = %queen.id(), %kind, "Queen corruption detected");
            }
            self.queens.insert(
                queen.id(),
                QueenCorruptionError {
                    queen_id: queen.id(),
                    territory_id: queen.territory_id(),
                    kind,
                    detected_at_ms: self.now_ms,
                    attempts: 0,
                },
            );
            self.schedule_correction(RecoveryTask::CorrectQueen(queen.id()));
            found = found.saturating_add(1);
        }
        self.count_detected(found);
        found
    }

    fn detect_hive_failures(&mut self, territories: &TerritoryManager) -> usize {
        let mut candidates = Vec::new();
        for hive in territories.all_hives().filter(|h| detect::hive_timed_out(h)) {
            candidates.push(HiveConstructionError {
                hive_id: Some(hive.id().clone()),
                queen_id: hive.queen_id(),
                territory_id: hive.territory_id(),
                kind: HiveFailureKind::Timeout,
                detected_at_ms: self.now_ms,
                attempts: 0,
            });
        }
        for queen in territories
            .all_queens()
            .filter(|q| detect::queen_missing_hive(q, territories))
        {
            candidates.push(HiveConstructionError {
                hive_id: None,
                queen_id: queen.id(),
                territory_id: queen.territory_id(),
                kind: HiveFailureKind::MissingHive,
                detected_at_ms: self.now_ms,
                attempts: 0,
            });
        }

        let mut found = 0_usize;
        for record in candidates {
            let key = record.key();
            if self.hives.contains_key(&key) {
                continue;
            }
            if self.config.enable_logging {
                info!(key = %key, kind = %record.kind, "Hive construction failure detected");
            }
            self.hives.insert(key.clone(), record);
            self.schedule_correction(RecoveryTask::CorrectHive(key));
            found = found.saturating_add(1);
        }
        self.count_detected(found);
        found
    }

    fn check_parasites(
        &mut self,
        territories: &mut TerritoryManager,
        parasites: &dyn ParasiteSource,
    ) -> usize {
        let mut seen = BTreeSet::new();
        let mut found = 0_usize;
        for parasite in parasites.all_parasites() {
            let Some(finding) = detect::parasite_control(&parasite, territories) else {
                continue;
            };
            seen.insert(parasite.id);
            found = found.saturating_add(1);

            let record = self.parasites.entry(parasite.id).or_insert_with(|| {
                ParasiteControlError {
                    parasite_id: parasite.id,
                    kind: finding.kind,
                    territory_id: finding.territory_id,
                    expected_queen: finding.expected_queen,
                    controllers: finding.controllers.clone(),
                    detected_at_ms: self.now_ms,
                    attempts: 0,
                }
            });
            if record.attempts == 0 {
                self.stats.errors_detected = self.stats.errors_detected.saturating_add(1);
                if self.config.enable_logging {
                    info!(
                        parasite_id = %parasite.id,
                        kind = %finding.kind,
                        "Parasite control error detected"
                    );
                }
            }
            record.kind = finding.kind;
            record.controllers.clone_from(&finding.controllers);
            record.attempts = record.attempts.saturating_add(1);
            let attempts = record.attempts;

            let outcome = correct::correct_parasite(territories, &parasite, &finding);
            let key = parasite.id.to_string();
            match self.settle("parasite", &key, attempts, Ok(outcome)) {
                Settled::Resolved | Settled::Abandoned => {
                    self.parasites.remove(&parasite.id);
                }
                Settled::Retry => {}
            }
        }
        self.parasites.retain(|id, _| seen.contains(id));
        found
    }

    // -----------------------------------------------------------------------
    // Correction
    // -----------------------------------------------------------------------

    fn run_overlap_correction(&mut self, key: &str, territories: &mut TerritoryManager) {
        let Some(record) = self.overlaps.get_mut(key) else {
            return;
        };
        record.attempts = record.attempts.saturating_add(1);
        let attempts = record.attempts;
        let outcome = correct::correct_overlap(territories, record);
        match self.settle("overlap", key, attempts, Ok(outcome)) {
            Settled::Resolved | Settled::Abandoned => {
                self.overlaps.remove(key);
            }
            // Left pending; step 5 of the next validation pass retries it.
            Settled::Retry => {}
        }
    }

    fn run_queen_correction(&mut self, queen_id: QueenId, territories: &mut TerritoryManager) {
        let Some(record) = self.queens.get_mut(&queen_id) else {
            return;
        };
        record.attempts = record.attempts.saturating_add(1);
        let attempts = record.attempts;
        let outcome = correct::correct_queen(territories, record);
        let key = queen_id.to_string();
        match self.settle("queen", &key, attempts, outcome) {
            Settled::Resolved | Settled::Abandoned => {
                self.queens.remove(&queen_id);
            }
            Settled::Retry => self.schedule_correction(RecoveryTask::CorrectQueen(queen_id)),
        }
    }

    fn run_hive_correction(&mut self, key: &str, territories: &mut TerritoryManager) {
        let Some(record) = self.hives.get_mut(key) else {
            return;
        };
        record.attempts = record.attempts.saturating_add(1);
        let attempts = record.attempts;
        let outcome = correct::correct_hive(territories, record);
        match self.settle("hive", key, attempts, outcome) {
            Settled::Resolved | Settled::Abandoned => {
                self.hives.remove(key);
            }
            Settled::Retry => self.schedule_correction(RecoveryTask::CorrectHive(key.to_owned())),
        }
    }

    /// Clear records whose drift is gone and retry pending overlaps.
    fn process_recovery_attempts(&mut self, territories: &mut TerritoryManager) -> usize {
        let before = self.pending_delayed();

        let overlap_keys: Vec<String> = self.overlaps.keys().cloned().collect();
        for key in overlap_keys {
            let gone = self
                .overlaps
                .get(&key)
                .is_some_and(|r| !correct::still_overlapping(territories, r.first, r.second));
            if gone {
                self.overlaps.remove(&key);
                self.count_succeeded();
            } else if self.overlaps.get(&key).is_some_and(|r| r.attempts > 0) {
                self.run_overlap_correction(&key, territories);
            }
        }

        let stale_queens: Vec<QueenId> = self
            .queens
            .values()
            .filter(|r| {
                territories
                    .queen(r.queen_id)
                    .is_none_or(|q| !detect::queen_still_corrupt(q, r.kind, territories))
            })
            .map(|r| r.queen_id)
            .collect();
        for id in stale_queens {
            self.queens.remove(&id);
            self.count_succeeded();
        }

        let stale_hives: Vec<String> = self
            .hives
            .iter()
            .filter(|(_, r)| {
                let hive = r.hive_id.as_ref().and_then(|id| territories.hive(id));
                !detect::hive_failure_persists(r.kind, hive, r.queen_id, territories)
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale_hives {
            self.hives.remove(&key);
            self.count_succeeded();
        }

        before.saturating_sub(self.pending_delayed())
    }

    /// Update stats and logs for one attempt and decide what happens to
    /// its record.
    fn settle(
        &mut self,
        category: &str,
        key: &str,
        attempts: u32,
        outcome: Result<CorrectionOutcome, RecoveryError>,
    ) -> Settled {
        self.stats.corrections_attempted = self.stats.corrections_attempted.saturating_add(1);
        match outcome {
            Ok(CorrectionOutcome::Resolved) => {
                self.count_succeeded();
                if self.config.enable_logging {
                    info!(category, key, attempts, "Correction succeeded");
                }
                return Settled::Resolved;
            }
            Ok(CorrectionOutcome::Pending) => {
                warn!(category, key, attempts, "Correction left drift in place");
            }
            Err(err) => {
                warn!(category, key, attempts, %err, "Correction attempt failed");
            }
        }
        self.stats.corrections_failed = self.stats.corrections_failed.saturating_add(1);
        if attempts >= self.config.max_retry_attempts {
            self.stats.corrections_abandoned = self.stats.corrections_abandoned.saturating_add(1);
            warn!(category, key, attempts, "Correction abandoned after max retries");
            return Settled::Abandoned;
        }
        Settled::Retry
    }

    fn schedule_correction(&mut self, task: RecoveryTask) {
        let due = self.now_ms.saturating_add(self.config.retry_delay_ms);
        self.queue.schedule(due, task);
    }

    fn arm_validation(&mut self) {
        let due = self
            .now_ms
            .saturating_add(self.config.validation_interval_ms.max(1));
        self.queue.schedule(due, RecoveryTask::Validate);
    }

    fn pending_delayed(&self) -> usize {
        self.overlaps
            .len()
            .saturating_add(self.queens.len())
            .saturating_add(self.hives.len())
    }

    fn count_detected(&mut self, found: usize) {
        let found = u64::try_from(found).unwrap_or(u64::MAX);
        self.stats.errors_detected = self.stats.errors_detected.saturating_add(found);
    }

    const fn count_succeeded(&mut self) {
        self.stats.corrections_succeeded = self.stats.corrections_succeeded.saturating_add(1);
    }
}
