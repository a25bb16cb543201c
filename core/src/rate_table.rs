//! The layered rate configuration.
//!
//! A RateTable holds four override layers:
//!   1. company rate + per-level rates (LevelRateLayer)
//!   2. band adjustments and their cached per-level finals (BandFinalRateLayer)
//!   3. performance weights (merit multiplier per grade)
//!   4. total budget ceiling
//!
//! RULE: a RateTable is never mutated in place. Every edit returns a new
//! value, so a snapshot handed to the resolver or a scenario stays valid.

use crate::{
    error::{LookupKind, PlanError, PlanResult},
    types::{BandName, Level, PerformanceGrade},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A base-up / merit pair, both in percent of base compensation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSplit {
    pub base_up: f64,
    pub merit:   f64,
}

impl RateSplit {
    pub const ZERO: RateSplit = RateSplit { base_up: 0.0, merit: 0.0 };

    pub fn new(base_up: f64, merit: f64) -> Self {
        Self { base_up, merit }
    }

    /// Unweighted sum of both components.
    pub fn total(&self) -> f64 {
        self.base_up + self.merit
    }

    pub fn offset(&self, delta: RateSplit) -> Self {
        Self {
            base_up: self.base_up + delta.base_up,
            merit:   self.merit + delta.merit,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.base_up == 0.0 && self.merit == 0.0
    }
}

pub type LevelRateLayer = BTreeMap<Level, RateSplit>;
pub type BandAdjustments = BTreeMap<BandName, RateSplit>;
pub type BandFinalRateLayer = BTreeMap<BandName, BTreeMap<Level, RateSplit>>;
pub type PerformanceWeightTable = BTreeMap<PerformanceGrade, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateTable {
    company:             RateSplit,
    level_rates:         LevelRateLayer,
    band_adjustments:    BandAdjustments,
    band_final_rates:    BandFinalRateLayer,
    performance_weights: PerformanceWeightTable,
    total_budget:        i64,
}

impl RateTable {
    /// Company rate applied uniformly to every given level, no band overrides.
    pub fn uniform(
        levels: &[Level],
        company: RateSplit,
        performance_weights: PerformanceWeightTable,
        total_budget: i64,
    ) -> Self {
        Self {
            company,
            level_rates: levels.iter().map(|l| (*l, company)).collect(),
            band_adjustments: BTreeMap::new(),
            band_final_rates: BTreeMap::new(),
            performance_weights,
            total_budget,
        }
    }

    /// Reassemble a table from persisted layers. Band finals are taken as
    /// stored; they are a cache of the adjustment at edit time.
    pub fn from_layers(
        company: RateSplit,
        level_rates: LevelRateLayer,
        band_adjustments: BandAdjustments,
        band_final_rates: BandFinalRateLayer,
        performance_weights: PerformanceWeightTable,
        total_budget: i64,
    ) -> Self {
        Self {
            company,
            level_rates,
            band_adjustments,
            band_final_rates,
            performance_weights,
            total_budget,
        }
    }

    // ── Lookup ─────────────────────────────────────────────────

    pub fn company_rate(&self) -> RateSplit { self.company }
    pub fn total_budget(&self) -> i64 { self.total_budget }
    pub fn level_rates(&self) -> &LevelRateLayer { &self.level_rates }
    pub fn band_adjustments(&self) -> &BandAdjustments { &self.band_adjustments }
    pub fn band_final_rates(&self) -> &BandFinalRateLayer { &self.band_final_rates }
    pub fn performance_weights(&self) -> &PerformanceWeightTable { &self.performance_weights }

    pub fn level_rate(&self, level: Level) -> Option<RateSplit> {
        self.level_rates.get(&level).copied()
    }

    pub fn band_final_rate(&self, band: &str, level: Level) -> Option<RateSplit> {
        self.band_final_rates.get(band)?.get(&level).copied()
    }

    pub fn weight(&self, grade: PerformanceGrade) -> Option<f64> {
        self.performance_weights.get(&grade).copied()
    }

    pub fn has_band_overrides(&self) -> bool {
        self.band_final_rates.values().any(|cells| !cells.is_empty())
    }

    /// Check that every known level and grade is seeded.
    pub fn validate(&self, levels: &[Level], grades: &[PerformanceGrade]) -> PlanResult<()> {
        if let Some(level) = levels.iter().find(|l| !self.level_rates.contains_key(l)) {
            return Err(PlanError::ConfigurationLookup {
                kind: LookupKind::Level,
                key:  level.to_string(),
            });
        }
        if let Some(grade) = grades.iter().find(|g| !self.performance_weights.contains_key(g)) {
            return Err(PlanError::ConfigurationLookup {
                kind: LookupKind::Grade,
                key:  grade.to_string(),
            });
        }
        Ok(())
    }

    // ── Edits (each returns a new revision) ────────────────────

    /// Company-wide slider: sets the company rate and every level to it.
    /// Cached band finals keep the values they were derived with.
    pub fn with_company_rate(&self, rate: RateSplit) -> Self {
        let mut next = self.clone();
        next.company = rate;
        for split in next.level_rates.values_mut() {
            *split = rate;
        }
        next
    }

    pub fn with_level_rate(&self, level: Level, rate: RateSplit) -> Self {
        let mut next = self.clone();
        next.level_rates.insert(level, rate);
        next
    }

    /// Record a band's deltas and cache the resulting per-level finals
    /// against the level rates as they stand now. A zero delta clears the
    /// band's override.
    pub fn with_band_adjustment(&self, band: &str, delta: RateSplit) -> Self {
        let mut next = self.clone();
        if delta.is_zero() {
            next.band_adjustments.remove(band);
            next.band_final_rates.remove(band);
            return next;
        }
        let finals = self
            .level_rates
            .iter()
            .map(|(level, split)| (*level, split.offset(delta)))
            .collect();
        next.band_adjustments.insert(band.to_string(), delta);
        next.band_final_rates.insert(band.to_string(), finals);
        next
    }

    /// Drop every band override.
    pub fn without_band_overrides(&self) -> Self {
        let mut next = self.clone();
        next.band_adjustments.clear();
        next.band_final_rates.clear();
        next
    }

    pub fn with_performance_weight(&self, grade: PerformanceGrade, weight: f64) -> Self {
        let mut next = self.clone();
        next.performance_weights.insert(grade, weight);
        next
    }

    pub fn with_total_budget(&self, total_budget: i64) -> Self {
        let mut next = self.clone();
        next.total_budget = total_budget;
        next
    }
}
