// Alert matching
// Decides which normalised records are shown to the operator and which of
// those trigger a notification.

use regex::{Regex, RegexBuilder};

use crate::config::MaxDistance;
use crate::error::ConfigError;
use crate::results::{DistanceUnit, HotelRecord};

pub const DEFAULT_BUDGET: f64 = 99999.0;
pub const MATCH_ANYTHING: &str = ".*";

pub fn compile_pattern(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

#[derive(Debug, Clone)]
pub struct AlertFilter {
    // None means "no distance filter" (anything downtown)
    pub max_distance: Option<MaxDistance>,
    // Budget and the two patterns are accepted but do not gate a match;
    // only the connected requirement does.
    pub budget: f64,
    pub hotel_pattern: Regex,
    pub room_pattern: Regex,
    // Also show hotels measured in miles. Once shown they are matched by the
    // same connected rule as every other record.
    pub show_all: bool,
}

impl AlertFilter {
    pub fn new(
        max_distance: Option<MaxDistance>,
        budget: f64,
        hotel_pattern: &str,
        room_pattern: &str,
        show_all: bool,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            max_distance,
            budget,
            hotel_pattern: compile_pattern(hotel_pattern)?,
            room_pattern: compile_pattern(room_pattern)?,
            show_all,
        })
    }

    pub fn is_displayed(&self, record: &HotelRecord) -> bool {
        self.show_all || record.unit != DistanceUnit::Miles
    }

    pub fn is_match(&self, record: &HotelRecord) -> bool {
        matches!(self.max_distance, Some(MaxDistance::Connected)) && record.connected
    }

    // Records hidden by the miles rule are dropped entirely; everything else
    // is kept, in order, with its match decision.
    pub fn evaluate<I>(&self, records: I) -> MatchResult
    where
        I: IntoIterator<Item = HotelRecord>,
    {
        let entries = records
            .into_iter()
            .filter(|record| self.is_displayed(record))
            .map(|record| MatchedRecord {
                matched: self.is_match(&record),
                record,
            })
            .collect();

        MatchResult { entries }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRecord {
    pub record: HotelRecord,
    pub matched: bool,
}

// Outcome of one poll cycle. Not kept between cycles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    pub entries: Vec<MatchedRecord>,
}

impl MatchResult {
    pub fn matches(&self) -> impl Iterator<Item = &HotelRecord> {
        self.entries
            .iter()
            .filter(|entry| entry.matched)
            .map(|entry| &entry.record)
    }

    pub fn match_count(&self) -> usize {
        self.matches().count()
    }

    pub fn has_matches(&self) -> bool {
        self.entries.iter().any(|entry| entry.matched)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
