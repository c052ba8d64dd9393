// Poll loop
// Searching -> Parsing -> Deciding -> (Notifying) -> sleep -> Searching ...
// A failed cycle is reported and abandoned; it never ends the loop.

use std::fmt;

use chrono::Local;
use thiserror::Error;

use crate::auth::{strategy_for, AuthStrategy};
use crate::config::{MaxDistance, Schedule, SearchCriteria, WatchConfig};
use crate::error::WatchError;
use crate::http::HttpSession;
use crate::matcher::{AlertFilter, MatchResult};
use crate::notify::NotifierSet;
use crate::results::ResultParser;
use crate::search::submit_search;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Searching,
    Parsing,
    Deciding,
    Notifying,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Searching => "searching",
            CycleState::Parsing => "parsing",
            CycleState::Deciding => "deciding",
            CycleState::Notifying => "notifying",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("{error}")]
pub struct CycleFailure {
    pub state: CycleState,
    #[source]
    pub error: WatchError,
}

impl CycleFailure {
    fn at(state: CycleState) -> impl FnOnce(WatchError) -> CycleFailure {
        move |error| CycleFailure { state, error }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub displayed: usize,
    pub matches: usize,
    pub notified: bool,
}

pub fn results_table(result: &MatchResult) -> String {
    let mut lines = vec![format!(
        "   {:<15} {:<10} {:<80} {}",
        "Distance", "Price", "Hotel", "Room"
    )];
    for entry in &result.entries {
        let marker = if entry.matched { " ! " } else { "   " };
        lines.push(format!("{}{}", marker, entry.record));
    }
    lines.join("\n")
}

pub struct Watcher<S> {
    http: S,
    strategy: Box<dyn AuthStrategy>,
    parser: ResultParser,
    criteria: SearchCriteria,
    filter: AlertFilter,
    notifiers: NotifierSet,
    schedule: Schedule,
    alert_target: String,
}

impl<S: HttpSession> Watcher<S> {
    // Nothing is sent here; authentication happens lazily inside the first cycle.
    pub fn new(config: &WatchConfig, http: S, notifiers: NotifierSet) -> Self {
        Self {
            http,
            strategy: strategy_for(&config.credential, &config.event),
            parser: ResultParser::new(&config.event),
            criteria: config.criteria.clone(),
            filter: config.filter.clone(),
            notifiers,
            schedule: config.schedule,
            alert_target: config.event.hotel_list_url(),
        }
    }

    pub fn banner(&self) -> String {
        format!(
            "Searching... ({}, {})",
            self.criteria,
            MaxDistance::describe(self.filter.max_distance.as_ref())
        )
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleFailure> {
        let mut state = CycleState::Searching;
        tracing::debug!(%state, "cycle started");
        self.strategy
            .prepare_for_search(&self.http)
            .await
            .map_err(CycleFailure::at(state))?;
        submit_search(&self.http, self.strategy.as_ref(), &self.criteria)
            .await
            .map_err(CycleFailure::at(state))?;

        state = CycleState::Parsing;
        tracing::debug!(%state, "search accepted");
        let records = self
            .parser
            .fetch_and_parse(&self.http)
            .await
            .map_err(CycleFailure::at(state))?;

        state = CycleState::Deciding;
        tracing::debug!(%state, "results decoded");
        let result = self.filter.evaluate(records);
        println!("Results:   ({})", Local::now().format("%Y-%m-%d %H:%M:%S"));
        println!("{}", results_table(&result));

        let mut report = CycleReport {
            displayed: result.len(),
            matches: result.match_count(),
            notified: false,
        };
        if !result.has_matches() {
            return Ok(report);
        }

        state = CycleState::Notifying;
        tracing::info!(%state, matches = report.matches, "matching rooms found");
        if self.notifiers.is_empty() {
            tracing::warn!("no notification channels configured");
            return Ok(report);
        }

        let failure = self
            .notifiers
            .dispatch(&self.alert_target)
            .await
            .into_iter()
            .find_map(|outcome| outcome.result.err());
        if let Some(error) = failure {
            return Err(CycleFailure::at(state)(error));
        }

        report.notified = true;
        Ok(report)
    }

    // Runs until the process is interrupted, or for exactly one cycle when
    // scheduled once.
    pub async fn run(&mut self) {
        loop {
            println!("{}", self.banner());
            match self.run_cycle().await {
                Ok(report) => tracing::info!(
                    displayed = report.displayed,
                    matches = report.matches,
                    notified = report.notified,
                    "search cycle complete"
                ),
                Err(failure) => tracing::error!(state = %failure.state, "{}", failure),
            }

            match self.schedule {
                Schedule::Once => return,
                Schedule::Repeat { delay } => tokio::time::sleep(delay).await,
            }
        }
    }
}
