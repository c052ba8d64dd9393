// Housing-block watcher for the event booking site

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod matcher;
pub mod notify;
pub mod results;
pub mod search;
pub mod watcher;

// Re-export key types for convenience
pub use auth::{strategy_for, AuthStrategy, ExistingBooking, NewReservation};
pub use cli::Cli;
pub use config::{
    BlockWindow, Credential, EventConfig, MaxDistance, NotifierSettings, RunMode, Schedule,
    SearchCriteria, WatchConfig,
};
pub use error::{ConfigError, WatchError};
pub use http::{HttpRequest, HttpSession, ReqwestSession};
pub use matcher::{AlertFilter, MatchResult, MatchedRecord};
pub use notify::{DiscordNotifier, Notifier, NotifierSet, PushbulletNotifier};
pub use results::{DistanceUnit, HotelRecord, HotelRecords, ResultParser};
pub use watcher::{CycleFailure, CycleReport, CycleState, Watcher};
