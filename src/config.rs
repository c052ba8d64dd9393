// Validated configuration for the watcher
// Everything here is built once at start-up and passed by reference afterwards.

use std::fmt;
use std::time::Duration;

use chrono::{Duration as Days, NaiveDate};
use regex::Regex;

use crate::error::ConfigError;
use crate::matcher::AlertFilter;

pub const DEFAULT_HOST: &str = "https://book.passkey.com";
pub const DEFAULT_EVENT_ID: u64 = 50023680;
pub const DEFAULT_OWNER_ID: u64 = 10909638;
pub const CONNECTED_MARKER: &str = "Skywalk to ICC";
pub const RESULTS_ELEMENT_ID: &str = "last-search-results";

const BOOKING_URL_PATTERN: &str =
    r"^https://book\.passkey\.com/reg/([0-9A-Z]{8}-[0-9A-Z]{4})/([0-9a-f]{1,64})$";

fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

// Closed date interval covered by the venue's housing block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    // First day of the event itself; the default stay is built around it
    pub start_day: NaiveDate,
}

impl Default for BlockWindow {
    fn default() -> Self {
        Self {
            first_day: day(2020, 7, 29),
            last_day: day(2020, 8, 2),
            start_day: day(2020, 7, 30),
        }
    }
}

impl BlockWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first_day <= date && date <= self.last_day
    }

    // Check in the day before the event starts (the "Wednesday" arrival)
    pub fn default_check_in(&self) -> NaiveDate {
        self.start_day - Days::days(1)
    }

    pub fn default_check_out(&self) -> NaiveDate {
        self.start_day + Days::days(3)
    }

    pub fn parse_day(&self, arg: &str) -> Result<NaiveDate, ConfigError> {
        let date = NaiveDate::parse_from_str(arg, "%Y-%m-%d")
            .map_err(|_| ConfigError::InvalidDate(arg.to_string()))?;
        if !self.contains(date) {
            return Err(ConfigError::OutsideBlockWindow(arg.to_string()));
        }
        Ok(date)
    }
}

// Identity of the event on the booking site and the endpoints derived from it
#[derive(Debug, Clone)]
pub struct EventConfig {
    pub host: String,
    pub event_id: u64,
    pub owner_id: u64,
    pub block_window: BlockWindow,
    pub connected_marker: String,
    pub results_element_id: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            event_id: DEFAULT_EVENT_ID,
            owner_id: DEFAULT_OWNER_ID,
            block_window: BlockWindow::default(),
            connected_marker: CONNECTED_MARKER.to_string(),
            results_element_id: RESULTS_ELEMENT_ID.to_string(),
        }
    }
}

impl EventConfig {
    pub fn event_base(&self) -> String {
        format!(
            "{}/event/{}/owner/{}",
            self.host, self.event_id, self.owner_id
        )
    }

    pub fn registration_url(&self, group_id: &str, token: &str) -> String {
        format!("{}/reg/{}/{}", self.host, group_id, token)
    }

    pub fn home_url(&self) -> String {
        format!("{}/home", self.event_base())
    }

    pub fn find_reservation_url(&self) -> String {
        format!("{}/reservation/find", self.event_base())
    }

    pub fn reload_reservation_url(&self, ack_number: &str, hash: &str) -> String {
        format!("{}/r/{}/{}", self.event_base(), ack_number, hash)
    }

    pub fn rooms_select_url(&self) -> String {
        format!("{}/rooms/select", self.event_base())
    }

    pub fn rooms_search_url(&self) -> String {
        format!("{}/rooms/select/search", self.event_base())
    }

    pub fn hotel_list_url(&self) -> String {
        format!("{}/list/hotels", self.event_base())
    }
}

// What to search for. Construction enforces check_in < check_out and that
// both dates fall inside the block window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: u32,
    children: u32,
    rooms: u32,
}

impl SearchCriteria {
    pub fn new(
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
        children: u32,
        rooms: u32,
        window: &BlockWindow,
    ) -> Result<Self, ConfigError> {
        for date in [check_in, check_out] {
            if !window.contains(date) {
                return Err(ConfigError::OutsideBlockWindow(date.to_string()));
            }
        }
        if check_in >= check_out {
            return Err(ConfigError::InvertedStay {
                check_in: check_in.to_string(),
                check_out: check_out.to_string(),
            });
        }

        Ok(Self {
            check_in,
            check_out,
            guests,
            children,
            rooms,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn guests(&self) -> u32 {
        self.guests
    }

    pub fn children(&self) -> u32 {
        self.children
    }

    pub fn rooms(&self) -> u32 {
        self.rooms
    }
}

fn plural(count: u32, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{} {}", count, one)
    } else {
        format!("{} {}", count, many)
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {} - {}",
            plural(self.guests, "guest", "guests"),
            plural(self.rooms, "room", "rooms"),
            self.check_in,
            self.check_out
        )
    }
}

// How we identify ourselves to the booking site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    // Registration link for attendees who have not booked yet
    RegistrationKey { group_id: String, token: String },
    // Acknowledgement number and surname of an existing booking
    ExistingBooking { ack_number: String, surname: String },
}

impl Credential {
    // Registration group ids are hyphenated (XXXXXXXX-XXXX); ack numbers are not.
    pub fn from_key_pair(key: &str, auth: &str) -> Self {
        if key.contains('-') {
            Credential::RegistrationKey {
                group_id: key.to_string(),
                token: auth.to_string(),
            }
        } else {
            Credential::ExistingBooking {
                ack_number: key.to_string(),
                surname: auth.to_string(),
            }
        }
    }

    pub fn from_booking_url(url: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(BOOKING_URL_PATTERN).map_err(|e| ConfigError::InvalidPattern {
            pattern: BOOKING_URL_PATTERN.to_string(),
            reason: e.to_string(),
        })?;
        let captures = pattern
            .captures(url)
            .ok_or_else(|| ConfigError::InvalidBookingUrl(url.to_string()))?;

        Ok(Credential::RegistrationKey {
            group_id: captures[1].to_string(),
            token: captures[2].to_string(),
        })
    }
}

// Maximum hotel distance that triggers an alert
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaxDistance {
    // Only hotels joined to the venue by a skywalk
    Connected,
    // Numeric bound in the venue's native unit (blocks)
    Within(f64),
}

impl MaxDistance {
    pub fn parse(arg: &str) -> Result<Self, ConfigError> {
        if arg == "connected" {
            return Ok(MaxDistance::Connected);
        }
        arg.parse::<f64>()
            .map(MaxDistance::Within)
            .map_err(|_| ConfigError::InvalidDistance(arg.to_string()))
    }

    // Banner text for an optional distance filter
    pub fn describe(max_distance: Option<&MaxDistance>) -> String {
        match max_distance {
            Some(MaxDistance::Connected) => "connected".to_string(),
            Some(MaxDistance::Within(blocks)) => format!("within {:.1} blocks", blocks),
            None => "downtown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    // Search, then sleep for the delay, forever
    Repeat { delay: Duration },
    // Search exactly once and exit
    Once,
}

impl Schedule {
    pub fn every_minutes(minutes: u64) -> Self {
        Schedule::Repeat {
            delay: Duration::from_secs(minutes * 60),
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::every_minutes(1)
    }
}

// Secrets for the outbound notification channels. A missing value disables
// that channel.
#[derive(Debug, Clone, Default)]
pub struct NotifierSettings {
    pub pushbullet_token: Option<String>,
    pub discord_webhook: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub event: EventConfig,
    pub criteria: SearchCriteria,
    pub credential: Credential,
    pub filter: AlertFilter,
    pub schedule: Schedule,
    pub notifiers: NotifierSettings,
}

// What the process should do once configuration is validated
#[derive(Debug, Clone)]
pub enum RunMode {
    // Fire every configured channel once and exit; the booking site is not contacted
    TestNotifications {
        notifiers: NotifierSettings,
        alert_target: String,
    },
    Watch(WatchConfig),
}
