// Command-line surface
// Parsed by clap, then validated into a `RunMode` before anything touches the network.

use clap::Parser;

use crate::config::{
    Credential, EventConfig, MaxDistance, NotifierSettings, RunMode, Schedule, SearchCriteria,
    WatchConfig, DEFAULT_EVENT_ID, DEFAULT_OWNER_ID,
};
use crate::error::ConfigError;
use crate::matcher::{AlertFilter, DEFAULT_BUDGET, MATCH_ANYTHING};

/// Watch the event housing block and alert when matching hotel rooms open up
#[derive(Parser, Debug)]
#[command(name = "hotel-block-watch", version)]
pub struct Cli {
    /// Number of guests
    #[arg(long, default_value_t = 1)]
    pub guests: u32,

    /// Number of children
    #[arg(long, default_value_t = 0)]
    pub children: u32,

    /// Number of rooms
    #[arg(long, default_value_t = 1)]
    pub rooms: u32,

    /// Check in
    #[arg(long, value_name = "YYYY-MM-DD", conflicts_with = "wednesday")]
    pub checkin: Option<String>,

    /// Check in on Wednesday, the day before the event opens
    #[arg(long)]
    pub wednesday: bool,

    /// Check out
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub checkout: Option<String>,

    /// Max hotel distance that triggers an alert (or 'connected' to require skywalk hotels)
    #[arg(long, value_name = "BLOCKS", conflicts_with = "connected")]
    pub max_distance: Option<String>,

    /// Shorthand for --max-distance connected
    #[arg(long)]
    pub connected: bool,

    /// Max total rate (not counting taxes/fees) that triggers an alert
    #[arg(long, value_name = "PRICE", default_value_t = DEFAULT_BUDGET)]
    pub budget: f64,

    /// Regular expression to match hotel name against
    #[arg(long, value_name = "PATTERN", default_value = MATCH_ANYTHING)]
    pub hotel_regex: String,

    /// Regular expression to match room against
    #[arg(long, value_name = "PATTERN", default_value = MATCH_ANYTHING)]
    pub room_regex: String,

    /// Show all rooms, even if miles away (shown rooms can trigger alerts)
    #[arg(long)]
    pub show_all: bool,

    /// Search every MINS minute(s)
    #[arg(long, value_name = "MINS", default_value_t = 1, conflicts_with = "once")]
    pub delay: u64,

    /// Search once and exit
    #[arg(long)]
    pub once: bool,

    /// Trigger every configured alert and exit
    #[arg(long)]
    pub test: bool,

    /// Registration key pair, or acknowledgement number and surname
    #[arg(long, num_args = 2, value_names = ["KEY", "AUTH"], conflicts_with = "url")]
    pub key: Option<Vec<String>>,

    /// Booking URL containing your registration key
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Pushbullet access token
    #[arg(long, env = "PUSHBULLET_TOKEN", hide_env_values = true)]
    pub pushbullet_token: Option<String>,

    /// Discord webhook URL
    #[arg(long, env = "DISCORD_WEBHOOK_URL", hide_env_values = true)]
    pub discord_webhook: Option<String>,

    #[arg(long, default_value_t = DEFAULT_EVENT_ID, hide = true)]
    pub event_id: u64,

    #[arg(long, default_value_t = DEFAULT_OWNER_ID, hide = true)]
    pub owner_id: u64,
}

impl Cli {
    fn credential(&self) -> Result<Credential, ConfigError> {
        if let Some(pair) = &self.key {
            return match pair.as_slice() {
                [key, auth] => Ok(Credential::from_key_pair(key, auth)),
                _ => Err(ConfigError::MissingCredential),
            };
        }
        match &self.url {
            Some(url) => Credential::from_booking_url(url),
            None => Err(ConfigError::MissingCredential),
        }
    }

    pub fn into_config(self) -> Result<RunMode, ConfigError> {
        let event = EventConfig {
            event_id: self.event_id,
            owner_id: self.owner_id,
            ..EventConfig::default()
        };
        let window = event.block_window;

        // --wednesday and an absent --checkin both arrive the day before the event
        let check_in = match (&self.checkin, self.wednesday) {
            (Some(arg), false) => window.parse_day(arg)?,
            _ => window.default_check_in(),
        };
        let check_out = match &self.checkout {
            Some(arg) => window.parse_day(arg)?,
            None => window.default_check_out(),
        };
        let criteria = SearchCriteria::new(
            check_in,
            check_out,
            self.guests,
            self.children,
            self.rooms,
            &window,
        )?;

        let max_distance = if self.connected {
            Some(MaxDistance::Connected)
        } else {
            self.max_distance
                .as_deref()
                .map(MaxDistance::parse)
                .transpose()?
        };
        let filter = AlertFilter::new(
            max_distance,
            self.budget,
            &self.hotel_regex,
            &self.room_regex,
            self.show_all,
        )?;

        let notifiers = NotifierSettings {
            pushbullet_token: self.pushbullet_token.clone(),
            discord_webhook: self.discord_webhook.clone(),
        };

        if self.test {
            return Ok(RunMode::TestNotifications {
                notifiers,
                alert_target: event.hotel_list_url(),
            });
        }

        let schedule = if self.once {
            Schedule::Once
        } else {
            Schedule::every_minutes(self.delay)
        };

        Ok(RunMode::Watch(WatchConfig {
            credential: self.credential()?,
            event,
            criteria,
            filter,
            schedule,
            notifiers,
        }))
    }
}
