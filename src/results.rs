// Result listing: extraction, decoding and normalisation
// The listing page embeds its data as JSON inside a <script> element. Pulling
// that blob out of the markup is kept behind `PayloadExtractor` so the scraping
// can change without touching the normalisation below.

use std::fmt;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EventConfig;
use crate::error::WatchError;
use crate::http::{HttpRequest, HttpSession};

pub trait PayloadExtractor: Send + Sync {
    // Returns the raw payload text, or None when the page does not carry one
    fn extract(&self, markup: &str) -> Option<String>;
}

// Finds the first <script> whose id matches (case-insensitively) and returns
// its text content untouched.
pub struct ScriptElementExtractor {
    element_id: String,
}

impl ScriptElementExtractor {
    pub fn new(element_id: &str) -> Self {
        Self {
            element_id: element_id.to_string(),
        }
    }
}

impl PayloadExtractor for ScriptElementExtractor {
    fn extract(&self, markup: &str) -> Option<String> {
        let document = Html::parse_document(markup);
        let selector = Selector::parse("script").ok()?;
        document
            .select(&selector)
            .find(|script| {
                script
                    .value()
                    .attr("id")
                    .is_some_and(|id| id.eq_ignore_ascii_case(&self.element_id))
            })
            .map(|script| script.text().collect::<String>())
    }
}

// Decodes HTML entities (&amp;, &#39;, ...) and leaves everything else,
// angle brackets included, as written
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

// Data structures for the embedded listing payload
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasskeyHotel {
    pub name: String,
    #[serde(default)]
    pub distance_from_event: Option<f64>,
    #[serde(default)]
    pub distance_unit: Option<i64>,
    #[serde(default)]
    pub message_map: Option<Value>,
    #[serde(default)]
    pub blocks: Vec<PasskeyBlock>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PasskeyBlock {
    pub name: String,
    #[serde(default)]
    pub inventory: Vec<PasskeyInventory>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PasskeyInventory {
    pub rate: f64,
    pub available: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Blocks,
    Yards,
    Miles,
    Meters,
    Kilometers,
    Unknown(i64),
}

impl From<i64> for DistanceUnit {
    fn from(code: i64) -> Self {
        match code {
            1 => DistanceUnit::Blocks,
            2 => DistanceUnit::Yards,
            3 => DistanceUnit::Miles,
            4 => DistanceUnit::Meters,
            5 => DistanceUnit::Kilometers,
            other => DistanceUnit::Unknown(other),
        }
    }
}

impl DistanceUnit {
    pub fn label(&self) -> &'static str {
        match self {
            DistanceUnit::Blocks => "blocks",
            DistanceUnit::Yards => "yards",
            DistanceUnit::Miles => "miles",
            DistanceUnit::Meters => "meters",
            DistanceUnit::Kilometers => "kilometers",
            DistanceUnit::Unknown(_) => "???",
        }
    }
}

// One hotel/room-block pairing, normalised for display and matching
#[derive(Debug, Clone, PartialEq)]
pub struct HotelRecord {
    pub name: String,
    pub distance: f64,
    pub unit: DistanceUnit,
    // Joined to the venue by a skywalk; overrides the numeric distance
    pub connected: bool,
    // Sum of every inventory line's rate in the block, before taxes and fees
    pub total_rate: f64,
    // Smallest availability across the block's inventory lines
    pub available_rooms: u32,
    pub room_type: String,
}

impl HotelRecord {
    pub fn measured_distance(&self) -> String {
        format!("{:.1} {}", self.distance, self.unit.label())
    }

    pub fn distance_label(&self) -> String {
        if self.connected {
            "Skywalk".to_string()
        } else {
            self.measured_distance()
        }
    }

    // Whole-currency price as shown to the operator
    pub fn price(&self) -> i64 {
        self.total_rate.trunc() as i64
    }
}

impl fmt::Display for HotelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let price = format!("${}", self.price());
        write!(
            f,
            "{:<15} {:<10} {:<80} ({}) {}",
            self.distance_label(),
            price,
            self.name,
            self.available_rooms,
            self.room_type
        )
    }
}

// The message map is usually a string but has been seen as an object
fn mentions(value: &Value, marker: &str) -> bool {
    match value {
        Value::String(text) => text.contains(marker),
        Value::Array(items) => items.iter().any(|item| mentions(item, marker)),
        Value::Object(map) => map
            .iter()
            .any(|(key, item)| key.contains(marker) || mentions(item, marker)),
        _ => false,
    }
}

struct HotelBlocks {
    name: String,
    distance: f64,
    unit: DistanceUnit,
    connected: bool,
    blocks: std::vec::IntoIter<PasskeyBlock>,
}

impl HotelBlocks {
    fn new(hotel: PasskeyHotel, marker: &str) -> Self {
        let connected = hotel
            .message_map
            .as_ref()
            .is_some_and(|message| mentions(message, marker));

        Self {
            name: decode_entities(&hotel.name),
            distance: hotel.distance_from_event.unwrap_or_default(),
            unit: DistanceUnit::from(hotel.distance_unit.unwrap_or_default()),
            connected,
            blocks: hotel.blocks.into_iter(),
        }
    }

    fn normalize(&self, block: PasskeyBlock) -> Option<HotelRecord> {
        let available = block
            .inventory
            .iter()
            .map(|line| line.available)
            .min()
            .unwrap_or(0);
        if available <= 0 {
            return None;
        }

        Some(HotelRecord {
            name: self.name.clone(),
            distance: self.distance,
            unit: self.unit,
            connected: self.connected,
            total_rate: block.inventory.iter().map(|line| line.rate).sum(),
            available_rooms: u32::try_from(available).unwrap_or(u32::MAX),
            room_type: decode_entities(&block.name),
        })
    }
}

// Lazily walks hotel/block pairs in the order the site listed them, skipping
// blocks with nothing available. Consumed once.
pub struct HotelRecords {
    hotels: std::vec::IntoIter<PasskeyHotel>,
    current: Option<HotelBlocks>,
    marker: String,
}

impl HotelRecords {
    pub fn new(hotels: Vec<PasskeyHotel>, connected_marker: &str) -> Self {
        Self {
            hotels: hotels.into_iter(),
            current: None,
            marker: connected_marker.to_string(),
        }
    }
}

impl Iterator for HotelRecords {
    type Item = HotelRecord;

    fn next(&mut self) -> Option<HotelRecord> {
        loop {
            if let Some(hotel) = self.current.as_mut() {
                while let Some(block) = hotel.blocks.next() {
                    if let Some(record) = hotel.normalize(block) {
                        return Some(record);
                    }
                }
                self.current = None;
            }

            let hotel = self.hotels.next()?;
            self.current = Some(HotelBlocks::new(hotel, &self.marker));
        }
    }
}

pub struct ResultParser {
    list_url: String,
    extractor: Box<dyn PayloadExtractor>,
    connected_marker: String,
}

impl ResultParser {
    pub fn new(event: &EventConfig) -> Self {
        Self::with_extractor(
            event,
            Box::new(ScriptElementExtractor::new(&event.results_element_id)),
        )
    }

    pub fn with_extractor(event: &EventConfig, extractor: Box<dyn PayloadExtractor>) -> Self {
        Self {
            list_url: event.hotel_list_url(),
            extractor,
            connected_marker: event.connected_marker.clone(),
        }
    }

    pub fn parse(&self, markup: &str) -> Result<HotelRecords, WatchError> {
        let payload = self
            .extractor
            .extract(markup)
            .ok_or(WatchError::ResultsNotFound)?;
        let hotels: Vec<PasskeyHotel> = serde_json::from_str(&payload)
            .map_err(|e| WatchError::decode("search results", e))?;
        Ok(HotelRecords::new(hotels, &self.connected_marker))
    }

    pub async fn fetch_and_parse(
        &self,
        http: &dyn HttpSession,
    ) -> Result<HotelRecords, WatchError> {
        let markup = http.send("List", HttpRequest::get(&self.list_url)).await?;
        self.parse(&markup)
    }
}
