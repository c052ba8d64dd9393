// Search submission
// The site models "submit a search" and "list the results" as separate calls;
// this module only does the first.

use crate::auth::AuthStrategy;
use crate::config::SearchCriteria;
use crate::error::WatchError;
use crate::http::HttpSession;

// The one room block we ever search. The site supports several per request
// but the watcher only needs block 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomBlock {
    pub block_id: u32,
    pub check_in: String,
    pub check_out: String,
    pub number_of_guests: u32,
    pub number_of_rooms: u32,
    pub number_of_children: u32,
}

impl From<&SearchCriteria> for RoomBlock {
    fn from(criteria: &SearchCriteria) -> Self {
        Self {
            block_id: 0,
            check_in: criteria.check_in().format("%Y-%m-%d").to_string(),
            check_out: criteria.check_out().format("%Y-%m-%d").to_string(),
            number_of_guests: criteria.guests(),
            number_of_rooms: criteria.rooms(),
            number_of_children: criteria.children(),
        }
    }
}

impl RoomBlock {
    // Form encoding used by the registration-key endpoint
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let prefix = format!("blockMap.blocks[{}]", self.block_id);
        vec![
            (format!("{}.blockId", prefix), self.block_id.to_string()),
            (format!("{}.checkIn", prefix), self.check_in.clone()),
            (format!("{}.checkOut", prefix), self.check_out.clone()),
            (
                format!("{}.numberOfGuests", prefix),
                self.number_of_guests.to_string(),
            ),
            (
                format!("{}.numberOfRooms", prefix),
                self.number_of_rooms.to_string(),
            ),
            (
                format!("{}.numberOfChildren", prefix),
                self.number_of_children.to_string(),
            ),
        ]
    }

    // JSON encoding used by the existing-reservation endpoint. Every value is
    // sent as a string, matching what the site's own page posts.
    pub fn json_body(&self) -> serde_json::Value {
        serde_json::json!({
            "blockMap": {
                "blocks": [{
                    "blockId": self.block_id.to_string(),
                    "checkIn": self.check_in,
                    "checkOut": self.check_out,
                    "numberOfGuests": self.number_of_guests.to_string(),
                    "numberOfRooms": self.number_of_rooms.to_string(),
                    "numberOfChildren": self.number_of_children.to_string(),
                }]
            }
        })
    }
}

// Posts the search in whatever shape the active strategy's endpoint expects.
// Returns once the site has answered 200.
pub async fn submit_search(
    http: &dyn HttpSession,
    strategy: &dyn AuthStrategy,
    criteria: &SearchCriteria,
) -> Result<(), WatchError> {
    let block = RoomBlock::from(criteria);
    let request = strategy.search_request(&block);
    http.send("Search", request).await?;
    Ok(())
}
