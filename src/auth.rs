// Authentication strategies
// Chosen once from the credential's shape; the search and parsing code only
// ever sees `dyn AuthStrategy`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::{Credential, EventConfig};
use crate::error::WatchError;
use crate::http::{HttpRequest, HttpSession};
use crate::search::RoomBlock;

#[async_trait]
pub trait AuthStrategy: Send + Sync {
    // Called once per poll cycle, before the search is submitted
    async fn prepare_for_search(&mut self, http: &dyn HttpSession) -> Result<(), WatchError>;

    // Encodes the search the way this strategy's endpoint expects it
    fn search_request(&self, block: &RoomBlock) -> HttpRequest;
}

pub fn strategy_for(credential: &Credential, event: &EventConfig) -> Box<dyn AuthStrategy> {
    match credential {
        Credential::RegistrationKey { group_id, token } => {
            Box::new(NewReservation::new(event, group_id, token))
        }
        Credential::ExistingBooking {
            ack_number,
            surname,
        } => Box::new(ExistingBooking::new(event, ack_number, surname)),
    }
}

// Attendee without a booking: the registration link alone opens a session.
// Nothing is kept between cycles, so every cycle repeats the same GET.
pub struct NewReservation {
    session_url: String,
    search_url: String,
}

impl NewReservation {
    pub fn new(event: &EventConfig, group_id: &str, token: &str) -> Self {
        Self {
            session_url: event.registration_url(group_id, token),
            search_url: event.rooms_select_url(),
        }
    }
}

#[async_trait]
impl AuthStrategy for NewReservation {
    async fn prepare_for_search(&mut self, http: &dyn HttpSession) -> Result<(), WatchError> {
        http.send("Session request", HttpRequest::get(&self.session_url))
            .await?;
        Ok(())
    }

    fn search_request(&self, block: &RoomBlock) -> HttpRequest {
        HttpRequest::PostForm {
            url: self.search_url.clone(),
            fields: block.form_fields(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReservationLookup {
    #[serde(rename = "ackNum", default)]
    ack_number: Option<Value>,
    #[serde(default)]
    hash: Option<Value>,
}

// The site is inconsistent about quoting numeric fields
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Attendee who already holds a booking. The reservation hash is stable for a
// booking, so it is looked up once per process and reused afterwards.
pub struct ExistingBooking {
    event: EventConfig,
    ack_number: String,
    surname: String,
    hash: Option<String>,
}

impl ExistingBooking {
    pub fn new(event: &EventConfig, ack_number: &str, surname: &str) -> Self {
        Self {
            event: event.clone(),
            ack_number: ack_number.to_string(),
            surname: surname.to_string(),
            hash: None,
        }
    }

    pub fn cached_hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    async fn lookup_hash(&self, http: &dyn HttpSession) -> Result<String, WatchError> {
        http.send("Session request", HttpRequest::get(self.event.home_url()))
            .await?;

        let request = HttpRequest::PostJson {
            url: self.event.find_reservation_url(),
            body: serde_json::json!({
                "ackNum": self.ack_number,
                "lastName": self.surname,
            }),
        };
        let body = http.send("Finding reservation", request).await?;

        let lookup: ReservationLookup =
            serde_json::from_str(&body).map_err(|e| WatchError::decode("reservation", e))?;

        let found = lookup.ack_number.as_ref().and_then(value_text);
        if found.as_deref() != Some(self.ack_number.as_str()) {
            return Err(WatchError::ReservationNotFound);
        }

        lookup
            .hash
            .as_ref()
            .and_then(value_text)
            .ok_or(WatchError::HashMissing)
    }
}

#[async_trait]
impl AuthStrategy for ExistingBooking {
    async fn prepare_for_search(&mut self, http: &dyn HttpSession) -> Result<(), WatchError> {
        let hash = match self.hash.clone() {
            Some(hash) => hash,
            None => {
                let hash = self.lookup_hash(http).await?;
                tracing::info!(ack_number = %self.ack_number, "reservation found");
                self.hash = Some(hash.clone());
                hash
            }
        };

        let reload = self.event.reload_reservation_url(&self.ack_number, &hash);
        http.send("Loading existing reservation", HttpRequest::get(reload))
            .await?;
        Ok(())
    }

    fn search_request(&self, block: &RoomBlock) -> HttpRequest {
        HttpRequest::PostJson {
            url: self.event.rooms_search_url(),
            body: block.json_body(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock_session::MockSession;
    use tokio_test::{assert_err, assert_ok};

    const ACK: &str = "987654321";

    fn existing_site(event: &EventConfig, lookup: &str) -> MockSession {
        let session = MockSession::new();
        session
            .respond(&event.home_url(), "<html></html>")
            .respond(&event.find_reservation_url(), lookup)
            .respond(&event.reload_reservation_url(ACK, "h4sh"), "<html></html>");
        session
    }

    #[tokio::test]
    async fn test_new_reservation_repeats_session_request() {
        let event = EventConfig::default();
        let session_url = event.registration_url("ABCD1234-WXYZ", "0a1b");
        let session = MockSession::new();
        session.respond(&session_url, "ok");

        let mut strategy = NewReservation::new(&event, "ABCD1234-WXYZ", "0a1b");
        assert_ok!(strategy.prepare_for_search(&session).await);
        assert_ok!(strategy.prepare_for_search(&session).await);

        assert_eq!(session.urls(), vec![session_url.clone(), session_url]);
        assert_eq!(session.requests()[0].0, "Session request");
    }

    #[tokio::test]
    async fn test_existing_booking_first_call_looks_up_hash() {
        let event = EventConfig::default();
        let session = existing_site(&event, r#"{"ackNum": "987654321", "hash": "h4sh"}"#);

        let mut strategy = ExistingBooking::new(&event, ACK, "Smith");
        assert_ok!(strategy.prepare_for_search(&session).await);

        assert_eq!(strategy.cached_hash(), Some("h4sh"));
        assert_eq!(
            session.urls(),
            vec![
                event.home_url(),
                event.find_reservation_url(),
                event.reload_reservation_url(ACK, "h4sh"),
            ]
        );

        match &session.requests()[1].1 {
            HttpRequest::PostJson { body, .. } => {
                assert_eq!(body["ackNum"], ACK);
                assert_eq!(body["lastName"], "Smith");
            }
            other => panic!("expected JSON lookup, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_existing_booking_reuses_cached_hash() {
        let event = EventConfig::default();
        let session = existing_site(&event, r#"{"ackNum": "987654321", "hash": "h4sh"}"#);

        let mut strategy = ExistingBooking::new(&event, ACK, "Smith");
        for _ in 0..3 {
            assert_ok!(strategy.prepare_for_search(&session).await);
        }

        assert_eq!(session.count(&event.find_reservation_url()), 1);
        assert_eq!(session.count(&event.home_url()), 1);
        assert_eq!(session.count(&event.reload_reservation_url(ACK, "h4sh")), 3);
    }

    #[tokio::test]
    async fn test_numeric_ack_number_is_accepted() {
        let event = EventConfig::default();
        let session = existing_site(&event, r#"{"ackNum": 987654321, "hash": "h4sh"}"#);

        let mut strategy = ExistingBooking::new(&event, ACK, "Smith");
        assert_ok!(strategy.prepare_for_search(&session).await);
    }

    #[tokio::test]
    async fn test_mismatched_ack_number() {
        let event = EventConfig::default();
        let session = existing_site(&event, r#"{"ackNum": "111111111", "hash": "h4sh"}"#);

        let mut strategy = ExistingBooking::new(&event, ACK, "Smith");
        let err = assert_err!(strategy.prepare_for_search(&session).await);
        assert!(matches!(err, WatchError::ReservationNotFound));
        assert_eq!(strategy.cached_hash(), None);
    }

    #[tokio::test]
    async fn test_missing_hash() {
        let event = EventConfig::default();
        let session = existing_site(&event, r#"{"ackNum": "987654321"}"#);

        let mut strategy = ExistingBooking::new(&event, ACK, "Smith");
        let err = assert_err!(strategy.prepare_for_search(&session).await);
        assert!(matches!(err, WatchError::HashMissing));
    }

    #[tokio::test]
    async fn test_malformed_lookup_response() {
        let event = EventConfig::default();
        let session = existing_site(&event, "<html>Sorry</html>");

        let mut strategy = ExistingBooking::new(&event, ACK, "Smith");
        let err = assert_err!(strategy.prepare_for_search(&session).await);
        assert!(matches!(err, WatchError::DecodeFailure { .. }));
    }

    #[tokio::test]
    async fn test_failed_lookup_is_retried_next_cycle() {
        let event = EventConfig::default();
        let session = existing_site(&event, r#"{"ackNum": "111111111"}"#);

        let mut strategy = ExistingBooking::new(&event, ACK, "Smith");
        assert_err!(strategy.prepare_for_search(&session).await);

        session.respond(
            &event.find_reservation_url(),
            r#"{"ackNum": "987654321", "hash": "h4sh"}"#,
        );
        assert_ok!(strategy.prepare_for_search(&session).await);
        assert_eq!(session.count(&event.find_reservation_url()), 2);
    }

    #[test]
    fn test_strategy_for_credential() {
        let event = EventConfig::default();
        let block = RoomBlock {
            block_id: 0,
            check_in: "2020-07-29".to_string(),
            check_out: "2020-08-02".to_string(),
            number_of_guests: 1,
            number_of_rooms: 1,
            number_of_children: 0,
        };

        let new = strategy_for(
            &Credential::from_key_pair("ABCD1234-WXYZ", "0a1b"),
            &event,
        );
        assert_eq!(new.search_request(&block).url(), event.rooms_select_url());

        let existing = strategy_for(&Credential::from_key_pair(ACK, "Smith"), &event);
        assert_eq!(
            existing.search_request(&block).url(),
            event.rooms_search_url()
        );
    }
}
