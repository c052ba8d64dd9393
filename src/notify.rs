// Outbound notification channels
// Each channel takes one alert target (a link to the listing) and fires once.
// A failing channel never stops the others from being tried.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};

use crate::config::NotifierSettings;
use crate::error::{ConfigError, WatchError};

pub const ALERT_TITLE: &str = "Hotel Block Notification";
pub const PUSHBULLET_ENDPOINT: &str = "https://api.pushbullet.com/v2/pushes";

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, target: &str) -> Result<(), WatchError>;
}

async fn post_json(
    label: &str,
    request: reqwest::RequestBuilder,
    payload: &Value,
) -> Result<(), WatchError> {
    let response = request
        .json(payload)
        .send()
        .await
        .map_err(|e| WatchError::request(label, e))?;

    // Discord answers 204, Pushbullet 200
    if !response.status().is_success() {
        return Err(WatchError::request(label, response.status().as_u16()));
    }
    Ok(())
}

pub struct PushbulletNotifier {
    client: reqwest::Client,
    access_token: String,
    endpoint: String,
}

impl PushbulletNotifier {
    pub fn new(client: reqwest::Client, access_token: &str) -> Self {
        Self {
            client,
            access_token: access_token.to_string(),
            endpoint: PUSHBULLET_ENDPOINT.to_string(),
        }
    }

    pub fn payload(target: &str) -> Value {
        json!({
            "type": "link",
            "title": ALERT_TITLE,
            "url": target,
        })
    }
}

#[async_trait]
impl Notifier for PushbulletNotifier {
    fn name(&self) -> &str {
        "Pushbullet"
    }

    async fn notify(&self, target: &str) -> Result<(), WatchError> {
        let request = self
            .client
            .post(&self.endpoint)
            .header("Access-Token", &self.access_token);
        post_json("Pushbullet notification", request, &Self::payload(target)).await
    }
}

pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(client: reqwest::Client, webhook_url: &str) -> Self {
        Self {
            client,
            webhook_url: webhook_url.to_string(),
        }
    }

    pub fn payload(target: &str) -> Value {
        json!({ "content": format!("{}: {}", ALERT_TITLE, target) })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "Discord"
    }

    async fn notify(&self, target: &str) -> Result<(), WatchError> {
        let request = self.client.post(&self.webhook_url);
        post_json("Discord notification", request, &Self::payload(target)).await
    }
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub channel: String,
    pub result: Result<(), WatchError>,
}

#[derive(Default)]
pub struct NotifierSet {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    // Builds one channel per configured secret
    pub fn from_settings(settings: &NotifierSettings) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(token) = &settings.pushbullet_token {
            notifiers.push(Box::new(PushbulletNotifier::new(client.clone(), token)));
        }
        if let Some(webhook) = &settings.discord_webhook {
            notifiers.push(Box::new(DiscordNotifier::new(client, webhook)));
        }
        Ok(Self::new(notifiers))
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    // Fires every channel together and reports each outcome
    pub async fn dispatch(&self, target: &str) -> Vec<DispatchOutcome> {
        let sends = self.notifiers.iter().map(|notifier| async move {
            let result = notifier.notify(target).await;
            if let Err(e) = &result {
                tracing::warn!(channel = notifier.name(), error = %e, "notification failed");
            }
            DispatchOutcome {
                channel: notifier.name().to_string(),
                result,
            }
        });
        join_all(sends).await
    }

    // Test-notification mode: fire every channel once and report each result
    pub async fn send_test_alerts(&self, target: &str) -> Vec<DispatchOutcome> {
        if self.is_empty() {
            println!("No notification channels configured");
            return Vec::new();
        }

        println!("Testing alerts: {}", self.channel_names().join(", "));
        let outcomes = self.dispatch(target).await;
        for outcome in &outcomes {
            match &outcome.result {
                Ok(()) => println!("{}: sent", outcome.channel),
                Err(e) => println!("{}: {}", outcome.channel, e),
            }
        }
        println!("Done");
        outcomes
    }
}


#[cfg(test)]
mod tests {
    use super::recording::RecordingNotifier;
    use super::*;
    use crate::http::local_server;

    #[test]
    fn test_pushbullet_payload() {
        let payload = PushbulletNotifier::payload("https://example.test/list/hotels");
        assert_eq!(payload["type"], "link");
        assert_eq!(payload["title"], ALERT_TITLE);
        assert_eq!(payload["url"], "https://example.test/list/hotels");
    }

    #[test]
    fn test_discord_payload() {
        let payload = DiscordNotifier::payload("https://example.test/list/hotels");
        assert_eq!(
            payload["content"],
            "Hotel Block Notification: https://example.test/list/hotels"
        );
    }

    #[test]
    fn test_from_settings_builds_configured_channels() {
        let none = NotifierSet::from_settings(&NotifierSettings::default()).unwrap();
        assert!(none.is_empty());

        let both = NotifierSet::from_settings(&NotifierSettings {
            pushbullet_token: Some("o.abc".to_string()),
            discord_webhook: Some("https://discord.test/api/webhooks/1/x".to_string()),
        })
        .unwrap();
        assert_eq!(both.len(), 2);
        assert_eq!(both.channel_names(), vec!["Pushbullet", "Discord"]);
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_the_other() {
        let failing = RecordingNotifier::failing();
        let healthy = RecordingNotifier::default();
        let set = NotifierSet::new(vec![Box::new(failing.clone()), Box::new(healthy.clone())]);

        let outcomes = set.dispatch("https://example.test/list").await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_err());
        assert!(outcomes[1].result.is_ok());
        assert_eq!(failing.sent(), vec!["https://example.test/list"]);
        assert_eq!(healthy.sent(), vec!["https://example.test/list"]);
    }

    #[tokio::test]
    async fn test_send_test_alerts_reports_each_channel() {
        let failing = RecordingNotifier::failing();
        let healthy = RecordingNotifier::default();
        let set = NotifierSet::new(vec![Box::new(healthy.clone()), Box::new(failing)]);

        let outcomes = set.send_test_alerts("https://example.test/list").await;

        let channels: Vec<&str> = outcomes.iter().map(|o| o.channel.as_str()).collect();
        assert_eq!(channels, vec!["Recording", "Failing"]);
        assert!(outcomes[1].result.is_err());
        assert_eq!(healthy.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_pushbullet_rejection_is_a_failure() {
        let (base, server) = local_server::serve(vec![local_server::response(
            "401 Unauthorized",
            &["Content-Type: application/json"],
            r#"{"error":{"code":"invalid_access_token"}}"#,
        )])
        .await;
        let mut notifier = PushbulletNotifier::new(reqwest::Client::new(), "o.abc");
        notifier.endpoint = format!("{}/v2/pushes", base);

        let err = notifier.notify("https://example.test/list").await.unwrap_err();
        assert_eq!(err.to_string(), "Pushbullet notification failed: 401");

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("POST /v2/pushes "));
        assert!(local_server::has_header(&heads[0], "access-token", "o.abc"));
    }

    #[tokio::test]
    async fn test_discord_accepts_no_content() {
        let (base, server) =
            local_server::serve(vec![local_server::response("204 No Content", &[], "")]).await;
        let webhook = format!("{}/api/webhooks/1/x", base);
        let notifier = DiscordNotifier::new(reqwest::Client::new(), &webhook);

        assert!(notifier.notify("https://example.test/list").await.is_ok());

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("POST /api/webhooks/1/x "));
        assert!(local_server::has_header(&heads[0], "content-type", "application/json"));
    }

    #[tokio::test]
    async fn test_discord_server_error_is_a_failure() {
        let (base, _server) = local_server::serve(vec![local_server::response(
            "500 Internal Server Error",
            &[],
            "oops",
        )])
        .await;
        let notifier = DiscordNotifier::new(reqwest::Client::new(), &format!("{}/hook", base));

        let err = notifier.notify("https://example.test/list").await.unwrap_err();
        assert!(matches!(
            err,
            WatchError::RequestFailure { ref label, .. } if label == "Discord notification"
        ));
    }

    #[tokio::test]
    async fn test_dispatch_without_channels() {
        let outcomes = NotifierSet::default().dispatch("https://example.test").await;
        assert!(outcomes.is_empty());
    }
}
