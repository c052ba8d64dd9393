// HTTP session client for the booking site
// One cookie jar lives for the whole process; the site tracks the in-progress
// search through it.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{ConfigError, WatchError};

const USER_AGENT: &str = concat!("hotel-block-watch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq)]
pub enum HttpRequest {
    Get {
        url: String,
    },
    PostForm {
        url: String,
        fields: Vec<(String, String)>,
    },
    PostJson {
        url: String,
        body: serde_json::Value,
    },
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        HttpRequest::Get { url: url.into() }
    }

    pub fn url(&self) -> &str {
        match self {
            HttpRequest::Get { url }
            | HttpRequest::PostForm { url, .. }
            | HttpRequest::PostJson { url, .. } => url,
        }
    }
}

// Anything that can carry a request to the booking site and hand back the
// body of a 200 response. `label` names the step for error messages.
#[async_trait]
pub trait HttpSession: Send + Sync {
    async fn send(&self, label: &str, request: HttpRequest) -> Result<String, WatchError>;
}

pub struct ReqwestSession {
    client: reqwest::Client,
}

impl ReqwestSession {
    pub fn new() -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpSession for ReqwestSession {
    async fn send(&self, label: &str, request: HttpRequest) -> Result<String, WatchError> {
        tracing::debug!(label, url = request.url(), "sending request");

        let builder = match &request {
            HttpRequest::Get { url } => self.client.get(url),
            HttpRequest::PostForm { url, fields } => self.client.post(url).form(fields),
            HttpRequest::PostJson { url, body } => self.client.post(url).json(body),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| WatchError::request(label, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WatchError::request(label, status.as_u16()));
        }

        response.text().await.map_err(|e| WatchError::request(label, e))
    }
}



#[cfg(test)]
mod tests {
    use super::mock_session::MockSession;
    use super::*;

    #[test]
    fn test_request_url() {
        let request = HttpRequest::PostForm {
            url: "https://example.test/rooms/select".to_string(),
            fields: vec![],
        };
        assert_eq!(request.url(), "https://example.test/rooms/select");
        assert_eq!(HttpRequest::get("a").url(), "a");
    }

    #[tokio::test]
    async fn test_mock_session_classifies_non_200() {
        let session = MockSession::new();
        session
            .respond("https://example.test/ok", "fine")
            .fail("https://example.test/broken", 503);

        let ok = session
            .send("Status check", HttpRequest::get("https://example.test/ok"))
            .await;
        assert_eq!(ok.unwrap(), "fine");

        let err = session
            .send("Status check", HttpRequest::get("https://example.test/broken"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Status check failed: 503");

        assert_eq!(session.requests().len(), 2);
    }

    #[test]
    fn test_reqwest_session_builds() {
        assert!(ReqwestSession::new().is_ok());
    }

    #[tokio::test]
    async fn test_reqwest_session_rejects_non_200_and_keeps_cookies() {
        let (base, server) = local_server::serve(vec![
            local_server::response(
                "503 Service Unavailable",
                &["Set-Cookie: JSESSIONID=abc123; Path=/"],
                "",
            ),
            local_server::response("200 OK", &[], "<html>rooms</html>"),
        ])
        .await;
        let session = ReqwestSession::new().unwrap();

        let err = session
            .send("Session request", HttpRequest::get(format!("{}/reg/x/y", base)))
            .await
            .unwrap_err();
        assert!(matches!(
            &err,
            WatchError::RequestFailure { label, reason }
                if label == "Session request" && reason == "503"
        ));

        let body = session
            .send("List", HttpRequest::get(format!("{}/list/hotels", base)))
            .await
            .unwrap();
        assert_eq!(body, "<html>rooms</html>");

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("GET /reg/x/y "));
        assert!(!heads[0].to_ascii_lowercase().contains("cookie:"));
        assert!(local_server::has_header(&heads[1], "cookie", "JSESSIONID=abc123"));
    }

    #[tokio::test]
    async fn test_reqwest_session_requires_exactly_200() {
        let (base, server) =
            local_server::serve(vec![local_server::response("201 Created", &[], "made")]).await;
        let session = ReqwestSession::new().unwrap();

        let request = HttpRequest::PostForm {
            url: format!("{}/rooms/select", base),
            fields: vec![("blockMap.blocks[0].blockId".to_string(), "0".to_string())],
        };
        let err = session.send("Search", request).await.unwrap_err();
        assert_eq!(err.to_string(), "Search failed: 201");

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("POST /rooms/select "));
        assert!(local_server::has_header(
            &heads[0],
            "content-type",
            "application/x-www-form-urlencoded"
        ));
    }
}
