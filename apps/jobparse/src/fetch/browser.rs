//! Browser automation collaborator.
//!
//! The fetch adapter only needs `navigate`, the rendered `<body>` markup and
//! `close`. `WebDriverLauncher` provides them by speaking the W3C WebDriver
//! protocol (chromedriver, geckodriver, Selenium Grid) over plain HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::PipelineError;

/// W3C element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Creates browser sessions. Shared across requests.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, PipelineError>;
}

/// One live browser session, used by a single fetch.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), PipelineError>;

    /// Serialized outer markup of the rendered `<body>` element.
    async fn rendered_body(&mut self) -> Result<String, PipelineError>;

    async fn close(&mut self) -> Result<(), PipelineError>;
}

/// Launches headless Chrome sessions through a WebDriver server.
#[derive(Clone)]
pub struct WebDriverLauncher {
    client: Client,
    base_url: String,
}

impl WebDriverLauncher {
    pub fn new(base_url: &str) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, PipelineError> {
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": ["--headless=new", "--no-sandbox", "--disable-dev-shm-usage"]
                    }
                }
            }
        });

        let value = send_command(
            &self.client,
            Method::POST,
            &format!("{}/session", self.base_url),
            Some(&capabilities),
        )
        .await
        .map_err(|e| PipelineError::Fetch(format!("Failed to create browser session: {e}")))?;

        let created: NewSessionValue = serde_json::from_value(value).map_err(|e| {
            PipelineError::Fetch(format!("WebDriver returned an unexpected session: {e}"))
        })?;
        debug!("WebDriver session {} created", created.session_id);

        Ok(Box::new(WebDriverSession {
            client: self.client.clone(),
            session_url: format!("{}/session/{}", self.base_url, created.session_id),
            closed: false,
        }))
    }
}

pub struct WebDriverSession {
    client: Client,
    session_url: String,
    closed: bool,
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), PipelineError> {
        send_command(
            &self.client,
            Method::POST,
            &format!("{}/url", self.session_url),
            Some(&json!({ "url": url })),
        )
        .await
        .map(|_| ())
        .map_err(|e| PipelineError::Fetch(format!("Failed to load {url}: {e}")))
    }

    async fn rendered_body(&mut self) -> Result<String, PipelineError> {
        let found = send_command(
            &self.client,
            Method::POST,
            &format!("{}/element", self.session_url),
            Some(&json!({ "using": "tag name", "value": "body" })),
        )
        .await
        .map_err(|e| PipelineError::Fetch(format!("Page has no body element: {e}")))?;

        let element_id = element_id(&found)
            .ok_or_else(|| PipelineError::Fetch("WebDriver returned no element id".to_string()))?;

        let markup = send_command(
            &self.client,
            Method::GET,
            &format!("{}/element/{}/property/outerHTML", self.session_url, element_id),
            None,
        )
        .await
        .map_err(|e| PipelineError::Fetch(format!("Failed to read page body: {e}")))?;

        markup
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Fetch("Body markup was not a string".to_string()))
    }

    async fn close(&mut self) -> Result<(), PipelineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        send_command(&self.client, Method::DELETE, &self.session_url, None)
            .await
            .map(|_| ())
            .map_err(|e| PipelineError::Fetch(format!("Failed to close browser session: {e}")))
    }
}

/// Sends one WebDriver command and unwraps the `value` member of the reply.
async fn send_command(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<&Value>,
) -> Result<Value, String> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(body);
    }

    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    let payload: Value = response.json().await.map_err(|e| e.to_string())?;

    if !status.is_success() {
        return Err(format!("status {}: {}", status.as_u16(), error_message(&payload)));
    }

    Ok(payload.get("value").cloned().unwrap_or(Value::Null))
}

fn element_id(value: &Value) -> Option<&str> {
    value.get(ELEMENT_KEY).and_then(Value::as_str)
}

/// WebDriver errors arrive as `{"value": {"error": ..., "message": ...}}`.
fn error_message(payload: &Value) -> String {
    let value = payload.get("value").unwrap_or(payload);
    match (
        value.get("error").and_then(Value::as_str),
        value.get("message").and_then(Value::as_str),
    ) {
        (Some(error), Some(message)) => format!("{error}: {message}"),
        (Some(error), None) => error.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) => payload.to_string(),
    }
}
