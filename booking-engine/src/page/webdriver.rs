//! WebDriver-backed page using `fantoccini`.
//!
//! Locators are compiled to XPath. Every query first checks
//! `document.readyState` so that a page that is still loading surfaces as a
//! transient [`PageError::Loading`] rather than a definitive absence.

use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator as WdLocator};
use serde_json::json;
use tracing::debug;

use super::{Locator, Page, PageError, PageFactory};

/// Default WebDriver endpoint (chromedriver's default port).
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Configuration for connecting to a WebDriver server.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// WebDriver server URL.
    pub url: String,
    /// Run the browser without a window.
    pub headless: bool,
    /// Browser window size as `width,height`.
    pub window_size: String,
}

impl WebDriverConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: false,
            window_size: "1366,900".to_string(),
        }
    }
}

/// Opens one browser session per booking run.
#[derive(Debug, Clone)]
pub struct WebDriverFactory {
    config: WebDriverConfig,
}

impl WebDriverFactory {
    pub fn new(config: WebDriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PageFactory for WebDriverFactory {
    type Page = WebDriverPage;

    async fn open(&self) -> Result<WebDriverPage, PageError> {
        let mut args = vec![
            format!("--window-size={}", self.config.window_size),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--no-sandbox".to_string(),
        ];
        if self.config.headless {
            args.push("--headless=new".to_string());
        }

        let mut caps = serde_json::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": args, "excludeSwitches": ["enable-automation"] }),
        );

        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);
        let client = builder
            .connect(&self.config.url)
            .await
            .map_err(|e| PageError::Driver(format!("failed to start session: {e}")))?;

        debug!(url = %self.config.url, "opened WebDriver session");
        Ok(WebDriverPage { client })
    }
}

/// A browser tab driven over WebDriver.
#[derive(Debug, Clone)]
pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    async fn ensure_loaded(&self) -> Result<(), PageError> {
        let state = self
            .client
            .execute("return document.readyState", vec![])
            .await
            .map_err(map_cmd_error)?;
        match state.as_str() {
            Some("complete") => Ok(()),
            other => Err(PageError::Loading(format!(
                "readyState={}",
                other.unwrap_or("unknown")
            ))),
        }
    }
}

#[async_trait]
impl Page for WebDriverPage {
    type Element = Element;

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>, PageError> {
        self.ensure_loaded().await?;
        let xpath = locator.to_xpath(false);
        self.client
            .find_all(WdLocator::XPath(&xpath))
            .await
            .map_err(map_cmd_error)
    }

    async fn find_all_within(
        &self,
        scope: &Element,
        locator: &Locator,
    ) -> Result<Vec<Element>, PageError> {
        let xpath = locator.to_xpath(true);
        scope
            .find_all(WdLocator::XPath(&xpath))
            .await
            .map_err(map_cmd_error)
    }

    async fn is_visible(&self, element: &Element) -> Result<bool, PageError> {
        element.is_displayed().await.map_err(map_cmd_error)
    }

    async fn is_interactable(&self, element: &Element) -> Result<bool, PageError> {
        Ok(element.is_displayed().await.map_err(map_cmd_error)?
            && element.is_enabled().await.map_err(map_cmd_error)?)
    }

    async fn text(&self, element: &Element) -> Result<String, PageError> {
        element.text().await.map_err(map_cmd_error)
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, PageError> {
        element.attr(name).await.map_err(map_cmd_error)
    }

    async fn click(&self, element: &Element) -> Result<(), PageError> {
        element.click().await.map_err(map_cmd_error)
    }

    async fn fill(&self, element: &Element, value: &str) -> Result<(), PageError> {
        element.clear().await.map_err(map_cmd_error)?;
        element.send_keys(value).await.map_err(map_cmd_error)
    }

    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| PageError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn current_url(&self) -> Result<String, PageError> {
        self.client
            .current_url()
            .await
            .map(|url| url.to_string())
            .map_err(map_cmd_error)
    }

    async fn close(&self) -> Result<(), PageError> {
        match self.client.clone().close().await {
            Ok(()) => Ok(()),
            // Session already gone.
            Err(e) if e.to_string().contains("invalid session id") => Ok(()),
            Err(e) => Err(map_cmd_error(e)),
        }
    }
}

fn map_cmd_error(err: CmdError) -> PageError {
    if err.is_no_such_element() {
        return PageError::NoSuchElement(err.to_string());
    }
    let message = err.to_string();
    let lower = message.to_ascii_lowercase();
    if lower.contains("stale element") {
        PageError::Stale(message)
    } else if lower.contains("timeout") || lower.contains("timed out") {
        PageError::Timeout(message)
    } else if lower.contains("invalid session id") || lower.contains("no such window") {
        PageError::Closed
    } else {
        PageError::Driver(message)
    }
}
