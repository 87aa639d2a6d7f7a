//! Browser page abstraction.
//!
//! The engine talks to the reservation site only through the [`Page`]
//! trait. Each booking run owns exactly one page, opened from a
//! [`PageFactory`] and closed when the run is closed.
//!
//! Two implementations exist:
//! - [`WebDriverPage`] drives a real browser over the WebDriver protocol
//! - [`MockPage`] is a scripted in-memory site used by tests

mod error;
mod locator;
mod mock;
mod webdriver;

use std::fmt;

use async_trait::async_trait;

pub use error::PageError;
pub use locator::Locator;
pub use mock::{MockElement, MockElementRef, MockPage, MockPageFactory, MockSite};
pub use webdriver::{WebDriverConfig, WebDriverFactory, WebDriverPage};

/// A live browser tab.
///
/// Every call is bounded by the backend's own command timeout. Query
/// methods never change page state.
#[async_trait]
pub trait Page: Send + Sync {
    /// Handle to an element on the current document.
    type Element: Clone + fmt::Debug + Send + Sync;

    /// All elements matching `locator` in the document.
    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element>, PageError>;

    /// All elements matching `locator` below `scope`.
    async fn find_all_within(
        &self,
        scope: &Self::Element,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>, PageError>;

    async fn is_visible(&self, element: &Self::Element) -> Result<bool, PageError>;

    /// Visible and enabled.
    async fn is_interactable(&self, element: &Self::Element) -> Result<bool, PageError>;

    async fn text(&self, element: &Self::Element) -> Result<String, PageError>;

    async fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, PageError>;

    async fn click(&self, element: &Self::Element) -> Result<(), PageError>;

    /// Replace the element's value with `value`.
    async fn fill(&self, element: &Self::Element, value: &str) -> Result<(), PageError>;

    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    async fn current_url(&self) -> Result<String, PageError>;

    /// Release the browser context. Closing twice is not an error.
    async fn close(&self) -> Result<(), PageError>;
}

/// Opens one isolated page per booking run.
#[async_trait]
pub trait PageFactory: Send + Sync + 'static {
    type Page: Page + 'static;

    async fn open(&self) -> Result<Self::Page, PageError>;
}
