pub mod engine;
pub mod playwright;

pub use engine::{BrowserEngine, BrowserPage, NavigationResponse};
pub use playwright::{PlaywrightEngine, PlaywrightSession};
