pub mod session;
pub mod static_page;
pub mod webdriver;

#[cfg(test)]
pub mod fake;

pub use session::{ElementPattern, RenderSession, await_readiness};
pub use static_page::{FetchedPage, StaticFetcher};
pub use webdriver::WebDriverSession;
