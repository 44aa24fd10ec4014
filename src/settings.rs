use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::pacing::Jitter;
use crate::sampler::SampleOptions;
use crate::site::{BROWSER_USER_AGENT, DEFAULT_BASE_URL, DEFAULT_LISTING_PAGES};

pub const ENV_PREFIX: &str = "ELIB";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub listing_pages: u32,
    pub per_listing: usize,
    pub attempt_factor: usize,
    pub listing_delay_min_ms: u64,
    pub listing_delay_max_ms: u64,
    pub book_delay_min_ms: u64,
    pub book_delay_max_ms: u64,
    pub db_path: PathBuf,
    pub json_path: PathBuf,
}

impl Settings {
    /// Built-in defaults overlaid with `ELIB_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    pub fn from_env(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("user_agent", BROWSER_USER_AGENT)?
            .set_default("timeout_secs", 30_i64)?
            .set_default("listing_pages", i64::from(DEFAULT_LISTING_PAGES))?
            .set_default("per_listing", 3_i64)?
            .set_default("attempt_factor", 3_i64)?
            .set_default("listing_delay_min_ms", Jitter::LISTING.min.as_millis() as i64)?
            .set_default("listing_delay_max_ms", Jitter::LISTING.max.as_millis() as i64)?
            .set_default("book_delay_min_ms", Jitter::BOOK.min.as_millis() as i64)?
            .set_default("book_delay_max_ms", Jitter::BOOK.max.as_millis() as i64)?
            .set_default("db_path", "data/books.sqlite")?
            .set_default("json_path", "data/books.json")?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn listing_delay(&self) -> Jitter {
        Jitter::from_millis(self.listing_delay_min_ms, self.listing_delay_max_ms)
    }

    pub fn book_delay(&self) -> Jitter {
        Jitter::from_millis(self.book_delay_min_ms, self.book_delay_max_ms)
    }

    pub fn sample_options(&self) -> SampleOptions {
        SampleOptions {
            listing_pages: self.listing_pages,
            per_listing: self.per_listing,
            attempt_factor: self.attempt_factor,
            delay: self.listing_delay(),
        }
    }
}
