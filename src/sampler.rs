use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::client::Fetch;
use crate::events::{CrawlEvent, Observer};
use crate::pacing::{pause, Jitter, Randomness};
use crate::site::{Catalog, DEFAULT_LISTING_PAGES};

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOptions {
    /// Listing pages are drawn from 1..=listing_pages.
    pub listing_pages: u32,
    /// At most this many links are taken from one listing visit.
    pub per_listing: usize,
    /// Listing visits allowed per requested URL.
    pub attempt_factor: usize,
    pub delay: Jitter,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            listing_pages: DEFAULT_LISTING_PAGES,
            per_listing: 3,
            attempt_factor: 3,
            delay: Jitter::LISTING,
        }
    }
}

/// Gathers a spread of detail URLs by visiting random listing pages.
pub struct UrlSampler<'a, F> {
    fetcher: &'a F,
    catalog: &'a Catalog,
    opts: SampleOptions,
}

impl<'a, F: Fetch> UrlSampler<'a, F> {
    pub fn new(fetcher: &'a F, catalog: &'a Catalog, opts: SampleOptions) -> Self {
        Self {
            fetcher,
            catalog,
            opts,
        }
    }

    /// Up to `target` distinct detail URLs. Stops after `attempt_factor * target`
    /// listing visits whether or not they succeeded; a short result is not an error.
    pub async fn sample<R, O>(&self, target: usize, rng: &mut R, observer: &mut O) -> Vec<String>
    where
        R: Randomness,
        O: Observer,
    {
        let budget = target.saturating_mul(self.opts.attempt_factor);
        observer.notify(CrawlEvent::SampleStarted { target, budget });

        let mut urls: Vec<String> = Vec::with_capacity(target);
        let mut attempts = 0;

        while urls.len() < target && attempts < budget {
            attempts += 1;
            let page = rng.page_index(1..=self.opts.listing_pages.max(1));
            let url = self.catalog.listing_url(page);

            match self.fetcher.fetch(&url).await {
                Ok(html) => {
                    let mut links = detail_links(&html, self.catalog);
                    let found = links.len();
                    rng.shuffle(&mut links);

                    let take = found.min(target - urls.len()).min(self.opts.per_listing);
                    let mut added = 0;
                    for link in links.into_iter().take(take) {
                        if !urls.contains(&link) {
                            urls.push(link);
                            added += 1;
                        }
                    }
                    observer.notify(CrawlEvent::ListingFetched {
                        page,
                        url,
                        links: found,
                        added,
                        collected: urls.len(),
                    });
                }
                Err(e) => {
                    observer.notify(CrawlEvent::ListingFailed {
                        page,
                        url,
                        error: e.to_string(),
                    });
                }
            }

            if urls.len() < target && attempts < budget {
                pause(rng.jitter(self.opts.delay)).await;
            }
        }

        observer.notify(CrawlEvent::SampleFinished {
            collected: urls.len(),
            attempts,
        });
        if urls.len() < target {
            observer.notify(CrawlEvent::SampleShort {
                target,
                collected: urls.len(),
            });
        }
        urls
    }
}

/// Distinct absolute detail-page links on a listing page, in page order.
pub fn detail_links(html: &str, catalog: &Catalog) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut links: Vec<String> = Vec::new();
    for href in doc.select(&LINK_SEL).filter_map(|a| a.value().attr("href")) {
        if !catalog.is_detail_link(href) {
            continue;
        }
        if let Some(abs) = catalog.absolute(href) {
            if !links.contains(&abs) {
                links.push(abs);
            }
        }
    }
    links
}
