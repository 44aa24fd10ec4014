use tracing::{debug, info, warn};

/// Progress reported by the sampler and the crawl loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    SampleStarted {
        target: usize,
        budget: usize,
    },
    ListingFetched {
        page: u32,
        url: String,
        links: usize,
        added: usize,
        collected: usize,
    },
    ListingFailed {
        page: u32,
        url: String,
        error: String,
    },
    SampleFinished {
        collected: usize,
        attempts: usize,
    },
    /// Attempt budget ran out before the target was reached.
    SampleShort {
        target: usize,
        collected: usize,
    },
    BookStarted {
        index: usize,
        total: usize,
        url: String,
    },
    BookHarvested {
        url: String,
        title: Option<String>,
    },
    BookSkipped {
        url: String,
        reason: String,
    },
}

pub trait Observer {
    fn notify(&mut self, event: CrawlEvent);
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn notify(&mut self, event: CrawlEvent) {
        (**self).notify(event)
    }
}

/// Collects events in order.
impl Observer for Vec<CrawlEvent> {
    fn notify(&mut self, event: CrawlEvent) {
        self.push(event);
    }
}

/// Default sink: one log line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn notify(&mut self, event: CrawlEvent) {
        match event {
            CrawlEvent::SampleStarted { target, budget } => {
                info!(wanted = target, budget, "sampling detail urls");
            }
            CrawlEvent::ListingFetched { page, url, links, added, collected } => {
                debug!(page, %url, links, added, collected, "listing page sampled");
            }
            CrawlEvent::ListingFailed { page, url, error } => {
                warn!(page, %url, %error, "listing fetch failed");
            }
            CrawlEvent::SampleFinished { collected, attempts } => {
                info!(collected, attempts, "sampling finished");
            }
            CrawlEvent::SampleShort { target, collected } => {
                warn!(wanted = target, collected, "attempt budget exhausted before target");
            }
            CrawlEvent::BookStarted { index, total, url } => {
                info!("[{}/{}] {}", index + 1, total, url);
            }
            CrawlEvent::BookHarvested { url, title } => {
                debug!(%url, title = title.as_deref().unwrap_or("-"), "book harvested");
            }
            CrawlEvent::BookSkipped { url, reason } => {
                warn!(%url, %reason, "book skipped");
            }
        }
    }
}
