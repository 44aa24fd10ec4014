use crate::client::{Fetch, FetchError};
use crate::events::{CrawlEvent, Observer};
use crate::pacing::{pause, Jitter, Randomness};
use crate::parser::fields::{FieldExtractor, LabelExtractor};
use crate::parser::{PageError, RecordBuilder};
use crate::record::BookRecord;
use crate::sampler::UrlSampler;

/// Why one detail page was skipped.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Page(#[from] PageError),
}

/// Run-level failures. Everything per-item is logged and skipped instead.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("no detail urls sampled (wanted {target})")]
    NoUrls { target: usize },

    #[error("all {attempted} detail pages failed")]
    NoRecords { attempted: usize },
}

/// Visits detail pages one after another and builds a record for each.
pub struct CrawlOrchestrator<'a, F, E = LabelExtractor> {
    fetcher: &'a F,
    builder: RecordBuilder<E>,
    delay: Jitter,
}

impl<'a, F: Fetch> CrawlOrchestrator<'a, F> {
    pub fn new(fetcher: &'a F, delay: Jitter) -> Self {
        Self::with_builder(fetcher, RecordBuilder::default(), delay)
    }
}

impl<'a, F: Fetch, E: FieldExtractor> CrawlOrchestrator<'a, F, E> {
    pub fn with_builder(fetcher: &'a F, builder: RecordBuilder<E>, delay: Jitter) -> Self {
        Self {
            fetcher,
            builder,
            delay,
        }
    }

    /// Records for every URL that could be fetched and parsed, in input order.
    /// Sleeps after each item, the last one included.
    pub async fn run<R, O>(&self, urls: &[String], rng: &mut R, observer: &mut O) -> Vec<BookRecord>
    where
        R: Randomness,
        O: Observer,
    {
        let mut records = Vec::with_capacity(urls.len());

        for (index, url) in urls.iter().enumerate() {
            observer.notify(CrawlEvent::BookStarted {
                index,
                total: urls.len(),
                url: url.clone(),
            });

            match self.harvest_one(url).await {
                Ok(record) => {
                    observer.notify(CrawlEvent::BookHarvested {
                        url: url.clone(),
                        title: record.title.clone(),
                    });
                    records.push(record);
                }
                Err(e) => {
                    observer.notify(CrawlEvent::BookSkipped {
                        url: url.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            pause(rng.jitter(self.delay)).await;
        }

        records
    }

    pub async fn harvest_one(&self, url: &str) -> Result<BookRecord, BookError> {
        let html = self.fetcher.fetch(url).await?;
        Ok(self.builder.build(url, &html)?)
    }
}

/// Sample `target` detail URLs, then crawl them.
pub async fn harvest<F, E, R, O>(
    sampler: &UrlSampler<'_, F>,
    crawler: &CrawlOrchestrator<'_, F, E>,
    target: usize,
    rng: &mut R,
    observer: &mut O,
) -> Result<Vec<BookRecord>, HarvestError>
where
    F: Fetch,
    E: FieldExtractor,
    R: Randomness,
    O: Observer,
{
    let urls = sampler.sample(target, rng, observer).await;
    if urls.is_empty() {
        return Err(HarvestError::NoUrls { target });
    }

    let records = crawler.run(&urls, rng, observer).await;
    if records.is_empty() {
        return Err(HarvestError::NoRecords {
            attempted: urls.len(),
        });
    }
    Ok(records)
}
