use std::ops::RangeInclusive;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Random delay window applied between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    pub min: Duration,
    pub max: Duration,
}

impl Jitter {
    pub const LISTING: Jitter = Jitter::from_millis(1_000, 2_000);
    pub const BOOK: Jitter = Jitter::from_millis(2_000, 4_000);

    pub const fn from_millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    #[cfg(test)]
    pub const fn none() -> Self {
        Self::from_millis(0, 0)
    }
}

/// Everything random the crawl does: which listing page to visit, link order,
/// and how long to wait.
pub trait Randomness {
    fn page_index(&mut self, range: RangeInclusive<u32>) -> u32;
    fn shuffle(&mut self, links: &mut [String]);
    fn jitter(&mut self, window: Jitter) -> Duration;
}

pub struct RngSource<R = StdRng> {
    rng: R,
}

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> Randomness for RngSource<R> {
    fn page_index(&mut self, range: RangeInclusive<u32>) -> u32 {
        if range.is_empty() {
            return *range.start();
        }
        self.rng.gen_range(range)
    }

    fn shuffle(&mut self, links: &mut [String]) {
        links.shuffle(&mut self.rng);
    }

    fn jitter(&mut self, window: Jitter) -> Duration {
        let (lo, hi) = (window.min.as_millis() as u64, window.max.as_millis() as u64);
        if hi <= lo {
            return window.min;
        }
        Duration::from_millis(self.rng.gen_range(lo..=hi))
    }
}

pub async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Replays a fixed page sequence, rotates links by a fixed step, never waits.
#[cfg(test)]
pub struct ScriptedRng {
    pages: Vec<u32>,
    step: usize,
    picks: usize,
    shuffles: usize,
}

#[cfg(test)]
impl ScriptedRng {
    pub fn new(pages: Vec<u32>) -> Self {
        Self {
            pages,
            step: 0,
            picks: 0,
            shuffles: 0,
        }
    }

    pub fn rotating(mut self, step: usize) -> Self {
        self.step = step;
        self
    }
}

#[cfg(test)]
impl Randomness for ScriptedRng {
    fn page_index(&mut self, range: RangeInclusive<u32>) -> u32 {
        let page = self.pages[self.picks % self.pages.len()];
        self.picks += 1;
        page.clamp(*range.start(), *range.end())
    }

    fn shuffle(&mut self, links: &mut [String]) {
        if !links.is_empty() {
            links.rotate_left((self.shuffles * self.step) % links.len());
        }
        self.shuffles += 1;
    }

    fn jitter(&mut self, _window: Jitter) -> Duration {
        Duration::ZERO
    }
}
