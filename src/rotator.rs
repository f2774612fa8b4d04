use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::Result;
use crate::item::PracticeItem;
use crate::pool;

/// Walks a pool of practice items. Rotating sessions call `advance`,
/// browsing sessions call `prev`/`next`.
#[derive(Debug, Clone)]
pub struct ItemRotator {
    original: Vec<PracticeItem>,
    order: Vec<PracticeItem>,
    index: usize,
    cycle: usize,
    rng: StdRng,
}

impl ItemRotator {
    /// Keeps the pool's order
    pub fn new(items: Vec<PracticeItem>, rng: StdRng) -> Result<Self> {
        pool::validate(&items)?;
        Ok(Self {
            order: items.clone(),
            original: items,
            index: 0,
            cycle: 0,
            rng,
        })
    }

    /// Starts from a shuffled copy of the pool
    pub fn shuffled(items: Vec<PracticeItem>, rng: StdRng) -> Result<Self> {
        let mut rotator = Self::new(items, rng)?;
        rotator.reshuffle();
        Ok(rotator)
    }

    fn reshuffle(&mut self) {
        self.order = self.original.clone();
        self.order.shuffle(&mut self.rng);
    }

    pub fn current(&self) -> &PracticeItem {
        &self.order[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pool_len(&self) -> usize {
        self.order.len()
    }

    /// How many times the pool has been reshuffled
    pub fn cycle(&self) -> usize {
        self.cycle
    }

    pub fn items(&self) -> &[PracticeItem] {
        &self.order
    }

    /// Next item; once the pool runs out a reshuffled copy starts at index 0
    pub fn advance(&mut self) {
        if self.index + 1 < self.order.len() {
            self.index += 1;
            return;
        }
        self.reshuffle();
        self.index = 0;
        self.cycle += 1;
        debug!("pool exhausted, reshuffled (cycle {})", self.cycle);
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.index + 1 < self.order.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Back to the first item of a fresh cycle
    pub fn restart(&mut self, shuffle: bool) {
        if shuffle {
            self.reshuffle();
        } else {
            self.order = self.original.clone();
        }
        self.index = 0;
        self.cycle = 0;
    }
}
