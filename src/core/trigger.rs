//! Crawl trigger state machine.
//!
//! `Idle → Crawling → Flushing → Idle`. The trigger is only enabled while
//! idle, so a second crawl cannot start against the same crawler while one
//! is still running or writing.

use std::sync::atomic::{AtomicU8, Ordering};

use super::error::CrawlError;

const IDLE: u8 = 0;
const CRAWLING: u8 = 1;
const FLUSHING: u8 = 2;

/// Phase of the crawl trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    Crawling,
    Flushing,
}

impl CrawlPhase {
    /// Status label shown on the trigger surface
    pub fn label(&self) -> &'static str {
        match self {
            CrawlPhase::Idle => "Intake:",
            CrawlPhase::Crawling => "Loading:",
            CrawlPhase::Flushing => "Writing:",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            CRAWLING => CrawlPhase::Crawling,
            FLUSHING => CrawlPhase::Flushing,
            _ => CrawlPhase::Idle,
        }
    }
}

/// Guards a crawler against concurrent crawls
#[derive(Debug, Default)]
pub struct CrawlTrigger {
    phase: AtomicU8,
}

impl CrawlTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CrawlPhase {
        CrawlPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Whether a new crawl may be started
    pub fn is_enabled(&self) -> bool {
        self.phase() == CrawlPhase::Idle
    }

    pub fn label(&self) -> &'static str {
        self.phase().label()
    }

    /// Move from Idle to Crawling, or fail with [`CrawlError::Busy`]
    pub fn try_begin(&self) -> Result<CrawlGuard<'_>, CrawlError> {
        self.phase
            .compare_exchange(IDLE, CRAWLING, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| CrawlError::Busy)?;

        Ok(CrawlGuard { trigger: self })
    }
}

/// Held for the duration of a crawl; returns the trigger to Idle on drop
#[derive(Debug)]
pub struct CrawlGuard<'a> {
    trigger: &'a CrawlTrigger,
}

impl CrawlGuard<'_> {
    /// Enter the final-flush phase
    pub fn flushing(&self) {
        self.trigger.phase.store(FLUSHING, Ordering::SeqCst);
    }
}

impl Drop for CrawlGuard<'_> {
    fn drop(&mut self) {
        self.trigger.phase.store(IDLE, Ordering::SeqCst);
    }
}
