#![allow(dead_code)]

//! Completed-day tracking for the 50-day program.
//!
//! Progress lives client-side only: a set of completed day numbers persisted
//! as a JSON array under one key, mutated by toggles from the daily
//! checklist. There is no server-side mirror.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::storage::{KeyValueStore, StorageError};

pub const PROGRESS_KEY: &str = "job-search-progress";
pub const TOTAL_DAYS: u32 = 50;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("Day {0} is outside the program range 1..=50")]
    DayOutOfRange(u32),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn KeyValueStore>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Completed days in ascending order.
    ///
    /// An unreadable stored payload reads as empty rather than failing, and
    /// day numbers outside the program range are dropped.
    pub async fn completed(&self) -> Result<BTreeSet<u32>, ProgressError> {
        let Some(raw) = self.store.get(PROGRESS_KEY).await? else {
            return Ok(BTreeSet::new());
        };
        match serde_json::from_str::<Vec<u32>>(&raw) {
            Ok(days) => Ok(days
                .into_iter()
                .filter(|day| (1..=TOTAL_DAYS).contains(day))
                .collect()),
            Err(err) => {
                warn!("Discarding unreadable progress payload: {err}");
                Ok(BTreeSet::new())
            }
        }
    }

    pub async fn is_complete(&self, day: u32) -> Result<bool, ProgressError> {
        check_day(day)?;
        Ok(self.completed().await?.contains(&day))
    }

    /// Flips one day and persists the sorted set. Returns whether the day is
    /// complete after the toggle.
    pub async fn toggle(&self, day: u32) -> Result<bool, ProgressError> {
        check_day(day)?;

        let mut days = self.completed().await?;
        let now_complete = days.insert(day);
        if !now_complete {
            days.remove(&day);
        }

        let serialized = serde_json::to_string(&days).map_err(StorageError::from)?;
        self.store.set(PROGRESS_KEY, &serialized).await?;
        Ok(now_complete)
    }

    /// Clears all progress by removing the persisted key, not by writing an
    /// empty array.
    pub async fn reset(&self) -> Result<(), ProgressError> {
        self.store.remove(PROGRESS_KEY).await?;
        Ok(())
    }
}

fn check_day(day: u32) -> Result<(), ProgressError> {
    if (1..=TOTAL_DAYS).contains(&day) {
        Ok(())
    } else {
        Err(ProgressError::DayOutOfRange(day))
    }
}
