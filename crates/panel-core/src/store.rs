//! Store trait for persisting cleaned and regression-ready tables.
//!
//! This module defines the [`TableStore`] trait that provides a unified interface
//! for storing cleaned vendor observations, company profiles and named frames
//! ("sheets") produced by the later stages.

use async_trait::async_trait;
use polars::prelude::DataFrame;
use std::time::Duration;

use crate::{
    error::Result,
    types::{EntityObservation, EntityProfile},
};

/// Trait for persisting pipeline tables between stages.
///
/// Implementations can store data in various backends (SQLite, in-memory, etc.)
/// so that later stages read what earlier stages produced without re-running ETL.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Retrieves the cleaned observations of a source.
    ///
    /// Returns `Ok(Some(observations))` if stored, `Ok(None)` if not.
    async fn get_observations(&self, source: &str) -> Result<Option<Vec<EntityObservation>>>;

    /// Stores the cleaned observations of a source, replacing earlier ones.
    async fn put_observations(&self, source: &str, observations: &[EntityObservation])
    -> Result<()>;

    /// Retrieves the stored company profiles.
    ///
    /// Returns `Ok(Some(profiles))` if stored, `Ok(None)` if not.
    async fn get_profiles(&self) -> Result<Option<Vec<EntityProfile>>>;

    /// Stores company profiles, replacing earlier ones with the same key.
    async fn put_profiles(&self, profiles: &[EntityProfile]) -> Result<()>;

    /// Retrieves a named frame.
    ///
    /// Returns `Ok(Some(frame))` if stored, `Ok(None)` if not.
    async fn get_frame(&self, sheet: &str) -> Result<Option<DataFrame>>;

    /// Stores a named frame, replacing an earlier one with the same name.
    async fn put_frame(&self, sheet: &str, frame: &DataFrame) -> Result<()>;

    /// Names of all stored frames, sorted.
    async fn sheets(&self) -> Result<Vec<String>>;

    /// Removes entries older than the specified TTL.
    ///
    /// Returns the number of entries invalidated.
    async fn invalidate_stale(&self, ttl: Duration) -> Result<usize>;

    /// Clears all stored data.
    async fn clear(&self) -> Result<()>;
}
