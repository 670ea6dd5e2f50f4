//! Price source abstraction.

use async_trait::async_trait;
use eodsync_types::{FetchWindow, Instrument, Series};

use crate::{FetchError, SourceClient};

/// Something that can return one instrument's history for a window.
///
/// [`SourceClient`] is the production implementation; the scheduler only
/// depends on this trait.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetches the adjusted-close series for `instrument` over `window`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] naming the instrument when the fetch fails.
    async fn fetch(&self, instrument: &Instrument, window: &FetchWindow)
    -> Result<Series, FetchError>;
}

#[async_trait]
impl PriceSource for SourceClient {
    async fn fetch(
        &self,
        instrument: &Instrument,
        window: &FetchWindow,
    ) -> Result<Series, FetchError> {
        Self::fetch(self, instrument, window).await
    }
}
