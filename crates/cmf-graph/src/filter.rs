//! Filter cores: a backend plus its configuration.
//!
//! Cores are shared through `Arc` and are read-only while shared. A node
//! that changes its options gets a private copy via `Arc::make_mut`.

use std::fmt;
use std::sync::Arc;

use crate::api::FilterApi;
use crate::options::Options;
use crate::GraphResult;

/// Registration, options and backend of a processing step.
#[derive(Clone)]
pub struct FilterCore {
    registration: String,
    options: Options,
    api: Arc<dyn FilterApi>,
}

impl FilterCore {
    /// Validates `options` against the backend and builds a core.
    pub fn new(api: Arc<dyn FilterApi>, options: Options) -> GraphResult<Self> {
        api.validate_options(&options)?;
        Ok(Self {
            registration: api.registration().to_string(),
            options,
            api,
        })
    }

    /// Backend registration.
    pub fn registration(&self) -> &str {
        &self.registration
    }

    /// Current options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Backend implementation.
    pub fn api(&self) -> &Arc<dyn FilterApi> {
        &self.api
    }
}

impl fmt::Debug for FilterCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterCore")
            .field("registration", &self.registration)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
