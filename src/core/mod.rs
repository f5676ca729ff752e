pub mod db;
pub mod errors;
pub mod helpers;
pub mod query_params;
pub mod store;

use crate::config::Config;
use crate::core::store::Store;

/// Per-request view of the application: the store client and configuration,
/// both constructed once at startup and handed to every handler.
pub struct AppContext<'a> {
    pub store: &'a dyn Store,
    pub config: &'a Config,
}

impl<'a> AppContext<'a> {
    pub fn new(store: &'a dyn Store, config: &'a Config) -> Self {
        Self { store, config }
    }
}
