pub mod bandit_api_client;
pub mod executor;
pub mod family_resolver;
pub mod hooks;
pub mod poller;
pub mod progress_tracker;
pub mod record_builder;
pub mod selection;

#[cfg(test)]
pub(crate) mod test_support;

pub use bandit_api_client::{BanditApiClient, EquipmentSource};
pub use executor::ImportExecutor;
pub use progress_tracker::ProgressTracker;
pub use selection::CatalogService;
