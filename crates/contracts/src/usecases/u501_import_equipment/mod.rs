pub mod progress;
pub mod request;
pub mod response;

pub use progress::ImportProgress;
pub use request::{CatalogProduct, CatalogQuery, SelectionRequest};
pub use response::{ImportResponse, ImportRunStatus};

/// Имя UseCase u501 для логов
pub const USECASE_NAME: &str = "u501_import_equipment";
