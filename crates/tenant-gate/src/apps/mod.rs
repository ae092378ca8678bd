//! Tenant (app) directory
//!
//! CRUD for apps and their rate-limit settings. Deleting an app revokes and
//! detaches its API keys in the same transaction.

mod directory;
mod error;
mod memory;
mod model;
mod postgres;
mod routes;
mod store;

pub use directory::AppDirectory;
pub use error::{AppError, AppResult};
pub use memory::{ApiKeyRecord, MemoryAppStore};
pub use model::{App, AppInput, Page, PageRequest};
pub use postgres::PgAppStore;
pub use routes::router;
pub use store::AppStore;
