pub mod catalog;
mod store;

pub use catalog::CatalogEntry;
pub use store::{ProjectContext, ProjectContextStore};
