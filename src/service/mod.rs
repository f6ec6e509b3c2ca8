//! Request-level operations over the store: module CRUD with derived
//! annotations, bulk issue linking, favorites, and per-user properties.

pub mod favorites;
pub mod links;
pub mod modules;
pub mod properties;

pub use favorites::FavoriteService;
pub use links::LinkService;
pub use modules::{ModuleService, project_fields};
pub use properties::PropertiesService;
