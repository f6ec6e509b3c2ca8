/// Burndown/completion-chart engine behind a trait.
pub mod burndown;
/// Storage layer: open, migrate, CRUD, single-pass aggregation queries.
pub mod db;
/// Crate-wide error type: NotFound, Validation, Storage, Json.
pub mod errors;
/// Activity event records and the fire-and-forget sink.
pub mod events;
/// Data types: Module, Issue, links, favorites, read shapes.
pub mod models;
/// Module CRUD, issue linking, favorites, and user properties.
pub mod service;
