//! Bank client records.
//!
//! # Data Flow
//! ```text
//! /api/clients handlers
//!     → ClientService (validation, uniqueness, paging)
//!     → dyn ClientStore
//!         → PgClientStore → ResilientPool::acquire() → Postgres
//!
//! First successful schema bootstrap
//!     → ClientSeeder (AvailabilityListener) → generator → ClientStore::insert
//! ```
//!
//! # Design Decisions
//! - The store is a trait object so the HTTP layer can be tested in memory
//! - Sorting is whitelisted through `SortField`, never interpolated from input
//! - Updates are optimistic on the `version` column

pub mod error;
pub mod generator;
pub mod model;
pub mod postgres;
pub mod seed;
pub mod service;
pub mod store;

pub use error::ClientError;
pub use model::{
    Client, ClientInput, ClientView, Currency, GroupCounts, GroupField, Nationality, NewClient, Page,
    PageRequest, SearchFilter, SortDirection, SortField,
};
pub use postgres::PgClientStore;
pub use seed::ClientSeeder;
pub use service::ClientService;
pub use store::ClientStore;
