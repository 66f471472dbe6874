pub mod models;
pub mod postgres;
pub mod store;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use postgres::PgStore;
pub use store::{DynStore, NewSubscription, Store, StoreError};
