//! Store client interface consumed by the relay worker

mod client;

pub use client::{HttpStoreClient, StoreClient, StoreError, StoreResult, StoredItem};
