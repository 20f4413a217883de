//! Remote store access and reconciliation for Corpusync.
//!
//! [`client`] speaks the file-search store REST surface; [`reconcile`] turns
//! a fresh chunk set into a delete-then-upload plan and executes it on a
//! bounded worker pool.

pub mod client;
pub mod reconcile;

pub use client::{HttpStoreClient, OperationHandle, StoreClient};
pub use reconcile::{
    CHUNK_CONTENT_TYPE, MatchMode, ReconcileOptions, ReconcileReport, Reconciler, plan,
};
