//! # Local Storage Rust Library
//!
//! A JSON-aware key-value storage adapter in the spirit of the browser's
//! `localStorage`, written against an injected store instead of a global one.
//!
//! ## Features
//!
//! - **Storage Module**: [`JsonStorage`](storage::JsonStorage) with support
//!   probing, JSON get/set, key enumeration and prefix cleanup
//! - **Backends**: in-memory and file-backed stores behind the
//!   [`StorageAdapter`](storage::StorageAdapter) trait
//!
//! ## Example
//!
//! ```rust
//! use local_storage_rust::prelude::*;
//! use serde_json::json;
//!
//! let storage = JsonStorage::new(MemoryAdapter::new());
//! storage.check_support()?;
//!
//! storage.set("user:1", &json!({"name": "alice"}))?;
//! assert_eq!(storage.get("user:1")?, Lookup::Present(json!({"name": "alice"})));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core error types
pub use error::{Error, Result};

// Core modules
pub mod error;
pub mod storage;

// Utility modules
mod utils;

pub use utils::init_tracing;

// Re-export commonly used types
pub mod prelude {
    //! Common types and traits for convenient importing

    pub use crate::error::{Error, Result};
    pub use crate::storage::{
        JsonStorage, LocalConfig, LocalStorage, Lookup, MemoryAdapter, StorageAdapter,
        StorageConfig, StorageError, StorageResult,
    };
}

// Version information
/// The version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
