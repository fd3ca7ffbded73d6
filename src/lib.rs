//! # Image Previewer
//!
//! An on-demand image thumbnail service.
//!
//! ## Overview
//!
//! Given a source image URL and target dimensions, the previewer fetches the
//! original, fills it to the requested size, stores the result on local disk
//! and serves it from a bounded LRU index on repeat requests.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Server                              │
//! │   GET /fill/{width}/{height}/{*source}  →  Previewer::fill  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Previewer                            │
//! │   key → LruCache::get ── hit ──→ FileStore::read            │
//! │                      └─ miss ─→ fetch → resize → save → set │
//! └─────────────────────────────────────────────────────────────┘
//!          │                   │                   │
//!          ▼                   ▼                   ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │    LruCache     │ │     Fetcher     │ │   Transformer   │
//! │                 │ │                 │ │                 │
//! │ • Ordered list  │ │ • reqwest proxy │ │ • image fill    │
//! │ • Capacity      │ │ • Header/query  │ │ • JPEG encode   │
//! │ • Eviction hook │ │   forwarding    │ │                 │
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    FileStore    │
//! │ • save/read     │
//! │ • delete (hook) │
//! └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`cache`] — LRU index and eviction hooks
//! - [`config`] — Configuration management
//! - [`fetch`] — Outbound proxy client
//! - [`pipeline`] — Fetch → resize → persist → register
//! - [`server`] — HTTP routes
//! - [`storage`] — Thumbnail files on disk
//! - [`transform`] — Image resizing
//!
//! ## Example
//!
//! ```no_run
//! use image_previewer::{Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     server::run(&config).await
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::option_if_let_else)]

pub mod cache;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod server;
pub mod storage;
pub mod transform;

// Re-export main types for convenience
pub use cache::{CacheEntry, CacheKey, EvictionHook, ImageItem, LruCache};
pub use config::Config;
pub use pipeline::{FillRequest, Preview, Previewer};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
