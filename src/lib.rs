//! # i18n harvest
//!
//! Incremental extraction of user-facing strings from a source tree.
//!
//! Every document under a root is fingerprinted by content. Documents whose
//! fingerprint matches the persisted cache reuse their stored results; the
//! rest are classified in parallel by a pluggable [`extract::Extractor`].
//! Per-document results are merged into one category → fragment mapping and
//! the cache is saved atomically for the next run.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │ Discovery │──▶│ Classifying │──▶│ Worker pool  │──▶│ Aggregate │
//! │ (walkdir) │   │ fingerprint │   │ (Extractor)  │   │  (union)  │
//! └───────────┘   │ vs. cache   │   └──────┬───────┘   └─────┬─────┘
//!                 └──────┬──────┘          │                 ▼
//!                        │ hits            ▼            text/json/csv
//!                        └───────────▶ CacheStore (atomic save)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! harvest scan ./src                       # text report in extracted_strings.txt
//! harvest scan ./src --format json -o -    # JSON on stdout
//! harvest scan ./src --force --top 20      # ignore the cache, show hotspots
//! harvest stats                            # inspect the cache
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`discover`] | Document discovery |
//! | [`fingerprint`] | Content digests |
//! | [`cache`] | Persisted fingerprint → results store |
//! | [`extract`] | Extractor trait |
//! | [`rules`] | Regex-based extraction rules |
//! | [`pool`] | Bounded extraction worker pool |
//! | [`aggregate`] | Tree-wide merge |
//! | [`pipeline`] | Scan controller |
//! | [`progress`] | Progress reporting |
//! | [`export`] | Output formats |
//! | [`stats`] | Scan summary and cache statistics |

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod discover;
pub mod error;
pub mod export;
pub mod extract;
pub mod fingerprint;
pub mod models;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod rules;
pub mod stats;
