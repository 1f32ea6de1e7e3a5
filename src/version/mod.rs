//! Dist-tag reconciliation layer
//!
//! This module turns a registry's distribution tags into display rows, one per
//! resolved version, newest first. It also owns fetching and caching of the
//! upstream tag snapshots.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registry   │────▶│  Resolver   │────▶│    Tags     │
//! │  (fetch)    │     │(cache-first)│     │ (reconcile) │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Registries  │     │    Cache    │     │   Semver    │
//! │   (npm)     │     │  (storage)  │     │  (parsing)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cache`]: SQLite-based dist-tag cache with freshness checks
//! - [`error`]: Error types for cache, registry and resolver operations
//! - [`registry`]: Registry trait for fetching dist-tags from remote sources
//! - [`registries`]: Concrete registry implementations (npm)
//! - [`resolver`]: Cache-first resolution of dist-tag snapshots
//! - [`semver`]: Lenient version parsing and ordering
//! - [`tags`]: Tag sorting, grouping and row building
//! - [`types`]: Common types like `DistTags` and `TaggedVersionRow`

pub mod cache;
pub mod error;
pub mod registries;
pub mod registry;
pub mod resolver;
pub mod semver;
pub mod tags;
pub mod types;
