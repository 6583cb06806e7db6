//! # LogKV
//!
//! A log-structured key-value storage engine with:
//! - One append-only data file per engine
//! - An in-memory index of key → file offset
//! - Crash recovery by replaying the data file on open
//! - Merge (compaction) that rewrites only live records
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Engine                              │
//! │        put / get / delete / merge   (RwLock: SWMR)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Index    │          │  AppendLog  │
//!   │ key→offset  │─────────▶│ logkv.data  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │    Entry    │
//!                           │   (codec)   │
//!                           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use logkv::Engine;
//!
//! let engine = Engine::open("./logkv_data")?;
//! engine.put(b"hello", b"world")?;
//! assert_eq!(engine.get(b"hello")?, Some(b"world".to_vec()));
//! engine.delete(b"hello")?;
//! engine.merge()?;
//! # Ok::<(), logkv::KvError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod datafile;
pub mod index;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::{Config, SyncStrategy};
pub use engine::{Engine, MergeStats, RecoveryStats};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of LogKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
