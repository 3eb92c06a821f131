//! # Tinder
//!
//! A pattern-driven log collector. Tinder reads a line-oriented log file,
//! splits every line into named fields using a `${name}` template, and
//! stores the raw entry plus its fields in SQLite for later querying.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  bounded  ┌─────────────┐   ┌──────────────┐
//! │ LineSource │──────────▶│ Format +    │──▶│    SQLite     │
//! │ (producer) │  channel  │ EntryId     │   │ logs/entries/ │
//! └────────────┘           └─────────────┘   │ strings/stats │
//!                                             └──────────────┘
//! ```
//!
//! One collect run is a single exclusive transaction: either every matched
//! line of the file lands in the store, or nothing does.
//!
//! ## Quick Start
//!
//! ```bash
//! tinder init
//! tinder collect --log /var/log/app.log --fmt '[${datetime}] ${msg}'
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation and store reset |
//! | [`format`] | `${name}` template matching |
//! | [`lines`] | Bounded line producer |
//! | [`ident`] | Entry id derivation |
//! | [`store`] | Log resolution and entry persistence |
//! | [`ingest`] | Run orchestration |
//! | [`server`] | HTTP listener |

pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod ident;
pub mod ingest;
pub mod lines;
pub mod migrate;
pub mod models;
pub mod server;
pub mod store;
pub mod telemetry;
