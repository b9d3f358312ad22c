//! # leadgrid
//!
//! A lead table on the command line. Leads live in a JSON file; the
//! [`leadgrid_seeker`] engine searches, filters and sorts them into a view,
//! and mutations go through an optimistic [`board::Board`].
//!
//! ## Modules
//!
//! - [`store`]: the [`store::LeadStore`] contract with in-memory and JSON file
//!   implementations
//! - [`board`]: the fetched snapshot and its optimistic mutations
//! - [`config`]: saved views read from YAML
//! - [`output`]: table and structured rendering
//! - [`cli`]: argument parsing and command execution

pub mod board;
pub mod cli;
pub mod config;
pub mod output;
pub mod store;

pub use board::{Board, BoardError};
pub use cli::{execute, run, Cli};
pub use config::{ConfigError, SavedView, SavedViews};
pub use output::{OutputMode, SerializeError};
pub use store::{FetchCriteria, JsonFileStore, LeadStore, MemoryStore, StoreError};
