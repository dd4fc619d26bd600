//! Orchestration engine for adventure games whose content is generated on
//! demand.
//!
//! This crate provides:
//! - An authoritative world store (character, map, items, NPCs, events)
//! - A command processor turning free-text input into one handled action
//! - An event engine that escalates actions into multi-turn events
//! - A discovery ledger linking narrative leads to generated entities
//! - A director that periodically biases future generation
//! - JSON save/load
//!
//! All prose and entities come from a [`ContentService`] implementation
//! supplied by the embedding application.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use wayfarer_core::{GameConfig, GameSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let content = Arc::new(MyContentService::new());
//!     let config = GameConfig::new("The Salt Roads")
//!         .with_character_concept("disgraced lighthouse keeper");
//!
//!     let session = GameSession::start(content, config).await?;
//!
//!     let response = session.submit("go north").await?;
//!     println!("{}", response.text());
//!
//!     session.save("salt_roads.json").await?;
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod content;
pub mod context;
pub mod director;
pub mod discovery;
pub mod effects;
pub mod events;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod testing;
pub mod world;

// Primary public API
pub use commands::{Action, CommandProcessor, TurnReport};
pub use config::{ConfigError, EnergyCosts, GameConfig};
pub use content::{ContentError, ContentService};
pub use director::{DirectorDirective, Subsystem};
pub use discovery::{DiscoveryLedger, LeadHint, LeadTarget, PotentialDiscovery};
pub use effects::EventEffects;
pub use session::{GameSession, Response, SessionError};
pub use store::{StoreError, WorldStore};
pub use testing::{MockContent, TestHarness};
