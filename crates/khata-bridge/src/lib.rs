//! # khata-bridge: Process-Boundary Adapter for Khata
//!
//! The UI process invokes data-layer operations by name through this crate:
//! one request = one operation with positional JSON arguments, answered by a
//! uniform result envelope. Nothing here ever throws across the boundary;
//! every failure, including an absent database handle, becomes
//! `{ success: false, error: "..." }`.
//!
//! ## Typical Startup
//! ```rust,ignore
//! use khata_bridge::{Bridge, FileBootstrapFlags};
//! use khata_db::DbConfig;
//!
//! let bridge = Bridge::new();
//! let mut flags = FileBootstrapFlags::load(data_dir.join("bootstrap.json"))?;
//!
//! // Fatal on failure: abort startup if the database can't be provisioned
//! bridge
//!     .init_with_first_run(DbConfig::new(data_dir.join("khata.db")), &mut flags)
//!     .await?;
//!
//! let reply = bridge.dispatch("get-all-customers", &[]).await;
//! ```
//!
//! ## Modules
//!
//! - [`dispatch`] - the [`Bridge`] handle and operation routing
//! - [`envelope`] - the canonical result envelope shapes
//! - [`bootstrap`] - JSON-file first-run flag store

pub mod bootstrap;
pub mod dispatch;
pub mod envelope;

pub use bootstrap::FileBootstrapFlags;
pub use dispatch::{Bridge, Request};
pub use envelope::Envelope;
