//! # rxdist-core: Pure Domain Types for Rxdist
//!
//! This crate holds the vocabulary shared by every layer of the
//! authorization-sync core. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Rxdist Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Mobile UI (role-gated screens)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ accessors                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            rxdist-sync (RoleStore, CacheLoader)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rxdist-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌──────────┐   │   │
//! │  │   │   role    │  │  types    │  │  snapshot  │  │  ticket  │   │   │
//! │  │   │   Role    │  │  UserId   │  │ RoleSnap-  │  │ Refresh- │   │   │
//! │  │   │ normalize │  │  Session  │  │   shot     │  │  Ticket  │   │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └──────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`role`] - Closed role enum and normalization of backend role strings
//! - [`types`] - User ids, sessions, auth events and refresh reasons
//! - [`snapshot`] - The immutable authorization snapshot
//! - [`ticket`] - Monotonic refresh tickets
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use rxdist_core::{Role, RoleSnapshot, UserId};
//!
//! // Backend strings are normalized at the boundary
//! assert_eq!(Role::normalize(" ventas "), Role::Ventas);
//! assert_eq!(Role::normalize("superuser"), Role::Unassigned);
//!
//! let user = UserId::new("u1").unwrap();
//! let snapshot = RoleSnapshot::resolved(user, Role::Admin);
//! assert!(snapshot.is_ready);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod role;
pub mod snapshot;
pub mod ticket;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult};
pub use role::Role;
pub use snapshot::{RoleSnapshot, RoleSource};
pub use ticket::{RefreshTicket, TicketCounter};
pub use types::{AuthEvent, RefreshReason, Session, UserId};
