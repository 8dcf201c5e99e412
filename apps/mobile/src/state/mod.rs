//! # State Module
//!
//! Screen-facing accessors over the runtime's shared state.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────────────┐      ┌──────────────────────────────┐    │
//! │  │        AuthState         │      │     CachedResource<T>        │    │
//! │  │                          │      │                              │    │
//! │  │  role / user_id /        │─────►│  keyed by the current role   │    │
//! │  │  is_ready / refresh()    │ role │  reload(options) / view()    │    │
//! │  │  sign_out()              │      │  follow() on snapshot change │    │
//! │  └────────────┬─────────────┘      └──────────────┬───────────────┘    │
//! │               │                                   │                     │
//! │               ▼                                   ▼                     │
//! │          RoleStore                      DashboardCacheLoader            │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Both accessors are cheap clones over shared, lock-protected state   │
//! │  • Snapshots and views are immutable `Arc`s replaced on every change   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod auth;
mod resource;

pub use auth::AuthState;
pub use resource::{CachedResource, ResourceFetch};
