//! # Roles
//!
//! The closed set of authorization categories a user can hold.
//!
//! ## Normalization Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Role Normalization                                │
//! │                                                                         │
//! │  Backend RPC / profile table          RoleResolver           Screens    │
//! │  ───────────────────────────          ────────────           ───────    │
//! │  "admin"          ───────────┐                                          │
//! │  " Ventas "       ───────────┼──► Role::normalize() ──► Role ──► gate   │
//! │  "ALMACEN"        ───────────┤        (trim, upper,                     │
//! │  "superuser"      ───────────┘         aliases)                         │
//! │                                                                         │
//! │  Unrecognized text becomes Role::Unassigned. Raw strings never travel   │
//! │  past the resolver.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// Authorization category assigned to a user.
///
/// `Unassigned` is the explicit empty role: no session, a user the backend
/// has no role for, or a role string we do not recognize. It serializes as
/// the empty string so the UI bridge keeps its `role === ""` checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full access, passes every screen gate.
    Admin,
    /// Sales force: orders, customers, commissions.
    Ventas,
    /// Warehouse: stock, kardex, dispatch.
    Bodega,
    /// Purchasing: suppliers, purchase orders.
    Compras,
    /// Receivables: collections, customer ledgers.
    Cobranza,
    /// No role.
    #[default]
    #[serde(rename = "")]
    Unassigned,
}

impl Role {
    /// All assignable roles, in display order.
    pub const ASSIGNABLE: [Role; 5] = [
        Role::Admin,
        Role::Ventas,
        Role::Bodega,
        Role::Compras,
        Role::Cobranza,
    ];

    /// Canonical wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Ventas => "VENTAS",
            Role::Bodega => "BODEGA",
            Role::Compras => "COMPRAS",
            Role::Cobranza => "COBRANZA",
            Role::Unassigned => "",
        }
    }

    /// Lenient conversion used at the resolver boundary.
    ///
    /// Never fails: anything that is not a known role or alias maps to
    /// [`Role::Unassigned`].
    pub fn normalize(raw: &str) -> Role {
        raw.parse().unwrap_or(Role::Unassigned)
    }

    /// Returns true for every role except [`Role::Unassigned`].
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Role::Unassigned)
    }

    /// Screen gate check. Admin passes every gate, Unassigned passes none.
    pub fn allows(&self, gate: &[Role]) -> bool {
        match self {
            Role::Unassigned => false,
            Role::Admin => true,
            role => gate.contains(role),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ADMIN" | "ADMINISTRADOR" => Ok(Role::Admin),
            "VENTAS" | "VENDEDOR" => Ok(Role::Ventas),
            "BODEGA" | "ALMACEN" | "INVENTARIO" => Ok(Role::Bodega),
            "COMPRAS" => Ok(Role::Compras),
            "COBRANZA" | "COBRANZAS" | "CXC" => Ok(Role::Cobranza),
            "" => Ok(Role::Unassigned),
            other => Err(CoreError::UnknownRole(other.to_string())),
        }
    }
}
