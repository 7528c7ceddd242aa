//! Tenant scoping for inbound messages.
//!
//! Filtering happens client-side so that switching the active tenant does
//! not require reconnecting the stream; only historical aggregates need a
//! server-side, tenant-scoped refresh.

use crate::message::StreamMessage;

/// Which tenant's records a widget admits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TenantSelection {
    /// Admit records from every tenant.
    #[default]
    All,
    /// Admit only records for one tenant (and records carrying no tenant).
    Only(String),
}

impl TenantSelection {
    /// Parse a user-facing label; `"all"` selects every tenant.
    pub fn from_label(label: &str) -> Self {
        if label == "all" {
            TenantSelection::All
        } else {
            TenantSelection::Only(label.to_string())
        }
    }

    /// The user-facing label, also carried in heartbeats and telemetry.
    pub fn label(&self) -> &str {
        match self {
            TenantSelection::All => "all",
            TenantSelection::Only(id) => id,
        }
    }

    /// The value for the refresh endpoint's `tenant` query parameter.
    /// `None` means unscoped.
    pub fn query_value(&self) -> Option<&str> {
        match self {
            TenantSelection::All => None,
            TenantSelection::Only(id) => Some(id),
        }
    }
}

/// The admit/reject predicate applied before a message reaches the
/// staleness monitor or the aggregator.
#[derive(Debug, Clone)]
pub struct TenantScope {
    active: TenantSelection,
}

impl TenantScope {
    /// Create a scope with the given initial selection.
    pub fn new(active: TenantSelection) -> Self {
        Self { active }
    }

    /// The current selection.
    pub fn active(&self) -> &TenantSelection {
        &self.active
    }

    /// Change the selection. Returns true if it actually changed.
    pub fn set_active(&mut self, selection: TenantSelection) -> bool {
        if self.active == selection {
            false
        } else {
            self.active = selection;
            true
        }
    }

    /// Whether a message passes the current selection.
    ///
    /// Messages with no tenant identifier are always admitted; they are
    /// tenant-agnostic control or platform traffic.
    pub fn admits(&self, message: &StreamMessage) -> bool {
        match &self.active {
            TenantSelection::All => true,
            TenantSelection::Only(id) => message.tenant_id().is_none_or(|t| t == id),
        }
    }
}
