// SPDX-FileCopyrightText: 2026 sqlbusy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role assignment: which identities delete and which write.

use sqlbusy_config::model::RolesConfig;
use sqlbusy_core::{Role, WorkerId};

/// Identities `1..=deleters` are deleters; every other identity writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleAssignment {
    deleters: u32,
}

impl Default for RoleAssignment {
    /// Identity 1 deletes, the rest write.
    fn default() -> Self {
        Self { deleters: 1 }
    }
}

impl RoleAssignment {
    pub fn new(deleters: u32) -> Self {
        Self { deleters }
    }

    pub fn from_config(roles: &RolesConfig) -> Self {
        Self::new(roles.deleters)
    }

    pub fn role_for(&self, identity: WorkerId) -> Role {
        if identity.0 <= self.deleters {
            Role::Deleter
        } else {
            Role::Writer
        }
    }

    /// Every identity `1..=workers` paired with its role.
    pub fn assign(&self, workers: u32) -> impl Iterator<Item = (WorkerId, Role)> + '_ {
        (1..=workers).map(|n| {
            let id = WorkerId(n);
            (id, self.role_for(id))
        })
    }
}
