//! Capability bitmask algebra.
//!
//! Each named permission is one private marker bit OR'd with the full bit
//! patterns of its prerequisites, so a composite permission structurally
//! contains everything it depends on. Containment is a single mask check:
//! `granted & required == required`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// A set of granted capabilities, persisted as a plain integer.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Permissions(u32);

impl Permissions {
    pub const NONE: Self = Self(0);

    pub const VIEW_MEMBERS: Self = Self(1 << 0);
    pub const VIEW_MEMBER_SETTINGS: Self = Self(Self::VIEW_MEMBERS.0 | 1 << 1);
    pub const EDIT_MEMBER_SETTINGS: Self = Self(Self::VIEW_MEMBER_SETTINGS.0 | 1 << 2);
    pub const CREATE_MEMBERS: Self = Self(Self::VIEW_MEMBERS.0 | 1 << 3);
    pub const DISABLE_MEMBERS: Self = Self(Self::VIEW_MEMBERS.0 | 1 << 4);
    pub const VIEW_INVITED_MEMBERS: Self = Self(Self::VIEW_MEMBERS.0 | 1 << 5);
    pub const UNINVITE_MEMBERS: Self = Self(Self::VIEW_INVITED_MEMBERS.0 | 1 << 6);
    pub const RETRIEVE_INVITATION: Self = Self(Self::VIEW_INVITED_MEMBERS.0 | 1 << 7);

    /// Every application permission (low 20 bit positions).
    pub const ADMIN: Self = Self((1 << 20) - 1);
    /// Every permission including reserved ones. Has to stay the highest mask.
    pub const SYS_ADMIN: Self = Self((1 << 31) - 1);

    /// All named permissions, most specific last.
    const NAMED: &'static [(Self, &'static str)] = &[
        (Self::NONE, "NONE"),
        (Self::VIEW_MEMBERS, "VIEW_MEMBERS"),
        (Self::VIEW_MEMBER_SETTINGS, "VIEW_MEMBER_SETTINGS"),
        (Self::EDIT_MEMBER_SETTINGS, "EDIT_MEMBER_SETTINGS"),
        (Self::CREATE_MEMBERS, "CREATE_MEMBERS"),
        (Self::DISABLE_MEMBERS, "DISABLE_MEMBERS"),
        (Self::VIEW_INVITED_MEMBERS, "VIEW_INVITED_MEMBERS"),
        (Self::UNINVITE_MEMBERS, "UNINVITE_MEMBERS"),
        (Self::RETRIEVE_INVITATION, "RETRIEVE_INVITATION"),
        (Self::ADMIN, "ADMIN"),
        (Self::SYS_ADMIN, "SYS_ADMIN"),
    ];

    const LABELS: &'static [(&'static str, &'static str)] = &[
        ("NONE", "None"),
        ("VIEW_MEMBERS", "View members"),
        ("VIEW_MEMBER_SETTINGS", "View member settings"),
        ("EDIT_MEMBER_SETTINGS", "Edit member settings"),
        ("CREATE_MEMBERS", "Create members"),
        ("DISABLE_MEMBERS", "Disable members"),
        ("VIEW_INVITED_MEMBERS", "View invited members"),
        ("UNINVITE_MEMBERS", "Uninvite members"),
        ("RETRIEVE_INVITATION", "Retrieve invitations"),
        ("ADMIN", "Administrator"),
        ("SYS_ADMIN", "System administrator"),
    ];

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `required` is granted.
    ///
    /// Composite permissions carry their prerequisites' bits, so this
    /// check enforces the hierarchy without walking it.
    #[must_use]
    pub const fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// Canonical name when the value is a named permission.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(value, _)| *value == self)
            .map(|(_, name)| *name)
    }

    /// Human-readable label, falling back to an `internal:`-prefixed raw
    /// name for values without a translation.
    #[must_use]
    pub fn label(self) -> String {
        match self.name() {
            Some(name) => Self::LABELS
                .iter()
                .find(|(key, _)| *key == name)
                .map_or_else(|| format!("internal: {name}"), |(_, label)| (*label).to_string()),
            None => format!("internal: {:#x}", self.0),
        }
    }
}

impl BitOr for Permissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Permissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#x}", self.0),
        }
    }
}
