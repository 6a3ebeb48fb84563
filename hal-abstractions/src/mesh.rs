//! Mesh network state API
//!
//! Models the parts of the mesh stack the node depends on: the device
//! role and the state-change notifications that announce a new role.

use core::future::Future;
use core::ops::BitOr;

/// Participation state of the node in the mesh network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MeshRole {
    /// Network stack not started
    Disabled = 0,
    /// Started but not attached to any partition
    Detached = 1,
    /// Attached as an end device
    Child = 2,
    /// Attached as a router
    Router = 3,
    /// Attached as the partition leader
    Leader = 4,
}

impl MeshRole {
    /// Whether the role means active participation in the network
    pub const fn is_attached(self) -> bool {
        matches!(self, Self::Child | Self::Router | Self::Leader)
    }

    /// Decode a raw role value
    ///
    /// Unknown values decode as `Detached`.
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Disabled,
            2 => Self::Child,
            3 => Self::Router,
            4 => Self::Leader,
            _ => Self::Detached,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Detached => "detached",
            Self::Child => "child",
            Self::Router => "router",
            Self::Leader => "leader",
        }
    }
}

impl core::fmt::Display for MeshRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bit set carried by a state-change notification
///
/// Bit positions match the mesh stack's state-change flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChangedFlags(u32);

impl ChangedFlags {
    pub const IP6_ADDRESS_ADDED: Self = Self(1 << 0);
    pub const IP6_ADDRESS_REMOVED: Self = Self(1 << 1);
    /// Device role changed
    pub const THREAD_ROLE: Self = Self(1 << 2);
    pub const THREAD_LL_ADDR: Self = Self(1 << 3);
    pub const THREAD_ML_ADDR: Self = Self(1 << 4);
    pub const THREAD_PARTITION_ID: Self = Self(1 << 7);
    pub const THREAD_NETDATA: Self = Self(1 << 9);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set in `self`
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for ChangedFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Mesh network stack
///
/// Implementors own the radio/link and report role changes. The node
/// never drives joining itself beyond calling [`MeshNetwork::start`].
pub trait MeshNetwork {
    /// Error returned when the stack cannot be started
    type Error: core::fmt::Debug;

    /// Begin participating in the network
    fn start(&mut self) -> Result<(), Self::Error>;

    /// Current device role
    fn role(&self) -> MeshRole;

    /// Wait for the next state-change event and return its flags
    fn wait_changed(&mut self) -> impl Future<Output = ChangedFlags>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attached_roles() {
        assert!(!MeshRole::Disabled.is_attached());
        assert!(!MeshRole::Detached.is_attached());
        assert!(MeshRole::Child.is_attached());
        assert!(MeshRole::Router.is_attached());
        assert!(MeshRole::Leader.is_attached());
    }

    #[test]
    fn unknown_raw_role_is_detached() {
        assert_eq!(MeshRole::from_raw(4), MeshRole::Leader);
        assert_eq!(MeshRole::from_raw(1), MeshRole::Detached);
        assert_eq!(MeshRole::from_raw(0x7f), MeshRole::Detached);
    }

    #[test]
    fn flags_contain_role_bit() {
        let flags = ChangedFlags::IP6_ADDRESS_ADDED | ChangedFlags::THREAD_ROLE;
        assert!(flags.contains(ChangedFlags::THREAD_ROLE));
        assert!(!ChangedFlags::THREAD_NETDATA.contains(ChangedFlags::THREAD_ROLE));
        assert!(!flags.contains(ChangedFlags::empty()));
        assert_eq!(ChangedFlags::from_bits(0b100), ChangedFlags::THREAD_ROLE);
    }
}
