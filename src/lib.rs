//! A no-std, heapless, hardened Address Resolution Protocol engine for Ethernet links.
//!
//! This crate is a pure, deterministic packet-processing state machine: it maps IPv4
//! addresses to MAC addresses, defends the resulting cache against poisoning, amplification,
//! cross-subnet spoofing and resource exhaustion, and additionally implements IPv4 Address
//! Conflict Detection (RFC 5227) and a Reverse ARP responder.
//!
//! Nothing in this crate touches a socket, a NIC, or a clock. Every entry point takes the
//! current state and an explicit monotonic millisecond timestamp and returns a new state;
//! callers own raw I/O, timekeeping, and logging.
//!
//! ```rust
//! use arpguard::*;
//!
//! let iface = InterfaceConfig {
//!     id: 0,
//!     mac: MacAddr::new([0x02, 0, 0, 0, 0, 1]),
//!     ip: IpV4Addr::new([10, 0, 0, 1]),
//!     subnet: Some(Subnet::new(IpV4Addr::new([10, 0, 0, 0]), 24)),
//!     vlan: None,
//!     rarp_enabled: false,
//!     static_entries: &[],
//! };
//! let config = Config { interfaces: &[iface], reverse_map: &[], ..Config::defaults() };
//! let state = init(config).unwrap();
//! assert_eq!(lookup(&state, 0, IpV4Addr::new([10, 0, 0, 2]), 0), Resolution::Unknown);
//! ```

#![no_std]
#![allow(dead_code)]
#![deny(missing_docs)]

#[cfg(feature = "panic_never")]
use panic_never as _;

pub use byte_struct::{ByteStruct, ByteStructLen};
pub use ufmt::{derive::uDebug, uDebug, uDisplay, uWrite};

pub mod acd;
pub mod arp;
pub mod cache;
pub mod config;
pub mod enet;
pub mod error;
pub mod flood;
pub mod iface;
pub mod neg;
pub mod pending;
pub mod rarp;
pub mod rng;
pub mod state;
pub mod validate;

pub use acd::AcdState;
pub use arp::{ArpOperation, ArpPayload, ProtocolType};
pub use cache::{Cache, CacheEntry, EntryKind};
pub use config::{Config, InterfaceConfig};
pub use enet::{EtherType, EthernetHeader, Frame, VlanTag, FRAME_LEN};
pub use error::{ConfigError, DropReason, Event, ParseError};
pub use flood::FloodTable;
pub use iface::{IfaceId, Interface};
pub use neg::NegCache;
pub use pending::PendingTable;
pub use rarp::ReverseMap;
pub use rng::Rng;
pub use state::{gratuitous_announce, init, lookup, request, start_dad, step, tick, Resolution, State, TickOutput, MAX_TICK_FRAMES};

/// Newtype for `[u8; N]` in order to be able to implement traits on fixed-width byte arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ByteArray<const N: usize>(pub [u8; N]);

impl<const N: usize> ByteStructLen for ByteArray<N> {
    const BYTE_LEN: usize = N;
}

impl<const N: usize> ByteStruct for ByteArray<N> {
    fn read_bytes(bytes: &[u8]) -> Self {
        let mut out = [0_u8; N];
        out.copy_from_slice(&bytes[0..N]);
        ByteArray(out)
    }

    fn write_bytes(&self, bytes: &mut [u8]) {
        bytes[0..N].copy_from_slice(&self.0);
    }
}

impl<const N: usize> ByteArray<N> {
    /// Convert to a big-endian (network) byte array.
    pub fn to_be_bytes(&self) -> [u8; N] {
        self.0
    }
}

impl uDebug for ByteArray<4> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        <[u8; 4] as uDebug>::fmt(&self.0, f)
    }
}

impl uDebug for ByteArray<6> {
    fn fmt<W>(&self, f: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        <[u8; 6] as uDebug>::fmt(&self.0, f)
    }
}

/// Standard 6-byte MAC address.
///
/// Locally-administered addresses are `[0x02, ...]`, `[0x06, ...]`, `[0x0A, ...]`, `[0x0E, ...]`.
pub type MacAddr = ByteArray<6>;

impl MacAddr {
    /// Build a MAC address from its six bytes.
    pub fn new(v: [u8; 6]) -> Self {
        ByteArray(v)
    }

    /// Broadcast address (all ones).
    pub const BROADCAST: MacAddr = ByteArray([0xFF_u8; 6]);

    /// Zero / unspecified address (all zeroes).
    pub const ZERO: MacAddr = ByteArray([0x0_u8; 6]);

    /// True iff this is the all-ones broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// True iff the least-significant bit of the first octet is set, per IEEE 802.3.
    /// This also matches the broadcast address, which is a degenerate multicast address;
    /// callers that need to distinguish the two should check [`MacAddr::is_broadcast`] first.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// True iff this is the all-zero address.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// IPv4 address as four bytes in dotted-decimal order.
pub type IpV4Addr = ByteArray<4>;

impl IpV4Addr {
    /// Build an IPv4 address from its four bytes.
    pub fn new(v: [u8; 4]) -> Self {
        ByteArray(v)
    }

    /// Limited broadcast address (all ones).
    pub const BROADCAST: IpV4Addr = ByteArray([0xFF_u8; 4]);

    /// Unspecified address (all zeroes), used as the sender address of an ACD probe.
    pub const UNSPECIFIED: IpV4Addr = ByteArray([0x0_u8; 4]);

    /// Big-endian `u32` representation, most convenient for bitwise subnet containment checks.
    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// True iff this is the all-zero address.
    pub fn is_unspecified(&self) -> bool {
        *self == Self::UNSPECIFIED
    }
}

/// An IPv4 subnet: a network address together with a prefix length in `0..=32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subnet {
    network: IpV4Addr,
    prefix_len: u8,
}

impl Subnet {
    /// Build a subnet from a network address and prefix length. The prefix length is
    /// clamped to `32` since an IPv4 address has no more bits than that to match against.
    pub fn new(network: IpV4Addr, prefix_len: u8) -> Self {
        Subnet {
            network,
            prefix_len: if prefix_len > 32 { 32 } else { prefix_len },
        }
    }

    /// The configured prefix length.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Standard bitwise subnet containment: the top `prefix_len` bits of `ip` and
    /// `network` must agree. A `/0` subnet contains every address.
    pub fn contains(&self, ip: IpV4Addr) -> bool {
        if self.prefix_len == 0 {
            return true;
        }
        let mask: u32 = (!0u32).checked_shl(32 - self.prefix_len as u32).unwrap_or(0);
        (ip.to_u32() & mask) == (self.network.to_u32() & mask)
    }
}

/// Derive To/From with an added "Unknown" variant catch-all for converting
/// from numerical values that do not match a valid variant, avoiding both
/// panicking and cumbersome error handling on the hot path.
///
/// Yoinked shamelessly (with some modification) from smoltcp.
#[macro_export]
macro_rules! enum_with_unknown {
    (
        $( #[$enum_attr:meta] )*
        pub enum $name:ident($ty:ty) {
            $(
              $( #[$variant_attr:meta] )*
              $variant:ident = $value:expr
            ),+ $(,)?
        }
    ) => {
        #[derive(Debug, uDebug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
        $( #[$enum_attr] )*
        pub enum $name {
            $(
              $( #[$variant_attr] )*
              $variant
            ),*,
            /// Catch-all for values that do not match a variant
            Unknown($ty)
        }

        impl ::core::convert::From<$ty> for $name {
            fn from(value: $ty) -> Self {
                match value {
                    $( $value => $name::$variant ),*,
                    other => $name::Unknown(other)
                }
            }
        }

        impl ::core::convert::From<$name> for $ty {
            fn from(value: $name) -> Self {
                match value {
                    $( $name::$variant => $value ),*,
                    $name::Unknown(other) => other
                }
            }
        }
    }
}

/// Hard capacity bound on an interface's resolution cache (see the data model's "Bounds").
pub const MAX_CACHE: usize = 1024;
/// Hard capacity bound on an interface's negative cache.
pub const MAX_NEG: usize = 256;
/// Hard capacity bound on the (shared) flood-control table.
pub const MAX_FLOOD: usize = 512;
/// Hard capacity bound on an interface's pending-request queue.
pub const MAX_PENDING: usize = 128;
/// Maximum number of interfaces a single [`State`] can host.
pub const MAX_IFACES: usize = 8;
/// Maximum number of entries in the RARP reverse (MAC -> IP) map.
pub const MAX_REVERSE: usize = 128;

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn mac_classifiers() {
        assert!(MacAddr::BROADCAST.is_broadcast());
        assert!(MacAddr::BROADCAST.is_multicast());
        assert!(!MacAddr::ZERO.is_broadcast());
        assert!(!MacAddr::ZERO.is_multicast());
        assert!(MacAddr::ZERO.is_zero());

        let multicast = MacAddr::new([0x01, 0, 0, 0, 0, 0]);
        assert!(multicast.is_multicast());
        assert!(!multicast.is_broadcast());

        let unicast = MacAddr::new([0x02, 0, 0, 0, 0, 1]);
        assert!(!unicast.is_multicast());
    }

    #[test]
    fn subnet_containment() {
        let subnet = Subnet::new(IpV4Addr::new([10, 0, 0, 0]), 24);
        assert!(subnet.contains(IpV4Addr::new([10, 0, 0, 1])));
        assert!(subnet.contains(IpV4Addr::new([10, 0, 0, 255])));
        assert!(!subnet.contains(IpV4Addr::new([10, 0, 1, 1])));

        let everything = Subnet::new(IpV4Addr::new([0, 0, 0, 0]), 0);
        assert!(everything.contains(IpV4Addr::new([192, 168, 1, 1])));

        let host_route = Subnet::new(IpV4Addr::new([10, 0, 0, 5]), 32);
        assert!(host_route.contains(IpV4Addr::new([10, 0, 0, 5])));
        assert!(!host_route.contains(IpV4Addr::new([10, 0, 0, 6])));
    }
}
