//! Configuration surface consumed once by [`crate::state::init`].
//!
//! Nothing here is mutable from the hot path: interfaces, static entries, and the reverse
//! map are all borrowed for the duration of `init` and copied into the owned, fixed-capacity
//! structures that make up [`crate::state::State`]. There is no allocator, so `init` takes
//! borrowed slices rather than owning a `Vec`.

use crate::enet::VlanTag;
use crate::iface::IfaceId;
use crate::{IpV4Addr, MacAddr, Subnet};

/// One interface's configuration: its identity, its addresses, and any entries that must be
/// installed as immutable Static cache entries before traffic starts flowing.
#[derive(Clone, Copy)]
pub struct InterfaceConfig<'a> {
    /// Unique id for this interface within the [`Config`] it belongs to.
    pub id: IfaceId,
    /// This interface's own hardware address.
    pub mac: MacAddr,
    /// This interface's own IPv4 address.
    pub ip: IpV4Addr,
    /// The subnet sender addresses must fall within, if any (§4.2 rule 3).
    pub subnet: Option<Subnet>,
    /// The 802.1Q tag this interface's frames carry, if the link is VLAN-tagged.
    pub vlan: Option<VlanTag>,
    /// Whether this interface answers RARP requests.
    pub rarp_enabled: bool,
    /// `(ip, mac)` pairs installed as Static cache entries, immune to merge/update/eviction.
    pub static_entries: &'a [(IpV4Addr, MacAddr)],
}

/// The complete configuration for a [`crate::state::State`]: its interfaces, the shared RARP
/// reverse map, and the timing/bound defaults from the external interfaces section.
#[derive(Clone, Copy)]
pub struct Config<'a> {
    /// The interfaces this state hosts, each with a distinct [`IfaceId`].
    pub interfaces: &'a [InterfaceConfig<'a>],
    /// `(mac, ip)` pairs answered by the RARP responder (C9), shared across interfaces.
    pub reverse_map: &'a [(MacAddr, IpV4Addr)],
    /// Default time-to-live for a newly merged Dynamic cache entry, in milliseconds.
    pub dyn_ttl_ms: u64,
    /// Time-to-live for a negative-cache record, in milliseconds.
    pub neg_ttl_ms: u64,
    /// Width of the flood-control sliding window, in milliseconds.
    pub flood_window_ms: u64,
    /// Maximum outbound requests for one target within a flood-control window.
    pub flood_max: u32,
    /// Minimum spacing between retransmissions of a pending request, in milliseconds.
    pub retry_interval_ms: u64,
    /// Number of retransmissions attempted before a pending request gives up.
    pub max_attempts: u32,
}

impl<'a> Config<'a> {
    /// The default configuration from the external interfaces section: no interfaces, no
    /// reverse map entries, and the stated default timings. Combine with struct-update syntax
    /// (`Config { interfaces: &[...], ..Config::defaults() }`) to supply just what differs.
    pub fn defaults() -> Self {
        Config {
            interfaces: &[],
            reverse_map: &[],
            dyn_ttl_ms: 300_000,
            neg_ttl_ms: 60_000,
            flood_window_ms: 1_000,
            flood_max: 5,
            retry_interval_ms: 1_000,
            max_attempts: 3,
        }
    }
}

impl<'a> Default for Config<'a> {
    fn default() -> Self {
        Self::defaults()
    }
}
