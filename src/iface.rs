//! Per-interface state: identity, bound addresses, and the bounded structures (C4/C5/C7)
//! and conflict-detection machine (C8) that belong to a single link.

use crate::acd::AcdState;
use crate::cache::Cache;
use crate::enet::VlanTag;
use crate::error::Event;
use crate::neg::NegCache;
use crate::pending::PendingTable;
use crate::{IpV4Addr, MacAddr, Subnet};

/// Identifies one of up to [`crate::MAX_IFACES`] interfaces hosted by a single [`crate::State`].
pub type IfaceId = u8;

/// Everything this engine knows about one Ethernet link: its own addresses, its resolution
/// and negative caches, its outstanding requests, and its Address Conflict Detection state.
#[derive(Clone, Copy)]
pub struct Interface {
    /// This interface's id, unique within its [`crate::State`].
    pub id: IfaceId,
    /// This interface's own hardware address.
    pub own_mac: MacAddr,
    /// This interface's own IPv4 address.
    pub own_ip: IpV4Addr,
    /// The configured subnet, if any; sender addresses outside it are rejected (§4.2 rule 3).
    pub subnet: Option<Subnet>,
    /// The 802.1Q tag this interface's frames carry, if the link is VLAN-tagged.
    pub vlan: Option<VlanTag>,
    /// Whether this interface answers RARP requests.
    pub rarp_enabled: bool,
    /// The resolution cache (C4).
    pub cache: Cache,
    /// The negative cache (C5).
    pub neg_cache: NegCache,
    /// Outstanding resolution requests (C7).
    pub pending: PendingTable,
    /// Address Conflict Detection state (C8) for this interface's own address.
    pub acd_state: AcdState,
    /// The most recent non-drop notice raised while processing this interface, for callers
    /// that want to know why without `step`/`tick` raising an exception to tell them.
    pub last_event: Option<Event>,
}

impl Interface {
    /// Build a freshly configured interface with empty caches, no pending requests, and ACD
    /// idle (the owner is expected to call [`crate::start_dad`] if it wants verified
    /// ownership of `ip` before using it).
    pub fn new(id: IfaceId, mac: MacAddr, ip: IpV4Addr, subnet: Option<Subnet>, rarp_enabled: bool) -> Self {
        Interface {
            id,
            own_mac: mac,
            own_ip: ip,
            subnet,
            vlan: None,
            rarp_enabled,
            cache: Cache::new(),
            neg_cache: NegCache::new(),
            pending: PendingTable::new(),
            acd_state: AcdState::idle(),
            last_event: None,
        }
    }

    /// Attach a VLAN tag to this interface's frames.
    pub fn with_vlan(mut self, vlan: VlanTag) -> Self {
        self.vlan = Some(vlan);
        self
    }

    /// Record a notice for external inspection, overwriting any previous one. `step`/`tick`
    /// only ever keep the most recent notice; callers that need a full history should poll
    /// after every call.
    pub fn notify(&mut self, event: Event) {
        self.last_event = Some(event);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn fresh_interface_has_empty_structures() {
        let i = Interface::new(0, MacAddr::new([0x02, 0, 0, 0, 0, 1]), IpV4Addr::new([10, 0, 0, 1]), None, false);
        assert_eq!(i.cache.len(), 0);
        assert_eq!(i.neg_cache.len(), 0);
        assert_eq!(i.pending.len(), 0);
        assert_eq!(i.acd_state, AcdState::Idle);
        assert_eq!(i.last_event, None);
    }

    #[test]
    fn notify_overwrites_previous_event() {
        let mut i = Interface::new(0, MacAddr::new([0x02, 0, 0, 0, 0, 1]), IpV4Addr::new([10, 0, 0, 1]), None, false);
        i.notify(Event::Flooded);
        i.notify(Event::CacheFull);
        assert_eq!(i.last_event, Some(Event::CacheFull));
    }
}
