//! Structural and semantic checks an inbound ARP/RARP payload must pass before any state
//! mutation is attempted.
//!
//! This runs after [`crate::arp::ArpPayload::parse`] has already confirmed the payload is
//! well-formed; everything here is about whether a well-formed payload is *allowed*, not
//! whether it is well-formed.

use crate::arp::{ArpOperation, ArpPayload};
use crate::error::DropReason;
use crate::iface::Interface;

/// Outcome of validating a payload against an interface: either it is accepted for dispatch,
/// or it is dropped with a reason a caller can inspect.
pub type ValidationResult = Result<(), DropReason>;

/// Run the rules from the validation component against `payload` as received on `iface`.
///
/// Self-check (sender claims our own IP with a foreign MAC) is deliberately not a rejection
/// here: it is a conflict signal [`crate::state::step`] hands to Address Conflict Detection,
/// not a drop, so this function does not look at `iface.own_ip` at all.
pub fn validate(iface: &Interface, payload: &ArpPayload) -> ValidationResult {
    if payload.sender_hw.is_broadcast() {
        return Err(DropReason::BroadcastSource);
    }
    if payload.sender_hw.is_multicast() {
        return Err(DropReason::MulticastSource);
    }
    if payload.sender_hw.is_zero() {
        return Err(DropReason::ZeroSource);
    }

    if payload.operation.is_rarp() && !iface.rarp_enabled {
        return Err(DropReason::RarpDisabled);
    }

    if let Some(subnet) = iface.subnet {
        let is_probe = payload.sender_proto.is_unspecified() && payload.operation == ArpOperation::Request;
        if !is_probe && !subnet.contains(payload.sender_proto) {
            return Err(DropReason::CrossSubnet);
        }
    }

    Ok(())
}

/// True iff `payload` is a self-check conflict signal for `iface`: the sender claims our own
/// IP address but not our own hardware address. Callers feed this to Address Conflict
/// Detection rather than treating it as an ordinary drop.
pub fn is_self_conflict(iface: &Interface, payload: &ArpPayload) -> bool {
    payload.sender_proto == iface.own_ip && payload.sender_hw != iface.own_mac
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{IpV4Addr, MacAddr, Subnet};

    fn iface() -> Interface {
        Interface::new(
            0,
            MacAddr::new([0x02, 0, 0, 0, 0, 1]),
            IpV4Addr::new([10, 0, 0, 1]),
            Some(Subnet::new(IpV4Addr::new([10, 0, 0, 0]), 24)),
            false,
        )
    }

    fn payload_from(sender_hw: MacAddr, sender_ip: IpV4Addr) -> ArpPayload {
        ArpPayload::new(
            ArpOperation::Request,
            sender_hw,
            sender_ip,
            MacAddr::ZERO,
            IpV4Addr::new([10, 0, 0, 1]),
        )
    }

    #[test]
    fn accepts_well_formed_in_subnet_request() {
        let i = iface();
        let p = payload_from(MacAddr::new([0x02, 0, 0, 0, 0, 2]), IpV4Addr::new([10, 0, 0, 2]));
        assert_eq!(validate(&i, &p), Ok(()));
    }

    #[test]
    fn rejects_broadcast_source() {
        let i = iface();
        let p = payload_from(MacAddr::BROADCAST, IpV4Addr::new([10, 0, 0, 2]));
        assert_eq!(validate(&i, &p), Err(DropReason::BroadcastSource));
    }

    #[test]
    fn rejects_multicast_source() {
        let i = iface();
        let p = payload_from(MacAddr::new([0x01, 0, 0, 0, 0, 2]), IpV4Addr::new([10, 0, 0, 2]));
        assert_eq!(validate(&i, &p), Err(DropReason::MulticastSource));
    }

    #[test]
    fn rejects_zero_source() {
        let i = iface();
        let p = payload_from(MacAddr::ZERO, IpV4Addr::new([10, 0, 0, 2]));
        assert_eq!(validate(&i, &p), Err(DropReason::ZeroSource));
    }

    #[test]
    fn rejects_cross_subnet() {
        let i = iface();
        let p = payload_from(MacAddr::new([0x02, 0, 0, 0, 0, 2]), IpV4Addr::new([192, 168, 1, 2]));
        assert_eq!(validate(&i, &p), Err(DropReason::CrossSubnet));
    }

    #[test]
    fn exempts_acd_probe_source_from_subnet_check() {
        let i = iface();
        let p = payload_from(MacAddr::new([0x02, 0, 0, 0, 0, 2]), IpV4Addr::UNSPECIFIED);
        assert_eq!(validate(&i, &p), Ok(()));
    }

    #[test]
    fn rejects_rarp_when_disabled() {
        let i = iface();
        let mut p = payload_from(MacAddr::new([0x02, 0, 0, 0, 0, 2]), IpV4Addr::new([10, 0, 0, 2]));
        p.operation = ArpOperation::RarpRequest;
        assert_eq!(validate(&i, &p), Err(DropReason::RarpDisabled));
    }

    #[test]
    fn detects_self_conflict() {
        let i = iface();
        let p = payload_from(MacAddr::new([0x02, 0, 0, 0, 0, 9]), IpV4Addr::new([10, 0, 0, 1]));
        assert!(is_self_conflict(&i, &p));
    }

    #[test]
    fn no_self_conflict_from_own_mac() {
        let i = iface();
        let p = payload_from(MacAddr::new([0x02, 0, 0, 0, 0, 1]), IpV4Addr::new([10, 0, 0, 1]));
        assert!(!is_self_conflict(&i, &p));
    }
}
