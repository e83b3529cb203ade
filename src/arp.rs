//! The 28-byte ARP/RARP payload: construction, byte-exact serialization, and validating parse.
//!
//! ARP is not a distinct network layer, but it is required for most IPv4-over-Ethernet
//! networks to function: a socket abstraction frequently needs the link-layer address of its
//! next hop resolved before it can send anything, even though routing itself may not need it.
//!
//! This module only constructs and parses the 28-byte payload defined by
//! <https://en.wikipedia.org/wiki/Address_Resolution_Protocol>; see [`crate::enet`] for how it
//! is wrapped in an Ethernet (and optionally 802.1Q) frame, and [`crate::state`] for the
//! merge/validate state machine that decides what to do with one.

use crate::error::ParseError;
use crate::{IpV4Addr, MacAddr};

use static_assertions::const_assert;
use ufmt::derive::uDebug;

/// Hardware type value for Ethernet, the only one this crate understands.
pub const HTYPE_ETHERNET: u16 = 1;
/// Protocol type value for IPv4, the only one this crate understands.
pub const PTYPE_IPV4: u16 = 0x0800;
/// Required hardware address length (standard MAC).
pub const HLEN_MAC: u8 = 6;
/// Required protocol address length (IPv4).
pub const PLEN_IPV4: u8 = 4;

/// Length of the ARP payload on the wire, per the data model.
pub const ARP_PAYLOAD_LEN: usize = 28;
const_assert!(ARP_PAYLOAD_LEN == 2 + 2 + 1 + 1 + 2 + 6 + 4 + 6 + 4);

/// An ARP or RARP message body for IPv4-over-Ethernet: hardware type, protocol type, address
/// lengths, operation, and the four (MAC, IP) sender/target pairs. Exactly 28 bytes on the
/// wire; see [`ArpPayload::parse`] / [`ArpPayload::serialize`].
#[derive(Clone, Copy, uDebug, Debug, PartialEq, Eq)]
pub struct ArpPayload {
    /// Hardware type; always [`HTYPE_ETHERNET`] after a successful parse.
    pub htype: u16,
    /// Protocol type; always [`PTYPE_IPV4`] after a successful parse.
    pub ptype: u16,
    /// Hardware address length; always [`HLEN_MAC`] after a successful parse.
    pub hlen: u8,
    /// Protocol address length; always [`PLEN_IPV4`] after a successful parse.
    pub plen: u8,
    /// Request, Reply, RarpRequest, or RarpReply.
    pub operation: ArpOperation,
    /// Sender hardware (MAC) address.
    pub sender_hw: MacAddr,
    /// Sender protocol (IPv4) address.
    pub sender_proto: IpV4Addr,
    /// Target hardware (MAC) address.
    pub target_hw: MacAddr,
    /// Target protocol (IPv4) address.
    pub target_proto: IpV4Addr,
}

impl ArpPayload {
    /// Build a well-formed payload from its semantic fields; `htype`/`ptype`/`hlen`/`plen`
    /// are filled in with the only values this crate ever emits.
    pub fn new(
        operation: ArpOperation,
        sender_hw: MacAddr,
        sender_proto: IpV4Addr,
        target_hw: MacAddr,
        target_proto: IpV4Addr,
    ) -> Self {
        ArpPayload {
            htype: HTYPE_ETHERNET,
            ptype: PTYPE_IPV4,
            hlen: HLEN_MAC,
            plen: PLEN_IPV4,
            operation,
            sender_hw,
            sender_proto,
            target_hw,
            target_proto,
        }
    }

    /// Serialize into the 28-byte big-endian wire representation.
    pub fn serialize(&self) -> [u8; ARP_PAYLOAD_LEN] {
        let mut out = [0_u8; ARP_PAYLOAD_LEN];
        out[0..2].copy_from_slice(&self.htype.to_be_bytes());
        out[2..4].copy_from_slice(&self.ptype.to_be_bytes());
        out[4] = self.hlen;
        out[5] = self.plen;
        out[6..8].copy_from_slice(&self.operation.to_be_bytes());
        out[8..14].copy_from_slice(&self.sender_hw.to_be_bytes());
        out[14..18].copy_from_slice(&self.sender_proto.to_be_bytes());
        out[18..24].copy_from_slice(&self.target_hw.to_be_bytes());
        out[24..28].copy_from_slice(&self.target_proto.to_be_bytes());
        out
    }

    /// Parse and validate a payload per the structural rules: at least 28 bytes, hardware
    /// type 1, protocol type 0x0800, address lengths (6, 4), and a recognized operation.
    /// A payload longer than 28 bytes is accepted (the leading 28 bytes are read; trailing
    /// bytes belong to Ethernet padding and are ignored here).
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < ARP_PAYLOAD_LEN {
            return Err(ParseError::TooShort);
        }

        let htype = u16::from_be_bytes([bytes[0], bytes[1]]);
        if htype != HTYPE_ETHERNET {
            return Err(ParseError::BadHwType);
        }

        let ptype = u16::from_be_bytes([bytes[2], bytes[3]]);
        if ptype != PTYPE_IPV4 {
            return Err(ParseError::BadProtoType);
        }

        let hlen = bytes[4];
        let plen = bytes[5];
        if hlen != HLEN_MAC || plen != PLEN_IPV4 {
            return Err(ParseError::BadLens);
        }

        let op_raw = u16::from_be_bytes([bytes[6], bytes[7]]);
        let operation = ArpOperation::from_u16(op_raw).ok_or(ParseError::BadOp)?;

        let mut sender_hw = [0_u8; 6];
        sender_hw.copy_from_slice(&bytes[8..14]);
        let mut sender_proto = [0_u8; 4];
        sender_proto.copy_from_slice(&bytes[14..18]);
        let mut target_hw = [0_u8; 6];
        target_hw.copy_from_slice(&bytes[18..24]);
        let mut target_proto = [0_u8; 4];
        target_proto.copy_from_slice(&bytes[24..28]);

        Ok(ArpPayload {
            htype,
            ptype,
            hlen,
            plen,
            operation,
            sender_hw: MacAddr::new(sender_hw),
            sender_proto: IpV4Addr::new(sender_proto),
            target_hw: MacAddr::new(target_hw),
            target_proto: IpV4Addr::new(target_proto),
        })
    }
}

/// ARP/RARP operation codes.
#[derive(Clone, Copy, uDebug, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum ArpOperation {
    /// ARP request: "who has target_proto? tell sender_proto".
    Request = 1,
    /// ARP reply: "sender_proto is at sender_hw".
    Reply = 2,
    /// RARP request: "who owns target_hw?".
    RarpRequest = 3,
    /// RARP reply: "target_hw is at target_proto".
    RarpReply = 4,
}

impl ArpOperation {
    /// Map a wire value to an operation, or `None` if it is not one of the four recognized
    /// codes (the caller turns that into [`ParseError::BadOp`]).
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(ArpOperation::Request),
            2 => Some(ArpOperation::Reply),
            3 => Some(ArpOperation::RarpRequest),
            4 => Some(ArpOperation::RarpReply),
            _ => None,
        }
    }

    /// True for the two ARP (non-RARP) operations.
    pub fn is_arp(&self) -> bool {
        matches!(self, ArpOperation::Request | ArpOperation::Reply)
    }

    /// True for the two RARP operations.
    pub fn is_rarp(&self) -> bool {
        matches!(self, ArpOperation::RarpRequest | ArpOperation::RarpReply)
    }

    /// Pack into a big-endian (network) byte array.
    pub fn to_be_bytes(&self) -> [u8; 2] {
        (*self as u16).to_be_bytes()
    }
}

/// EtherType / ARP protocol-type values this crate recognizes. Kept in the ARP module because
/// the ARP payload's `ptype` field shares the same numbering as Ethernet's `ethertype` field,
/// but the two are read from different offsets and must not be confused.
#[derive(Clone, Copy, uDebug, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum ProtocolType {
    /// Internet Protocol version 4.
    IpV4 = PTYPE_IPV4,
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    fn sample() -> ArpPayload {
        ArpPayload::new(
            ArpOperation::Request,
            MacAddr::new([7_u8; 6]),
            IpV4Addr::new([8_u8; 4]),
            MacAddr::new([9_u8; 6]),
            IpV4Addr::new([10_u8; 4]),
        )
    }

    /// Round trip: parse(serialize(p)) == Ok(p), for any well-formed payload.
    #[test]
    fn round_trip() {
        let msg = sample();
        let bytes = msg.serialize();
        assert_eq!(bytes.len(), ARP_PAYLOAD_LEN);
        let parsed = ArpPayload::parse(&bytes).expect("well-formed payload must parse");
        assert_eq!(parsed, msg);
    }

    #[test]
    fn rejects_too_short() {
        let bytes = [0_u8; 27];
        assert_eq!(ArpPayload::parse(&bytes), Err(ParseError::TooShort));
    }

    #[test]
    fn rejects_bad_hardware_type() {
        let mut bytes = sample().serialize();
        bytes[0..2].copy_from_slice(&6u16.to_be_bytes());
        assert_eq!(ArpPayload::parse(&bytes), Err(ParseError::BadHwType));
    }

    #[test]
    fn rejects_bad_protocol_type() {
        let mut bytes = sample().serialize();
        bytes[2..4].copy_from_slice(&0x86DDu16.to_be_bytes());
        assert_eq!(ArpPayload::parse(&bytes), Err(ParseError::BadProtoType));
    }

    #[test]
    fn rejects_bad_address_lengths() {
        let mut bytes = sample().serialize();
        bytes[4] = 8;
        assert_eq!(ArpPayload::parse(&bytes), Err(ParseError::BadLens));
    }

    #[test]
    fn rejects_bad_operation() {
        let mut bytes = sample().serialize();
        bytes[6..8].copy_from_slice(&9u16.to_be_bytes());
        assert_eq!(ArpPayload::parse(&bytes), Err(ParseError::BadOp));
    }

    #[test]
    fn tolerates_trailing_padding() {
        let mut bytes = std::vec![0_u8; 46];
        bytes[0..ARP_PAYLOAD_LEN].copy_from_slice(&sample().serialize());
        let parsed = ArpPayload::parse(&bytes).expect("trailing padding must be tolerated");
        assert_eq!(parsed, sample());
    }
}
