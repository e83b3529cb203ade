//! Link layer: Ethernet II framing, the optional 802.1Q VLAN tag, and CRC-32 validation.
//!
//! Diagram: <https://en.wikipedia.org/wiki/Ethernet_frame#Ethernet_II>
//!
//! This engine only ever carries one payload type — a 28-byte [`crate::arp::ArpPayload`] —
//! so unlike [`crate::arp`]'s teacher module this header is not generic over the payload; it
//! always builds or consumes a fixed [`FRAME_LEN`]-byte frame.

use crate::arp::ARP_PAYLOAD_LEN;
use crate::error::ParseError;
use crate::MacAddr;

use byte_struct::*;

/// EtherType values this crate dispatches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum EtherType {
    /// ARP.
    Arp = 0x0806,
    /// RARP.
    Rarp = 0x8035,
    /// 802.1Q VLAN tag marker: if this value is seen where an EtherType was expected, what
    /// follows is a VLAN tag control word, not the real EtherType.
    Vlan = 0x8100,
}

impl EtherType {
    fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0806 => Some(EtherType::Arp),
            0x8035 => Some(EtherType::Rarp),
            0x8100 => Some(EtherType::Vlan),
            _ => None,
        }
    }

    /// Pack into a big-endian (network) byte array.
    pub fn to_be_bytes(&self) -> [u8; 2] {
        (*self as u16).to_be_bytes()
    }
}

bitfields!(
    /// The 16-bit control word of an 802.1Q tag: 3-bit priority code point, 1-bit drop
    /// eligible indicator, 12-bit VLAN id.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    VlanControl: u16 {
        pub pcp: 3,
        pub dei: 1,
        pub vid: 12
    }
);

/// An 802.1Q VLAN tag: fixed TPID 0x8100 plus the PCP/DEI/VID control word.
#[derive(ByteStruct, Clone, Copy, Debug, PartialEq, Eq)]
#[byte_struct_be]
pub struct VlanTag {
    /// Tag protocol identifier; always 0x8100.
    pub tpid: u16,
    /// Priority/drop-eligible/VLAN-id control word.
    pub control: VlanControl,
}

impl VlanTag {
    /// Build a tag for the given VLAN id (12 bits; truncated if larger) with PCP/DEI zero.
    pub fn new(vid: u16) -> Self {
        VlanTag {
            tpid: EtherType::Vlan as u16,
            control: VlanControl::new().with_vid(vid & 0x0FFF),
        }
    }
}

/// The fixed (non-VLAN) part of an Ethernet II header: destination MAC, source MAC.
#[derive(ByteStruct, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EthernetHeader {
    /// Destination MAC address.
    pub dst_macaddr: MacAddr,
    /// Source MAC address.
    pub src_macaddr: MacAddr,
}

/// Minimum Ethernet payload length before the frame check sequence, per IEEE 802.3.
const MIN_PRE_CRC_LEN: usize = 60;
/// Length of the trailing CRC-32 frame check sequence.
const CRC_LEN: usize = 4;

/// Fixed length of any frame this engine builds or accepts: header (14 or 18 bytes with a
/// VLAN tag) + the 28-byte ARP payload, zero-padded up to [`MIN_PRE_CRC_LEN`], plus the
/// 4-byte CRC. Because the payload is always exactly 28 bytes, this total is 64 bytes
/// whether or not a VLAN tag is present.
pub const FRAME_LEN: usize = MIN_PRE_CRC_LEN + CRC_LEN;
static_assertions::const_assert!(FRAME_LEN == 64);

/// A fixed-size, CRC-appended, zero-padded Ethernet frame wrapping one ARP/RARP payload.
pub type Frame = [u8; FRAME_LEN];

/// A successfully decapsulated and CRC-validated frame. Note that `ethertype_raw` is
/// deliberately not restricted to `{Arp, Rarp}` here: whether an EtherType is one this engine
/// dispatches on is a *semantic* question for the caller (see the dispatcher's step 2), not a
/// structural one decap should fail on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decapsulated<'a> {
    /// Ethernet header (destination, source).
    pub header: EthernetHeader,
    /// The VLAN tag, if one was present.
    pub vlan: Option<VlanTag>,
    /// Raw EtherType that followed the (optional) VLAN tag.
    pub ethertype_raw: u16,
    /// The payload region, including any zero padding: at least [`ARP_PAYLOAD_LEN`] bytes.
    pub payload: &'a [u8],
}

impl<'a> Decapsulated<'a> {
    /// The EtherType as one of the values this engine recognizes, or `None` if it is
    /// something else (traffic this engine does not process).
    pub fn ethertype(&self) -> Option<EtherType> {
        EtherType::from_u16(self.ethertype_raw).filter(|et| !matches!(et, EtherType::Vlan))
    }
}

/// IEEE 802.3 CRC-32: polynomial 0xEDB88320 (reflected), initial value 0xFFFFFFFF, final XOR
/// 0xFFFFFFFF. Delegated to `crc32fast`, which implements exactly this table/initial/final
/// convention (the variant common to Ethernet, zlib, and gzip).
fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Wrap an ARP/RARP payload in an Ethernet II frame (with an optional 802.1Q tag), zero-pad
/// to the Ethernet minimum, and append the IEEE 802.3 CRC-32.
pub fn encap(
    payload: &[u8; ARP_PAYLOAD_LEN],
    src: MacAddr,
    dst: MacAddr,
    ethertype: EtherType,
    vlan: Option<VlanTag>,
) -> Frame {
    let mut frame = [0_u8; FRAME_LEN];
    let mut i = 0;

    frame[i..i + 6].copy_from_slice(&dst.to_be_bytes());
    i += 6;
    frame[i..i + 6].copy_from_slice(&src.to_be_bytes());
    i += 6;

    if let Some(tag) = vlan {
        let mut tag_bytes = [0_u8; 4];
        tag.write_bytes(&mut tag_bytes);
        frame[i..i + 4].copy_from_slice(&tag_bytes);
        i += 4;
    }

    frame[i..i + 2].copy_from_slice(&ethertype.to_be_bytes());
    i += 2;

    frame[i..i + ARP_PAYLOAD_LEN].copy_from_slice(payload);
    i += ARP_PAYLOAD_LEN;

    // Remaining bytes up to MIN_PRE_CRC_LEN are already zero from the initial fill; `i`
    // stops before them, so padding needs no explicit write.
    debug_assert!(i <= MIN_PRE_CRC_LEN);

    let checksum = crc32(&frame[0..MIN_PRE_CRC_LEN]);
    frame[MIN_PRE_CRC_LEN..FRAME_LEN].copy_from_slice(&checksum.to_be_bytes());

    frame
}

/// Parse an Ethernet II frame, validating its CRC-32 and locating the optional VLAN tag.
/// Tolerates non-zero padding bytes (only the declared minimum length and the CRC are
/// checked) and tolerates frames longer than [`FRAME_LEN`] (the last 4 bytes are always
/// taken as the CRC, and everything between the header and the CRC is the payload region).
pub fn decap(bytes: &[u8]) -> Result<Decapsulated<'_>, ParseError> {
    if bytes.len() < FRAME_LEN {
        return Err(ParseError::TooShort);
    }

    let pre_crc_len = bytes.len() - CRC_LEN;
    let expected_crc = u32::from_be_bytes([
        bytes[pre_crc_len],
        bytes[pre_crc_len + 1],
        bytes[pre_crc_len + 2],
        bytes[pre_crc_len + 3],
    ]);
    if crc32(&bytes[0..pre_crc_len]) != expected_crc {
        return Err(ParseError::BadCrc);
    }

    let mut dst = [0_u8; 6];
    dst.copy_from_slice(&bytes[0..6]);
    let mut src = [0_u8; 6];
    src.copy_from_slice(&bytes[6..12]);
    let header = EthernetHeader {
        dst_macaddr: MacAddr::new(dst),
        src_macaddr: MacAddr::new(src),
    };

    let tag_marker = u16::from_be_bytes([bytes[12], bytes[13]]);
    let (vlan, ethertype_offset) = if tag_marker == EtherType::Vlan as u16 {
        let control = VlanControl::read_bytes(&bytes[14..16]);
        (
            Some(VlanTag {
                tpid: tag_marker,
                control,
            }),
            16,
        )
    } else {
        (None, 12)
    };

    let ethertype_raw = u16::from_be_bytes([bytes[ethertype_offset], bytes[ethertype_offset + 1]]);
    let payload = &bytes[ethertype_offset + 2..pre_crc_len];
    Ok(Decapsulated {
        header,
        vlan,
        ethertype_raw,
        payload,
    })
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::arp::{ArpOperation, ArpPayload};
    use crate::IpV4Addr;

    fn sample_payload() -> [u8; ARP_PAYLOAD_LEN] {
        ArpPayload::new(
            ArpOperation::Request,
            MacAddr::new([2, 0, 0, 0, 0, 2]),
            IpV4Addr::new([10, 0, 0, 2]),
            MacAddr::ZERO,
            IpV4Addr::new([10, 0, 0, 1]),
        )
        .serialize()
    }

    #[test]
    fn encap_decap_round_trip_untagged() {
        let src = MacAddr::new([2, 0, 0, 0, 0, 2]);
        let dst = MacAddr::BROADCAST;
        let frame = encap(&sample_payload(), src, dst, EtherType::Arp, None);
        assert_eq!(frame.len(), FRAME_LEN);

        let decoded = decap(&frame).expect("well-formed frame must decode");
        assert_eq!(decoded.header.src_macaddr, src);
        assert_eq!(decoded.header.dst_macaddr, dst);
        assert!(decoded.vlan.is_none());
        assert_eq!(decoded.ethertype(), Some(EtherType::Arp));
        assert_eq!(&decoded.payload[0..ARP_PAYLOAD_LEN], &sample_payload()[..]);
    }

    #[test]
    fn encap_decap_round_trip_vlan_tagged() {
        let src = MacAddr::new([2, 0, 0, 0, 0, 2]);
        let dst = MacAddr::new([2, 0, 0, 0, 0, 1]);
        let vlan = VlanTag::new(42);
        let frame = encap(&sample_payload(), src, dst, EtherType::Arp, Some(vlan));

        let decoded = decap(&frame).expect("well-formed tagged frame must decode");
        let tag = decoded.vlan.expect("vlan tag must round-trip");
        assert_eq!(tag.control.vid(), 42);
    }

    #[test]
    fn rejects_bad_crc() {
        let mut frame = encap(&sample_payload(), MacAddr::ZERO, MacAddr::BROADCAST, EtherType::Arp, None);
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        assert_eq!(decap(&frame), Err(ParseError::BadCrc));
    }

    #[test]
    fn rejects_too_short() {
        let bytes = [0_u8; FRAME_LEN - 1];
        assert_eq!(decap(&bytes), Err(ParseError::TooShort));
    }

    #[test]
    fn tolerates_nonzero_padding() {
        let mut frame = encap(&sample_payload(), MacAddr::ZERO, MacAddr::BROADCAST, EtherType::Arp, None);
        // Flip a padding byte (between the ARP payload and the CRC) and recompute the CRC;
        // the frame must still decode since padding content is not checked, only its presence.
        let pad_index = 14 + ARP_PAYLOAD_LEN;
        frame[pad_index] = 0xAA;
        let checksum = crc32(&frame[0..MIN_PRE_CRC_LEN]);
        frame[MIN_PRE_CRC_LEN..FRAME_LEN].copy_from_slice(&checksum.to_be_bytes());

        let decoded = decap(&frame).expect("non-zero padding must be tolerated");
        assert_eq!(&decoded.payload[0..ARP_PAYLOAD_LEN], &sample_payload()[..]);
    }
}
