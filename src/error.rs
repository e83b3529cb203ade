//! Non-fatal error and notice kinds.
//!
//! Nothing in this crate's hot path (`step`, `tick`, `request`, `lookup`) panics, indexes out
//! of bounds on attacker-controlled data, or returns `Result`: every malformed or disallowed
//! input degrades to a drop, and `step`'s only externally-visible failure mode is returning
//! `None` instead of a reply. These enums exist so that a caller who wants to know *why* a
//! frame was dropped can, via [`crate::iface::Interface::last_event`], without the core ever
//! raising an exception to do it.

use ufmt::derive::uDebug;

/// Why [`crate::arp::ArpPayload::parse`] or [`crate::enet::Frame::decap`] rejected a frame,
/// before any semantic validation or state mutation was attempted.
#[derive(Clone, Copy, uDebug, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than 28 bytes were available for the ARP payload.
    TooShort,
    /// The Ethernet frame's trailing CRC-32 did not match its contents.
    BadCrc,
    /// Hardware type was not 1 (Ethernet).
    BadHwType,
    /// Protocol type was not 0x0800 (IPv4).
    BadProtoType,
    /// Hardware/protocol address lengths were not (6, 4).
    BadLens,
    /// Operation code was not one of {1, 2, 3, 4}.
    BadOp,
}

/// Why a structurally valid ARP/RARP payload was dropped during semantic validation
/// (see the validation component).
#[derive(Clone, Copy, uDebug, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Sender hardware address was the broadcast address (amplification attempt).
    BroadcastSource,
    /// Sender hardware address had the multicast bit set (spoofing attempt).
    MulticastSource,
    /// Sender hardware address was all-zero.
    ZeroSource,
    /// The interface has a configured subnet and the sender's IP falls outside it.
    CrossSubnet,
    /// The frame's EtherType was neither 0x0806 (ARP) nor 0x8035 (RARP).
    BadEtherType,
    /// The frame named an interface id this [`crate::state::State`] does not have.
    UnknownInterface,
    /// The operation was a RARP operation but the interface has RARP disabled.
    RarpDisabled,
}

/// A non-drop notice raised while processing a frame or a tick, for callers that inspect
/// [`crate::iface::Interface::last_event`] after a [`crate::state::step`] or
/// [`crate::state::tick`] call. Unlike [`DropReason`], these do not by themselves mean the
/// frame produced no effect: a `StaticViolation` or `CacheFull` frame may still produce a
/// reply, and a `DadConflict` is a real state transition, not a drop.
#[derive(Clone, Copy, uDebug, Debug, PartialEq, Eq)]
pub enum Event {
    /// An incoming packet tried to update a Static cache entry; the update was ignored.
    StaticViolation,
    /// An outbound request was suppressed by the flood-control limiter.
    Flooded,
    /// A cache insert was dropped because the cache was full of Static entries.
    CacheFull,
    /// Address Conflict Detection observed a collision and moved to `Conflict`.
    DadConflict,
    /// A conflicting packet arrived while `Bound`; the interface moved to `Defending`.
    DadDefending,
}

/// Why [`crate::state::init`] rejected a configuration. Unlike the hot-path error kinds
/// above, this is reported via `Result` because a bad configuration is an administrative
/// mistake caught once at startup, not an adversarial input processed at line rate.
#[derive(Clone, Copy, uDebug, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// More interfaces were configured than [`crate::MAX_IFACES`] allows.
    TooManyInterfaces,
    /// Two configured interfaces share the same id.
    DuplicateInterfaceId,
    /// An interface's static-entry list is longer than [`crate::MAX_CACHE`].
    TooManyStaticEntries,
    /// The RARP reverse map is longer than [`crate::MAX_REVERSE`].
    TooManyReverseEntries,
}
