//! The processor entry point (C11) and multi-interface dispatcher (C10): composes the wire
//! codec, validation, caches, flood control, pending queue, and ACD into the crate's single
//! pure surface — `init`, `step`, `request`, `lookup`, `tick`, `start_dad`.
//!
//! Every entry point here takes the current [`State`] by value and returns a new one: there
//! is no interior mutability and no implicit global, so two calls with identical arguments
//! always produce identical results, down to the byte-identical reply frame (the determinism
//! requirement). Time and randomness are both explicit parameters; nothing here reads a
//! clock or an entropy source on its own.

use crate::acd::{AcdAction, AcdState};
use crate::arp::{ArpOperation, ArpPayload};
use crate::cache::MergeOutcome;
use crate::config::Config;
use crate::enet::{self, EtherType, Frame};
use crate::error::{ConfigError, Event};
use crate::flood::FloodTable;
use crate::iface::{IfaceId, Interface};
use crate::rarp::ReverseMap;
use crate::{IpV4Addr, MacAddr, MAX_IFACES, MAX_PENDING};

/// Upper bound on the number of frames a single [`tick`] call can produce: per interface, up
/// to [`MAX_PENDING`] retransmissions plus at most one Address Conflict Detection action.
pub const MAX_TICK_FRAMES: usize = MAX_IFACES * (MAX_PENDING + 1);

/// The outcome of a [`crate::lookup`] call: a live binding, a remembered failure, or neither.
///
/// A null sentinel is deliberately not used here: `Negative` and `Unknown` differ
/// semantically (one suppresses a fresh query, the other does not) and collapsing them would
/// lose that distinction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// `ip` currently resolves to this hardware address.
    Resolved(MacAddr),
    /// `ip` recently failed to resolve and the negative-cache TTL has not yet elapsed.
    Negative,
    /// `ip` has neither a cache entry nor a negative-cache record.
    Unknown,
}

/// The up-to-[`MAX_TICK_FRAMES`] outbound frames a [`tick`] call produced, in no particular
/// cross-interface order. Fixed-capacity since this crate has no allocator.
pub struct TickOutput {
    frames: [Option<Frame>; MAX_TICK_FRAMES],
    count: usize,
}

impl TickOutput {
    fn empty() -> Self {
        TickOutput {
            frames: [None; MAX_TICK_FRAMES],
            count: 0,
        }
    }

    fn push(&mut self, frame: Frame) {
        if self.count < MAX_TICK_FRAMES {
            self.frames[self.count] = Some(frame);
            self.count += 1;
        }
    }

    /// The frames produced, in emission order.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames[..self.count].iter().flatten()
    }

    /// Number of frames produced.
    pub fn len(&self) -> usize {
        self.count
    }

    /// True iff no frames were produced.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// The complete state of this engine: every interface's cache, negative cache, pending
/// queue, and Address Conflict Detection state, plus the flood table and RARP reverse map
/// shared across all of them.
///
/// Every field is `Copy`, so `State` is only `Clone` by choice: at the bounds in §3 an
/// `Interface` alone is tens of kilobytes, and a bare `Copy` derive would make a full
/// duplication look as cheap as an integer assignment. Threading it by value through `step`
/// and `tick` (per the pure-step design commitment) still moves rather than deep-copies a
/// caller's existing value; only an explicit `.clone()` pays the real cost.
pub struct State {
    interfaces: [Option<Interface>; MAX_IFACES],
    flood_table: FloodTable,
    reverse_map: ReverseMap,
    dyn_ttl_ms: u64,
    neg_ttl_ms: u64,
    flood_window_ms: u64,
    flood_max: u32,
    retry_interval_ms: u64,
    max_attempts: u32,
}

impl Clone for State {
    fn clone(&self) -> Self {
        State {
            interfaces: self.interfaces,
            flood_table: self.flood_table,
            reverse_map: self.reverse_map,
            dyn_ttl_ms: self.dyn_ttl_ms,
            neg_ttl_ms: self.neg_ttl_ms,
            flood_window_ms: self.flood_window_ms,
            flood_max: self.flood_max,
            retry_interval_ms: self.retry_interval_ms,
            max_attempts: self.max_attempts,
        }
    }
}

impl State {
    fn index_of(&self, iface_id: IfaceId) -> Option<usize> {
        self.interfaces.iter().position(|s| matches!(s, Some(i) if i.id == iface_id))
    }

    /// Borrow one interface's full state, for callers that want to inspect its cache, ACD
    /// state, or `last_event` directly rather than only through `lookup`.
    pub fn interface(&self, iface_id: IfaceId) -> Option<&Interface> {
        self.index_of(iface_id).and_then(move |idx| self.interfaces[idx].as_ref())
    }

    /// Install (or replace) a Static cache entry on `iface_id` from outside the hot path.
    /// Returns `false` if the interface is unknown or its cache is already full.
    pub fn add_static(&mut self, iface_id: IfaceId, ip: IpV4Addr, mac: MacAddr) -> bool {
        match self.index_of(iface_id).and_then(|idx| self.interfaces[idx].as_mut()) {
            Some(iface) => iface.cache.insert_static(ip, mac),
            None => false,
        }
    }

    /// Remove the cache entry for `ip` on `iface_id`, Static or Dynamic. Returns `false` if
    /// the interface is unknown or held no entry for `ip`.
    pub fn remove_entry(&mut self, iface_id: IfaceId, ip: IpV4Addr) -> bool {
        match self.index_of(iface_id).and_then(|idx| self.interfaces[idx].as_mut()) {
            Some(iface) => iface.cache.remove(ip),
            None => false,
        }
    }

    /// Remove every Dynamic cache entry on `iface_id`, keeping Static entries in place.
    /// Returns `false` if the interface is unknown.
    pub fn flush_dynamic(&mut self, iface_id: IfaceId) -> bool {
        match self.index_of(iface_id).and_then(|idx| self.interfaces[idx].as_mut()) {
            Some(iface) => {
                iface.cache.flush_dynamic();
                true
            }
            None => false,
        }
    }
}

/// Build a fresh [`State`] from a [`Config`]: copy every interface and its static entries
/// into owned, fixed-capacity storage, and populate the shared RARP reverse map. Borrowed
/// config data is not retained past this call, so `State` carries no lifetime.
pub fn init(config: Config) -> Result<State, ConfigError> {
    if config.interfaces.len() > MAX_IFACES {
        return Err(ConfigError::TooManyInterfaces);
    }

    let mut interfaces: [Option<Interface>; MAX_IFACES] = [None; MAX_IFACES];
    for (slot, ic) in config.interfaces.iter().enumerate() {
        if interfaces[..slot].iter().flatten().any(|i: &Interface| i.id == ic.id) {
            return Err(ConfigError::DuplicateInterfaceId);
        }
        if ic.static_entries.len() > crate::MAX_CACHE {
            return Err(ConfigError::TooManyStaticEntries);
        }

        let mut iface = Interface::new(ic.id, ic.mac, ic.ip, ic.subnet, ic.rarp_enabled);
        if let Some(vlan) = ic.vlan {
            iface = iface.with_vlan(vlan);
        }
        for (ip, mac) in ic.static_entries {
            if !iface.cache.insert_static(*ip, *mac) {
                return Err(ConfigError::TooManyStaticEntries);
            }
        }
        interfaces[slot] = Some(iface);
    }

    if config.reverse_map.len() > crate::MAX_REVERSE {
        return Err(ConfigError::TooManyReverseEntries);
    }
    let mut reverse_map = ReverseMap::new();
    for (mac, ip) in config.reverse_map {
        if !reverse_map.insert(*mac, *ip) {
            return Err(ConfigError::TooManyReverseEntries);
        }
    }

    Ok(State {
        interfaces,
        flood_table: FloodTable::new(),
        reverse_map,
        dyn_ttl_ms: config.dyn_ttl_ms,
        neg_ttl_ms: config.neg_ttl_ms,
        flood_window_ms: config.flood_window_ms,
        flood_max: config.flood_max,
        retry_interval_ms: config.retry_interval_ms,
        max_attempts: config.max_attempts,
    })
}

/// The address this interface currently cares about for conflict purposes: the candidate or
/// bound address under Address Conflict Detection if one is active, or else the interface's
/// own configured address. Falling back to `own_ip` keeps the plain §4.2 rule 5 self-check
/// ("sender claims our own IP with a foreign MAC") in force even when no `start_dad` call is
/// in flight, which is the common steady-state case.
fn conflict_candidate(iface: &Interface) -> IpV4Addr {
    iface.acd_state.candidate_ip().unwrap_or(iface.own_ip)
}

/// True iff `payload` is a conflict signal for `iface`'s candidate/bound address: either a
/// Reply or gratuitous Request claiming that address from a foreign MAC (§4.2 rule 5, and
/// §4.8's "Bound: a conflicting packet ... arrives"), or — only reachable while `Probing` —
/// another host's probe for the same still-unclaimed candidate (§4.8's "a Request from
/// another MAC probing the same IP arrives").
fn is_conflicting(iface: &Interface, payload: &ArpPayload) -> bool {
    if payload.sender_hw == iface.own_mac {
        return false;
    }
    let candidate = conflict_candidate(iface);
    match payload.operation {
        ArpOperation::Reply => payload.sender_proto == candidate,
        ArpOperation::Request => {
            payload.sender_proto == candidate || (payload.sender_proto.is_unspecified() && payload.target_proto == candidate)
        }
        ArpOperation::RarpRequest | ArpOperation::RarpReply => false,
    }
}

fn build_request(iface: &Interface, sender_ip: IpV4Addr, target_ip: IpV4Addr) -> Frame {
    let payload = ArpPayload::new(ArpOperation::Request, iface.own_mac, sender_ip, MacAddr::ZERO, target_ip);
    enet::encap(&payload.serialize(), iface.own_mac, MacAddr::BROADCAST, EtherType::Arp, iface.vlan)
}

fn rarp_reply(reverse_map: &ReverseMap, iface: &Interface, payload: &ArpPayload, vlan: Option<crate::enet::VlanTag>) -> Option<Frame> {
    let resolved_ip = reverse_map.lookup(payload.target_hw)?;
    let reply = ArpPayload::new(ArpOperation::RarpReply, iface.own_mac, iface.own_ip, payload.sender_hw, resolved_ip);
    Some(enet::encap(&reply.serialize(), iface.own_mac, payload.sender_hw, EtherType::Rarp, vlan))
}

/// Process one received Ethernet frame on `iface_id` at `now_ms`, per §4.10:
///
/// 1. decapsulate and CRC-check the frame;
/// 2. require EtherType ARP or RARP;
/// 3. locate the interface;
/// 4. validate the payload (§4.2);
/// 5. dispatch on operation: merge (§4.3) for Request/Reply, RARP lookup (§4.9) for
///    RARP-Request, feeding any conflict signal to Address Conflict Detection first;
/// 6. encapsulate a reply if one was produced, copying the inbound VLAN tag if present.
///
/// Any failure at steps 1–4 returns `(state, None)` with no state change beyond what was
/// already true (aging and retries happen only in [`tick`], never here).
pub fn step(mut state: State, iface_id: IfaceId, frame_bytes: &[u8], now_ms: u64) -> (State, Option<Frame>) {
    let decapsulated = match enet::decap(frame_bytes) {
        Ok(d) => d,
        Err(_) => return (state, None),
    };
    if decapsulated.ethertype().is_none() {
        return (state, None);
    }
    let idx = match state.index_of(iface_id) {
        Some(idx) => idx,
        None => return (state, None),
    };
    let payload = match ArpPayload::parse(decapsulated.payload) {
        Ok(p) => p,
        Err(_) => return (state, None),
    };

    let mut iface = match state.interfaces[idx] {
        Some(iface) => iface,
        None => return (state, None),
    };

    if crate::validate::validate(&iface, &payload).is_err() {
        return (state, None);
    }

    if payload.operation.is_arp() && is_conflicting(&iface, &payload) {
        let (next_acd, action) = iface.acd_state.on_conflict(now_ms);
        iface.acd_state = next_acd;
        if action.is_some() {
            iface.notify(Event::DadDefending);
        } else if iface.acd_state.is_conflict() {
            iface.notify(Event::DadConflict);
        }
        state.interfaces[idx] = Some(iface);
        return (state, None);
    }

    let reply = match payload.operation {
        ArpOperation::Request | ArpOperation::Reply => {
            let sip = payload.sender_proto;
            let smac = payload.sender_hw;
            let for_us = payload.target_proto == iface.own_ip;

            if for_us || iface.cache.contains(sip) {
                match iface.cache.merge(sip, smac, now_ms, state.dyn_ttl_ms) {
                    MergeOutcome::Updated | MergeOutcome::Inserted => {
                        iface.neg_cache.remove(sip);
                        iface.pending.fulfill(sip);
                    }
                    MergeOutcome::StaticViolation => iface.notify(Event::StaticViolation),
                    MergeOutcome::CacheFull => iface.notify(Event::CacheFull),
                }
            }

            if payload.operation == ArpOperation::Request && for_us {
                let reply_payload = ArpPayload::new(ArpOperation::Reply, iface.own_mac, iface.own_ip, smac, sip);
                Some(enet::encap(&reply_payload.serialize(), iface.own_mac, smac, EtherType::Arp, decapsulated.vlan))
            } else {
                None
            }
        }
        ArpOperation::RarpRequest => rarp_reply(&state.reverse_map, &iface, &payload, decapsulated.vlan),
        ArpOperation::RarpReply => None,
    };

    state.interfaces[idx] = Some(iface);
    (state, reply)
}

/// Request resolution of `target_ip` on `iface_id`. A pending entry is always registered (or
/// left alone if one is already outstanding) so that `tick` continues to track it regardless
/// of whether a frame goes out this call; the frame itself is only emitted if flood control
/// allows it (§4.6), since the flood table is the one thing in this crate shared across every
/// interface and every call site that can originate a Request.
pub fn request(mut state: State, iface_id: IfaceId, target_ip: IpV4Addr, now_ms: u64) -> (State, Option<Frame>) {
    let idx = match state.index_of(iface_id) {
        Some(idx) => idx,
        None => return (state, None),
    };
    let mut iface = match state.interfaces[idx] {
        Some(iface) => iface,
        None => return (state, None),
    };

    iface.pending.register(target_ip, now_ms);

    let allowed = state
        .flood_table
        .allow_request(target_ip, now_ms, state.flood_window_ms, state.flood_max);

    let frame = if allowed {
        Some(build_request(&iface, iface.own_ip, target_ip))
    } else {
        iface.notify(Event::Flooded);
        None
    };

    state.interfaces[idx] = Some(iface);
    (state, frame)
}

/// Look up the current resolution for `ip` on `iface_id`: a live cache entry, an unexpired
/// negative-cache record, or neither.
pub fn lookup(state: &State, iface_id: IfaceId, ip: IpV4Addr, now_ms: u64) -> Resolution {
    let Some(iface) = state.interface(iface_id) else {
        return Resolution::Unknown;
    };
    if let Some(mac) = iface.cache.lookup(ip, now_ms) {
        return Resolution::Resolved(mac);
    }
    if iface.neg_cache.is_negative(ip, now_ms) {
        return Resolution::Negative;
    }
    Resolution::Unknown
}

/// Advance every interface's caches, pending queue, and Address Conflict Detection state to
/// `now_ms`, returning whatever outbound frames that produces. Retries are not gated by the
/// flood table: a pending request's own `retry_interval_ms`/`max_attempts` bound already
/// limit how often and how many times this crate re-requests the same address, independent of
/// the flood table's job of bounding requests that arrive through [`request`].
pub fn tick(mut state: State, now_ms: u64) -> (State, TickOutput) {
    let mut out = TickOutput::empty();
    let neg_ttl_ms = state.neg_ttl_ms;
    let retry_interval_ms = state.retry_interval_ms;
    let max_attempts = state.max_attempts;

    for slot in state.interfaces.iter_mut() {
        let Some(iface) = slot.as_mut() else { continue };

        iface.cache.age(now_ms);
        iface.neg_cache.age(now_ms);

        let sweep = iface.pending.sweep(now_ms, retry_interval_ms, max_attempts);
        for ip in sweep.to_retry.iter().flatten() {
            out.push(build_request(iface, iface.own_ip, *ip));
        }
        for ip in sweep.gave_up.iter().flatten() {
            iface.neg_cache.record_failure(*ip, now_ms, neg_ttl_ms);
        }

        let (next_acd, action) = iface.acd_state.poll(now_ms);
        iface.acd_state = next_acd;
        if let Some(action) = action {
            let (sender_ip, target_ip) = match action {
                AcdAction::Probe { candidate_ip } => (IpV4Addr::UNSPECIFIED, candidate_ip),
                AcdAction::Announce { candidate_ip } | AcdAction::Defend { candidate_ip } => (candidate_ip, candidate_ip),
            };
            out.push(build_request(iface, sender_ip, target_ip));
        }
    }

    (state, out)
}

/// Begin Address Conflict Detection for `candidate_ip` on `iface_id`, seeding the jitter
/// stream from `rng_seed`. A no-op if the interface is unknown.
pub fn start_dad(mut state: State, iface_id: IfaceId, candidate_ip: IpV4Addr, now_ms: u64, rng_seed: u64) -> State {
    if let Some(idx) = state.index_of(iface_id) {
        if let Some(iface) = state.interfaces[idx].as_mut() {
            iface.acd_state = AcdState::start(candidate_ip, now_ms, rng_seed);
        }
    }
    state
}

/// Send a gratuitous ARP for `iface_id`'s own address (`sender_ip = target_ip = own_ip`),
/// outside of the ACD Announce/Defend lifecycle — e.g. after a cache flush or re-enabling a
/// previously down interface, where peers' stale cache entries should be refreshed without
/// re-running probe/announce from scratch.
pub fn gratuitous_announce(state: &State, iface_id: IfaceId) -> Option<Frame> {
    let iface = state.interface(iface_id)?;
    Some(build_request(iface, iface.own_ip, iface.own_ip))
}
