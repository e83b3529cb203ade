//! The per-interface resolution cache: IP -> MAC bindings, the RFC 826 merge algorithm, and
//! bounded, oldest-first Dynamic eviction.
//!
//! There is no allocator here, so the cache is a fixed-capacity array of optional slots
//! rather than a growable map; [`crate::MAX_CACHE`] is a hard ceiling, not a starting
//! capacity. A linear scan is adequate at these bounds and keeps the whole structure
//! `Copy`-friendly, which matters since [`crate::state::State`] is threaded by value through
//! every `step`.

use crate::{IpV4Addr, MacAddr, MAX_CACHE};

/// Whether a cache entry was installed by configuration (and therefore immutable from the
/// hot path) or learned from traffic (and therefore subject to aging and eviction).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Configured at [`crate::state::init`] time; never aged out or evicted, never updated
    /// by an incoming packet.
    Static,
    /// Learned from a validated incoming packet; subject to `ttl_ms` aging and eviction.
    Dynamic,
}

/// One IP -> MAC binding, with the bookkeeping the aging sweep and eviction policy need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// The bound IPv4 address.
    pub ip: IpV4Addr,
    /// The MAC address it currently resolves to.
    pub mac: MacAddr,
    /// Monotonic millisecond timestamp this entry was last (re)installed.
    pub inserted_at: u64,
    /// Time-to-live in milliseconds; ignored for [`EntryKind::Static`] entries.
    pub ttl_ms: u64,
    /// Static or Dynamic; see [`EntryKind`].
    pub kind: EntryKind,
}

impl CacheEntry {
    fn is_expired(&self, now: u64) -> bool {
        matches!(self.kind, EntryKind::Dynamic) && now >= self.inserted_at.saturating_add(self.ttl_ms)
    }
}

/// Result of attempting to merge a sender binding into a [`Cache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// An existing Dynamic entry for this IP was refreshed in place.
    Updated,
    /// A new Dynamic entry was inserted (possibly evicting the oldest Dynamic entry).
    Inserted,
    /// The entry for this IP is Static; the incoming binding was ignored.
    StaticViolation,
    /// The cache had no room and every entry was Static, so nothing could be evicted.
    CacheFull,
}

/// A bounded table of IP -> MAC bindings for a single interface.
#[derive(Clone, Copy)]
pub struct Cache {
    slots: [Option<CacheEntry>; MAX_CACHE],
    len: usize,
}

impl Cache {
    /// An empty cache.
    pub const fn new() -> Self {
        Cache {
            slots: [None; MAX_CACHE],
            len: 0,
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True iff the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Look up the live binding for `ip`, treating an expired Dynamic entry as absent.
    pub fn lookup(&self, ip: IpV4Addr, now: u64) -> Option<MacAddr> {
        self.slots
            .iter()
            .flatten()
            .find(|e| e.ip == ip && !e.is_expired(now))
            .map(|e| e.mac)
    }

    /// True iff a slot for `ip` exists, Static or Dynamic, irrespective of TTL expiry. The
    /// merge algorithm (§4.3) uses this rather than [`Cache::lookup`] because "an entry for
    /// `sip` exists" is a structural question, not a liveness one: a not-yet-aged-out stale
    /// entry still takes the update branch rather than the insert-if-for-us branch.
    pub fn contains(&self, ip: IpV4Addr) -> bool {
        self.index_of(ip).is_some()
    }

    /// Install a Static entry at configuration time. Returns `false` if the cache is full.
    pub fn insert_static(&mut self, ip: IpV4Addr, mac: MacAddr) -> bool {
        if let Some(slot) = self.slot_for(ip) {
            self.slots[slot] = Some(CacheEntry {
                ip,
                mac,
                inserted_at: 0,
                ttl_ms: 0,
                kind: EntryKind::Static,
            });
            return true;
        }
        self.push(CacheEntry {
            ip,
            mac,
            inserted_at: 0,
            ttl_ms: 0,
            kind: EntryKind::Static,
        })
        .is_some()
    }

    /// Apply the RFC 826 merge rule for a validated sender binding observed at `now`:
    /// refresh an existing Dynamic entry in place, or insert a new Dynamic entry subject to
    /// the bound and eviction policy. A Static entry for `ip` is never touched.
    pub fn merge(&mut self, ip: IpV4Addr, mac: MacAddr, now: u64, ttl_ms: u64) -> MergeOutcome {
        if let Some(entry) = self.slots.iter_mut().flatten().find(|e| e.ip == ip) {
            return match entry.kind {
                EntryKind::Static => MergeOutcome::StaticViolation,
                EntryKind::Dynamic => {
                    entry.mac = mac;
                    entry.inserted_at = now;
                    entry.ttl_ms = ttl_ms;
                    MergeOutcome::Updated
                }
            };
        }

        let entry = CacheEntry {
            ip,
            mac,
            inserted_at: now,
            ttl_ms,
            kind: EntryKind::Dynamic,
        };
        match self.push(entry) {
            Some(_) => MergeOutcome::Inserted,
            None => MergeOutcome::CacheFull,
        }
    }

    /// Remove all expired Dynamic entries. Never changes the relative order of survivors and
    /// never increases `len`.
    pub fn age(&mut self, now: u64) {
        for slot in self.slots.iter_mut() {
            if let Some(entry) = slot {
                if entry.is_expired(now) {
                    *slot = None;
                    self.len -= 1;
                }
            }
        }
    }

    /// Remove the entry for `ip`, Static or Dynamic. Used by administrative flush operations.
    pub fn remove(&mut self, ip: IpV4Addr) -> bool {
        if let Some(idx) = self.index_of(ip) {
            self.slots[idx] = None;
            self.len -= 1;
            true
        } else {
            false
        }
    }

    /// Remove every Dynamic entry, keeping Static entries untouched.
    pub fn flush_dynamic(&mut self) {
        for slot in self.slots.iter_mut() {
            if matches!(slot, Some(e) if matches!(e.kind, EntryKind::Dynamic)) {
                *slot = None;
                self.len -= 1;
            }
        }
    }

    /// Iterate over the occupied entries.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.slots.iter().flatten()
    }

    fn index_of(&self, ip: IpV4Addr) -> Option<usize> {
        self.slots.iter().position(|s| matches!(s, Some(e) if e.ip == ip))
    }

    fn slot_for(&self, ip: IpV4Addr) -> Option<usize> {
        self.index_of(ip)
    }

    /// Insert `entry` into a free slot, evicting the oldest Dynamic entry (ties broken by
    /// lexicographically smaller IP) if the cache is full. Returns `None` only when the
    /// cache is full of Static entries and nothing is evictable.
    fn push(&mut self, entry: CacheEntry) -> Option<usize> {
        if let Some(idx) = self.slots.iter().position(|s| s.is_none()) {
            self.slots[idx] = Some(entry);
            self.len += 1;
            return Some(idx);
        }

        let evict = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                Some(e) if matches!(e.kind, EntryKind::Dynamic) => Some((i, e.inserted_at, e.ip)),
                _ => None,
            })
            .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.2 .0.cmp(&b.2 .0)))
            .map(|(i, _, _)| i)?;

        self.slots[evict] = Some(entry);
        Some(evict)
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    fn ip(n: u8) -> IpV4Addr {
        IpV4Addr::new([10, 0, 0, n])
    }

    fn mac(n: u8) -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, n])
    }

    #[test]
    fn merge_inserts_then_updates_in_place() {
        let mut c = Cache::new();
        assert_eq!(c.merge(ip(1), mac(1), 100, 1000), MergeOutcome::Inserted);
        assert_eq!(c.len(), 1);
        assert_eq!(c.merge(ip(1), mac(2), 200, 1000), MergeOutcome::Updated);
        assert_eq!(c.len(), 1);
        assert_eq!(c.lookup(ip(1), 200), Some(mac(2)));
    }

    #[test]
    fn static_entries_resist_merge() {
        let mut c = Cache::new();
        c.insert_static(ip(1), mac(1));
        assert_eq!(c.merge(ip(1), mac(9), 100, 1000), MergeOutcome::StaticViolation);
        assert_eq!(c.lookup(ip(1), 100), Some(mac(1)));
    }

    #[test]
    fn aging_expires_dynamic_only() {
        let mut c = Cache::new();
        c.insert_static(ip(1), mac(1));
        c.merge(ip(2), mac(2), 0, 100);
        assert_eq!(c.lookup(ip(2), 50), Some(mac(2)));
        c.age(200);
        assert_eq!(c.len(), 1);
        assert_eq!(c.lookup(ip(2), 200), None);
        assert_eq!(c.lookup(ip(1), 200), Some(mac(1)));
    }

    fn ip_n(i: u16) -> IpV4Addr {
        IpV4Addr::new([10, (i >> 8) as u8, (i & 0xFF) as u8, 0])
    }

    #[test]
    fn eviction_prefers_oldest_dynamic_entry() {
        let mut c = Cache::new();
        for i in 0..MAX_CACHE as u16 {
            c.merge(ip_n(i), mac(1), i as u64, 1_000_000);
        }
        assert_eq!(c.len(), MAX_CACHE);
        let outcome = c.merge(ip(250), mac(250), 1_000_000, 1_000_000);
        assert_eq!(outcome, MergeOutcome::Inserted);
        assert_eq!(c.len(), MAX_CACHE);
        assert_eq!(c.lookup(ip_n(0), 1_000_001), None);
    }

    #[test]
    fn cache_full_of_static_rejects_insert() {
        let mut c = Cache::new();
        for i in 0..MAX_CACHE as u16 {
            assert!(c.insert_static(ip_n(i), mac(1)));
        }
        let outcome = c.merge(ip(250), mac(250), 1, 1000);
        assert_eq!(outcome, MergeOutcome::CacheFull);
        assert_eq!(c.len(), MAX_CACHE);
    }

    #[test]
    fn contains_ignores_expiry() {
        let mut c = Cache::new();
        c.merge(ip(1), mac(1), 0, 100);
        assert!(c.contains(ip(1)));
        c.age(1000);
        assert!(!c.contains(ip(1)));
    }

    #[test]
    fn flush_dynamic_keeps_static() {
        let mut c = Cache::new();
        c.insert_static(ip(1), mac(1));
        c.merge(ip(2), mac(2), 0, 1000);
        c.flush_dynamic();
        assert_eq!(c.len(), 1);
        assert_eq!(c.lookup(ip(1), 0), Some(mac(1)));
        assert_eq!(c.lookup(ip(2), 0), None);
    }
}
