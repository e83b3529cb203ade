//! Flood control (C6): a sliding-window rate limiter on outbound requests per target address,
//! shared across interfaces.
//!
//! Per the concurrency model, this table is exclusively owned by a single scheduler thread;
//! nothing here takes a lock.

use crate::{IpV4Addr, MAX_FLOOD};

#[derive(Clone, Copy)]
struct FloodEntry {
    target: IpV4Addr,
    window_start: u64,
    count: u32,
}

/// A bounded table tracking how many requests have been sent for each target IP within the
/// current window.
#[derive(Clone, Copy)]
pub struct FloodTable {
    slots: [Option<FloodEntry>; MAX_FLOOD],
    len: usize,
}

impl FloodTable {
    /// An empty flood table.
    pub const fn new() -> Self {
        FloodTable {
            slots: [None; MAX_FLOOD],
            len: 0,
        }
    }

    /// Number of tracked targets.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True iff no targets are tracked.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Decide whether a request for `target` may be sent at `now`, per the sliding-window
    /// policy: a fresh window opens every `window_ms`, allowing up to `max_per_window`
    /// requests within it.
    pub fn allow_request(&mut self, target: IpV4Addr, now: u64, window_ms: u64, max_per_window: u32) -> bool {
        if let Some(entry) = self.slots.iter_mut().flatten().find(|e| e.target == target) {
            if now.saturating_sub(entry.window_start) >= window_ms {
                entry.window_start = now;
                entry.count = 1;
                return true;
            }
            if entry.count < max_per_window {
                entry.count += 1;
                return true;
            }
            return false;
        }

        let entry = FloodEntry {
            target,
            window_start: now,
            count: 1,
        };
        if let Some(idx) = self.slots.iter().position(|s| s.is_none()) {
            self.slots[idx] = Some(entry);
            self.len += 1;
            return true;
        }

        if let Some(idx) = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|e| (i, e.window_start)))
            .min_by_key(|(_, ts)| *ts)
            .map(|(i, _)| i)
        {
            self.slots[idx] = Some(entry);
        }
        true
    }
}

impl Default for FloodTable {
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

    #[test]
    fn allows_up_to_max_within_window() {
        let mut f = FloodTable::new();
        for _ in 0..5 {
            assert!(f.allow_request(ip(1), 0, 1000, 5));
        }
        assert!(!f.allow_request(ip(1), 500, 1000, 5));
    }

    #[test]
    fn resets_after_window_elapses() {
        let mut f = FloodTable::new();
        for _ in 0..5 {
            assert!(f.allow_request(ip(1), 0, 1000, 5));
        }
        assert!(!f.allow_request(ip(1), 999, 1000, 5));
        assert!(f.allow_request(ip(1), 1000, 1000, 5));
    }

    #[test]
    fn tracks_targets_independently() {
        let mut f = FloodTable::new();
        for _ in 0..5 {
            assert!(f.allow_request(ip(1), 0, 1000, 5));
        }
        assert!(f.allow_request(ip(2), 0, 1000, 5));
    }
}
