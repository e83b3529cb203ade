//! Address Conflict Detection (C8, RFC 5227): Probe, Announce, Bound, Defend, Conflict.
//!
//! Every transition here is a pure function of the current state, the current time, and
//! (for probe spacing) the carried [`Rng`] stream; nothing sleeps or schedules a timer. The
//! caller drives this forward by calling [`AcdState::poll`] from [`crate::state::tick`] and
//! [`AcdState::on_conflict`] whenever the validation/merge path observes a conflicting sender
//! for the candidate address.

use crate::rng::Rng;
use crate::IpV4Addr;

/// Number of probes sent before announcing, per RFC 5227 §2.1.1.
pub const PROBE_NUM: u32 = 3;
/// Minimum spacing between probes, in milliseconds.
pub const PROBE_MIN_MS: u64 = 1000;
/// Maximum spacing between probes, in milliseconds.
pub const PROBE_MAX_MS: u64 = 2000;
/// Quiet period after the last probe before announcing, in milliseconds.
pub const PROBE_WAIT_MS: u64 = 1000;
/// Number of gratuitous announcements sent once probing completes cleanly.
pub const ANNOUNCE_NUM: u32 = 2;
/// Spacing between announcements, in milliseconds.
pub const ANNOUNCE_INTERVAL_MS: u64 = 2000;
/// How long a `Defending` interface waits for a repeat conflict before reverting to `Bound`.
pub const DEFEND_INTERVAL_MS: u64 = 10_000;

/// What, if anything, [`AcdState::poll`] or [`AcdState::on_conflict`] wants sent as an ARP
/// Request. The caller fills in hardware addresses and wraps it for the wire; this type only
/// carries which IPv4 address is the subject and what kind of announcement it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcdAction {
    /// Send a probe: `sender_ip = 0`, `target_ip = candidate_ip`.
    Probe {
        /// The address being probed for.
        candidate_ip: IpV4Addr,
    },
    /// Send a gratuitous announcement: `sender_ip = target_ip = candidate_ip`.
    Announce {
        /// The address being announced.
        candidate_ip: IpV4Addr,
    },
    /// Send a defense announcement after observing a conflict while `Bound`.
    Defend {
        /// The address being defended.
        candidate_ip: IpV4Addr,
    },
}

/// The Address Conflict Detection state machine for one interface's candidate address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcdState {
    /// No candidate address is under test.
    Idle,
    /// Sending up to [`PROBE_NUM`] probes, then waiting [`PROBE_WAIT_MS`] before announcing.
    Probing {
        /// The address under test.
        candidate_ip: IpV4Addr,
        /// Probes sent so far.
        sent: u32,
        /// When the next probe (or the move to `Announcing`) is due.
        next_due: u64,
        /// Jitter stream used to pick each probe's spacing.
        rng: Rng,
    },
    /// Sending [`ANNOUNCE_NUM`] gratuitous announcements, spaced by [`ANNOUNCE_INTERVAL_MS`].
    Announcing {
        /// The address being announced.
        candidate_ip: IpV4Addr,
        /// Announcements sent so far.
        sent: u32,
        /// When the next announcement (or the move to `Bound`) is due.
        next_due: u64,
    },
    /// Normal operation: the candidate address is ours and unchallenged.
    Bound {
        /// The bound address.
        candidate_ip: IpV4Addr,
    },
    /// A conflict was observed while `Bound`; one defense was sent and we are watching for a
    /// repeat within [`DEFEND_INTERVAL_MS`].
    Defending {
        /// The address being defended.
        candidate_ip: IpV4Addr,
        /// When the defend window closes and we revert to `Bound`.
        deadline: u64,
    },
    /// Terminal: a conflict was confirmed and this candidate must be abandoned by the caller.
    Conflict {
        /// The address that lost the conflict.
        candidate_ip: IpV4Addr,
    },
}

impl AcdState {
    /// No candidate under test.
    pub const fn idle() -> Self {
        AcdState::Idle
    }

    /// Begin probing `candidate_ip`, seeding the jitter stream from `seed`. The first probe
    /// is due immediately (at the next [`AcdState::poll`] call with `now >= now`).
    pub fn start(candidate_ip: IpV4Addr, now: u64, seed: u64) -> Self {
        AcdState::Probing {
            candidate_ip,
            sent: 0,
            next_due: now,
            rng: Rng::new(seed),
        }
    }

    /// The candidate/bound address this state is tracking, if any.
    pub fn candidate_ip(&self) -> Option<IpV4Addr> {
        match self {
            AcdState::Idle => None,
            AcdState::Probing { candidate_ip, .. }
            | AcdState::Announcing { candidate_ip, .. }
            | AcdState::Bound { candidate_ip }
            | AcdState::Defending { candidate_ip, .. }
            | AcdState::Conflict { candidate_ip } => Some(*candidate_ip),
        }
    }

    /// True iff the candidate address is bound and may be used normally.
    pub fn is_bound(&self) -> bool {
        matches!(self, AcdState::Bound { .. })
    }

    /// True iff this candidate was lost to a conflict and must be replaced by the caller.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AcdState::Conflict { .. })
    }

    /// Advance time, possibly producing an outbound probe/announcement and/or a state
    /// transition. Called once per [`crate::state::tick`].
    pub fn poll(self, now: u64) -> (AcdState, Option<AcdAction>) {
        match self {
            AcdState::Probing {
                candidate_ip,
                sent,
                next_due,
                mut rng,
            } => {
                if now < next_due {
                    return (
                        AcdState::Probing {
                            candidate_ip,
                            sent,
                            next_due,
                            rng,
                        },
                        None,
                    );
                }
                if sent >= PROBE_NUM {
                    return (
                        AcdState::Announcing {
                            candidate_ip,
                            sent: 0,
                            next_due: now,
                        },
                        None,
                    );
                }
                let spacing = rng.uniform_range(PROBE_MIN_MS, PROBE_MAX_MS);
                let new_sent = sent + 1;
                let next_due = if new_sent >= PROBE_NUM { now + PROBE_WAIT_MS } else { now + spacing };
                (
                    AcdState::Probing {
                        candidate_ip,
                        sent: new_sent,
                        next_due,
                        rng,
                    },
                    Some(AcdAction::Probe { candidate_ip }),
                )
            }
            AcdState::Announcing { candidate_ip, sent, next_due } => {
                if now < next_due {
                    return (AcdState::Announcing { candidate_ip, sent, next_due }, None);
                }
                if sent >= ANNOUNCE_NUM {
                    return (AcdState::Bound { candidate_ip }, None);
                }
                let new_sent = sent + 1;
                (
                    AcdState::Announcing {
                        candidate_ip,
                        sent: new_sent,
                        next_due: now + ANNOUNCE_INTERVAL_MS,
                    },
                    Some(AcdAction::Announce { candidate_ip }),
                )
            }
            AcdState::Defending { candidate_ip, deadline } => {
                if now >= deadline {
                    (AcdState::Bound { candidate_ip }, None)
                } else {
                    (AcdState::Defending { candidate_ip, deadline }, None)
                }
            }
            AcdState::Idle | AcdState::Bound { .. } | AcdState::Conflict { .. } => (self, None),
        }
    }

    /// A conflicting sender was observed for this interface's candidate/bound address at
    /// `now`. `Probing`/`Announcing` abandon the candidate outright; `Bound` starts defending;
    /// a second conflict while already `Defending` confirms the loss.
    pub fn on_conflict(self, now: u64) -> (AcdState, Option<AcdAction>) {
        match self {
            AcdState::Probing { candidate_ip, .. } | AcdState::Announcing { candidate_ip, .. } => {
                (AcdState::Conflict { candidate_ip }, None)
            }
            AcdState::Bound { candidate_ip } => (
                AcdState::Defending {
                    candidate_ip,
                    deadline: now + DEFEND_INTERVAL_MS,
                },
                Some(AcdAction::Defend { candidate_ip }),
            ),
            AcdState::Defending { candidate_ip, .. } => (AcdState::Conflict { candidate_ip }, None),
            AcdState::Idle | AcdState::Conflict { .. } => (self, None),
        }
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
    fn probes_then_announces_then_binds() {
        let mut s = AcdState::start(ip(1), 0, 42);
        let mut now = 0u64;
        let mut probes = 0;
        let mut announces = 0;
        for _ in 0..200 {
            let (next, action) = s.poll(now);
            s = next;
            match action {
                Some(AcdAction::Probe { .. }) => probes += 1,
                Some(AcdAction::Announce { .. }) => announces += 1,
                _ => {}
            }
            if s.is_bound() {
                break;
            }
            now += 500;
        }
        assert_eq!(probes, PROBE_NUM);
        assert_eq!(announces, ANNOUNCE_NUM);
        assert!(s.is_bound());
        assert_eq!(s.candidate_ip(), Some(ip(1)));
    }

    #[test]
    fn conflict_during_probing_is_terminal() {
        let s = AcdState::start(ip(1), 0, 1);
        let (s, action) = s.on_conflict(100);
        assert!(s.is_conflict());
        assert_eq!(action, None);
    }

    #[test]
    fn bound_conflict_enters_defending_then_returns_to_bound() {
        let s = AcdState::Bound { candidate_ip: ip(1) };
        let (s, action) = s.on_conflict(1000);
        assert_eq!(action, Some(AcdAction::Defend { candidate_ip: ip(1) }));
        assert!(matches!(s, AcdState::Defending { .. }));

        let (s, _) = s.poll(1000 + DEFEND_INTERVAL_MS);
        assert!(s.is_bound());
    }

    #[test]
    fn repeat_conflict_while_defending_is_terminal() {
        let s = AcdState::Bound { candidate_ip: ip(1) };
        let (s, _) = s.on_conflict(1000);
        let (s, action) = s.on_conflict(1500);
        assert!(s.is_conflict());
        assert_eq!(action, None);
    }

    #[test]
    fn idle_ignores_conflict() {
        let (s, action) = AcdState::idle().on_conflict(0);
        assert_eq!(s, AcdState::Idle);
        assert_eq!(action, None);
    }
}
