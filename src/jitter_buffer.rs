//! Latency-bounded RTP reordering buffer.
//!
//! Every operation is a pure value transition: `(buffer, input) -> (buffer',
//! outputs)`. No internal locking or timers — the owning task drives
//! [`JitterBuffer::handle_timeout`] using the `next_timer_ms` each call
//! returns.

use std::collections::BTreeMap;

/// 16-bit RTP sequence number comparison using serial arithmetic (RFC 1982):
/// `a` is "after" `b` iff `(a - b) mod 2^16` is in `(0, 2^15)`.
#[must_use]
pub fn seq_gt(a: u16, b: u16) -> bool {
    let diff = a.wrapping_sub(b);
    diff != 0 && diff < 0x8000
}

/// Distance from `from` to `to` going forward in serial order, i.e. the
/// `n` such that `from.wrapping_add(n) == to` for the smaller of the two
/// possible directions.
#[must_use]
pub fn seq_distance(from: u16, to: u16) -> u16 {
    to.wrapping_sub(from)
}

/// An inbound RTP packet as the jitter buffer sees it: opaque except for
/// its sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RtpPacket {
    pub sequence_number: u16,
    pub payload: Vec<u8>,
}

/// Drop classifications counted alongside released packets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JitterBufferStats {
    pub duplicate: u64,
    pub late: u64,
    pub empty_payload: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BufferState {
    Initial,
    Buffering,
}

struct Entry {
    packet: RtpPacket,
    arrival: u64,
}

/// A latency-bounded, wrap-safe packet reordering buffer.
pub struct JitterBuffer {
    state: BufferState,
    latency_ms: u64,
    store: BTreeMap<u16, Entry>,
    base_seq: u16,
    next_expected_seq: u16,
    stats: JitterBufferStats,
}

/// Default latency bound.
pub const DEFAULT_LATENCY_MS: u64 = 100;

impl JitterBuffer {
    /// Creates a buffer in the `initial` state with the given latency bound.
    #[must_use]
    pub fn new(latency_ms: u64) -> Self {
        Self {
            state: BufferState::Initial,
            latency_ms,
            store: BTreeMap::new(),
            base_seq: 0,
            next_expected_seq: 0,
            stats: JitterBufferStats::default(),
        }
    }

    #[must_use]
    pub fn latency_ms(&self) -> u64 {
        self.latency_ms
    }

    #[must_use]
    pub fn stats(&self) -> JitterBufferStats {
        self.stats
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Inserts `packet`, arriving at time `now` (milliseconds on an
    /// arbitrary monotonic clock the caller owns). Returns the packets
    /// released as a side effect of this insert, in sequence order, and the
    /// next timer deadline relative to `now` (`None` if nothing is pending).
    pub fn insert(&mut self, packet: RtpPacket, now: u64) -> (Vec<RtpPacket>, Option<u64>) {
        if packet.payload.is_empty() {
            self.stats.empty_payload += 1;
            return (vec![], self.next_timer(now));
        }

        if self.state == BufferState::Initial {
            self.base_seq = packet.sequence_number;
            self.next_expected_seq = packet.sequence_number;
            self.state = BufferState::Buffering;
        }

        let seq = packet.sequence_number;
        if seq_gt(self.next_expected_seq, seq) {
            self.stats.late += 1;
            return (vec![], self.next_timer(now));
        }
        if self.store.contains_key(&seq) {
            self.stats.duplicate += 1;
            return (vec![], self.next_timer(now));
        }

        self.store.insert(seq, Entry { packet, arrival: now });

        let released = self.release_contiguous_or_due(now);
        let timer = self.next_timer(now);
        (released, timer)
    }

    /// Releases the earliest pending packet unconditionally (its deadline
    /// has elapsed), then any contiguous successors.
    pub fn handle_timeout(&mut self, now: u64) -> (Vec<RtpPacket>, Option<u64>) {
        let mut released = Vec::new();
        if let Some(seq) = self.earliest_pending_seq() {
            let entry = self.store.remove(&seq).expect("key just observed");
            self.next_expected_seq = seq.wrapping_add(1);
            released.push(entry.packet);
            released.extend(self.release_contiguous_or_due(now));
        }
        (released, self.next_timer(now))
    }

    /// Drains all pending packets in sequence order and returns to
    /// `initial` state.
    pub fn flush(&mut self) -> Vec<RtpPacket> {
        let next_expected_seq = self.next_expected_seq;
        let mut entries: Vec<(u16, Entry)> = std::mem::take(&mut self.store).into_iter().collect();
        entries.sort_by_key(|(seq, _)| seq_distance(next_expected_seq, *seq));
        let released = entries.into_iter().map(|(_, e)| e.packet).collect();
        self.state = BufferState::Initial;
        self.base_seq = 0;
        self.next_expected_seq = 0;
        released
    }

    /// The pending entry closest ahead of `next_expected_seq` in serial
    /// order — the map's native ascending-key order is meaningless once
    /// pending sequence numbers straddle the 16-bit wrap boundary.
    fn earliest_pending_seq(&self) -> Option<u16> {
        self.store
            .keys()
            .copied()
            .min_by_key(|&seq| seq_distance(self.next_expected_seq, seq))
    }

    /// Releases the contiguous run starting at `next_expected_seq`, then any
    /// further packets whose `arrival + latency_ms` has already elapsed.
    fn release_contiguous_or_due(&mut self, now: u64) -> Vec<RtpPacket> {
        let mut released = Vec::new();

        loop {
            match self.store.remove(&self.next_expected_seq) {
                Some(entry) => {
                    released.push(entry.packet);
                    self.next_expected_seq = self.next_expected_seq.wrapping_add(1);
                }
                None => break,
            }
        }

        while let Some(seq) = self.earliest_pending_seq() {
            if self.store[&seq].arrival + self.latency_ms > now {
                break;
            }
            let entry = self.store.remove(&seq).expect("key just observed");
            self.next_expected_seq = seq.wrapping_add(1);
            released.push(entry.packet);
            // A released-by-timeout packet may unblock a contiguous run
            // that was waiting behind it.
            loop {
                match self.store.remove(&self.next_expected_seq) {
                    Some(next_entry) => {
                        released.push(next_entry.packet);
                        self.next_expected_seq = self.next_expected_seq.wrapping_add(1);
                    }
                    None => break,
                }
            }
        }

        released
    }

    fn next_timer(&self, now: u64) -> Option<u64> {
        self.store
            .values()
            .map(|e| (e.arrival + self.latency_ms).saturating_sub(now))
            .min()
    }
}
