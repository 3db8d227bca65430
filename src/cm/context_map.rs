//! Cache-line-sized bit-history store shared by the order-n, word, record
//! and sparse models (spec.md 4.4). Grounded directly in `ContextMap` from
//! `Paq8b.cpp`: each 64-byte bucket holds 7 checksums, one LRU/priority
//! byte, and 7 runs of 7 bit-history bytes (one run per nibble depth).
//! `set()` permutes the context into a bucket + per-slot checksum rather
//! than hashing it fresh every call, and rebucketing happens only at bit
//! positions 0, 2 and 5 -- the three points where a new nibble begins.

use crate::cm::logistic::Stretch;
use crate::cm::state_table::StateTable;
use crate::cm::statemap::StateMap;

const BUCKET_SLOTS: usize = 7;
const BUCKET_SIZE: usize = 64;

#[derive(Clone)]
struct Bucket {
    bytes: [u8; BUCKET_SIZE],
}

impl Bucket {
    fn new() -> Bucket {
        Bucket { bytes: [0; BUCKET_SIZE] }
    }

    fn checksum(&self, slot: usize) -> u16 {
        let o = slot * 2;
        u16::from_le_bytes([self.bytes[o], self.bytes[o + 1]])
    }

    fn set_checksum(&mut self, slot: usize, v: u16) {
        let o = slot * 2;
        let b = v.to_le_bytes();
        self.bytes[o] = b[0];
        self.bytes[o + 1] = b[1];
    }

    fn priority_byte(&self) -> usize {
        14
    }

    fn history_mut(&mut self, slot: usize) -> &mut [u8] {
        let o = 16 + slot * 7;
        &mut self.bytes[o..o + 7]
    }

    fn history(&self, slot: usize) -> &[u8] {
        let o = 16 + slot * 7;
        &self.bytes[o..o + 7]
    }

    /// Finds the bucket slot for `checksum`, evicting the slot with the
    /// smallest state priority (fewest total observations) if no slot
    /// matches and the bucket is full. Mirrors the C++ `ContextMap::E::get`.
    fn find(&mut self, checksum: u16) -> usize {
        for slot in 0..BUCKET_SLOTS {
            if self.checksum(slot) == checksum {
                self.bytes[self.priority_byte()] = slot as u8;
                return slot;
            }
        }
        let mut worst = 0usize;
        let mut worst_pri = i32::MAX;
        for slot in 0..BUCKET_SLOTS {
            let pri = self.history(slot)[0] as i32;
            if pri < worst_pri {
                worst_pri = pri;
                worst = slot;
            }
        }
        self.set_checksum(worst, checksum);
        for b in self.history_mut(worst).iter_mut() {
            *b = 0;
        }
        self.bytes[self.priority_byte()] = worst as u8;
        worst
    }
}

/// Maps a bit position within the current byte (0-7) plus the bits already
/// decided (`c0`) to one of the 7 history slots in a bucket: slot 0 at
/// each group's first bit (also the rebucketing instant), slots 1-2 after
/// one more bit, slots 3-6 after two more. Groups are bits [0,1], [2,3,4],
/// [5,6,7], matching spec.md 4.4's "bit boundaries 0, 2, 5".
fn nibble_slot(bpos: u32, c0: u32) -> (usize, bool) {
    let group_start = match bpos {
        0 | 1 => 0,
        2 | 3 | 4 => 2,
        _ => 5,
    };
    let rel = bpos - group_start;
    match rel {
        0 => (0, true),
        1 => (1 + (c0 & 1) as usize, false),
        _ => (3 + (c0 & 3) as usize, false),
    }
}

/// One context slot: a rolling hash plus the bucket/nibble cursor derived
/// from it at the last rebucketing instant.
struct Slot {
    cxt: u32,
    bucket: usize,
    run: usize,
    nibble: usize,
    sm: StateMap,
    run_count: u8,
    last_byte: u8,
}

pub struct ContextMap {
    buckets: Vec<Bucket>,
    mask: usize,
    slots: Vec<Slot>,
}

impl ContextMap {
    /// `mem` is the number of buckets (rounded down to a power of two);
    /// `n` is the number of independent contexts tracked. Each context's
    /// `StateMap` is seeded from `states`' `(n0, n1)` counts (spec.md 4.3).
    pub fn new(mem: usize, n: usize, states: &StateTable) -> ContextMap {
        let buckets_len = mem.next_power_of_two().max(1);
        ContextMap {
            buckets: vec![Bucket::new(); buckets_len],
            mask: buckets_len - 1,
            slots: (0..n)
                .map(|_| Slot {
                    cxt: 0,
                    bucket: 0,
                    run: 0,
                    nibble: 0,
                    sm: StateMap::from_state_table(states),
                    run_count: 0,
                    last_byte: 0,
                })
                .collect(),
        }
    }

    /// Sets context `i`'s raw (unhashed) context value. Call once per byte,
    /// at `bpos==0`, before the first `predict` of the new byte.
    pub fn set(&mut self, i: usize, cx: u32) {
        self.slots[i].cxt = cx;
    }

    /// Tracks the last byte seen at context `i`'s current bucket slot,
    /// producing the run-length feature (spec.md 4.4). Call once per byte
    /// alongside `set`, passing the byte that context predicts over (the
    /// model's own choice of "recent byte" -- usually `buf(1)`).
    pub fn set_last_byte(&mut self, i: usize, b: u8) {
        let slot = &mut self.slots[i];
        if slot.last_byte == b {
            slot.run_count = slot.run_count.saturating_add(1);
        } else {
            slot.run_count = 0;
            slot.last_byte = b;
        }
    }

    fn rebucket(&mut self, i: usize) {
        let slot = &mut self.slots[i];
        let mut cx = slot.cxt.wrapping_mul(987654323).wrapping_add(i as u32);
        cx = cx.rotate_left(16);
        let permuted = cx.wrapping_mul(123456791).wrapping_add(i as u32);
        let check = (permuted >> 16) as u16;
        let bucket_idx = (permuted as usize) & self.mask;
        let run = self.buckets[bucket_idx].find(check);
        slot.bucket = bucket_idx;
        slot.run = run;
    }

    /// Stretched probability plus the run length and indicator features
    /// described in spec.md 4.4: `(stretch(p1)>>2, p1-2048, nonempty flag,
    /// run count, raw stretch)`. Rebuckets automatically at bit positions
    /// 0, 2, 5 and remembers which of the 7 history slots this call used,
    /// so the following `update_bit` trains the right one.
    pub fn predict(&mut self, i: usize, bpos: u32, c0: u32, st: &Stretch) -> [i32; 5] {
        let (nibble, is_boundary) = nibble_slot(bpos, c0);
        if is_boundary {
            self.rebucket(i);
        }
        self.slots[i].nibble = nibble;
        let bucket = self.slots[i].bucket;
        let run = self.slots[i].run;
        let s = self.buckets[bucket].history(run)[nibble];
        let cxt_key = (i as u32).wrapping_add(s as u32).wrapping_add((nibble as u32) << 16);
        let p1 = self.slots[i].sm.peek(cxt_key).clamp(1, 4095);
        let stretched = st.stretch(p1);
        let run_count = self.slots[i].run_count as i32;
        [
            stretched >> 2,
            p1 - 2048,
            if s != 0 { 256 } else { 0 },
            run_count,
            stretched,
        ]
    }

    /// Advances the bit-history state for context `i`'s last-predicted
    /// slot, using the probabilistic increment for high states (>=204)
    /// described in spec.md 4.4, with `fastrand` standing in for the
    /// original's bespoke PRNG (see SPEC_FULL.md 4).
    pub fn update_bit(&mut self, i: usize, bit: i32, states: &StateTable) {
        let nibble = self.slots[i].nibble;
        let bucket = self.slots[i].bucket;
        let run = self.slots[i].run;
        let hist = self.buckets[bucket].history_mut(run);
        let s = hist[nibble];
        let ns = states.next(s, bit);
        hist[nibble] = if ns >= 204 {
            let shift = (452 - ns as i32) >> 3;
            if shift > 0 && shift < 32 && (fastrand::u32(..) >> (32 - shift)) != 0 {
                ns.saturating_sub(4)
            } else {
                ns
            }
        } else {
            ns
        };
        let cxt_key = (i as u32).wrapping_add(s as u32).wrapping_add((nibble as u32) << 16);
        self.slots[i].sm.p(bit, cxt_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_round_trips_checksum() {
        let states = StateTable::new();
        let mut cm = ContextMap::new(16, 1, &states);
        let st = Stretch::new();
        cm.set(0, 0xdead_beef);
        cm.predict(0, 0, 1, &st);
        let bucket = cm.slots[0].bucket;
        let run = cm.slots[0].run;
        assert_eq!(cm.buckets[bucket].history(run)[0], 0);
    }

    #[test]
    fn nibble_slots_partition_byte() {
        let mut seen = std::collections::HashSet::new();
        for bpos in 0..8u32 {
            for c0 in [1u32, 0b10, 0b11, 0b101, 0b111] {
                let (n, _) = nibble_slot(bpos, c0);
                assert!(n < 7);
                seen.insert(n);
            }
        }
        assert!(seen.len() >= 5);
    }
}
