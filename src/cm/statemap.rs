//! Counter -> probability map (spec.md 4.3). Ported from `Paq8b.cpp`'s
//! `StateMap` (~1103-1122): `t[cxt]` holds p(next bit == 1 | cxt) scaled by
//! 65536. Each call trains the *previous* context toward the bit that was
//! actually observed at a fixed `>>8` rate, switches to the new context, and
//! returns its estimate scaled to 12 bits (`>>4`).

use crate::cm::state_table::StateTable;

#[derive(Clone)]
pub struct StateMap {
    cxt: usize,
    t: Vec<u16>,
}

impl StateMap {
    /// Flat-initialized table of `n` entries, each starting at p=1/2. Used
    /// for contexts that aren't a raw bit-history state (e.g. the match
    /// model's length-bucket table), where there's no `(n0, n1)` to seed
    /// from.
    pub fn new(n: usize) -> StateMap {
        StateMap { cxt: 0, t: vec![1 << 15; n.max(1)] }
    }

    /// 256-entry table indexed directly by bit-history state, seeded from
    /// each state's `(n0, n1)` counts exactly as `Paq8b.cpp`'s constructor:
    /// `p(1) = 65536*(n1+1)/(n0+n1+2)`, with either count scaled by 64 when
    /// the other is zero so a pure run of one bit starts near certainty.
    pub fn from_state_table(states: &StateTable) -> StateMap {
        let mut t = vec![0u16; 256];
        for (i, slot) in t.iter_mut().enumerate() {
            let (n0, n1) = states.counts(i as u8);
            let mut n0 = n0 as i32;
            let mut n1 = n1 as i32;
            if n0 == 0 {
                n1 *= 64;
            }
            if n1 == 0 {
                n0 *= 64;
            }
            *slot = (65536 * (n1 + 1) / (n0 + n1 + 2)).clamp(0, 65535) as u16;
        }
        StateMap { cxt: 0, t }
    }

    /// Trains on `bit` at the last context used, switches to `cxt`, and
    /// returns the new context's estimate (12-bit).
    pub fn p(&mut self, bit: i32, cxt: u32) -> i32 {
        debug_assert!(bit == 0 || bit == 1);
        self.train(bit);
        self.cxt = cxt as usize % self.t.len();
        (self.t[self.cxt] >> 4) as i32
    }

    /// Reads `cxt`'s current estimate without disturbing the training
    /// cursor -- used when a caller wants a prediction before committing to
    /// train this map on the resulting bit.
    pub fn peek(&self, cxt: u32) -> i32 {
        (self.t[cxt as usize % self.t.len()] >> 4) as i32
    }

    fn train(&mut self, bit: i32) {
        let cur = self.t[self.cxt] as i32;
        let delta = ((bit << 16) - cur + 128) >> 8;
        self.t[self.cxt] = (cur + delta).clamp(0, 65535) as u16;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_to_certainty() {
        let mut sm = StateMap::new(4);
        let mut pr = 2048;
        for _ in 0..4000 {
            pr = sm.p(1, 0);
        }
        assert!(pr > 3800, "pr={pr}");
    }

    #[test]
    fn from_state_table_seeds_all_zero_state_near_certainty() {
        let states = StateTable::new();
        let sm = StateMap::from_state_table(&states);
        // State 0 is "no bits seen" (n0=n1=0): the constructor's n0==0 and
        // n1==0 branches both fire, leaving p(1) at the neutral midpoint.
        let p0 = sm.peek(0);
        assert!((1500..2500).contains(&p0), "p0={p0}");
    }
}
