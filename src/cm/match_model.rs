//! Rolling-hash long-match detector (spec.md 4.7). Indexes the shared
//! `PredictorContext` ring buffer by a hash of the last several bytes; once
//! a match is found, predicts that the bit stream continues to agree with
//! the matched position until a misprediction breaks it. Matches of length
//! 400 or more are reported back to the top-level predictor so it can
//! shortcut the rest of the mixer (spec.md 4.11).

use crate::cm::logistic::{ILog, Stretch};
use crate::cm::ring::PredictorContext;
use crate::cm::statemap::StateMap;

pub const LONG_MATCH: usize = 400;

pub struct MatchModel {
    hash: usize,
    ht: Vec<u32>,
    ht_mask: usize,
    ptr: usize,
    len: usize,
    sm: StateMap,
    order: u32,
}

impl MatchModel {
    pub fn new(mem: usize) -> MatchModel {
        let ht_len = (mem / 8).next_power_of_two().max(1024);
        MatchModel {
            hash: 0,
            ht: vec![0; ht_len],
            ht_mask: ht_len - 1,
            ptr: 0,
            len: 0,
            sm: StateMap::new(56 << 8),
            order: 24,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Called once per byte boundary, after `ctx.update_bit` has pushed the
    /// finished byte into the ring buffer.
    pub fn update_byte(&mut self, ctx: &PredictorContext, ilog: &ILog) {
        self.hash = (self.hash.wrapping_mul(5 << 5) ^ (ctx.byte_at(1) as usize + 1)) & self.ht_mask;
        let _ = ilog;

        if self.len > 0 {
            self.ptr += 1;
            if self.len < 0xffff {
                self.len += 1;
            }
        } else {
            let candidate = self.ht[self.hash] as usize;
            if candidate != 0 {
                self.ptr = candidate;
                self.len = self.extend(ctx);
            }
        }
        self.ht[self.hash] = ctx.pos as u32;
    }

    fn extend(&self, ctx: &PredictorContext) -> usize {
        let mut len = 0usize;
        while len < 0xffff {
            let a = ctx.byte_at(len + 1);
            let b = ctx.buf[(self.ptr.wrapping_sub(len + 1)) & ctx.pos_mask()];
            if a != b || self.ptr <= len {
                break;
            }
            len += 1;
        }
        len
    }

    /// Stretched prediction for the current bit, plus the order-selector
    /// contribution this model adds to the mixer context (spec.md 4.11:
    /// order 5 plus a bucket of the match length).
    pub fn p(&mut self, ctx: &PredictorContext, st: &Stretch) -> i32 {
        if self.len == 0 {
            return st.stretch(self.sm.peek(ctx.c0).clamp(1, 4095));
        }
        let predicted_byte = ctx.buf[self.ptr & ctx.pos_mask()];
        let bits_done = 32 - ctx.c0.leading_zeros() - 1;
        let predicted_bit = (predicted_byte >> (7 - bits_done.min(7))) as u32 & 1;
        let expected_prefix = predicted_byte as u32 >> (8 - bits_done).clamp(0, 8);
        let actual_prefix = ctx.c0 & ((1u32 << bits_done) - 1).max(0);
        if bits_done > 0 && expected_prefix != actual_prefix {
            return 0;
        }
        let lenc = (self.len.min(28) * 2 + predicted_bit as usize) * 256 + predicted_byte as usize;
        st.stretch(self.sm.peek(lenc as u32).clamp(1, 4095))
    }

    pub fn update(&mut self, bit: i32, ctx: &PredictorContext) {
        if self.len > 0 {
            let predicted_byte = ctx.buf[self.ptr & ctx.pos_mask()];
            let bits_done = (32 - ctx.c0.leading_zeros() - 1).saturating_sub(1);
            let predicted_bit = (predicted_byte >> (7 - bits_done.min(7))) & 1;
            if predicted_bit as i32 != bit {
                self.len = 0;
            }
        }
        let cxt = if self.len == 0 { ctx.c0 } else { 0 };
        self.sm.p(bit, cxt);
    }

    pub fn order(&self) -> u32 {
        if self.len == 0 {
            0
        } else {
            self.order
                + if self.len >= 8 { 1 } else { 0 }
                + if self.len >= 12 { 1 } else { 0 }
                + if self.len >= 16 { 1 } else { 0 }
                + if self.len >= 32 { 1 } else { 0 }
        }
    }

    pub fn is_long_match(&self) -> bool {
        self.len >= LONG_MATCH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cm::ring::PredictorContext;

    fn feed_byte(ctx: &mut PredictorContext, mm: &mut MatchModel, ilog: &ILog, byte: u8) {
        for i in (0..8).rev() {
            ctx.update_bit(((byte >> i) & 1) as i32);
        }
        mm.update_byte(ctx, ilog);
    }

    #[test]
    fn no_match_found_before_any_repetition() {
        let mut ctx = PredictorContext::new(1 << 16);
        let mut mm = MatchModel::new(1 << 16);
        let ilog = ILog::new();
        for &b in b"abcdefg" {
            feed_byte(&mut ctx, &mut mm, &ilog, b);
        }
        assert_eq!(mm.len(), 0);
        assert!(!mm.is_long_match());
    }

    #[test]
    fn finds_and_extends_a_repeated_sequence() {
        let mut ctx = PredictorContext::new(1 << 16);
        let mut mm = MatchModel::new(1 << 16);
        let ilog = ILog::new();
        let pattern = b"abcdefgh";
        for _ in 0..40 {
            for &b in pattern {
                feed_byte(&mut ctx, &mut mm, &ilog, b);
            }
        }
        assert!(mm.len() > 0, "expected an active match after many repeats of a short pattern");
    }

    #[test]
    fn order_is_zero_without_an_active_match() {
        let mm = MatchModel::new(1 << 16);
        assert_eq!(mm.order(), 0);
    }
}
