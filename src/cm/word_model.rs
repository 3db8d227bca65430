//! Models English text: word-hash chains, a running hash of letters, and
//! the text column relative to the last two newlines (spec.md 4.4, ported
//! from `wordModel()`). Emits 14 `ContextMap` contexts.

use crate::cm::context_map::ContextMap;
use crate::cm::logistic::Stretch;
use crate::cm::mixer::Mixer;
use crate::cm::ring::PredictorContext;
use crate::cm::state_table::StateTable;

const NUM_CONTEXTS: usize = 14;

pub struct WordModel {
    cm: ContextMap,
    word0: u32,
    word1: u32,
    word2: u32,
    word3: u32,
    word4: u32,
    text0: u32,
    nl1: i64,
    nl: i64,
}

impl WordModel {
    pub fn new(mem: usize, states: &StateTable) -> WordModel {
        WordModel {
            cm: ContextMap::new(mem * 32, NUM_CONTEXTS, states),
            word0: 0,
            word1: 0,
            word2: 0,
            word3: 0,
            word4: 0,
            text0: 0,
            nl1: -3,
            nl: -2,
        }
    }

    /// Called once per byte, at `bpos==0`, before mixing.
    pub fn update_byte(&mut self, ctx: &PredictorContext) {
        let mut c = (ctx.c4 & 255) as u8;
        if c.is_ascii_uppercase() {
            c += b'a' - b'A';
        }
        if c.is_ascii_lowercase() || c >= 128 {
            self.word0 = self.word0.wrapping_mul(263).wrapping_mul(4).wrapping_add(c as u32);
            self.text0 = self.text0.wrapping_mul(997).wrapping_mul(16).wrapping_add(c as u32);
        } else if self.word0 != 0 {
            self.word4 = self.word3.wrapping_mul(11);
            self.word3 = self.word2.wrapping_mul(7);
            self.word2 = self.word1.wrapping_mul(5);
            self.word1 = self.word0.wrapping_mul(3);
            self.word0 = 0;
        }
        if c == 10 {
            self.nl1 = self.nl;
            self.nl = ctx.pos as i64 - 1;
        }

        let col = (ctx.pos as i64 - self.nl).clamp(0, 255) as u32;
        let above_idx = self.nl1 + col as i64;
        let above = if above_idx >= 0 { ctx.at(above_idx as usize) } else { 0 } as u32;
        let buf1 = ctx.byte_at(1) as u32;

        let h = self.word0.wrapping_mul(271).wrapping_add(buf1);
        self.cm.set(0, h);
        self.cm.set(1, self.word0);
        self.cm.set(2, h.wrapping_add(self.word1));
        self.cm.set(3, self.word0.wrapping_add(self.word1.wrapping_mul(17)));
        self.cm.set(4, h.wrapping_add(self.word2));
        self.cm.set(5, h.wrapping_add(self.word1).wrapping_add(self.word2));
        self.cm.set(6, h.wrapping_add(self.word3));
        self.cm.set(7, h.wrapping_add(self.word4));
        self.cm.set(8, self.text0 & 0xffff);
        self.cm.set(9, self.text0 & 0xfffff);
        self.cm.set(10, (col << 8) | above);
        self.cm.set(11, (col << 8) | buf1);
        self.cm.set(12, (buf1 << 8) | above);
        self.cm.set(13, col);
    }

    pub fn mix(&mut self, m: &mut Mixer, bpos: u32, c0: u32, st: &Stretch) {
        for i in 0..NUM_CONTEXTS {
            let out = self.cm.predict(i, bpos, c0, st);
            for v in out {
                m.add(v);
            }
        }
    }

    pub fn update(&mut self, bit: i32, states: &StateTable) {
        for i in 0..NUM_CONTEXTS {
            self.cm.update_bit(i, bit, states);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_hash_resets_on_non_letter() {
        let mut ctx = PredictorContext::new(1 << 16);
        let states = StateTable::new();
        let mut wm = WordModel::new(1 << 16, &states);
        for &b in b"hello world!x" {
            for bit_pos in 0..8 {
                let bit = ((b >> (7 - bit_pos)) & 1) as i32;
                if ctx.at_byte_boundary() {
                    wm.update_byte(&ctx);
                }
                ctx.update_bit(bit);
            }
        }
        assert_eq!(wm.word0, 0);
        assert_ne!(wm.word1, 0);
    }
}
