//! Order-1/2 contexts with gaps between the referenced bytes (spec.md 4.4,
//! ported from `sparseModel()`): pairs of bytes separated by 3-7 positions,
//! plus a bank of single-byte contexts at increasing distances.

use crate::cm::context_map::ContextMap;
use crate::cm::logistic::Stretch;
use crate::cm::mixer::Mixer;
use crate::cm::ring::PredictorContext;
use crate::cm::state_table::StateTable;

const NUM_GAP_CONTEXTS: usize = 8;
const NUM_DISTANCE_CONTEXTS: usize = 8;

pub struct SparseModel {
    cm: ContextMap,
    scm: ContextMap,
}

impl SparseModel {
    pub fn new(mem: usize, states: &StateTable) -> SparseModel {
        SparseModel {
            cm: ContextMap::new(mem * 4, NUM_GAP_CONTEXTS, states),
            scm: ContextMap::new(mem, NUM_DISTANCE_CONTEXTS, states),
        }
    }

    pub fn update_byte(&mut self, ctx: &PredictorContext) {
        let b = |d: usize| ctx.byte_at(d) as u32;
        self.cm.set(0, ctx.c4 & 0x00ff_00ff);
        self.cm.set(1, ctx.c4 & 0xff00_00ff);
        self.cm.set(2, b(1) | (b(5) << 8));
        self.cm.set(3, b(1) | (b(6) << 8));
        self.cm.set(4, ctx.c4 & 0x00ff_ff00);
        self.cm.set(5, ctx.c4 & 0xff00_ff00);
        self.cm.set(6, b(3) | (b(6) << 8));
        self.cm.set(7, b(4) | (b(8) << 8));
        for i in 0..NUM_DISTANCE_CONTEXTS {
            self.scm.set(i, b(i + 1));
        }
    }

    pub fn mix(&mut self, m: &mut Mixer, bpos: u32, c0: u32, st: &Stretch) {
        for i in 0..NUM_GAP_CONTEXTS {
            for v in self.cm.predict(i, bpos, c0, st) {
                m.add(v);
            }
        }
        for i in 0..NUM_DISTANCE_CONTEXTS {
            for v in self.scm.predict(i, bpos, c0, st) {
                m.add(v);
            }
        }
    }

    pub fn update(&mut self, bit: i32, states: &StateTable) {
        for i in 0..NUM_GAP_CONTEXTS {
            self.cm.update_bit(i, bit, states);
        }
        for i in 0..NUM_DISTANCE_CONTEXTS {
            self.scm.update_bit(i, bit, states);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cm::ring::PredictorContext;

    #[test]
    fn runs_a_full_cycle_and_stays_in_the_valid_stretch_range() {
        let mut ctx = PredictorContext::new(1 << 16);
        let states = StateTable::new();
        let mut sparse = SparseModel::new(1 << 16, &states);
        let st = Stretch::new();
        let n = (NUM_GAP_CONTEXTS + NUM_DISTANCE_CONTEXTS) * 5;

        for &byte in b"the quick brown fox jumps over the lazy dog" {
            for i in (0..8).rev() {
                let bit = ((byte >> i) & 1) as i32;
                let bpos = ctx.bpos;
                let c0 = ctx.c0;
                if ctx.at_byte_boundary() {
                    sparse.update_byte(&ctx);
                }
                let mut m = Mixer::new(n, 1, 1);
                sparse.mix(&mut m, bpos, c0, &st);
                m.set(0, 0);
                let pr = m.p(&st);
                assert!((0..=4095).contains(&pr), "pr={pr}");
                sparse.update(bit, &states);
                ctx.update_bit(bit);
            }
        }
    }
}
