//! Low-order byte contexts (spec.md 4.11's "low-order mixer contexts"):
//! a direct (unhashed) order-1 table, since 65536 reachable `(prev_byte,
//! partial_byte)` pairs fit exactly with no collisions, plus orders 2, 3,
//! 4 and 6 sharing one `ContextMap` bucket (spec.md 4.4), each keyed on
//! the last 2/3/4/6 whole bytes packed from `c4`/`c8`.

use crate::cm::context_map::ContextMap;
use crate::cm::logistic::Stretch;
use crate::cm::mixer::Mixer;
use crate::cm::ring::PredictorContext;
use crate::cm::state_table::StateTable;
use crate::cm::statemap::StateMap;

pub struct Order1Model {
    t: Vec<u8>,
    idx: usize,
    sm: StateMap,
    prev_byte: u32,
}

impl Order1Model {
    pub fn new(states: &StateTable) -> Order1Model {
        Order1Model {
            t: vec![0; 65536],
            idx: 0,
            sm: StateMap::from_state_table(states),
            prev_byte: 0,
        }
    }

    pub fn update_byte(&mut self, ctx: &PredictorContext) {
        self.prev_byte = ctx.byte_at(1) as u32;
    }

    pub fn predict(&mut self, c0: u32, st: &Stretch) -> i32 {
        self.idx = ((self.prev_byte << 8) | (c0 & 0xff)) as usize;
        let s = self.t[self.idx];
        st.stretch(self.sm.peek(s as u32).clamp(1, 4095))
    }

    pub fn update(&mut self, bit: i32, states: &StateTable) {
        let s = self.t[self.idx];
        self.t[self.idx] = states.next(s, bit);
        self.sm.p(bit, s as u32);
    }

    /// The previous whole byte, used by the top level for mixer context
    /// selection and the order-bucket computation (spec.md 4.8 NN2).
    pub fn prev_byte(&self) -> u32 {
        self.prev_byte
    }
}

const NUM_ORDERS: usize = 4; // orders 2, 3, 4, 6

pub struct HighOrderModel {
    cm: ContextMap,
}

impl HighOrderModel {
    pub fn new(mem: usize, states: &StateTable) -> HighOrderModel {
        HighOrderModel {
            cm: ContextMap::new(mem * 2, NUM_ORDERS, states),
        }
    }

    pub fn update_byte(&mut self, ctx: &PredictorContext) {
        self.cm.set(0, ctx.c4 & 0x0000_ffff);
        self.cm.set(1, ctx.c4 & 0x00ff_ffff);
        self.cm.set(2, ctx.c4);
        self.cm
            .set(3, ctx.c4.wrapping_mul(11).wrapping_add(ctx.c8 & 0xffff));
    }

    /// Adds the 4 orders' features to the mixer, returning the number of
    /// orders whose current bit-history is non-empty -- used by the top
    /// level to pick a mixer/order-bucket when the match model is inactive
    /// (spec.md 9's "order determined by the number of nonzero bit
    /// histories").
    pub fn mix(&mut self, m: &mut Mixer, bpos: u32, c0: u32, st: &Stretch) -> u32 {
        let mut nonzero = 0;
        for i in 0..NUM_ORDERS {
            let out = self.cm.predict(i, bpos, c0, st);
            if out[2] != 0 {
                nonzero += 1;
            }
            for v in out {
                m.add(v);
            }
        }
        nonzero
    }

    pub fn update(&mut self, bit: i32, states: &StateTable) {
        for i in 0..NUM_ORDERS {
            self.cm.update_bit(i, bit, states);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order1_table_is_exact() {
        let mut ctx = PredictorContext::new(1 << 16);
        let states = StateTable::new();
        let mut o1 = Order1Model::new(&states);
        let st = Stretch::new();
        for &b in b"ab" {
            for bit_pos in 0..8 {
                let bit = ((b >> (7 - bit_pos)) & 1) as i32;
                if ctx.at_byte_boundary() {
                    o1.update_byte(&ctx);
                }
                let _ = o1.predict(ctx.c0, &st);
                o1.update(bit, &states);
                ctx.update_bit(bit);
            }
        }
        assert_eq!(o1.prev_byte(), b'b' as u32);
    }
}
