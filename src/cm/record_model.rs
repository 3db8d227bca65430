//! Models 2-D data with a detected fixed record length (spec.md 4.4, ported
//! from `recordModel()`): tracks the last four positions a given byte value
//! appeared at, infers a candidate stride from their spacing, and emits
//! contexts that pair a byte with the byte one (and two) records back.

use crate::cm::context_map::ContextMap;
use crate::cm::logistic::{ILog, Stretch};
use crate::cm::mixer::Mixer;
use crate::cm::ring::PredictorContext;
use crate::cm::state_table::StateTable;

const NUM_CONTEXTS: usize = 7;

pub struct RecordModel {
    cm: ContextMap,
    cpos1: [i64; 256],
    cpos2: [i64; 256],
    cpos3: [i64; 256],
    cpos4: [i64; 256],
    wpos1: Vec<i64>,
    rlen: i64,
    rlen1: i64,
    rlen2: i64,
    rcount1: i32,
    rcount2: i32,
}

impl RecordModel {
    pub fn new(mem: usize, states: &StateTable) -> RecordModel {
        RecordModel {
            cm: ContextMap::new(mem * 4, NUM_CONTEXTS, states),
            cpos1: [0; 256],
            cpos2: [0; 256],
            cpos3: [0; 256],
            cpos4: [0; 256],
            wpos1: vec![0; 0x10000],
            rlen: 2,
            rlen1: 3,
            rlen2: 4,
            rcount1: 0,
            rcount2: 0,
        }
    }

    pub fn update_byte(&mut self, ctx: &PredictorContext, ilog: &ILog) {
        let pos = ctx.pos as i64;
        let c = ctx.byte_at(1) as usize;
        let w = (ctx.c4 & 0xffff) as usize;
        let r = pos - self.cpos1[c];

        if r > 1
            && r == self.cpos1[c] - self.cpos2[c]
            && r == self.cpos2[c] - self.cpos3[c]
            && r == self.cpos3[c] - self.cpos4[c]
            && (r > 15
                || (c == ctx.at((pos - r * 5 - 1).max(0) as usize) as usize
                    && c == ctx.at((pos - r * 6 - 1).max(0) as usize) as usize))
        {
            if r == self.rlen1 {
                self.rcount1 += 1;
            } else if r == self.rlen2 {
                self.rcount2 += 1;
            } else if self.rcount1 > self.rcount2 {
                self.rlen2 = r;
                self.rcount2 = 1;
            } else {
                self.rlen1 = r;
                self.rcount1 = 1;
            }
        }
        if self.rcount1 > 15 && self.rlen != self.rlen1 {
            self.rlen = self.rlen1;
            self.rcount1 = 0;
            self.rcount2 = 0;
        }
        if self.rcount2 > 15 && self.rlen != self.rlen2 {
            self.rlen = self.rlen2;
            self.rcount1 = 0;
            self.rcount2 = 0;
        }

        let rlen = self.rlen.max(1);
        let buf_back = |d: i64| -> u32 {
            if d <= 0 || d > pos {
                0
            } else {
                ctx.byte_at(d as usize) as u32
            }
        };
        let buf1 = buf_back(1);
        let buf2 = buf_back(2);

        self.cm.set(0, (buf1 << 8) | (pos - self.cpos1[c]).min(255) as u32);
        self.cm.set(
            1,
            (buf1 << 17) | (buf2 << 9) | ((ilog.llog((pos - self.wpos1[w]).max(0) as u32) >> 2) as u32),
        );
        let col = (pos % rlen) as u32;
        self.cm.set(2, (buf1 << 8) | buf_back(rlen));
        self.cm.set(
            3,
            (rlen as u32) | (buf_back(rlen) << 10) | (buf_back(rlen * 2) << 18),
        );
        self.cm.set(4, (rlen as u32) | (buf_back(rlen) << 10) | (col << 18));
        self.cm.set(5, (rlen as u32) | (buf1 << 10) | (col << 18));
        self.cm.set(6, col | ((rlen as u32) << 12));

        self.cpos4[c] = self.cpos3[c];
        self.cpos3[c] = self.cpos2[c];
        self.cpos2[c] = self.cpos1[c];
        self.cpos1[c] = pos;
        self.wpos1[w] = pos;
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
    use crate::cm::ring::PredictorContext;

    #[test]
    fn runs_over_repeating_rows_and_stays_in_the_valid_stretch_range() {
        let mut ctx = PredictorContext::new(1 << 16);
        let states = StateTable::new();
        let mut rec = RecordModel::new(1 << 16, &states);
        let ilog = ILog::new();
        let st = Stretch::new();
        let n = NUM_CONTEXTS * 5;

        let row: &[u8] = b"0123456789";
        for _ in 0..20 {
            for &byte in row {
                for i in (0..8).rev() {
                    let bit = ((byte >> i) & 1) as i32;
                    let bpos = ctx.bpos;
                    let c0 = ctx.c0;
                    if ctx.at_byte_boundary() {
                        rec.update_byte(&ctx, &ilog);
                    }
                    let mut m = Mixer::new(n, 1, 1);
                    rec.mix(&mut m, bpos, c0, &st);
                    m.set(0, 0);
                    let pr = m.p(&st);
                    assert!((0..=4095).contains(&pr), "pr={pr}");
                    rec.update(bit, &states);
                    ctx.update_bit(bit);
                }
            }
        }
        assert_eq!(rec.rlen, 10, "expected the 10-byte row stride to be detected");
    }
}
