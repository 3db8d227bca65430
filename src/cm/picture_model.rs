//! Models a monochrome (e.g. CCITT fax) bitmap with a fixed row stride of
//! 215 bytes (spec.md 4.4, ported from `picModel()`). Three row-register
//! contexts combine the current row with the rows 215, 431 and 647 bytes
//! back -- the same horizontal offset one, two and three rows above the
//! predicted pixel.

use crate::cm::logistic::Stretch;
use crate::cm::mixer::Mixer;
use crate::cm::ring::PredictorContext;
use crate::cm::state_table::StateTable;
use crate::cm::statemap::StateMap;

const NUM_CONTEXTS: usize = 3;
const TABLE_LEN: usize = 0x10200;

pub struct PictureModel {
    t: Vec<u8>,
    sm: [StateMap; NUM_CONTEXTS],
    cxt: [usize; NUM_CONTEXTS],
    r0: u32,
    r1: u32,
    r2: u32,
    r3: u32,
}

impl PictureModel {
    pub fn new(states: &StateTable) -> PictureModel {
        PictureModel {
            t: vec![0; TABLE_LEN],
            sm: [
                StateMap::from_state_table(states),
                StateMap::from_state_table(states),
                StateMap::from_state_table(states),
            ],
            cxt: [0; NUM_CONTEXTS],
            r0: 0,
            r1: 0,
            r2: 0,
            r3: 0,
        }
    }

    /// Called once per coded bit, before `mix`.
    pub fn update_contexts(&mut self, ctx: &PredictorContext, states: &StateTable) {
        for i in 0..NUM_CONTEXTS {
            self.t[self.cxt[i]] = states.next(self.t[self.cxt[i]], ctx.y);
        }

        self.r0 = (self.r0 << 1) | ctx.y as u32;
        let bit215 = (ctx.byte_at(215) as u32 >> (7 - ctx.bpos)) & 1;
        let bit431 = (ctx.byte_at(431) as u32 >> (7 - ctx.bpos)) & 1;
        let bit647 = (ctx.byte_at(647) as u32 >> (7 - ctx.bpos)) & 1;
        self.r1 = (self.r1 << 1) | bit215;
        self.r2 = (self.r2 << 1) | bit431;
        self.r3 = (self.r3 << 1) | bit647;

        self.cxt[0] = ((self.r0 & 0x7) | (self.r1 >> 4 & 0x38) | (self.r2 >> 3 & 0xc0)) as usize;
        self.cxt[1] = 0x100
            + ((self.r0 & 1) | (self.r1 >> 4 & 0x3e) | (self.r2 >> 2 & 0x40) | (self.r3 >> 1 & 0x80)) as usize;
        self.cxt[2] = 0x200
            + ((self.r0 & 0x3f) ^ (self.r1 & 0x3ffe) ^ (self.r2 << 2 & 0x7f00) ^ (self.r3 << 5 & 0xf800)) as usize;
    }

    pub fn mix(&mut self, m: &mut Mixer, st: &Stretch) {
        for i in 0..NUM_CONTEXTS {
            let p = self.sm[i].peek(self.cxt[i] as u32).clamp(1, 4095);
            m.add(st.stretch(p));
        }
    }

    pub fn update(&mut self, bit: i32) {
        for i in 0..NUM_CONTEXTS {
            self.sm[i].p(bit, self.cxt[i] as u32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cm::mixer::Mixer;
    use crate::cm::ring::PredictorContext;

    /// Drives one coded bit through the model in the same order
    /// `Predictor::p`/`Predictor::update` do: contexts are rebuilt from the
    /// ring buffer's state as of the *previous* bit, mixed in, then trained
    /// once the real bit is known, and only then does the ring buffer
    /// advance to reflect this bit.
    fn code_bit(
        ctx: &mut PredictorContext,
        pic: &mut PictureModel,
        states: &StateTable,
        m: &mut Mixer,
        st: &Stretch,
        bit: i32,
    ) {
        pic.update_contexts(ctx, states);
        pic.mix(m, st);
        pic.update(bit);
        ctx.update_bit(bit);
    }

    #[test]
    fn new_model_starts_with_zero_registers() {
        let states = StateTable::new();
        let pic = PictureModel::new(&states);
        assert_eq!(pic.cxt, [0; NUM_CONTEXTS]);
    }

    #[test]
    fn runs_many_bits_without_panicking_and_stays_in_range() {
        let mut ctx = PredictorContext::new(1 << 16);
        let states = StateTable::new();
        let mut pic = PictureModel::new(&states);
        let st = Stretch::new();
        // Enough bits to wrap past the 647-byte lookback several times over.
        for i in 0..20_000usize {
            let mut m = Mixer::new(NUM_CONTEXTS, 1, 1);
            let bit = ((i * 2654435761) >> 13 & 1) as i32;
            code_bit(&mut ctx, &mut pic, &states, &mut m, &st, bit);
            m.set(0, 0);
            let pr = m.p(&st);
            assert!((0..=4095).contains(&pr), "pr={pr}");
        }
    }

    #[test]
    fn repeating_rows_drive_a_context_toward_a_confident_prediction() {
        let mut ctx = PredictorContext::new(1 << 16);
        let states = StateTable::new();
        let mut pic = PictureModel::new(&states);
        let st = Stretch::new();
        // Three identical 215-byte rows of all-1 bits: every row-offset
        // lookback this model uses (215, 431, 647) agrees on every bit.
        let row_bits = 215 * 8;
        for _ in 0..3 {
            for _ in 0..row_bits {
                let mut m = Mixer::new(NUM_CONTEXTS, 1, 1);
                code_bit(&mut ctx, &mut pic, &states, &mut m, &st, 1);
            }
        }
        let mut m = Mixer::new(NUM_CONTEXTS, 1, 1);
        pic.update_contexts(&ctx, &states);
        pic.mix(&mut m, &st);
        m.set(0, 0);
        let pr = m.p(&st);
        assert!(pr > 2048, "expected the repeated all-ones rows to bias the prediction high, got {pr}");
    }
}
