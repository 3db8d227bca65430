//! Top-level bit predictor (spec.md 4.11): owns the shared [`PredictorContext`]
//! and every sub-model, runs them in the original's fixed order each bit,
//! and blends their stretched outputs through the two-layer [`Mixer`] and
//! the final [`ApmChain`]. One `Predictor` lives for an entire archive, not
//! per file -- `set_filetype` swaps which structural models are gated on
//! without resetting anything else, so cross-file redundancy keeps paying
//! off exactly as it does within a single file (spec.md 6).

use crate::cm::apm::ApmChain;
use crate::cm::bmp_model::BmpModel;
use crate::cm::exe_model::ExeModel;
use crate::cm::jpeg_model::JpegModel;
use crate::cm::logistic::{ILog, Stretch};
use crate::cm::match_model::MatchModel;
use crate::cm::mixer::Mixer;
use crate::cm::order_model::{HighOrderModel, Order1Model};
use crate::cm::picture_model::PictureModel;
use crate::cm::record_model::RecordModel;
use crate::cm::ring::{FileType, PredictorContext};
use crate::cm::run_map::RunContextMap;
use crate::cm::small_map::SmallMap;
use crate::cm::sparse_model::SparseModel;
use crate::cm::state_table::StateTable;
use crate::cm::word_model::WordModel;

/// order1(1) + matcher(1) + run map(1) + high-order(4*5) + word(14*5) +
/// record(7*5) + sparse((8+8)*5) + picture(3) + bmp(6+8*5) + exe(12*5) +
/// jpeg(1), the last two gated on filetype/active but counted at their max.
const MIXER_INPUTS: usize = 318;
const MIXER_SETS: usize = 8;
const MIXER_SETS2: usize = 4;

pub struct Predictor {
    ctx: PredictorContext,
    st: Stretch,
    ilog: ILog,
    states: StateTable,
    order1: Order1Model,
    high_order: HighOrderModel,
    word: WordModel,
    record: RecordModel,
    sparse: SparseModel,
    picture: PictureModel,
    bmp: BmpModel,
    exe: ExeModel,
    jpeg: JpegModel,
    matcher: MatchModel,
    run_map: RunContextMap,
    order0: SmallMap,
    mixer: Mixer,
    apm: ApmChain,
    last_bit: i32,
}

impl Predictor {
    pub fn new(mem: usize) -> Predictor {
        let mem = mem.max(1);
        let states = StateTable::new();
        Predictor {
            ctx: PredictorContext::new(mem),
            st: Stretch::new(),
            ilog: ILog::new(),
            order1: Order1Model::new(&states),
            high_order: HighOrderModel::new(mem, &states),
            word: WordModel::new(mem, &states),
            record: RecordModel::new(mem, &states),
            sparse: SparseModel::new(mem, &states),
            picture: PictureModel::new(&states),
            bmp: BmpModel::new(mem, &states),
            exe: ExeModel::new(mem, &states),
            jpeg: JpegModel::new(mem, &states),
            matcher: MatchModel::new(mem),
            run_map: RunContextMap::new(mem * 4),
            order0: SmallMap::new(9, 7),
            mixer: Mixer::new(MIXER_INPUTS, MIXER_SETS, MIXER_SETS2),
            apm: ApmChain::new(256, 1024, 256, 8),
            last_bit: 0,
            states,
        }
    }

    /// Sets the structural filetype gate for the file about to be coded,
    /// without touching any model's learned state (spec.md 6: the predictor
    /// runs continuously across an archive's files).
    pub fn set_filetype(&mut self, ft: FileType) {
        self.ctx.filetype = ft;
    }

    pub fn filetype(&self) -> FileType {
        self.ctx.filetype
    }

    /// Predicts P(next bit == 1), scaled to [0, 4096). Must be followed by
    /// exactly one call to `update` with the bit that was actually coded.
    pub fn p(&mut self) -> i32 {
        let bpos = self.ctx.bpos;
        let c0 = self.ctx.c0;

        if self.ctx.at_byte_boundary() {
            self.order1.update_byte(&self.ctx);
            self.high_order.update_byte(&self.ctx);
            self.word.update_byte(&self.ctx);
            self.record.update_byte(&self.ctx, &self.ilog);
            self.sparse.update_byte(&self.ctx);
            self.matcher.update_byte(&self.ctx, &self.ilog);
            self.run_map.set(self.ctx.c4 & 0xffff);
            self.run_map.update_byte(self.ctx.byte_at(1));
            self.order0.set(self.ctx.byte_at(1) as u32);
            self.bmp.update_byte(&self.ctx, &self.ilog);
            if self.ctx.filetype == FileType::Exe {
                self.exe.update_byte(&self.ctx);
            }
            self.jpeg.update_byte(&self.ctx);
        }

        self.picture.update_contexts(&self.ctx, &self.states);
        self.jpeg.update_bits(&self.ctx);

        let order1_pr = self.order1.predict(c0, &self.st);
        let matcher_pr = self.matcher.p(&self.ctx, &self.st);
        let run_pr = self.run_map.p(c0, &self.st);
        let order0_pr = self.st.stretch(self.order0.p());

        self.mixer.add(order1_pr);
        self.mixer.add(matcher_pr);
        self.mixer.add(run_pr);
        self.mixer.add(order0_pr);

        let nonzero = self.high_order.mix(&mut self.mixer, bpos, c0, &self.st);
        self.word.mix(&mut self.mixer, bpos, c0, &self.st);
        self.record.mix(&mut self.mixer, bpos, c0, &self.st);
        self.sparse.mix(&mut self.mixer, bpos, c0, &self.st);
        self.picture.mix(&mut self.mixer, &self.st);
        self.bmp.mix(&mut self.mixer, bpos, c0, &self.st);
        if self.ctx.filetype == FileType::Exe {
            self.exe.mix(&mut self.mixer, bpos, c0, &self.st);
        }
        self.jpeg.mix(&mut self.mixer, bpos, c0, &self.st);

        let order_sel = if self.matcher.is_long_match() {
            MIXER_SETS - 1
        } else if self.matcher.len() > 0 {
            ((self.matcher.order() / 4) as usize).min(MIXER_SETS - 2)
        } else {
            (nonzero as usize).min(MIXER_SETS - 2)
        };
        self.mixer.set(order_sel, self.ctx.filetype as usize);

        let mixed = self.mixer.p(&self.st);

        let refined = self.apm.p(
            self.last_bit,
            mixed,
            c0 & 0xff,
            (self.ctx.filetype as u32) * 256 + (c0 & 0xff),
            self.ctx.byte_at(1) as u32,
            bpos,
            &self.st,
        );

        refined.clamp(1, 4095)
    }

    /// Trains every model on the bit that was actually coded, then advances
    /// the shared ring buffer registers. Must follow a call to `p`.
    pub fn update(&mut self, bit: i32) {
        self.order1.update(bit, &self.states);
        self.high_order.update(bit, &self.states);
        self.word.update(bit, &self.states);
        self.record.update(bit, &self.states);
        self.sparse.update(bit, &self.states);
        self.picture.update(bit);
        self.bmp.update(bit, &self.states);
        if self.ctx.filetype == FileType::Exe {
            self.exe.update(bit, &self.states);
        }
        self.jpeg.update(bit, &self.states);
        self.matcher.update(bit, &self.ctx);
        self.order0.update(bit);
        self.mixer.update(bit);

        self.last_bit = bit;
        self.ctx.update_bit(bit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicts_in_range_and_trains_without_panicking() {
        let mut p = Predictor::new(1 << 16);
        for &b in b"hello, world! this is a short repeating test. hello, world!" {
            for i in (0..8).rev() {
                let bit = ((b >> i) & 1) as i32;
                let pr = p.p();
                assert!((1..4096).contains(&pr));
                p.update(bit);
            }
        }
    }

    #[test]
    fn set_filetype_does_not_reset_models() {
        let mut p = Predictor::new(1 << 16);
        for &b in b"abcdefgh" {
            for i in (0..8).rev() {
                let bit = ((b >> i) & 1) as i32;
                let _ = p.p();
                p.update(bit);
            }
        }
        p.set_filetype(FileType::Exe);
        assert_eq!(p.filetype(), FileType::Exe);
        let _ = p.p();
        p.update(0);
    }
}
