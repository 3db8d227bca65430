//! Sparse x86 opcode contexts (spec.md 4.10, ported from `exeModel()`):
//! each of the 12 contexts looks `i` bytes back for a `(prefix, opcode,
//! mod/r/m)` triple, where `mod/r/m` is masked to `0xC7` (mod + r/m bits,
//! dropping the reg field so register choice doesn't fragment the context).
//! Only active while the archive's filetype tag is `Exe` (spec.md 4.11).

use crate::cm::context_map::ContextMap;
use crate::cm::logistic::Stretch;
use crate::cm::mixer::Mixer;
use crate::cm::ring::PredictorContext;
use crate::cm::state_table::StateTable;

const NUM_CONTEXTS: usize = 12;

pub struct ExeModel {
    cm: ContextMap,
}

impl ExeModel {
    pub fn new(mem: usize, states: &StateTable) -> ExeModel {
        ExeModel {
            cm: ContextMap::new(mem * 2, NUM_CONTEXTS, states),
        }
    }

    /// `execxt` from the original: looks `i` bytes back from the byte
    /// boundary for the prefix/opcode/modrm triple, optionally folding in
    /// `x` (the previous byte, only for `i > 4`) to spread the later
    /// contexts across more of the instruction stream.
    fn execxt(ctx: &PredictorContext, i: usize, x: u32) -> u32 {
        let b = |d: usize| ctx.byte_at(d) as u32;
        let prefix = u32::from(b(i + 2) == 0x0f)
            + 2 * u32::from(b(i + 2) == 0x66)
            + 3 * u32::from(b(i + 2) == 0x67)
            + 4 * u32::from(b(i + 3) == 0x0f)
            + 8 * u32::from(b(i + 3) == 0x66)
            + 12 * u32::from(b(i + 3) == 0x67);
        let opcode = b(i + 1);
        let modrm = b(i) & 0xc7;
        prefix | (opcode << 4) | (modrm << 12) | (x << 20)
    }

    pub fn update_byte(&mut self, ctx: &PredictorContext) {
        let buf1 = ctx.byte_at(1);
        for i in 0..NUM_CONTEXTS {
            let x = if i > 4 { buf1 as u32 } else { 0 };
            self.cm.set(i, Self::execxt(ctx, i, x));
        }
    }

    pub fn mix(&mut self, m: &mut Mixer, bpos: u32, c0: u32, st: &Stretch) {
        for i in 0..NUM_CONTEXTS {
            for v in self.cm.predict(i, bpos, c0, st) {
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
