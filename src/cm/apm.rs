//! Adaptive probability map: a `StateMap`-like structure indexed by a
//! discrete context plus a stretched, quantized input probability. Used to
//! refine the mixer's output in a chain of independently-trained stages
//! (spec.md 4.9).

use crate::cm::logistic::{squash, Stretch};

pub struct Apm {
    bin: usize,
    num_cxts: usize,
    bin_map: Vec<u16>,
}

impl Apm {
    pub fn new(n: usize) -> Apm {
        let anchors: Vec<u16> = (0..33).map(|i| (squash((i - 16) * 128) * 16) as u16).collect();
        Apm {
            bin: 0,
            num_cxts: n,
            bin_map: anchors.into_iter().cycle().take(n * 33).collect(),
        }
    }

    pub fn p(&mut self, bit: i32, rate: i32, pr: i32, cxt: u32, st: &Stretch) -> i32 {
        debug_assert!(bit == 0 || bit == 1);
        debug_assert!((0..4096).contains(&pr));
        debug_assert!((cxt as usize) < self.num_cxts);
        self.update(bit, rate);

        let d = st.stretch(pr);
        let i_w = d & 127;
        self.bin = (((d + 2048) >> 7) + (cxt as i32) * 33) as usize;

        let l = self.bin_map[self.bin] as i32;
        let u = self.bin_map[self.bin + 1] as i32;
        ((l * (128 - i_w)) + (u * i_w)) >> 11
    }

    fn update(&mut self, bit: i32, rate: i32) {
        debug_assert!(bit == 0 || bit == 1);
        debug_assert!(rate > 0 && rate < 32);

        let g: i32 = (bit << 16) + (bit << rate) - bit - bit;

        let l = self.bin_map[self.bin] as i32;
        let u = self.bin_map[self.bin + 1] as i32;
        self.bin_map[self.bin] = (l + ((g - l) >> rate)) as u16;
        self.bin_map[self.bin + 1] = (u + ((g - u) >> rate)) as u16;
    }
}

/// Runs a prediction through the fixed 4-stage chain described in spec.md
/// 4.9: `pr = (3*apm1(pr) + pr) / 4`, then
/// `pr = (apm2(pr) + 2*apm3(pr) + apm4(pr) + 2) / 4`.
pub struct ApmChain {
    stage1: Apm,
    stage2: Apm,
    stage3: Apm,
    stage4: Apm,
}

impl ApmChain {
    pub fn new(n1: usize, n2: usize, n3: usize, n4: usize) -> ApmChain {
        ApmChain {
            stage1: Apm::new(n1),
            stage2: Apm::new(n2),
            stage3: Apm::new(n3),
            stage4: Apm::new(n4),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn p(
        &mut self,
        bit: i32,
        pr: i32,
        cxt1: u32,
        cxt2: u32,
        cxt3: u32,
        cxt4: u32,
        st: &Stretch,
    ) -> i32 {
        let p1 = self.stage1.p(bit, 7, pr, cxt1, st);
        let pr = (3 * p1 + pr) / 4;
        let p2 = self.stage2.p(bit, 7, pr, cxt2, st);
        let p3 = self.stage3.p(bit, 7, pr, cxt3, st);
        let p4 = self.stage4.p(bit, 7, pr, cxt4, st);
        (p2 + 2 * p3 + p4 + 2) / 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_identity_before_training() {
        let mut apm = Apm::new(4);
        let st = Stretch::new();
        let out = apm.p(1, 7, 2048, 0, &st);
        assert!((out - 2048).abs() < 200, "out={out}");
    }

    #[test]
    fn converges_toward_the_trained_bit() {
        let mut apm = Apm::new(4);
        let st = Stretch::new();
        let mut out = 2048;
        for _ in 0..2000 {
            out = apm.p(1, 7, out, 0, &st);
        }
        assert!(out > 3500, "out={out}");
    }

    #[test]
    fn contexts_are_independent() {
        let mut apm = Apm::new(4);
        let st = Stretch::new();
        for _ in 0..2000 {
            apm.p(1, 7, 3000, 0, &st);
        }
        let untouched = apm.p(0, 7, 2048, 1, &st);
        assert!((untouched - 2048).abs() < 200, "untouched={untouched}");
    }

    #[test]
    fn chain_stays_in_valid_probability_range() {
        let mut chain = ApmChain::new(4, 4, 4, 4);
        let st = Stretch::new();
        let mut pr = 2048;
        for i in 0..100 {
            let bit = (i % 2) as i32;
            pr = chain.p(bit, pr, 0, 0, 0, 0, &st);
            assert!((0..=4095).contains(&pr), "pr={pr}");
        }
    }
}
