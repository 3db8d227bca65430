//! Two-layer logistic mixer (spec.md 4.8). Layer 1 holds `s` parallel
//! single-layer networks, each with `n` inputs (rounded up to a multiple of
//! 8 so a SIMD dot product can stride over it; the scalar fallback here
//! doesn't need the padding but keeps the same layout the teacher's `Mixer`
//! used). A context selects which of the `s` weight rows is active for
//! layer 1; layer 2 combines the `s` layer-1 outputs with one more trained
//! weight row, selected by a smaller top-level context.

use crate::cm::logistic::{squash, Stretch};

fn round8(n: usize) -> usize {
    (n + 7) & !7
}

fn dot_product(inputs: &[i32], weights: &[i32]) -> i32 {
    inputs.iter().zip(weights.iter()).map(|(i, w)| i * w).sum::<i32>() >> 16
}

fn train(inputs: &[i32], weights: &mut [i32], err: i32) {
    for (input, weight) in inputs.iter().zip(weights.iter_mut()) {
        *weight = (*weight + (((*input * err * 2) >> 16) + 1) / 2).clamp(-32768, 32767);
    }
}

struct Layer1 {
    n: usize,
    padded: usize,
    s: usize,
    inputs: Vec<i32>,
    weights: Vec<i32>,
    outputs: Vec<i32>,
    active: usize,
}

impl Layer1 {
    fn new(n: usize, s: usize) -> Layer1 {
        let padded = round8(n);
        Layer1 {
            n,
            padded,
            s,
            inputs: Vec::with_capacity(n),
            weights: vec![1 << 14; padded * s],
            outputs: vec![2048; s],
            active: 0,
        }
    }

    fn add(&mut self, pr: i32) {
        debug_assert!(self.inputs.len() < self.n);
        self.inputs.push(pr);
    }

    fn set_context(&mut self, cxt: usize) {
        self.active = cxt % self.s;
    }

    /// Only the context-selected net is recomputed this bit (spec.md 4.8:
    /// "up to S concurrently active contexts"); the other S-1 nets keep
    /// whichever output they last produced, so layer 2 still sees a full
    /// vector of S stretched inputs every call.
    fn forward(&mut self) {
        let base = self.active * self.padded;
        self.outputs[self.active] =
            squash(dot_product(&self.inputs, &self.weights[base..base + self.n]));
    }

    fn train_all(&mut self, bit: i32) {
        let base = self.active * self.padded;
        let err = ((bit << 12) - self.outputs[self.active]) * 7;
        train(&self.inputs, &mut self.weights[base..base + self.n], err);
        self.inputs.clear();
    }
}

/// A single layer-1 network selected by context, feeding a layer-2
/// combiner that is itself context-selected.
pub struct Mixer {
    l1: Layer1,
    l2_weights: Vec<i32>,
    l2_n: usize,
    l2_set: usize,
    l2_inputs: Vec<i32>,
    pr: i32,
}

impl Mixer {
    /// `n` inputs per layer-1 network, `s` layer-1 networks (selected by a
    /// context), `s2` layer-2 weight sets (selected by a coarser context).
    pub fn new(n: usize, s: usize, s2: usize) -> Mixer {
        Mixer {
            l1: Layer1::new(n, s),
            l2_weights: vec![1 << 14; s * s2],
            l2_n: s,
            l2_set: 0,
            l2_inputs: vec![0; s],
            pr: 2048,
        }
    }

    pub fn add(&mut self, pr: i32) {
        self.l1.add(pr);
    }

    pub fn set(&mut self, cxt1: usize, cxt2: usize) {
        self.l1.set_context(cxt1);
        self.l2_set = (cxt2 % (self.l2_weights.len() / self.l2_n)) * self.l2_n;
    }

    pub fn p(&mut self, st: &Stretch) -> i32 {
        self.l1.forward();
        for (i, &o) in self.l1.outputs.iter().enumerate() {
            self.l2_inputs[i] = st.stretch(o);
        }
        let d = dot_product(&self.l2_inputs, &self.l2_weights[self.l2_set..self.l2_set + self.l2_n]);
        self.pr = squash(d);
        self.pr
    }

    pub fn update(&mut self, bit: i32) {
        let err = ((bit << 12) - self.pr) * 7;
        train(
            &self.l2_inputs,
            &mut self.l2_weights[self.l2_set..self.l2_set + self.l2_n],
            err,
        );
        self.l1.train_all(bit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_even_odds() {
        let mut m = Mixer::new(8, 2, 1);
        for _ in 0..8 {
            m.add(0);
        }
        m.set(0, 0);
        let st = Stretch::new();
        assert_eq!(m.p(&st), 2048);
    }

    #[test]
    fn learns_to_favor_a_consistently_confident_input() {
        let st = Stretch::new();
        let mut m = Mixer::new(8, 1, 1);
        let mut last = 2048;
        for _ in 0..500 {
            for _ in 0..8 {
                m.add(2000);
            }
            m.set(0, 0);
            last = m.p(&st);
            m.update(1);
        }
        assert!(last > 2048, "mixer should have learned toward bit 1, got {last}");
    }

    #[test]
    fn context_selection_wraps_into_range() {
        let mut m = Mixer::new(8, 2, 1);
        for _ in 0..8 {
            m.add(100);
        }
        m.set(usize::MAX, usize::MAX);
        let st = Stretch::new();
        let _ = m.p(&st);
        m.update(0);
    }
}
