//! Shadow-decodes a JPEG entropy-coded scan bit by bit to expose the
//! decoder's own state -- Huffman code so far, MCU position, predicted DC
//! value, recent run/size codes -- as mixer contexts (spec.md 4.4, ported
//! from `jpegModel()`). Unlike the structural models this one keeps its
//! own small `Mixer` and a short `ApmChain`, since its contexts are only
//! meaningful while a scan is active; the blended result is folded into
//! the main mixer as a single stretched input (spec.md 9's "composition,
//! not inheritance").
//!
//! The table-building and bit-accumulation logic follows the original
//! closely; the context set is trimmed to the most load-bearing handful
//! rather than the original's full ~19, which is noted in the project's
//! design ledger.

use crate::cm::apm::ApmChain;
use crate::cm::context_map::ContextMap;
use crate::cm::logistic::{hash3, hash4, Stretch};
use crate::cm::mixer::Mixer;
use crate::cm::ring::PredictorContext;
use crate::cm::state_table::StateTable;

const NUM_CONTEXTS: usize = 8;
const MAX_COMPONENTS: usize = 4;

#[derive(Clone)]
struct HufTable {
    min: [i32; 17],
    max: [i32; 17],
    valptr: [i32; 17],
    values: Vec<u8>,
}

impl HufTable {
    fn empty() -> HufTable {
        HufTable {
            min: [0; 17],
            max: [0; 17],
            valptr: [0; 17],
            values: Vec::new(),
        }
    }

    fn build(counts: &[u8; 16], values: Vec<u8>) -> HufTable {
        let mut t = HufTable::empty();
        t.values = values;
        let mut code = 0i32;
        let mut k = 0i32;
        for l in 1..=16usize {
            let n = counts[l - 1] as i32;
            if n == 0 {
                t.min[l] = 0;
                t.max[l] = 0;
                t.valptr[l] = 0;
            } else {
                t.valptr[l] = k;
                t.min[l] = code;
                code += n;
                t.max[l] = code;
                k += n;
            }
            code <<= 1;
        }
        t
    }

    fn decode(&self, huffcode: u32, huffbits: u32) -> Option<u8> {
        let l = huffbits as usize;
        if l == 0 || l > 16 {
            return None;
        }
        let hc = huffcode as i32;
        if self.max[l] > 0 && hc >= self.min[l] && hc < self.max[l] {
            let idx = (self.valptr[l] + hc - self.min[l]) as usize;
            self.values.get(idx).copied()
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Huffman,
    Extra,
}

/// Which length-prefixed marker segment is currently being buffered
/// (spec.md 4.4: DHT builds Huffman tables, SOS selects them per
/// component, SOF0 gives the component count).
#[derive(Clone, Copy, PartialEq, Eq)]
enum SegKind {
    Dht,
    Sos,
    Sof,
}

pub struct JpegModel {
    active: bool,
    sos_pos: usize,
    huf: [[HufTable; 4]; 2], // [Tc: dc/ac][Th: 0..4]
    hufsel: [[u8; 10]; 2],
    ncomp: usize,
    huffcode: u32,
    huffbits: u32,
    phase: Phase,
    extra_val: u32,
    extra_total: u32,
    extra_count: u32,
    rs: i32,
    mcupos: usize,
    pred: [i32; MAX_COMPONENTS],
    recent_rs: u32,
    ssum: i32,
    seg_kind: Option<SegKind>,
    seg_buf: Vec<u8>,
    seg_len: usize,
    cm: ContextMap,
    mixer: Mixer,
    apm: ApmChain,
    last_pr: i32,
}

impl JpegModel {
    pub fn new(mem: usize, states: &StateTable) -> JpegModel {
        JpegModel {
            active: false,
            sos_pos: 0,
            huf: [
                [HufTable::empty(), HufTable::empty(), HufTable::empty(), HufTable::empty()],
                [HufTable::empty(), HufTable::empty(), HufTable::empty(), HufTable::empty()],
            ],
            hufsel: [[0; 10]; 2],
            ncomp: 1,
            huffcode: 0,
            huffbits: 0,
            phase: Phase::Huffman,
            extra_val: 0,
            extra_total: 0,
            extra_count: 0,
            rs: -1,
            mcupos: 0,
            pred: [0; MAX_COMPONENTS],
            recent_rs: 0,
            ssum: 0,
            seg_kind: None,
            seg_buf: Vec::new(),
            seg_len: 0,
            cm: ContextMap::new(mem * 4, NUM_CONTEXTS, states),
            mixer: Mixer::new(NUM_CONTEXTS * 5, 16, 1),
            apm: ApmChain::new(1024, 1024, 256, 16),
            last_pr: 2048,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Called once per byte, at `bpos==0`: marker detection, length-prefixed
    /// segment buffering, and Huffman table construction happen here, byte
    /// at a time, exactly as in the original (markers can't straddle a bit
    /// boundary). DHT/SOF0/SOS bodies are accumulated across calls since
    /// their declared length can span many bytes; once a segment's declared
    /// length is satisfied it's parsed in one shot (spec.md 4.4).
    pub fn update_byte(&mut self, ctx: &PredictorContext) {
        let b1 = ctx.byte_at(1);
        let b2 = ctx.byte_at(2);
        let b3 = ctx.byte_at(3);
        let b4 = ctx.byte_at(4);

        if b4 == 0xFF && b3 == 0xD8 && b2 == 0xFF && (b1 >> 4) == 0xE {
            self.active = true;
            self.pred = [0; MAX_COMPONENTS];
            self.mcupos = 0;
            self.phase = Phase::Huffman;
            self.huffcode = 0;
            self.huffbits = 0;
            self.rs = -1;
            self.seg_kind = None;
            self.seg_buf.clear();
            self.seg_len = 0;
        }
        if !self.active {
            return;
        }

        if let Some(kind) = self.seg_kind {
            self.seg_buf.push(b1);
            if self.seg_buf.len() == 2 {
                self.seg_len = ((self.seg_buf[0] as usize) << 8) | self.seg_buf[1] as usize;
            }
            if self.seg_len >= 2 && self.seg_buf.len() >= self.seg_len {
                let body = std::mem::take(&mut self.seg_buf);
                match kind {
                    SegKind::Dht => self.parse_dht(&body[2..]),
                    SegKind::Sos => self.parse_sos(&body[2..]),
                    SegKind::Sof => self.parse_sof(&body[2..]),
                }
                self.seg_kind = None;
                self.seg_len = 0;
            }
            return;
        }

        if b2 == 0xFF && b1 == 0xD9 {
            self.active = false;
            return;
        }
        if b2 == 0xFF && (0xD0..=0xD7).contains(&b1) {
            self.phase = Phase::Huffman;
            self.huffcode = 0;
            self.huffbits = 0;
            self.rs = -1;
            self.mcupos = 0;
            return;
        }
        if b2 == 0xFF && (0xC0..=0xC3).contains(&b1) {
            self.seg_kind = Some(SegKind::Sof);
            self.seg_buf.clear();
            self.seg_len = 0;
        } else if b2 == 0xFF && b1 == 0xC4 {
            self.seg_kind = Some(SegKind::Dht);
            self.seg_buf.clear();
            self.seg_len = 0;
        } else if b2 == 0xFF && b1 == 0xDA {
            self.seg_kind = Some(SegKind::Sos);
            self.seg_buf.clear();
            self.seg_len = 0;
        }
    }

    /// Parses a SOF0-3 body: precision byte, 2-byte height, 2-byte width,
    /// then the component count used to size the per-component DC
    /// predictor array and the zigzag MCU stride (spec.md 4.10).
    fn parse_sof(&mut self, body: &[u8]) {
        if body.len() < 6 {
            return;
        }
        self.ncomp = (body[5] as usize).clamp(1, MAX_COMPONENTS);
    }

    /// Parses one DHT segment body, which may pack several `(Tc/Th byte,
    /// 16 length counts, values...)` tables back to back, and builds each
    /// one's canonical Huffman decode table (spec.md 4.10's `huf[Tc][Th]`).
    fn parse_dht(&mut self, mut body: &[u8]) {
        while body.len() >= 17 {
            let tc_th = body[0];
            let tc = (tc_th >> 4) as usize;
            let th = (tc_th & 0x0f) as usize;
            let mut counts = [0u8; 16];
            counts.copy_from_slice(&body[1..17]);
            let n: usize = counts.iter().map(|&c| c as usize).sum();
            if body.len() < 17 + n {
                break;
            }
            let values = body[17..17 + n].to_vec();
            if tc < 2 && th < 4 {
                self.huf[tc][th] = HufTable::build(&counts, values);
            }
            body = &body[17 + n..];
        }
    }

    /// Parses a SOS body: component count, then each component's
    /// `(selector byte, Td/Ta nibble)`, registering per-component Huffman
    /// table ids and resetting the shadow decoder for the scan about to
    /// begin (spec.md 4.10).
    fn parse_sos(&mut self, body: &[u8]) {
        if body.is_empty() {
            return;
        }
        let ns = (body[0] as usize).min(MAX_COMPONENTS);
        let mut dc = [0u8; MAX_COMPONENTS];
        let mut ac = [0u8; MAX_COMPONENTS];
        for i in 0..ns {
            if let Some(&tdta) = body.get(2 + 2 * i) {
                dc[i] = tdta >> 4;
                ac[i] = tdta & 0x0f;
            }
        }
        for i in 0..ns.min(10) {
            self.hufsel[0][i] = dc[i];
            self.hufsel[1][i] = ac[i];
        }
        self.sos_pos = 0;
        self.mcupos = 0;
        self.phase = Phase::Huffman;
        self.huffcode = 0;
        self.huffbits = 0;
        self.rs = -1;
    }

    /// Called once per coded bit, before `mix`. Advances the shadow Huffman
    /// decoder with the bit that was just coded (`ctx.y`).
    pub fn update_bits(&mut self, ctx: &PredictorContext) {
        if !self.active {
            return;
        }
        match self.phase {
            Phase::Huffman => {
                self.huffcode = (self.huffcode << 1) | ctx.y as u32;
                self.huffbits += 1;
                let comp = self.mcupos / 64;
                let ac = if self.mcupos & 63 != 0 { 1 } else { 0 };
                let sel = self.hufsel[ac][comp.min(9)] as usize;
                if let Some(rs) = self.huf[ac][sel].decode(self.huffcode, self.huffbits) {
                    self.rs = rs as i32;
                    let extra = (rs & 0x0f) as u32;
                    if extra == 0 {
                        self.finish_coefficient(0);
                    } else {
                        self.extra_val = 0;
                        self.extra_total = extra;
                        self.extra_count = 0;
                        self.phase = Phase::Extra;
                    }
                } else if self.huffbits >= 16 {
                    // No code matched within the max length: resync at the
                    // next byte boundary rather than decode garbage forever.
                    self.huffcode = 0;
                    self.huffbits = 0;
                }
            }
            Phase::Extra => {
                self.extra_val = (self.extra_val << 1) | ctx.y as u32;
                self.extra_count += 1;
                if self.extra_count >= self.extra_total {
                    let size = (self.rs & 0x0f) as u32;
                    let magnitude = sign_extend(self.extra_val, size);
                    self.finish_coefficient(magnitude);
                }
            }
        }

        self.cm.set(0, hash3(1, self.huffcode, self.mcupos as u32));
        self.cm
            .set(1, hash3(2, (self.mcupos >> 6) as u32, (self.mcupos & 63) as u32));
        self.cm.set(2, hash3(3, self.recent_rs, self.mcupos as u32 >> 2));
        self.cm.set(3, hash4(4, self.huffcode, self.huffbits, self.mcupos as u32));
        self.cm.set(4, hash3(5, self.ssum as u32 >> 4, (self.mcupos & 63) as u32));
        self.cm.set(
            5,
            hash3(6, self.pred[self.mcupos / 64 % MAX_COMPONENTS] as u32 & 0xff, self.mcupos as u32 >> 6),
        );
        self.cm.set(6, hash3(7, self.recent_rs, self.huffbits));
        self.cm.set(7, hash4(8, self.huffcode, self.recent_rs, (self.mcupos & 63) as u32));
    }

    fn finish_coefficient(&mut self, magnitude: u32) {
        let signed = magnitude as i32;
        let comp = self.mcupos / 64 % MAX_COMPONENTS;
        if self.mcupos & 63 == 0 {
            self.pred[comp] += signed;
            self.ssum = self.pred[comp];
        } else {
            self.ssum += signed;
        }
        self.recent_rs = ((self.recent_rs << 8) | (self.rs as u32 & 0xff)) & 0xffff;

        let run = ((self.rs >> 4) & 0x0f) as usize;
        if self.mcupos & 63 == 0 {
            self.mcupos += 1;
        } else {
            self.mcupos += run + 1;
        }
        if self.mcupos % 64 == 0 {
            self.mcupos = (self.mcupos / 64 % self.ncomp.max(1)) * 64 + (self.mcupos / (64 * self.ncomp.max(1))) * 64 * self.ncomp.max(1);
        }

        self.phase = Phase::Huffman;
        self.huffcode = 0;
        self.huffbits = 0;
        self.rs = -1;
    }

    pub fn mix(&mut self, m: &mut Mixer, bpos: u32, c0: u32, st: &Stretch) {
        if !self.active {
            return;
        }
        for i in 0..NUM_CONTEXTS {
            for v in self.cm.predict(i, bpos, c0, st) {
                self.mixer.add(v);
            }
        }
        self.mixer.set(self.mcupos % 16, 0);
        let pr = self.mixer.p(st);
        let refined = self.apm.p(
            0,
            pr,
            self.huffcode & 1023,
            (self.mcupos as u32) & 1023,
            (self.rs as u32 & 0xff) % 256,
            self.huffbits % 16,
            st,
        );
        self.last_pr = refined;
        m.add(st.stretch(refined));
    }

    pub fn update(&mut self, bit: i32, states: &StateTable) {
        if !self.active {
            return;
        }
        for i in 0..NUM_CONTEXTS {
            self.cm.update_bit(i, bit, states);
        }
        self.mixer.update(bit);
    }
}

fn sign_extend(v: u32, bits: u32) -> u32 {
    if bits == 0 {
        return 0;
    }
    let half = 1u32 << (bits - 1);
    if v < half {
        v.wrapping_sub((1u32 << bits) - 1)
    } else {
        v
    }
}
