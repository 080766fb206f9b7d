// The shared effects chain every voice is mixed into:
//
//   voices (mono) -> Delay -> Convolver (stereo IR) -> level -> device
//
// There is no dry path; everything the listener hears has been through the
// reverb. Both user-facing parameters are plain fields, so changing them never
// rebuilds anything.

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use super::frame::StereoFrame;
use super::impulse::ImpulseResponse;

pub const MAX_DELAY_SECS: f32 = 5.0;
pub const DEFAULT_DELAY_SECS: f32 = 0.3;
pub const DEFAULT_REVERB_LEVEL: f32 = 0.5;

// Partition length; also the convolver's added latency in frames.
pub const BLOCK_SIZE: usize = 256;

// Convolver power normalization constants, same as browser convolvers use.
const GAIN_CALIBRATION: f32 = 0.00125;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
const MIN_POWER: f32 = 0.000125;

// ── Delay ─────────────────────────────────────────────────────────

/// Plain delay line, no feedback.
pub struct Delay {
    buf: Vec<f32>,
    write: usize,
    delay_frames: usize,
    sample_rate: f32,
}

impl Delay {
    pub fn new(sample_rate: u32, delay_secs: f32) -> Self {
        let max_frames = (MAX_DELAY_SECS * sample_rate as f32).ceil() as usize;
        let mut delay = Self {
            buf: vec![0.0; max_frames + 1],
            write: 0,
            delay_frames: 0,
            sample_rate: sample_rate as f32,
        };
        delay.set_time(delay_secs);
        delay
    }

    pub fn set_time(&mut self, secs: f32) {
        let secs = if secs.is_finite() { secs.clamp(0.0, MAX_DELAY_SECS) } else { 0.0 };
        self.delay_frames = ((secs * self.sample_rate).round() as usize).min(self.buf.len() - 1);
    }

    #[cfg(test)]
    pub fn time(&self) -> f32 {
        self.delay_frames as f32 / self.sample_rate
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let len = self.buf.len();
        self.buf[self.write] = input;
        let read = (self.write + len - self.delay_frames) % len;
        self.write = (self.write + 1) % len;
        self.buf[read]
    }
}

// ── Convolver ─────────────────────────────────────────────────────

/// Uniformly partitioned overlap-add convolution of a mono signal with a
/// stereo impulse response. Output lags input by exactly `BLOCK_SIZE` frames.
pub struct Convolver {
    r2c: Arc<dyn RealToComplex<f32>>,
    c2r: Arc<dyn ComplexToReal<f32>>,
    partitions: usize,

    // per channel, per partition spectra of the IR
    ir_spectra: [Vec<Vec<Complex<f32>>>; 2],
    // frequency-domain delay line of past input blocks, newest at `fdl_head`
    fdl: Vec<Vec<Complex<f32>>>,
    fdl_head: usize,

    input_block: Vec<f32>,
    output_block: Vec<StereoFrame>,
    overlap: [Vec<f32>; 2],
    pos: usize,

    time_buf: Vec<f32>,
    acc: Vec<Complex<f32>>,
    fwd_scratch: Vec<Complex<f32>>,
    inv_scratch: Vec<Complex<f32>>,
}

impl Convolver {
    pub fn new(impulse: &ImpulseResponse, sample_rate: u32) -> Self {
        let fft_size = BLOCK_SIZE * 2;
        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(fft_size);
        let c2r = planner.plan_fft_inverse(fft_size);

        let partitions = impulse.len().div_ceil(BLOCK_SIZE).max(1);
        let scale = normalization_scale(impulse, sample_rate);

        let mut fwd_scratch = r2c.make_scratch_vec();
        let mut time_buf = r2c.make_input_vec();
        let mut spectra_for = |channel: &[f32]| -> Vec<Vec<Complex<f32>>> {
            (0..partitions)
                .map(|p| {
                    time_buf.fill(0.0);
                    let start = (p * BLOCK_SIZE).min(channel.len());
                    let end = (start + BLOCK_SIZE).min(channel.len());
                    for (dst, src) in time_buf.iter_mut().zip(&channel[start..end]) {
                        *dst = src * scale;
                    }
                    let mut spectrum = r2c.make_output_vec();
                    if r2c.process_with_scratch(&mut time_buf, &mut spectrum, &mut fwd_scratch).is_err() {
                        spectrum.fill(Complex::new(0.0, 0.0));
                    }
                    spectrum
                })
                .collect()
        };
        let ir_spectra = [spectra_for(&impulse.left), spectra_for(&impulse.right)];

        Self {
            fdl: vec![r2c.make_output_vec(); partitions],
            fdl_head: 0,
            input_block: vec![0.0; BLOCK_SIZE],
            output_block: vec![StereoFrame::zero(); BLOCK_SIZE],
            overlap: [vec![0.0; BLOCK_SIZE], vec![0.0; BLOCK_SIZE]],
            pos: 0,
            time_buf,
            acc: r2c.make_output_vec(),
            fwd_scratch,
            inv_scratch: c2r.make_scratch_vec(),
            ir_spectra,
            partitions,
            r2c,
            c2r,
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> StereoFrame {
        self.input_block[self.pos] = input;
        let out = self.output_block[self.pos];
        self.pos += 1;
        if self.pos == BLOCK_SIZE {
            self.pos = 0;
            self.run_block();
        }
        out
    }

    fn run_block(&mut self) {
        let fft_size = BLOCK_SIZE * 2;
        let inv_n = 1.0 / fft_size as f32;

        self.time_buf[..BLOCK_SIZE].copy_from_slice(&self.input_block);
        self.time_buf[BLOCK_SIZE..].fill(0.0);
        self.fdl_head = (self.fdl_head + self.partitions - 1) % self.partitions;
        let head = self.fdl_head;
        if self.r2c
            .process_with_scratch(&mut self.time_buf, &mut self.fdl[head], &mut self.fwd_scratch)
            .is_err()
        {
            self.fdl[head].fill(Complex::new(0.0, 0.0));
        }

        for ch in 0..2 {
            self.acc.fill(Complex::new(0.0, 0.0));
            for k in 0..self.partitions {
                let x = &self.fdl[(head + k) % self.partitions];
                let h = &self.ir_spectra[ch][k];
                for ((a, x), h) in self.acc.iter_mut().zip(x).zip(h) {
                    *a += x * h;
                }
            }
            // c2r insists DC and Nyquist are purely real
            let last = self.acc.len() - 1;
            self.acc[0].im = 0.0;
            self.acc[last].im = 0.0;

            if self.c2r
                .process_with_scratch(&mut self.acc, &mut self.time_buf, &mut self.inv_scratch)
                .is_err()
            {
                self.time_buf.fill(0.0);
            }

            let overlap = &mut self.overlap[ch];
            for i in 0..BLOCK_SIZE {
                let y = self.time_buf[i] * inv_n + overlap[i];
                overlap[i] = self.time_buf[BLOCK_SIZE + i] * inv_n;
                let frame = &mut self.output_block[i];
                if ch == 0 { frame.left = y } else { frame.right = y }
            }
        }
    }
}

fn normalization_scale(impulse: &ImpulseResponse, sample_rate: u32) -> f32 {
    let n = (impulse.left.len() + impulse.right.len()).max(1) as f32;
    let energy: f32 = impulse.left.iter().chain(&impulse.right).map(|s| s * s).sum();
    let mut power = (energy / n).sqrt();
    if !power.is_finite() || power < MIN_POWER {
        power = MIN_POWER;
    }
    GAIN_CALIBRATION / power * (GAIN_CALIBRATION_SAMPLE_RATE / sample_rate as f32)
}

// ── Chain ─────────────────────────────────────────────────────────

pub struct EffectsChain {
    delay: Delay,
    reverb: Convolver,
    level: f32,
}

impl EffectsChain {
    pub fn new(sample_rate: u32, impulse: &ImpulseResponse) -> Self {
        Self {
            delay: Delay::new(sample_rate, DEFAULT_DELAY_SECS),
            reverb: Convolver::new(impulse, sample_rate),
            level: DEFAULT_REVERB_LEVEL,
        }
    }

    pub fn set_delay_time(&mut self, secs: f32) {
        self.delay.set_time(secs);
    }

    pub fn set_reverb_level(&mut self, level: f32) {
        self.level = if level.is_finite() { level.clamp(0.0, 1.0) } else { 0.0 };
    }

    #[cfg(test)]
    pub fn delay_time(&self) -> f32 {
        self.delay.time()
    }

    #[cfg(test)]
    pub fn reverb_level(&self) -> f32 {
        self.level
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> StereoFrame {
        let delayed = self.delay.process(input);
        self.reverb.process(delayed).scaled(self.level)
    }
}
