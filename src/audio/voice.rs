// A layered "piano" voice: three oscillators at 1x, 2x and 4x the note
// frequency. Only the fundamental carries the ADSR envelope; the two upper
// partials sit at a fixed level for the whole note.

pub const ATTACK: f32 = 0.01;
pub const DECAY: f32 = 0.1;
pub const SUSTAIN: f32 = 0.7;
pub const RELEASE: f32 = 0.3;

const HARMONIC_GAIN: f32 = 0.5;
const OVERTONE_GAIN: f32 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
}

impl Waveform {
    // phase is in cycles, [0, 1)
    #[inline]
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (std::f32::consts::TAU * phase).sin(),
            Waveform::Triangle => 1.0 - 4.0 * ((phase + 0.25).fract() - 0.5).abs(),
            Waveform::Square => if phase < 0.5 { 1.0 } else { -1.0 },
        }
    }
}

/// Gain of the fundamental `t` seconds into a note lasting `duration` seconds.
///
/// 0 -> 1 over the attack, 1 -> sustain over the decay, hold, then a linear
/// release that hits 0 exactly at `duration`. Notes shorter than
/// attack + decay are simply cut off.
pub fn envelope(t: f32, duration: f32) -> f32 {
    if t < 0.0 || t >= duration {
        return 0.0;
    }
    let release_start = (duration - RELEASE).max(ATTACK + DECAY);
    if t < ATTACK {
        t / ATTACK
    } else if t < ATTACK + DECAY {
        1.0 - (1.0 - SUSTAIN) * (t - ATTACK) / DECAY
    } else if t < release_start {
        SUSTAIN
    } else {
        SUSTAIN * (duration - t) / (duration - release_start)
    }
}

#[derive(Clone, Copy, Debug)]
struct Oscillator {
    waveform: Waveform,
    phase: f32,
    phase_inc: f32, // cycles per frame
    gain: f32,
}

impl Oscillator {
    fn new(waveform: Waveform, frequency: f32, sample_rate: f32, gain: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            phase_inc: frequency / sample_rate,
            gain,
        }
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let s = self.waveform.sample(self.phase);
        self.phase = (self.phase + self.phase_inc).fract();
        s
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PianoVoice {
    oscillators: [Oscillator; 3],
    start_frame: u64,
    length: u64, // frames
    elapsed: u64,
    duration: f32,
    sample_rate: f32,
    pub active: bool,
}

impl PianoVoice {
    pub fn new(frequency: f32, start_frame: u64, duration: f32, sample_rate: u32) -> Self {
        let sr = sample_rate as f32;
        let duration = duration.max(0.0);
        Self {
            oscillators: [
                Oscillator::new(Waveform::Sine, frequency, sr, 1.0),
                Oscillator::new(Waveform::Triangle, frequency * 2.0, sr, HARMONIC_GAIN),
                Oscillator::new(Waveform::Square, frequency * 4.0, sr, OVERTONE_GAIN),
            ],
            start_frame,
            length: (duration * sr).round() as u64,
            elapsed: 0,
            duration,
            sample_rate: sr,
            // a bad note token gives NaN; play nothing rather than poison the mix
            active: frequency.is_finite() && frequency > 0.0,
        }
    }

    pub fn silent() -> Self {
        Self {
            active: false,
            ..Self::new(0.0, 0, 0.0, 1)
        }
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// Next mono sample at absolute frame `clock`. Silent before the start,
    /// retires itself once the note has run its length.
    #[inline]
    pub fn next_sample(&mut self, clock: u64) -> f32 {
        if !self.active || clock < self.start_frame {
            return 0.0;
        }
        if self.elapsed >= self.length {
            self.active = false;
            return 0.0;
        }
        let t = self.elapsed as f32 / self.sample_rate;
        self.elapsed += 1;

        let [fundamental, harmonic, overtone] = &mut self.oscillators;
        fundamental.next() * envelope(t, self.duration)
            + harmonic.next() * harmonic.gain
            + overtone.next() * overtone.gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn envelope_shape_for_half_second_note() {
        let d = 0.5;
        assert!(close(envelope(0.0, d), 0.0));
        assert!(close(envelope(0.005, d), 0.5));
        assert!(close(envelope(0.01, d), 1.0));
        assert!(close(envelope(0.06, d), 0.85));
        assert!(close(envelope(0.11, d), 0.7));
        assert!(close(envelope(0.19, d), 0.7));
        assert!(close(envelope(0.35, d), 0.35));
        assert!(close(envelope(0.5, d), 0.0));
        assert!(close(envelope(-0.1, d), 0.0));
    }

    #[test]
    fn triangle_and_square_shapes() {
        assert!(close(Waveform::Triangle.sample(0.0), 0.0));
        assert!(close(Waveform::Triangle.sample(0.25), 1.0));
        assert!(close(Waveform::Triangle.sample(0.75), -1.0));
        assert_eq!(Waveform::Square.sample(0.1), 1.0);
        assert_eq!(Waveform::Square.sample(0.6), -1.0);
    }

    #[test]
    fn voice_is_silent_before_start_and_retires_after() {
        let mut v = PianoVoice::new(440.0, 10, 0.01, 1000);
        for clock in 0..10 {
            assert_eq!(v.next_sample(clock), 0.0);
        }
        // 10 frames long at 1 kHz
        for clock in 10..20 {
            v.next_sample(clock);
        }
        assert!(v.active);
        assert_eq!(v.next_sample(20), 0.0);
        assert!(!v.active);
    }

    #[test]
    fn harmonics_sound_from_the_first_frame() {
        let mut v = PianoVoice::new(100.0, 0, 0.5, 1000);
        // sine 0, triangle 0, square +1 at phase 0
        assert!(close(v.next_sample(0), OVERTONE_GAIN));
    }

    #[test]
    fn nan_frequency_is_silent() {
        let mut v = PianoVoice::new(f32::NAN, 0, 0.5, 44100);
        assert!(!v.active);
        assert_eq!(v.next_sample(0), 0.0);
    }
}
