use crate::audio_api::{AudioCommand, VoiceParams};

use super::effect::EffectsChain;
use super::frame::StereoFrame;
use super::impulse::ImpulseResponse;
use super::voice::PianoVoice;

const MAX_VOICES: usize = 32; // hard cap so we wont malloc in audio callback

/// The audio context: sample clock, voice pool and the one effects chain
/// every voice feeds. Built once, then moved into the output callback.
pub struct Engine {
    sample_rate: u32,
    clock: u64, // frames rendered so far
    voices: [PianoVoice; MAX_VOICES],
    effects: EffectsChain,
}

impl Engine {
    pub fn new(sample_rate: u32, impulse: &ImpulseResponse) -> Self {
        Self {
            sample_rate,
            clock: 0,
            voices: [PianoVoice::silent(); MAX_VOICES],
            effects: EffectsChain::new(sample_rate, impulse),
        }
    }

    #[cfg(test)]
    pub fn clock(&self) -> u64 {
        self.clock
    }

    #[cfg(test)]
    pub fn effects(&self) -> &EffectsChain {
        &self.effects
    }

    #[cfg(test)]
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::PlayVoice(p) => self.trigger_voice(p),
            AudioCommand::SetDelayTime(secs) => self.effects.set_delay_time(secs),
            AudioCommand::SetReverbLevel(level) => self.effects.set_reverb_level(level),
        }
    }

    fn trigger_voice(&mut self, p: VoiceParams) {
        let offset_frames = (p.offset.max(0.0) * self.sample_rate as f32).round() as u64;
        let start = self.clock + offset_frames;

        // free slot, otherwise steal the oldest voice
        let slot = self
            .voices
            .iter()
            .position(|v| !v.active)
            .or_else(|| {
                self.voices
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, v)| v.start_frame())
                    .map(|(i, _)| i)
            })
            .unwrap_or(0);

        self.voices[slot] = PianoVoice::new(p.frequency, start, p.duration, self.sample_rate);
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        for frame in out.iter_mut() {
            let mut mono = 0.0f32;
            for v in self.voices.iter_mut() {
                mono += v.next_sample(self.clock);
            }
            *frame = self.effects.process(mono).clamped();
            self.clock += 1;
        }
    }
}
