use std::path::Path;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info};

use crate::audio_api::AudioCommand;

mod effect;
mod engine;
mod frame;
mod impulse;
mod sample_buffer;
mod voice;

pub use effect::{DEFAULT_DELAY_SECS, DEFAULT_REVERB_LEVEL};
pub use engine::Engine;
pub use frame::StereoFrame;
pub use impulse::ImpulseResponse;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        if self.tx.try_send(cmd).is_err() {
            debug!(?cmd, "audio command queue full, dropping");
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Open the default output device and start the engine on it. The impulse
/// response is decoded (or synthesized) before the stream starts so the
/// callback never touches the filesystem.
pub fn start_audio(impulse_path: Option<&Path>) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate: u32 = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let impulse = ImpulseResponse::load_or_synthesize(impulse_path, sample_rate);
            let engine = Engine::new(sample_rate, &impulse);

            let output_stream = build_output_stream_f32(&device, &config.into(), engine, rx, channels)?;
            output_stream.play().context("failed to play output stream")?;
            info!(sample_rate, channels, "audio output started");

            Ok(AudioHandle {
                tx,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut engine: Engine,
    rx: Receiver<AudioCommand>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let err_fn = |err| error!("audio output stream error: {err}");

    // scratch grows to the largest block the device asks for, then stays put
    let mut scratch: Vec<StereoFrame> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels.max(1);
            if scratch.len() < n_frames {
                scratch.resize(n_frames, StereoFrame::zero());
            }
            let frames = &mut scratch[..n_frames];
            engine.render_block(frames);

            for (out, frame) in data.chunks_exact_mut(channels.max(1)).zip(frames.iter()) {
                match out {
                    [mono] => *mono = 0.5 * (frame.left + frame.right),
                    [l, r, rest @ ..] => {
                        *l = frame.left;
                        *r = frame.right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
