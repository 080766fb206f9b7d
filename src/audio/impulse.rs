use std::path::Path;

use tracing::{info, warn};

use super::sample_buffer::SampleBuffer;

// Length of the generated fallback impulse
pub const SYNTHETIC_IR_SECS: f32 = 2.0;

/// Stereo impulse response for the convolver, already at the output rate.
#[derive(Clone, Debug, Default)]
pub struct ImpulseResponse {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl ImpulseResponse {
    pub fn len(&self) -> usize {
        self.left.len().max(self.right.len())
    }

    /// A single unit tap; the convolver becomes a pure (scaled) delay.
    pub fn unit() -> Self {
        Self { left: vec![1.0], right: vec![1.0] }
    }

    pub fn load_wav(path: &Path, sample_rate: u32) -> anyhow::Result<Self> {
        let buffer = SampleBuffer::load_wav(path, sample_rate)?;
        Ok(Self {
            left: buffer.data.iter().map(|f| f.left).collect(),
            right: buffer.data.iter().map(|f| f.right).collect(),
        })
    }

    /// Two seconds of white noise under a squared linear decay, each side
    /// drawn independently.
    pub fn synthesize(sample_rate: u32, rng: &mut fastrand::Rng) -> Self {
        let len = ((SYNTHETIC_IR_SECS * sample_rate as f32) as usize).max(1);
        let mut side = || -> Vec<f32> {
            (0..len)
                .map(|i| {
                    let decay = 1.0 - i as f32 / len as f32;
                    (rng.f32() * 2.0 - 1.0) * decay * decay
                })
                .collect()
        };
        let left = side();
        let right = side();
        Self { left, right }
    }

    /// Load the IR asset, falling back to a synthetic one on any failure.
    pub fn load_or_synthesize(path: Option<&Path>, sample_rate: u32) -> Self {
        let loaded = match path {
            Some(p) => Self::load_wav(p, sample_rate),
            None => Err(anyhow::anyhow!("no impulse response configured")),
        };
        match loaded {
            Ok(ir) => {
                info!(frames = ir.len(), "loaded impulse response");
                ir
            }
            Err(e) => {
                warn!("failed to load impulse response, using synthetic decay: {e:#}");
                Self::synthesize(sample_rate, &mut fastrand::Rng::new())
            }
        }
    }
}
