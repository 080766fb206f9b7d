// Everything the UI side can ask of the audio thread. The engine owns the
// clock, so voice start times travel as offsets from "whenever the engine
// picks the command up".

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceParams {
    pub frequency: f32,
    pub offset: f32,   // seconds after receipt
    pub duration: f32, // seconds
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AudioCommand {
    PlayVoice(VoiceParams),

    // live effect parameters; applied in place, last write wins
    SetDelayTime(f32),
    SetReverbLevel(f32),
}
