// Asks a chat-completion endpoint to invent a progression and reads the reply
// straight back as a `Progression`. One request per call, no retries.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pipeline::progression::Progression;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4";
const TEMPERATURE: f32 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("no API key configured (set OPENAI_API_KEY or pass --api-key)")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("reply carried no message content")]
    EmptyReply,

    #[error("reply is not a progression: {0}")]
    Parse(#[from] serde_json::Error),
}

pub trait ProgressionGenerator: Send + Sync {
    fn generate(&self, description: &str) -> Result<Progression, GenerateError>;
}

// ── Wire types ────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

// ── Client ────────────────────────────────────────────────────────

pub struct ChatCompletionGenerator {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatCompletionGenerator {
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }
}

impl ProgressionGenerator for ChatCompletionGenerator {
    fn generate(&self, description: &str) -> Result<Progression, GenerateError> {
        let api_key = self.api_key.as_deref().ok_or(GenerateError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: build_prompt(description) }],
            temperature: TEMPERATURE,
        };
        debug!(endpoint = %self.endpoint, model = %self.model, "requesting progression");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(GenerateError::Status { status: status.as_u16(), body });
        }
        let progression = parse_reply(&body)?;
        info!(name = %progression.name, "generated progression");
        Ok(progression)
    }
}

pub fn build_prompt(description: &str) -> String {
    format!(
        r#"Create a piano chord progression based on this description: "{description}".
Reply only with a JSON string that follows this interface:
interface Progression {{
  name: string;
  chords: string;
  solo: string;
  info: string;
}}

Follow these specific guidelines:
1. The 'name' should be a short, descriptive title for the progression.
2. The 'chords' should be a space-separated string of chord symbols, NOT individual notes. For example: "Cmaj7 Am7 Dm7 G7" is correct, but "C4 E4 G4 B4, A3 C4 E4 G4" is not.
3. Each chord symbol should follow standard notation: root note (uppercase) followed by quality (maj, min, dim, aug, etc.) and extensions (7, 9, 11, etc.) if applicable. Examples: C, Dm, Gmaj7, F#m7b5.
4. The 'solo' should be a space-separated string of individual notes with octave numbers, representing a melodic line that fits over the chord progression. For example: "C5 E5 G5 B5 A5 G5 F5 D5".
5. The 'info' should provide a brief description of the progression, its mood, or potential use in music.

Ensure the JSON is valid and can be parsed without errors."#
    )
}

/// Pull the first choice's content out of a completion body and parse it as
/// a progression. No schema checks beyond what serde needs.
pub fn parse_reply(body: &str) -> Result<Progression, GenerateError> {
    let reply: ChatResponse = serde_json::from_str(body)?;
    let content = reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(GenerateError::EmptyReply)?;
    Ok(serde_json::from_str(&content)?)
}

pub type GenerateResult = Result<Progression, GenerateError>;

/// Run one generation on its own thread; the result shows up on `tx`.
pub fn spawn_generate(
    generator: Arc<dyn ProgressionGenerator>,
    description: String,
    tx: Sender<GenerateResult>,
) {
    thread::spawn(move || {
        let result = generator.generate(&description);
        if tx.send(result).is_err() {
            warn!("generation finished after the app stopped listening");
        }
    });
}
