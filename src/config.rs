use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::generator::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::pipeline::persistence::custom_file_path;

const APP_DIR: &str = "chordtty";
const LOG_FILE: &str = "chordtty.log";

#[derive(Parser, Debug, Clone)]
#[command(name = "chordtty")]
#[command(about = "Terminal piano that plays and visualizes chord progressions", long_about = None)]
pub struct Config {
    /// Where saved progressions (and the log, by default) live
    #[arg(long, env = "CHORDTTY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Impulse response WAV for the reverb; a synthetic one is used if it can't be read
    #[arg(long, default_value = "impulse-response.wav")]
    pub impulse: PathBuf,

    /// Chat-completion endpoint used to generate progressions
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Model identifier sent with each generation request
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Bearer token for the endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Artificial latency of the built-in progression fetch
    #[arg(long, default_value = "1000")]
    pub fetch_latency_ms: u64,

    /// Log file (default: <data-dir>/chordtty.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| std::env::current_dir().unwrap_or_default())
                .join(APP_DIR)
        })
    }

    pub fn custom_file(&self) -> PathBuf {
        custom_file_path(&self.data_dir())
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| self.data_dir().join(LOG_FILE))
    }

    pub fn fetch_latency(&self) -> Duration {
        Duration::from_millis(self.fetch_latency_ms)
    }
}
