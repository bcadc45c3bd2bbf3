//! Command-line configuration for the server.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// File name of the model artifact written by `evasao-train`.
pub const MODEL_FILE_NAME: &str = "modelo_evasao.bin";

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    about = "Serve the academic dropout prediction form",
    long_about = "Serves a form with one input per student attribute and answers each \
                  submission with the predicted outcome and the dropout probability.\n\n\
                  EXAMPLES:\n  \
                  # Model next to the executable, default address\n  \
                  evasao-web\n\n  \
                  # Explicit model and address\n  \
                  evasao-web --model modelo_evasao.bin --listen 0.0.0.0:8080"
)]
pub struct WebConfig {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8501")]
    pub listen: SocketAddr,

    /// Model artifact (defaults to modelo_evasao.bin next to the executable)
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl WebConfig {
    /// The artifact path to load, resolving the default.
    pub fn model_path(&self) -> PathBuf {
        self.model.clone().unwrap_or_else(default_model_path)
    }
}

/// `modelo_evasao.bin` in the executable's directory, or in the working
/// directory when the executable path is unknown.
pub fn default_model_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(MODEL_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(MODEL_FILE_NAME))
}
