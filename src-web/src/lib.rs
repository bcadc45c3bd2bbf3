//! evasao-web: the student dropout prediction form.
//!
//! Serves an HTML page with one input per predictor column, scores the
//! submitted record with the model trained by `evasao-train`, and shows the
//! dropout probability as an error-styled (dropout) or success-styled
//! (graduation) message. The same scoring is available as JSON at
//! `POST /api/predict`.
//!
//! The model is loaded once per process through [`ModelHandle`] and shared
//! read-only by every request.

pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod state;
pub mod verdict;

pub use config::WebConfig;
pub use error::{PageError, WebError};
pub use handlers::router;
pub use state::{AppState, ModelHandle};
pub use verdict::{Verdict, VerdictStyle};
