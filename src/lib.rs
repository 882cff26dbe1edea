//! Caption It: a web form that sends an image to a captioning service and
//! shows the captions it gets back.

pub mod config;
pub mod error;
pub mod form;
pub mod page;
pub mod picker;
pub mod render;
pub mod service;
pub mod web;

pub use config::FormConfig;
pub use error::{CaptionError, ErrorKind, FormError};
pub use form::{CaptionForm, RequestToken, Status, Submission};
pub use render::{CaptionEntry, CaptionResult};
pub use service::{CaptionRequest, CaptionService, HttpCaptionService};
