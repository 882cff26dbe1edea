#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use caption_it::{CaptionError, CaptionRequest, CaptionResult, CaptionService};

pub const BOUNDARY: &str = "caption-it-test-boundary";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        mime: &'a str,
        bytes: &'a [u8],
    },
}

pub fn image_part(bytes: &[u8]) -> Part<'_> {
    Part::File {
        name: "image",
        file_name: "cat.png",
        mime: "image/png",
        bytes,
    }
}

/// Encode parts as a multipart/form-data body using [`BOUNDARY`].
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, mime
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Caption service that answers from a script and remembers what it was asked.
pub struct ScriptedService {
    replies: Mutex<Vec<(Duration, Result<CaptionResult, CaptionError>)>>,
    calls: AtomicUsize,
    pub requests: Mutex<Vec<CaptionRequest>>,
}

impl ScriptedService {
    /// Replies are used in order; the last one repeats.
    pub fn new(replies: Vec<(Duration, Result<CaptionResult, CaptionError>)>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(result: Result<CaptionResult, CaptionError>) -> Self {
        Self::new(vec![(Duration::ZERO, result)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptionService for ScriptedService {
    async fn generate(&self, request: &CaptionRequest) -> Result<CaptionResult, CaptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let (delay, reply) = {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.remove(0)
            } else {
                replies[0].clone()
            }
        };
        tokio::time::sleep(delay).await;
        reply
    }
}
