//! The caption form and its request lifecycle.

use tokio::time::Instant;

use crate::config::{ChoiceOption, FormConfig};
use crate::error::{CaptionError, FormError};
use crate::picker::PickedImage;
use crate::render::{result_entries, CaptionEntry, CaptionResult, CopyTracker, ResultEntry};
use crate::service::{CaptionRequest, ImageUpload};

/// Identifies one submission. Later submissions get larger tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Submitting { token: RequestToken },
    Success(CaptionResult),
    Error(CaptionError),
}

/// A request that has been issued and is waiting to be settled.
#[derive(Debug, Clone)]
pub struct Submission {
    pub token: RequestToken,
    pub request: CaptionRequest,
}

#[derive(Debug)]
pub struct CaptionForm {
    styles: Vec<ChoiceOption>,
    languages: Vec<ChoiceOption>,
    image: Option<PickedImage>,
    style: String,
    language: String,
    details: String,
    status: Status,
    latest_token: RequestToken,
    copies: CopyTracker,
}

impl CaptionForm {
    pub fn new(config: &FormConfig) -> Self {
        let styles = config.styles.clone();
        let languages = config.languages.clone();
        let style = styles.first().map(|o| o.value.clone()).unwrap_or_default();
        let language = languages.first().map(|o| o.value.clone()).unwrap_or_default();

        Self {
            styles,
            languages,
            image: None,
            style,
            language,
            details: String::new(),
            status: Status::Idle,
            latest_token: RequestToken::default(),
            copies: CopyTracker::new(config.copy_ack),
        }
    }

    pub fn styles(&self) -> &[ChoiceOption] {
        &self.styles
    }

    pub fn languages(&self) -> &[ChoiceOption] {
        &self.languages
    }

    pub fn image(&self) -> Option<&PickedImage> {
        self.image.as_ref()
    }

    /// Replace the current image. The previous image's preview is released.
    pub fn set_image(&mut self, image: PickedImage) {
        self.image = Some(image);
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn set_details(&mut self, details: impl Into<String>) {
        self.details = details.into();
    }

    pub fn select_style(&mut self, value: &str) -> Result<(), FormError> {
        self.style = Self::choose(&self.styles, "style", value)?;
        Ok(())
    }

    pub fn select_language(&mut self, value: &str) -> Result<(), FormError> {
        self.language = Self::choose(&self.languages, "language", value)?;
        Ok(())
    }

    fn choose(options: &[ChoiceOption], field: &'static str, value: &str) -> Result<String, FormError> {
        options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.value.clone())
            .ok_or_else(|| FormError::UnknownOption {
                field,
                value: value.to_string(),
            })
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, Status::Submitting { .. })
    }

    pub fn latest_token(&self) -> RequestToken {
        self.latest_token
    }

    /// Start a submission with the current selections.
    ///
    /// Without an image nothing changes and `NoImage` is returned. Otherwise
    /// the previous result is cleared, the form becomes `Submitting`, and the
    /// returned submission carries a fresh token.
    pub fn begin_submission(&mut self) -> Result<Submission, CaptionError> {
        let image = self.image.as_ref().ok_or(CaptionError::NoImage)?;

        let details = self.details.trim();
        let request = CaptionRequest {
            image: ImageUpload {
                file_name: image.file_name.clone(),
                mime: image.mime.clone(),
                bytes: image.bytes.clone(),
            },
            style: self.style.clone(),
            language: self.language.clone(),
            details: (!details.is_empty()).then(|| details.to_string()),
        };

        self.latest_token = RequestToken(self.latest_token.0 + 1);
        let token = self.latest_token;
        self.status = Status::Submitting { token };
        self.copies.clear();

        tracing::info!(token = token.0, style = %request.style, language = %request.language, "submitting caption request");
        Ok(Submission { token, request })
    }

    /// Apply the outcome of a submission. Returns false, leaving the form
    /// untouched, when the submission is no longer the one being waited on.
    pub fn settle(&mut self, token: RequestToken, outcome: Result<CaptionResult, CaptionError>) -> bool {
        if self.status != (Status::Submitting { token }) {
            tracing::info!(
                token = token.0,
                latest = self.latest_token.0,
                "discarding stale caption response"
            );
            return false;
        }

        self.status = match outcome {
            Ok(result) => Status::Success(result),
            Err(e) => Status::Error(e),
        };
        true
    }

    /// Clear the image, details and results. Selections are kept and any
    /// request still in flight will be discarded when it settles.
    pub fn start_over(&mut self) {
        self.image = None;
        self.details.clear();
        self.status = Status::Idle;
        self.copies.clear();
    }

    pub fn entries(&self) -> Vec<ResultEntry<'_>> {
        result_entries(&self.status)
    }

    /// Caption at `index` when the form is showing captions.
    pub fn caption(&self, index: usize) -> Option<&CaptionEntry> {
        match &self.status {
            Status::Success(result) => result.entries().get(index),
            _ => None,
        }
    }

    pub fn mark_copied(&mut self, index: usize, now: Instant) -> Result<(), FormError> {
        if self.caption(index).is_none() {
            return Err(FormError::NoSuchEntry(index));
        }
        self.copies.mark(index, now);
        Ok(())
    }

    pub fn is_copied(&self, index: usize, now: Instant) -> bool {
        self.copies.is_acknowledged(index, now)
    }

    pub fn copies(&self) -> &CopyTracker {
        &self.copies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picker::tests::PNG_BYTES;
    use crate::picker::ImagePicker;
    use axum::body::Bytes;
    use std::time::Duration;

    fn form_with_image(picker: &ImagePicker) -> CaptionForm {
        let mut form = CaptionForm::new(&FormConfig::default());
        form.set_image(
            picker
                .pick("cat.png", "image/png", Bytes::from_static(PNG_BYTES))
                .unwrap(),
        );
        form
    }

    #[test]
    fn test_defaults_to_first_options() {
        let form = CaptionForm::new(&FormConfig::default());
        assert_eq!(form.style(), "funny");
        assert_eq!(form.language(), "en-us");
        assert_eq!(form.status(), &Status::Idle);
        assert!(form.image().is_none());
    }

    #[test]
    fn test_unknown_option_keeps_selection() {
        let mut form = CaptionForm::new(&FormConfig::default());
        form.select_style("witty").unwrap();
        let err = form.select_style("sarcastic").unwrap_err();
        assert_eq!(
            err,
            FormError::UnknownOption {
                field: "style",
                value: "sarcastic".to_string()
            }
        );
        assert_eq!(form.style(), "witty");
        assert!(form.select_language("fr").is_err());
        assert_eq!(form.language(), "en-us");
    }

    #[test]
    fn test_submit_without_image_is_rejected() {
        let mut form = CaptionForm::new(&FormConfig::default());
        let err = form.begin_submission().unwrap_err();
        assert_eq!(err, CaptionError::NoImage);
        assert_eq!(form.status(), &Status::Idle);
        assert_eq!(form.latest_token(), RequestToken::default());
    }

    #[test]
    fn test_submission_carries_selections() {
        let picker = ImagePicker::default();
        let mut form = form_with_image(&picker);
        form.select_style("random").unwrap();
        form.select_language("ta").unwrap();
        form.set_details("  ");

        let submission = form.begin_submission().unwrap();
        assert_eq!(submission.request.style, "random");
        assert_eq!(submission.request.language, "ta");
        assert_eq!(submission.request.details, None);
        assert_eq!(submission.request.image.file_name, "cat.png");
        assert!(form.is_loading());

        form.set_details("golden hour");
        let second = form.begin_submission().unwrap();
        assert!(second.token > submission.token);
        assert_eq!(second.request.details.as_deref(), Some("golden hour"));
    }

    #[test]
    fn test_new_submission_clears_previous_result() {
        let picker = ImagePicker::default();
        let mut form = form_with_image(&picker);
        let first = form.begin_submission().unwrap();
        assert!(form.settle(first.token, Ok(CaptionResult(vec![CaptionEntry::plain("A")]))));
        assert_eq!(form.entries().len(), 1);

        form.begin_submission().unwrap();
        assert!(form.entries().is_empty());
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let picker = ImagePicker::default();
        let mut form = form_with_image(&picker);
        let slow = form.begin_submission().unwrap();
        let fast = form.begin_submission().unwrap();

        let fresh = CaptionResult(vec![CaptionEntry::plain("fresh")]);
        assert!(form.settle(fast.token, Ok(fresh.clone())));
        assert!(!form.settle(slow.token, Ok(CaptionResult(vec![CaptionEntry::plain("stale")]))));
        assert_eq!(form.status(), &Status::Success(fresh));
    }

    #[test]
    fn test_failure_becomes_single_error_entry() {
        let picker = ImagePicker::default();
        let mut form = form_with_image(&picker);
        let submission = form.begin_submission().unwrap();
        form.settle(
            submission.token,
            Err(CaptionError::NetworkFailure("connection refused".to_string())),
        );

        assert!(!form.is_loading());
        assert_eq!(
            form.entries(),
            vec![ResultEntry::Error("Network error: connection refused".to_string())]
        );
    }

    #[test]
    fn test_start_over_clears_everything() {
        let picker = ImagePicker::default();
        let mut form = form_with_image(&picker);
        form.select_style("romantic").unwrap();
        form.set_details("anniversary dinner");
        let submission = form.begin_submission().unwrap();
        form.settle(submission.token, Ok(CaptionResult(vec![CaptionEntry::plain("A")])));

        form.start_over();
        assert!(form.image().is_none());
        assert_eq!(form.details(), "");
        assert!(form.entries().is_empty());
        assert_eq!(form.status(), &Status::Idle);
        assert_eq!(form.style(), "romantic");
        assert!(picker.previews().is_empty());
    }

    #[test]
    fn test_start_over_while_submitting_discards_response() {
        let picker = ImagePicker::default();
        let mut form = form_with_image(&picker);
        let submission = form.begin_submission().unwrap();

        form.start_over();
        assert!(!form.settle(submission.token, Ok(CaptionResult(vec![CaptionEntry::plain("late")]))));
        assert_eq!(form.status(), &Status::Idle);
    }

    #[test]
    fn test_replacing_image_releases_old_preview() {
        let picker = ImagePicker::default();
        let mut form = form_with_image(&picker);
        let old_id = form.image().unwrap().preview().id();

        form.set_image(
            picker
                .pick("dog.png", "image/png", Bytes::from_static(PNG_BYTES))
                .unwrap(),
        );
        assert!(picker.previews().get(old_id).is_none());
        assert_eq!(picker.previews().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_requires_existing_caption() {
        let picker = ImagePicker::default();
        let mut form = form_with_image(&picker);
        assert_eq!(form.mark_copied(0, Instant::now()), Err(FormError::NoSuchEntry(0)));

        let submission = form.begin_submission().unwrap();
        form.settle(
            submission.token,
            Ok(CaptionResult(vec![CaptionEntry::plain("A"), CaptionEntry::plain("B")])),
        );
        form.mark_copied(1, Instant::now()).unwrap();
        assert!(form.is_copied(1, Instant::now()));
        assert!(!form.is_copied(0, Instant::now()));

        tokio::time::advance(form.copies().delay() + Duration::from_millis(1)).await;
        assert!(!form.is_copied(1, Instant::now()));
    }
}
