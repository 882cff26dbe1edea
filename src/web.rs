use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::config::FormConfig;
use crate::error::CaptionError;
use crate::form::CaptionForm;
use crate::page;
use crate::picker::{ImagePicker, PickedImage};
use crate::render::{download_body, download_file_name};
use crate::service::CaptionService;

pub struct AppState {
    pub form: Mutex<CaptionForm>,
    pub picker: ImagePicker,
    pub service: Arc<dyn CaptionService>,
    pub config: FormConfig,
}

impl AppState {
    pub fn new(config: FormConfig, service: Arc<dyn CaptionService>) -> Arc<Self> {
        Arc::new(Self {
            form: Mutex::new(CaptionForm::new(&config)),
            picker: ImagePicker::default(),
            service,
            config,
        })
    }

    /// Begin a submission and run it in the background.
    ///
    /// The returned task settles the form when the service answers and
    /// yields whether the answer was applied (false when it went stale).
    pub async fn submit(self: &Arc<Self>) -> Result<JoinHandle<bool>, CaptionError> {
        let submission = self.form.lock().await.begin_submission()?;
        let state = Arc::clone(self);

        Ok(tokio::spawn(async move {
            let outcome = state.service.generate(&submission.request).await;
            state.form.lock().await.settle(submission.token, outcome)
        }))
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/image", post(pick_image))
        .route("/generate", post(generate))
        .route("/reset", post(start_over))
        .route("/captions/:index/copy", post(copy_caption))
        .route("/captions/:index/download", get(download_caption))
        .route("/preview/:id", get(preview_image))
        .nest_service("/static", static_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Fields posted by the page. Anything missing keeps its current value.
#[derive(Debug, Default)]
struct Submitted {
    image: Option<PickedImage>,
    style: Option<String>,
    language: Option<String>,
    details: Option<String>,
}

impl Submitted {
    async fn read(picker: &ImagePicker, mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut submitted = Submitted::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let mime = field.content_type().unwrap_or_default().to_string();
                    let data = field.bytes().await?;
                    if let Some(image) = picker.pick(&file_name, &mime, data) {
                        submitted.image = Some(image);
                    }
                }
                "type" => submitted.style = Some(field.text().await?),
                "language" => submitted.language = Some(field.text().await?),
                "details" => submitted.details = Some(field.text().await?),
                other => tracing::debug!(field = other, "ignoring unknown form field"),
            }
        }

        Ok(submitted)
    }

    fn apply(self, form: &mut CaptionForm) {
        if let Some(image) = self.image {
            form.set_image(image);
        }
        if let Some(style) = self.style {
            if let Err(e) = form.select_style(&style) {
                tracing::warn!("{}", e);
            }
        }
        if let Some(language) = self.language {
            if let Err(e) = form.select_language(&language) {
                tracing::warn!("{}", e);
            }
        }
        if let Some(details) = self.details {
            form.set_details(details);
        }
    }
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let form = state.form.lock().await;
    Html(page::render(&form, None, Instant::now()))
}

/// Browse and drop both land here. The script posts the whole form so the
/// other selections survive the reload.
async fn pick_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Redirect, MultipartError> {
    let submitted = Submitted::read(&state.picker, multipart).await?;
    submitted.apply(&mut *state.form.lock().await);
    Ok(Redirect::to("/"))
}

async fn preview_image(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> Response {
    let Some(preview) = state.picker.previews().get(id) else {
        return (StatusCode::NOT_FOUND, "Preview released").into_response();
    };

    (
        [
            (header::CONTENT_TYPE, preview.mime),
            (header::CACHE_CONTROL, "no-store".to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
            // Uploaded SVGs must not run scripts when opened directly.
            (
                header::CONTENT_SECURITY_POLICY,
                "default-src 'none'; style-src 'unsafe-inline'; sandbox".to_string(),
            ),
        ],
        preview.bytes,
    )
        .into_response()
}

async fn generate(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, MultipartError> {
    let submitted = Submitted::read(&state.picker, multipart).await?;
    submitted.apply(&mut *state.form.lock().await);

    match state.submit().await {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(e) => {
            tracing::info!("submission blocked: {}", e);
            let form = state.form.lock().await;
            let html = page::render(&form, Some(&e.to_string()), Instant::now());
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(html)).into_response())
        }
    }
}

async fn start_over(State(state): State<Arc<AppState>>) -> Redirect {
    state.form.lock().await.start_over();
    Redirect::to("/#top")
}

async fn copy_caption(State(state): State<Arc<AppState>>, Path(index): Path<usize>) -> Response {
    let mut form = state.form.lock().await;
    match form.mark_copied(index, Instant::now()) {
        Ok(()) => Redirect::to(&format!("/#caption-{}", index)).into_response(),
        Err(e) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    }
}

async fn download_caption(
    State(state): State<Arc<AppState>>,
    Path(index): Path<usize>,
) -> Response {
    let form = state.form.lock().await;
    let Some(entry) = form.caption(index) else {
        return (StatusCode::NOT_FOUND, format!("No caption at position {}", index)).into_response();
    };

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download_file_name(index)),
            ),
        ],
        download_body(entry),
    )
        .into_response()
}
