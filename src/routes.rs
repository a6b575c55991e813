use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::cookie::Cookie;
use actix_web::http::header::{self, ContentType};
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::TryStreamExt as _;
use serde_json::json;
use tracing::{debug, info};

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::csrf;
use crate::error::AppError;
use crate::models::*;
use crate::render::{RenderError, Renderer};
use crate::repo::{PostRepo, RepoError};
use crate::storage::{self, allowed_file, secure_filename, ImageError, ImageStore, Upload};

pub const FLASH_COOKIE: &str = "flash";
const FLASH_CREATED: &str = "created";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(
            web::resource("/add")
                .route(web::get().to(add_form))
                .route(web::post().to(add_post)),
        )
        .service(web::resource("/blog/{id}").route(web::get().to(view_blog)))
        .service(web::resource("/search").route(web::get().to(search)));
    // uploads are linked from pages as /static/images/<filename>
    cfg.route("/static/images/{filename}", web::get().to(get_image));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn PostRepo>,
    pub image_store: Arc<dyn ImageStore>,
    pub renderer: Arc<Renderer>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(repo: Arc<dyn PostRepo>, image_store: Arc<dyn ImageStore>) -> Result<Self, RenderError> {
        Ok(Self {
            repo,
            image_store,
            renderer: Arc::new(Renderer::new()?),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        })
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    fn page<T: serde::Serialize>(&self, page: &str, ctx: &T) -> Result<String, AppError> {
        Ok(self.renderer.render(page, ctx)?)
    }
}

fn html(body: String) -> HttpResponse {
    HttpResponse::Ok().content_type(ContentType::html()).body(body)
}

// ---------------- List -----------------------------------------------
pub async fn home(req: HttpRequest, data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let blogs = data.repo.list_all().await?;
    let flash = req
        .cookie(FLASH_COOKIE)
        .filter(|c| c.value() == FLASH_CREATED)
        .map(|_| "Blog successfully added!");
    let body = data.page("home", &json!({ "blogs": blogs, "flash": flash }))?;
    let mut resp = HttpResponse::Ok();
    resp.content_type(ContentType::html());
    if req.cookie(FLASH_COOKIE).is_some() {
        // shown once
        let mut gone = Cookie::new(FLASH_COOKIE, "");
        gone.set_path("/");
        gone.make_removal();
        resp.cookie(gone);
    }
    Ok(resp.body(body))
}

// ---------------- Create ---------------------------------------------
/// Result of a create submission: either the stored post or the reasons it
/// was turned away, together with what the user typed.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(Post),
    Rejected { errors: FormErrors, input: PostForm },
}

/// Validates the form, stores the image (if any) and then the post.
/// Missing title/content and unusable images are rejections, not failures.
pub async fn create_post(
    repo: &dyn PostRepo,
    images: &dyn ImageStore,
    form: PostForm,
    upload: Option<Upload>,
    max_upload_bytes: usize,
) -> Result<CreateOutcome, AppError> {
    let mut errors = FormErrors::check(&form);
    if !errors.is_empty() {
        return Ok(CreateOutcome::Rejected { errors, input: form });
    }
    let image_path = match storage::accept(images, upload, max_upload_bytes).await {
        Ok(p) => p,
        Err(ImageError::UnsupportedFileType) => {
            errors.image = Some("Only .png, .jpg and .jpeg images are allowed.".into());
            return Ok(CreateOutcome::Rejected { errors, input: form });
        }
        Err(ImageError::TooLarge) => {
            errors.image = Some(format!("Images must be at most {max_upload_bytes} bytes."));
            return Ok(CreateOutcome::Rejected { errors, input: form });
        }
        Err(e) => return Err(e.into()),
    };
    match repo.insert(form.clone().into_new_post(image_path)).await {
        Ok(post) => Ok(CreateOutcome::Created(post)),
        Err(RepoError::Validation(msg)) => {
            errors.content = Some(msg);
            Ok(CreateOutcome::Rejected { errors, input: form })
        }
        Err(e) => Err(e.into()),
    }
}

fn add_page(
    data: &AppState,
    token: &str,
    form: &PostForm,
    errors: &FormErrors,
) -> Result<HttpResponse, AppError> {
    let body = data.page("add", &json!({ "form": form, "errors": errors, "csrf_token": token }))?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .cookie(csrf::token_cookie(token))
        .body(body))
}

pub async fn add_form(req: HttpRequest, data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let token = csrf::current_or_new(&req);
    add_page(&data, &token, &PostForm::default(), &FormErrors::default())
}

#[derive(Default)]
struct Submission {
    form: PostForm,
    csrf_token: Option<String>,
    upload: Option<Upload>,
}

async fn read_submission(mut payload: Multipart, max_upload_bytes: usize) -> Result<Submission, AppError> {
    let mut sub = Submission::default();
    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        debug!("multipart error: {e}");
        AppError::BadRequest
    })? {
        let cd = field.content_disposition();
        let name = cd.get_name().unwrap_or_default().to_owned();
        let filename = cd.get_filename().map(str::to_owned);

        // only the image part is capped; text fields are read in full
        let cap = (name == "image").then(|| max_upload_bytes.saturating_add(1));
        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            debug!("multipart stream error: {e}");
            AppError::BadRequest
        })? {
            match cap {
                // one byte past the limit is enough for intake to reject it
                Some(cap) => {
                    let room = cap.saturating_sub(bytes.len());
                    bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
                }
                None => bytes.extend_from_slice(&chunk),
            }
        }

        match name.as_str() {
            "name" => sub.form.name = field_text(bytes)?,
            "title" => sub.form.title = field_text(bytes)?,
            "content" => sub.form.content = field_text(bytes)?,
            csrf::CSRF_FIELD => sub.csrf_token = Some(field_text(bytes)?),
            "image" => {
                sub.upload = filename.map(|filename| Upload { filename, bytes });
            }
            _ => {}
        }
    }
    Ok(sub)
}

fn field_text(bytes: Vec<u8>) -> Result<String, AppError> {
    String::from_utf8(bytes).map_err(|_| AppError::BadRequest)
}

pub async fn add_post(
    req: HttpRequest,
    data: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let sub = read_submission(payload, data.max_upload_bytes).await?;
    if !csrf::verify(&req, sub.csrf_token.as_deref()) {
        debug!("create rejected: csrf token missing or mismatched");
        return Err(AppError::Forbidden);
    }
    let outcome = create_post(
        data.repo.as_ref(),
        data.image_store.as_ref(),
        sub.form,
        sub.upload,
        data.max_upload_bytes,
    )
    .await?;
    match outcome {
        CreateOutcome::Created(post) => {
            info!(id = post.id, title = %post.title, "post created");
            let mut flash = Cookie::new(FLASH_COOKIE, FLASH_CREATED);
            flash.set_path("/");
            Ok(HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/"))
                .cookie(flash)
                .finish())
        }
        CreateOutcome::Rejected { errors, input } => {
            debug!(?errors, "create rejected");
            let token = csrf::current_or_new(&req);
            add_page(&data, &token, &input, &errors)
        }
    }
}

// ---------------- View -----------------------------------------------
pub async fn view_blog(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let Ok(id) = path.into_inner().parse::<Id>() else {
        return not_found_page(&data);
    };
    match data.repo.get_by_id(id).await {
        Ok(post) => Ok(html(data.page("blog", &json!({ "post": post }))?)),
        Err(RepoError::NotFound) => not_found_page(&data),
        Err(e) => Err(e.into()),
    }
}

fn not_found_page(data: &AppState) -> Result<HttpResponse, AppError> {
    let body = data.page(
        "error",
        &json!({ "heading": "Post not found", "message": "There is no post with that id." }),
    )?;
    Ok(HttpResponse::NotFound().content_type(ContentType::html()).body(body))
}

// ---------------- Search ---------------------------------------------
pub async fn search(data: web::Data<AppState>, query: web::Query<SearchQuery>) -> Result<HttpResponse, AppError> {
    let q = query.into_inner().search;
    let results = data.repo.search(&q).await?;
    Ok(html(data.page("search", &json!({ "query": q, "results": results }))?))
}

// ---------------- Images ---------------------------------------------
pub async fn get_image(data: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let filename = path.into_inner();
    if secure_filename(&filename) != filename || !allowed_file(&filename) {
        return Err(AppError::NotFound);
    }
    let bytes = data.image_store.load(&filename).await?;
    let mime = if filename.to_ascii_lowercase().ends_with(".png") { "image/png" } else { "image/jpeg" };
    Ok(HttpResponse::Ok().insert_header((header::CONTENT_TYPE, mime)).body(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::inmem::InMemRepo;
    use crate::storage::FsImageStore;

    fn form(title: &str, content: &str) -> PostForm {
        PostForm { name: String::new(), title: title.into(), content: content.into() }
    }

    #[tokio::test]
    async fn valid_form_without_image_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let repo = InMemRepo::new();
        let images = FsImageStore::new(dir.path());
        let out = create_post(&repo, &images, form("Hello", "World"), None, 1024).await.unwrap();
        match out {
            CreateOutcome::Created(p) => {
                assert_eq!(p.title, "Hello");
                assert_eq!(p.image_path, None);
            }
            other => panic!("expected Created, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejection_echoes_input_and_skips_image_write() {
        let dir = tempfile::tempdir().unwrap();
        let repo = InMemRepo::new();
        let images = FsImageStore::new(dir.path());
        let upload = Upload { filename: "ok.png".into(), bytes: b"png".to_vec() };
        let out = create_post(&repo, &images, form("", "body"), Some(upload), 1024).await.unwrap();
        match out {
            CreateOutcome::Rejected { errors, input } => {
                assert!(errors.title.is_some());
                assert!(errors.content.is_none());
                assert_eq!(input.content, "body");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert!(!dir.path().join("ok.png").exists());
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn bad_extension_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = InMemRepo::new();
        let images = FsImageStore::new(dir.path());
        let upload = Upload { filename: "photo.GIF".into(), bytes: b"gif".to_vec() };
        let out = create_post(&repo, &images, form("t", "c"), Some(upload), 1024).await.unwrap();
        assert!(matches!(out, CreateOutcome::Rejected { ref errors, .. } if errors.image.is_some()));
    }
}
