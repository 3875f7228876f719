//! HTTP upload surface, enabled with the `server` feature.

use std::sync::Arc;

use actix_web::{
    http::header::CONTENT_TYPE, web, App, HttpRequest, HttpResponse, HttpServer,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    encoder::ImageEncoder,
    error::{Result, TryOnError},
    gemini::TryOnClient,
    orchestrator::{generate_shared, SharedStudio, Slot, Studio},
    render::render_html,
};

pub struct AppState {
    studio: SharedStudio,
    client: TryOnClient,
    upload_limit: usize,
}

impl AppState {
    pub fn new(client: TryOnClient, encoder: ImageEncoder) -> Self {
        Self {
            upload_limit: encoder.max_bytes(),
            studio: Arc::new(tokio::sync::Mutex::new(Studio::new(encoder))),
            client,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl From<&TryOnError> for ErrorBody {
    fn from(err: &TryOnError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PromptUpdate {
    prompt: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/upload/{slot}", web::post().to(upload))
        .route("/prompt", web::put().to(set_prompt))
        .route("/generate", web::post().to(generate))
        .route("/result", web::get().to(result))
        .route("/state", web::get().to(state));
}

pub async fn run(config: &Config, client: TryOnClient) -> std::io::Result<()> {
    let port = config.port_or_default();
    let data = web::Data::new(AppState::new(
        client,
        ImageEncoder::new().with_max_bytes(config.max_upload_bytes),
    ));

    log::info!("🌐 Serving try-on studio on http://127.0.0.1:{}", port);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
    .bind(("127.0.0.1", port))?
    .run()
    .await
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

async fn upload(
    data: web::Data<AppState>,
    slot: web::Path<String>,
    req: HttpRequest,
    mut payload: web::Payload,
) -> HttpResponse {
    let slot: Slot = match slot.parse() {
        Ok(slot) => slot,
        Err(err) => return HttpResponse::BadRequest().json(ErrorBody::from(&err)),
    };
    let hint = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let body = read_upload(&mut payload, data.upload_limit).await;

    let mut studio = data.studio.lock().await;
    let stored = match body {
        Ok(bytes) => studio.select_image(slot, &bytes, hint),
        Err(err) => studio.store_upload(slot, Err(err)),
    };
    match stored {
        Ok(()) => HttpResponse::Ok().json(studio.snapshot()),
        Err(err) => HttpResponse::UnprocessableEntity().json(ErrorBody::from(&err)),
    }
}

/// Reads at most `limit + 1` bytes, leaving the size check to the encoder.
async fn read_upload(payload: &mut web::Payload, limit: usize) -> Result<web::BytesMut> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk
            .map_err(|e| TryOnError::Encoding(format!("failed to read upload: {}", e)))?;
        body.extend_from_slice(&chunk);
        if body.len() > limit {
            body.truncate(limit + 1);
            break;
        }
    }
    Ok(body)
}

async fn set_prompt(data: web::Data<AppState>, update: web::Json<PromptUpdate>) -> HttpResponse {
    let mut studio = data.studio.lock().await;
    studio.set_prompt(update.into_inner().prompt);
    HttpResponse::Ok().json(studio.snapshot())
}

async fn generate(data: web::Data<AppState>) -> HttpResponse {
    match generate_shared(&data.studio, &data.client).await {
        Ok(true) => HttpResponse::Ok().json(data.studio.lock().await.snapshot()),
        Ok(false) => HttpResponse::Conflict().json(ErrorBody {
            kind: "busy",
            message: "A generation is already in progress.".to_string(),
        }),
        Err(err) => HttpResponse::BadRequest().json(ErrorBody::from(&err)),
    }
}

async fn result(data: web::Data<AppState>) -> HttpResponse {
    let studio = data.studio.lock().await;
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_html(studio.state()))
}

async fn state(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.studio.lock().await.snapshot())
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Virtual Try-On Studio</title></head>
<body>
<h1>Virtual Try-On Studio</h1>
<p>Powered by Gemini 2.5 Flash Image</p>
<label>1. Upload Person <input type="file" accept="image/*" data-slot="person"></label>
<label>2. Upload Clothing <input type="file" accept="image/*" data-slot="clothing"></label>
<label>3. Refine with a prompt (optional)<textarea id="prompt" rows="4"></textarea></label>
<button id="generate" disabled>Virtual Try-On</button>
<div id="result"></div>
<script>
const button = document.getElementById("generate");
const prompt = document.getElementById("prompt");
async function refresh() {
  const state = await (await fetch("/state")).json();
  if (document.activeElement !== prompt) prompt.value = state.prompt;
  button.disabled = !state.can_generate;
  button.textContent = state.state.status === "loading" ? "Generating..." : "Virtual Try-On";
  document.getElementById("result").innerHTML = await (await fetch("/result")).text();
}
for (const input of document.querySelectorAll("input[data-slot]")) {
  input.addEventListener("change", async () => {
    const file = input.files[0];
    if (!file) return;
    await fetch("/upload/" + input.dataset.slot, {
      method: "POST", headers: { "Content-Type": file.type }, body: file });
    refresh();
  });
}
prompt.addEventListener("change", async () => {
  await fetch("/prompt", { method: "PUT", headers: { "Content-Type": "application/json" },
    body: JSON.stringify({ prompt: prompt.value }) });
});
button.addEventListener("click", async () => {
  const pending = fetch("/generate", { method: "POST" });
  setTimeout(refresh, 100);
  await pending;
  refresh();
});
refresh();
</script>
</body>
</html>
"#;
