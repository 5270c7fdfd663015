//! Tests of the HTTP caption client against a local actix-web backend

use actix_multipart::Multipart;
use actix_web::{web, App, HttpResponse, HttpServer};
use futures::{StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use caption_client::config::{ClientConfig, ENV_API_URL, ENV_AUDIO_DIR};
use caption_client::{
    CaptionRequest, CaptionResult, CaptionService, HttpCaptionService, Metrics, TempDirAudioStore, TransportError,
    WorkflowOrchestrator, WorkflowState, GENERIC_FAILURE_MESSAGE,
};

const AUDIO_BYTES: &[u8] = b"ID3\x04\x00fake-mp3-frames";

/// How the fake backend answers
#[derive(Debug, Clone, Copy)]
enum Mode {
    Captions,
    ServiceError,
    ServerError,
    Malformed,
    NoAudio,
}

/// What the fake backend received on its last upload
#[derive(Debug, Default, Clone)]
struct Upload {
    lang: Option<String>,
    field_name: String,
    file_name: Option<String>,
    bytes: Vec<u8>,
}

struct Backend {
    mode: Mode,
    last_upload: Arc<Mutex<Option<Upload>>>,
}

async fn caption(
    query: web::Query<HashMap<String, String>>,
    mut form: Multipart,
    backend: web::Data<Backend>,
) -> HttpResponse {
    let mut upload = Upload {
        lang: query.get("lang").cloned(),
        ..Upload::default()
    };

    while let Ok(Some(mut field)) = form.try_next().await {
        if let Some(cd) = field.content_disposition() {
            upload.field_name = cd.get_name().unwrap_or_default().to_string();
            upload.file_name = cd.get_filename().map(|name| name.to_string());
        }
        while let Some(chunk) = field.next().await {
            match chunk {
                Ok(data) => upload.bytes.extend_from_slice(&data),
                Err(_) => return HttpResponse::BadRequest().finish(),
            }
        }
    }
    *backend.last_upload.lock().unwrap() = Some(upload);

    match backend.mode {
        Mode::Captions | Mode::NoAudio => HttpResponse::Ok().json(serde_json::json!({
            "original_caption": "a dog",
            "translated_caption": "un chien",
        })),
        Mode::ServiceError => HttpResponse::Ok().json(serde_json::json!({ "error": "unsupported format" })),
        Mode::ServerError => HttpResponse::InternalServerError().body("model crashed"),
        Mode::Malformed => HttpResponse::Ok().content_type("application/json").body("{\"original_caption\":"),
    }
}

async fn audio(backend: web::Data<Backend>) -> HttpResponse {
    match backend.mode {
        Mode::NoAudio => HttpResponse::NotFound().finish(),
        _ => HttpResponse::Ok().content_type("audio/mpeg").body(AUDIO_BYTES),
    }
}

/// Start a backend on a free port, returning its base URL
fn spawn_backend(mode: Mode) -> (String, Arc<Mutex<Option<Upload>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind backend");
    let port = listener.local_addr().expect("backend addr").port();
    let last_upload = Arc::new(Mutex::new(None));

    let shared = last_upload.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Backend {
                mode,
                last_upload: shared.clone(),
            }))
            .route("/caption/", web::post().to(caption))
            .route("/audio", web::get().to(audio))
    })
    .workers(1)
    .listen(listener)
    .expect("listen")
    .run();
    actix_web::rt::spawn(server);

    (format!("http://127.0.0.1:{}/", port), last_upload)
}

fn service_for(url: &str) -> HttpCaptionService {
    let map = HashMap::from([(ENV_API_URL.to_string(), url.to_string())]);
    HttpCaptionService::new(&ClientConfig::from_source(|key| map.get(key).cloned())).expect("client")
}

#[actix_web::test]
async fn test_caption_upload_uses_file_field_and_lang_query() {
    let (url, last_upload) = spawn_backend(Mode::Captions);
    let service = service_for(&url);

    let request = CaptionRequest::new(vec![1, 2, 3, 4], "fr").with_file_name("dog.png");
    let result = service.caption_and_translate(request).await.expect("caption");

    assert_eq!(
        result,
        CaptionResult::Captioned {
            original_caption: "a dog".to_string(),
            translated_caption: "un chien".to_string(),
        }
    );
    let upload = last_upload.lock().unwrap().clone().expect("upload received");
    assert_eq!(upload.lang.as_deref(), Some("fr"));
    assert_eq!(upload.field_name, "file");
    assert_eq!(upload.file_name.as_deref(), Some("dog.png"));
    assert_eq!(upload.bytes, vec![1, 2, 3, 4]);
}

#[actix_web::test]
async fn test_service_error_body_is_a_rejection() {
    let (url, _) = spawn_backend(Mode::ServiceError);
    let service = service_for(&url);

    let result = service
        .caption_and_translate(CaptionRequest::new(vec![9; 8], "es"))
        .await
        .expect("caption");

    assert_eq!(
        result,
        CaptionResult::Rejected {
            error_message: "unsupported format".to_string()
        }
    );
}

#[actix_web::test]
async fn test_server_error_is_a_status_error() {
    let (url, _) = spawn_backend(Mode::ServerError);
    let service = service_for(&url);

    let err = service
        .caption_and_translate(CaptionRequest::new(vec![9; 8], "es"))
        .await
        .expect_err("500 must fail");

    match err {
        TransportError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "model crashed");
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[actix_web::test]
async fn test_malformed_body_is_a_decode_error() {
    let (url, _) = spawn_backend(Mode::Malformed);
    let service = service_for(&url);

    let err = service
        .caption_and_translate(CaptionRequest::new(vec![9; 8], "de"))
        .await
        .expect_err("truncated json");

    assert!(matches!(err, TransportError::Decode(_)));
}

#[actix_web::test]
async fn test_fetch_audio_returns_raw_bytes() {
    let (url, _) = spawn_backend(Mode::Captions);
    let service = service_for(&url);

    let payload = service.fetch_audio().await.expect("audio");
    assert_eq!(payload, AUDIO_BYTES);
}

#[actix_web::test]
async fn test_missing_audio_is_a_status_error() {
    let (url, _) = spawn_backend(Mode::NoAudio);
    let service = service_for(&url);

    let err = service.fetch_audio().await.expect_err("404 must fail");
    assert!(err.is_status());
}

#[actix_web::test]
async fn test_full_run_writes_audio_and_cleans_up() {
    let (url, _) = spawn_backend(Mode::Captions);
    let audio_dir = tempfile::tempdir().expect("tempdir");
    let map = HashMap::from([
        (ENV_API_URL.to_string(), url),
        (ENV_AUDIO_DIR.to_string(), audio_dir.path().display().to_string()),
    ]);
    let config = ClientConfig::from_source(|key| map.get(key).cloned());

    let orchestrator = WorkflowOrchestrator::new(
        Arc::new(HttpCaptionService::new(&config).expect("client")),
        Arc::new(TempDirAudioStore::new(&config.audio_dir)),
        Metrics::default(),
    );

    let state = orchestrator.start(vec![0x89, b'P', b'N', b'G'], "fr").await.expect("start");
    let path = match &state {
        WorkflowState::Succeeded {
            translated_caption,
            audio_handle,
            ..
        } => {
            assert_eq!(translated_caption, "un chien");
            assert_eq!(audio_handle.size_bytes(), AUDIO_BYTES.len());
            audio_handle.path().to_path_buf()
        }
        other => panic!("expected Succeeded, got {:?}", other),
    };
    assert!(path.starts_with(audio_dir.path()));
    assert_eq!(std::fs::read(&path).expect("audio file"), AUDIO_BYTES);

    drop(orchestrator);
    assert!(!path.exists());
}

#[actix_web::test]
async fn test_full_run_with_missing_audio_fails_generically() {
    let (url, _) = spawn_backend(Mode::NoAudio);
    let audio_dir = tempfile::tempdir().expect("tempdir");
    let orchestrator = WorkflowOrchestrator::new(
        Arc::new(service_for(&url)),
        Arc::new(TempDirAudioStore::new(audio_dir.path())),
        Metrics::default(),
    );

    let state = orchestrator.start(vec![1, 2, 3], "fr").await.expect("start");

    assert_eq!(state.message(), Some(GENERIC_FAILURE_MESSAGE));
    assert_eq!(std::fs::read_dir(audio_dir.path()).expect("read dir").count(), 0);
}
