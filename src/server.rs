use crate::cors::{self, CorsPolicy};
use crate::error::RelayError;
use crate::io_struct::ChatRequest;
use crate::relay_state::{RelayConfig, RelayState};
use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer,
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::{Method, header::ContentType},
    middleware, web,
};
use std::io::Write;

pub const HEALTH_BODY: &str = "saverx-chat-proxy: OK";

pub async fn health() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(HEALTH_BODY)
}

pub async fn chat(
    body: web::Bytes,
    app_state: web::Data<RelayState>,
) -> Result<HttpResponse, RelayError> {
    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        log::debug!("Rejecting chat request with invalid JSON: {}", e);
        RelayError::InvalidJson(e)
    })?;
    let resp = app_state
        .forward_chat(ChatRequest::from_value(payload))
        .await?;
    Ok(resp.into())
}

/// Preflight for any path, 404 for everything else.
pub async fn fallback(req: HttpRequest) -> Result<HttpResponse, RelayError> {
    if req.method() == Method::OPTIONS {
        return Ok(HttpResponse::NoContent().finish());
    }
    Err(RelayError::NotFound)
}

pub fn build_app(
    app_state: web::Data<RelayState>,
    cors_policy: web::Data<CorsPolicy>,
    max_payload_size: usize,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(middleware::from_fn(cors::apply_cors))
        .wrap(middleware::Logger::default())
        .app_data(app_state)
        .app_data(cors_policy)
        .app_data(web::PayloadConfig::new(max_payload_size))
        .service(
            web::resource("/")
                .route(web::get().to(health))
                .default_service(web::to(fallback)),
        )
        .service(
            web::resource("/chat")
                .route(web::post().to(chat))
                .default_service(web::to(fallback)),
        )
        .default_service(web::to(fallback))
}

pub fn init_logging(level: log::LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .parse_default_env();
    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

pub async fn startup(relay_config: RelayConfig) -> anyhow::Result<()> {
    init_logging(relay_config.log_level);

    let app_state = web::Data::new(RelayState::new(&relay_config)?);
    let cors_policy = web::Data::new(relay_config.cors.clone());
    let max_payload_size = relay_config.max_payload_size;

    log::info!(
        "Starting server at {}:{}, relaying to {} (model {})",
        relay_config.host,
        relay_config.port,
        relay_config.upstream_url,
        relay_config.model
    );

    HttpServer::new(move || build_app(app_state.clone(), cors_policy.clone(), max_payload_size))
        .bind((relay_config.host.as_str(), relay_config.port))?
        .run()
        .await?;

    Ok(())
}
