use actix_web::{
    Error,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{self, HeaderValue},
    middleware::Next,
    web,
};

pub const PRIMARY_ORIGIN: &str = "https://saverx.ai";
pub const DEV_ORIGINS: &[&str] = &["http://localhost:5500", "http://127.0.0.1:5500"];

const ALLOW_METHODS: &str = "POST, OPTIONS, GET";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Exact-match origin allow-list. Unknown origins get the primary origin back,
/// which makes the browser refuse the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub primary_origin: String,
    pub allowed_origins: Vec<String>,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        let mut allowed_origins = vec![PRIMARY_ORIGIN.to_string()];
        allowed_origins.extend(DEV_ORIGINS.iter().map(|o| o.to_string()));
        Self {
            primary_origin: PRIMARY_ORIGIN.to_string(),
            allowed_origins,
        }
    }
}

impl CorsPolicy {
    pub fn with_extra_origins(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        for origin in extra {
            if !self.allowed_origins.contains(&origin) {
                self.allowed_origins.push(origin);
            }
        }
        self
    }

    pub fn allow_origin<'a>(&'a self, origin: Option<&str>) -> &'a str {
        origin
            .and_then(|origin| self.allowed_origins.iter().find(|allowed| *allowed == origin))
            .map(String::as_str)
            .unwrap_or(&self.primary_origin)
    }

    pub fn apply_headers(&self, origin: Option<&str>, headers: &mut header::HeaderMap) {
        if let Ok(allow) = HeaderValue::from_str(self.allow_origin(origin)) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow);
        }
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
    }
}

/// Middleware stamping CORS headers on every response, including error
/// responses produced by handlers and extractors.
pub async fn apply_cors(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let policy = req
        .app_data::<web::Data<CorsPolicy>>()
        .cloned()
        .unwrap_or_else(|| web::Data::new(CorsPolicy::default()));
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let mut res = next.call(req).await?;
    policy.apply_headers(origin.as_deref(), res.headers_mut());
    Ok(res)
}
