use std::net::IpAddr;
use std::time::Instant;

use actix_cors::Cors;
use actix_web::http::{Method, StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, ResponseError, web};
use metrics::{counter, histogram};
use tracing::warn;

use super::{CorsSettings, RateLimiter, ServerState};
use crate::proto::{
    AuthenticatedResponse, CLIENT_ID_HEADER, ErrorResponse, HealthResponse, PickChoiceRequest,
    PickChoiceResponse, PublicKeyRequest, VerifyRequest,
};
use crate::{Error, Result};

/// Largest accepted JSON body. Operands are bounded well below this.
pub const MAX_JSON_BODY: usize = 4096;

/// Shared data behind every route.
#[derive(Clone)]
pub struct AppState {
    state: ServerState,
    limiter: RateLimiter,
}

impl AppState {
    /// Bundles verifier state with the rate limiter.
    pub fn new(state: ServerState, limiter: RateLimiter) -> Self {
        Self { state, limiter }
    }

    /// Verifier state.
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidOperand(_) | Error::MissingHeader(_) => StatusCode::BAD_REQUEST,
            Error::UnknownSession(_) => StatusCode::NOT_FOUND,
            Error::ProtocolViolation(_) => StatusCode::CONFLICT,
            Error::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Error::CapacityExceeded(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            err: self.to_string(),
        })
    }
}

/// Registers the verifier routes and the JSON body limit.
///
/// ```rust,no_run
/// use actix_web::{App, HttpServer, web};
/// use dl_zkpp::server::{AppState, RateLimiter, RoundPolicy, ServerState, service};
/// use dl_zkpp::GroupParameters;
///
/// # async fn run() -> std::io::Result<()> {
/// let state = ServerState::new(GroupParameters::rfc5114_2048_256(), RoundPolicy::default());
/// let data = web::Data::new(AppState::new(state, RateLimiter::new(6000, 500)));
///
/// HttpServer::new(move || App::new().app_data(data.clone()).configure(service::configure))
///     .bind(("127.0.0.1", 8080))?
///     .run()
///     .await
/// # }
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_JSON_BODY)
            .error_handler(|err, _req| Error::InvalidOperand(err.to_string()).into()),
    )
    .route("/handshake", web::get().to(handshake))
    .route("/handshake", web::post().to(handshake))
    .route("/public-key", web::post().to(public_key))
    .route("/pick-choice", web::post().to(pick_choice))
    .route("/verify", web::post().to(verify))
    .route("/authenticated", web::get().to(authenticated))
    .route("/healthcheck", web::get().to(healthcheck));
}

/// Builds the cross-origin layer for browser clients.
///
/// Preflights may use `GET`, `POST` and `OPTIONS` with the `content-type`
/// and client id headers. An empty origin list allows any origin.
pub fn cors(settings: &CorsSettings) -> Cors {
    let cors = Cors::default()
        .allowed_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static(CLIENT_ID_HEADER),
        ])
        .max_age(settings.max_age_secs);

    if settings.allowed_origins.is_empty() {
        return cors.allow_any_origin();
    }

    settings
        .allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

fn peer(req: &HttpRequest) -> Option<IpAddr> {
    req.peer_addr().map(|addr| addr.ip())
}

fn client_id(req: &HttpRequest) -> Result<&str> {
    req.headers()
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(Error::MissingHeader(CLIENT_ID_HEADER))
}

fn observe<T>(route: &'static str, start: Instant, result: &Result<T>) {
    histogram!("zkpp.request.duration", "route" => route).record(start.elapsed().as_secs_f64());

    match result {
        Ok(_) => counter!("zkpp.request.success", "route" => route).increment(1),
        Err(e) => {
            counter!("zkpp.request.failure", "route" => route).increment(1);
            if matches!(e, Error::ProtocolViolation(_)) {
                warn!(route, error = %e, "protocol violation");
            }
        }
    }
}

async fn handshake(req: HttpRequest, data: web::Data<AppState>) -> Result<HttpResponse> {
    let start = Instant::now();
    counter!("zkpp.request.count", "route" => "handshake").increment(1);

    let result = async {
        data.limiter.check_rate_limit(peer(&req)).await?;
        data.state.handshake().await
    }
    .await;

    observe("handshake", start, &result);
    Ok(HttpResponse::Ok().json(result?))
}

async fn public_key(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<PublicKeyRequest>,
) -> Result<HttpResponse> {
    let start = Instant::now();
    counter!("zkpp.request.count", "route" => "public_key").increment(1);

    let result = async {
        data.limiter.check_rate_limit(peer(&req)).await?;
        let id = client_id(&req)?;
        data.state.submit_public_key(id, body.into_inner().y).await
    }
    .await;

    observe("public_key", start, &result);
    result?;
    Ok(HttpResponse::Ok().finish())
}

async fn pick_choice(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<PickChoiceRequest>,
) -> Result<HttpResponse> {
    let start = Instant::now();
    counter!("zkpp.request.count", "route" => "pick_choice").increment(1);

    let result = async {
        data.limiter.check_rate_limit(peer(&req)).await?;
        let id = client_id(&req)?;
        data.state.pick_choice(id, body.into_inner().c).await
    }
    .await;

    observe("pick_choice", start, &result);
    Ok(HttpResponse::Ok().json(PickChoiceResponse { choice: result? }))
}

async fn verify(
    req: HttpRequest,
    data: web::Data<AppState>,
    body: web::Json<VerifyRequest>,
) -> Result<HttpResponse> {
    let start = Instant::now();
    counter!("zkpp.request.count", "route" => "verify").increment(1);

    let result = async {
        data.limiter.check_rate_limit(peer(&req)).await?;
        let id = client_id(&req)?;
        data.state.verify(id, body.into_inner().res).await
    }
    .await;

    observe("verify", start, &result);
    let outcome = result?;

    let valid = if outcome.valid { "true" } else { "false" };
    counter!("zkpp.rounds", "valid" => valid).increment(1);

    Ok(HttpResponse::Ok().json(outcome))
}

async fn authenticated(req: HttpRequest, data: web::Data<AppState>) -> Result<HttpResponse> {
    let start = Instant::now();
    counter!("zkpp.request.count", "route" => "authenticated").increment(1);

    let result = async {
        data.limiter.check_rate_limit(peer(&req)).await?;
        let id = client_id(&req)?;
        data.state.authenticated(id).await
    }
    .await;

    observe("authenticated", start, &result);
    let auth = result?;

    let outcome = if auth { "success" } else { "failure" };
    counter!("zkpp.decisions", "outcome" => outcome).increment(1);

    Ok(HttpResponse::Ok().json(AuthenticatedResponse { auth }))
}

async fn healthcheck() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse { ok: true })
}
