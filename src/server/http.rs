//! HTTP server for Reel Uploadr
//!
//! Built directly on `hyper` and `tokio`: one task per connection, HTTP/1.1,
//! JSON responses. Upload bodies are never buffered in memory; they are
//! adapted into an `AsyncRead` and streamed into the pipeline.
//!
//! # Example
//!
//! ```no_run
//! use reel_uploadr::server::{AppState, http::HttpServer};
//!
//! # async fn example(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
//! let server = HttpServer::bind("127.0.0.1:0", state).await?;
//! println!("Listening on {}", server.local_addr());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::{BodyExt, BodyStream, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE, WWW_AUTHENTICATE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::io::StreamReader;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{AppState, ServerError};
use crate::auth::{AuthError, AuthRequest};
use crate::metrics;
use crate::repo::NewVideo;
use crate::router::{Route, RouterError};
use crate::upload::{UploadError, UploadRequest};

/// Largest JSON body accepted by the record endpoints
const MAX_JSON_BODY: usize = 64 * 1024;

type HttpResponse = Response<Full<Bytes>>;

pub struct HttpServer {
    state: AppState,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl HttpServer {
    /// Bind to `address` immediately. Port 0 picks a free port.
    pub async fn bind(address: &str, state: AppState) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!(address = %local_addr, "Server bound");

        Ok(Self {
            state,
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until the task is dropped
    ///
    /// Connection errors are logged and never stop the loop.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(address = %self.local_addr, "Starting HTTP server");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            let state = self.state.clone();

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let state = state.clone();
                    async move { Ok::<_, Infallible>(handle_request(req, state).await) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer_addr, error = %e, "Error serving connection");
                }
            });
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> HttpResponse {
    let (status, body) = match serde_json::to_vec(value) {
        Ok(body) => (status, body),
        Err(e) => {
            error!(error = %e, "Failed to serialize response");
            (StatusCode::INTERNAL_SERVER_ERROR, b"{}".to_vec())
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn error_response(status: StatusCode, code: &str, message: &str) -> HttpResponse {
    json_response(
        status,
        &ErrorBody {
            error: message,
            code,
        },
    )
}

fn upload_error_response(e: &UploadError) -> HttpResponse {
    if e.status_code().is_server_error() {
        error!(error = %e, code = e.error_code(), "Request failed");
    } else {
        warn!(error = %e, code = e.error_code(), "Request rejected");
    }
    error_response(e.status_code(), e.error_code(), &e.to_string())
}

fn auth_error_response(e: &AuthError) -> HttpResponse {
    let challenge = match e {
        AuthError::MissingAuth => "Bearer",
        _ => "Bearer error=\"invalid_token\"",
    };
    let mut response = error_response(StatusCode::UNAUTHORIZED, "unauthorized", &e.to_string());
    response
        .headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
    response
}

fn router_error_response(e: &RouterError) -> HttpResponse {
    match e {
        RouterError::InvalidPath(_) => {
            error_response(StatusCode::NOT_FOUND, "not-found", &e.to_string())
        }
        RouterError::InvalidId(_) => {
            error_response(StatusCode::BAD_REQUEST, "invalid-id", &e.to_string())
        }
        RouterError::MethodNotAllowed(_) => error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "method-not-allowed",
            &e.to_string(),
        ),
    }
}

fn content_type_of(req: &Request<Incoming>) -> String {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Adapt a streaming hyper body into an `AsyncRead`
fn body_reader(body: Incoming) -> impl tokio::io::AsyncRead + Unpin + Send {
    let stream = BodyStream::new(body)
        .try_filter_map(|frame| futures::future::ready(Ok(frame.into_data().ok())))
        .map_err(std::io::Error::other);
    StreamReader::new(stream)
}

#[tracing::instrument(
    name = "http.request",
    skip_all,
    fields(method = %req.method(), path = %req.uri().path())
)]
async fn handle_request(req: Request<Incoming>, state: AppState) -> HttpResponse {
    let route = match Route::parse(req.method().as_str(), req.uri().path()) {
        Ok(route) => route,
        Err(e) => return router_error_response(&e),
    };

    if !route.requires_auth() {
        return json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" }));
    }

    let owner_id = match state
        .authenticator
        .authenticate(&AuthRequest::from_headers(req.headers()))
        .await
    {
        Ok(result) => {
            metrics::record_auth_attempt(true);
            result.owner_id
        }
        Err(e) => {
            metrics::record_auth_attempt(false);
            warn!(error = %e, "Authentication failed");
            return auth_error_response(&e);
        }
    };

    match route {
        Route::Health => json_response(StatusCode::OK, &serde_json::json!({ "status": "ok" })),
        Route::CreateVideo => create_video(req, state, owner_id).await,
        Route::GetVideo { video_id } => match state.service.get_video(video_id, owner_id).await {
            Ok(record) => json_response(StatusCode::OK, &record),
            Err(e) => upload_error_response(&e),
        },
        Route::UploadVideo { video_id } => {
            let request = UploadRequest {
                video_id,
                owner_id,
                content_type: content_type_of(&req),
                content: body_reader(req.into_body()),
            };
            match state.service.upload(request).await {
                Ok(record) => json_response(StatusCode::OK, &record),
                Err(e) => upload_error_response(&e),
            }
        }
        Route::UploadThumbnail { video_id } => {
            let request = UploadRequest {
                video_id,
                owner_id,
                content_type: content_type_of(&req),
                content: body_reader(req.into_body()),
            };
            match state.service.upload_thumbnail(request).await {
                Ok(record) => json_response(StatusCode::OK, &record),
                Err(e) => upload_error_response(&e),
            }
        }
    }
}

async fn create_video(req: Request<Incoming>, state: AppState, owner_id: Uuid) -> HttpResponse {
    let body = match Limited::new(req.into_body(), MAX_JSON_BODY).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid-body",
                &format!("Failed to read body: {}", e),
            )
        }
    };

    let draft: NewVideo = match serde_json::from_slice(&body) {
        Ok(draft) => draft,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "invalid-body",
                &format!("Invalid video JSON: {}", e),
            )
        }
    };

    match state.service.create_video(owner_id, draft).await {
        Ok(record) => json_response(StatusCode::CREATED, &record),
        Err(e) => upload_error_response(&e),
    }
}
