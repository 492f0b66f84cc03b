use poem::http::StatusCode;
use poem::{Endpoint, IntoResponse, Middleware, Request, Response};
use std::time::Instant;

/// Middleware that logs HTTP requests with method, path, query, status,
/// duration, and client IP
pub struct RequestLogging;

impl<E: Endpoint> Middleware<E> for RequestLogging {
    type Output = RequestLoggingEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        RequestLoggingEndpoint { inner: ep }
    }
}

pub struct RequestLoggingEndpoint<E> {
    inner: E,
}

struct RequestSummary {
    method: String,
    path: String,
    // List endpoints carry their filters here
    query: String,
    client_ip: String,
}

impl RequestSummary {
    fn of(req: &Request) -> Self {
        Self {
            method: req.method().to_string(),
            path: req.uri().path().to_string(),
            query: req.uri().query().unwrap_or_default().to_string(),
            client_ip: req
                .remote_addr()
                .as_socket_addr()
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }

    fn log_completed(&self, status: StatusCode, duration_ms: u128) {
        macro_rules! emit {
            ($level:ident, $msg:literal) => {
                tracing::$level!(
                    method = %self.method,
                    path = %self.path,
                    query = %self.query,
                    status = %status.as_u16(),
                    duration_ms = %duration_ms,
                    client_ip = %self.client_ip,
                    $msg
                )
            };
        }
        if status.is_success() {
            emit!(info, "request completed");
        } else if status.is_client_error() || status.is_server_error() {
            emit!(warn, "request failed");
        } else {
            emit!(debug, "request completed");
        }
    }
}

impl<E: Endpoint> Endpoint for RequestLoggingEndpoint<E> {
    type Output = Response;

    async fn call(&self, req: Request) -> poem::Result<Self::Output> {
        let start = Instant::now();
        let summary = RequestSummary::of(&req);

        let response = self.inner.call(req).await;
        let duration_ms = start.elapsed().as_millis();

        match response {
            Ok(resp) => {
                let resp = resp.into_response();
                summary.log_completed(resp.status(), duration_ms);
                Ok(resp)
            }
            Err(err) => {
                tracing::error!(
                    method = %summary.method,
                    path = %summary.path,
                    query = %summary.query,
                    status = %err.status().as_u16(),
                    duration_ms = %duration_ms,
                    client_ip = %summary.client_ip,
                    error = %err,
                    "request error"
                );
                Err(err)
            }
        }
    }
}
