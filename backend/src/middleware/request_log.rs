//! Request logging middleware with a per-request correlation id.
//!
//! Each incoming request receives a UUID `request_id` that is echoed in an
//! `X-Request-Id` response header and attached to the completion log line,
//! so a client-reported failure can be matched to its log entry.

use std::task::{Context, Poll};
use std::time::Instant;

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use tracing::info;
use uuid::Uuid;

/// Response header carrying the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Zero-config transform; wrap the app with `.wrap(RequestLog)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLog;

impl<S, B> Transform<S, ServiceRequest> for RequestLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLogMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLogMiddleware { service }))
    }
}

/// Service produced by [`RequestLog`].
pub struct RequestLogMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLogMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, request: ServiceRequest) -> Self::Future {
        let request_id = Uuid::new_v4();
        let method = request.method().clone();
        let path = request.path().to_owned();
        let started = Instant::now();
        let fut = self.service.call(request);

        Box::pin(async move {
            let mut response = fut.await?;
            let elapsed = started.elapsed();
            let status = response.status();
            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
            info!(
                %request_id,
                %method,
                path,
                status = status.as_u16(),
                elapsed_ms = elapsed.as_millis() as u64,
                "request completed"
            );
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test, web};

    #[actix_web::test]
    async fn responses_carry_a_request_id() {
        let app = test::init_service(
            App::new()
                .wrap(RequestLog)
                .route("/ping", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        let header = resp
            .headers()
            .get(REQUEST_ID_HEADER)
            .expect("request id header present");
        let id: Uuid = header
            .to_str()
            .expect("header is ascii")
            .parse()
            .expect("header is a uuid");
        assert!(!id.is_nil());
    }
}
