use axum::http::{HeaderValue, Method, Request, Response, Uri};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::observer::{self, QueryObserver};
use crate::tally::QueryTally;
use crate::threshold::AnnotateResponse;

// id the detector is registered under in the middleware list
pub const DETECTOR_ID: &str = "query_snitch.middleware.n_plus_one_detector";

pub const HEADER_NAME: &str = "x-n-plus-one-queries";
pub const HEADER_VALUE: &str = "true";

// used when the response carries no threshold
pub const DEFAULT_THRESHOLD: i64 = 1;

/// Response marker: a query failure propagated out of the handler, so the
/// tally is partial and gets discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryFailed;

#[derive(Debug, Clone, Copy, Default)]
pub struct NPlusOneLayer;

impl NPlusOneLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for NPlusOneLayer {
    type Service = NPlusOneDetector<S>;

    fn layer(&self, inner: S) -> Self::Service {
        NPlusOneDetector { inner }
    }
}

#[derive(Debug, Clone)]
pub struct NPlusOneDetector<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for NPlusOneDetector<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // keep the service that was driven to readiness
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let method = req.method().clone();
        let path = full_path(req.uri());

        Box::pin(async move {
            let query_observer = Arc::new(QueryObserver::new());
            let mut response =
                observer::scope(Arc::clone(&query_observer), async move { inner.call(req).await })
                    .await?;

            inspect(&method, &path, &query_observer, &mut response);
            Ok(response)
        })
    }
}

// Path plus query string, as the client sent it
fn full_path(uri: &Uri) -> String {
    uri.path_and_query()
        .map_or_else(|| uri.path().to_owned(), |pq| pq.as_str().to_owned())
}

fn inspect<B>(
    method: &Method,
    path: &str,
    query_observer: &QueryObserver,
    response: &mut Response<B>,
) {
    let threshold = response.take_threshold().unwrap_or(DEFAULT_THRESHOLD);

    if response.extensions_mut().remove::<QueryFailed>().is_some() {
        debug!(
            target: "query_snitch",
            %method,
            path,
            "query execution failed, discarding partial tally"
        );
        return;
    }

    let tally = QueryTally::from_records(query_observer.take_records());
    let violations = tally.violations(threshold);
    if violations.is_empty() {
        return;
    }

    warn!(
        target: "query_snitch",
        %method,
        path,
        threshold,
        "Query Snitch detected N+1 queries on {} '{}'\n{}",
        method,
        path,
        violations
    );
    response
        .headers_mut()
        .insert(HEADER_NAME, HeaderValue::from_static(HEADER_VALUE));
}
