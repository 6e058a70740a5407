use axum::http::Response;
use futures::future::BoxFuture;
use std::future::Future;
use std::task::{Context, Poll};
use tower::{Layer, Service};

// repeats of one query a response allows before it is flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NPlusOneThreshold(pub i64);

pub trait AnnotateResponse {
    fn set_threshold(&mut self, threshold: i64);

    /// Remove and return the annotation, if any.
    fn take_threshold(&mut self) -> Option<i64>;
}

impl<B> AnnotateResponse for Response<B> {
    fn set_threshold(&mut self, threshold: i64) {
        self.extensions_mut().insert(NPlusOneThreshold(threshold));
    }

    fn take_threshold(&mut self) -> Option<i64> {
        self.extensions_mut()
            .remove::<NPlusOneThreshold>()
            .map(|NPlusOneThreshold(threshold)| threshold)
    }
}

// errors carry no response to annotate
impl<R, E> AnnotateResponse for Result<R, E>
where
    R: AnnotateResponse,
{
    fn set_threshold(&mut self, threshold: i64) {
        if let Ok(response) = self {
            response.set_threshold(threshold);
        }
    }

    fn take_threshold(&mut self) -> Option<i64> {
        self.as_mut().ok().and_then(AnnotateResponse::take_threshold)
    }
}

// detector_active is decided once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdAnnotator {
    threshold: i64,
    detector_active: bool,
}

pub fn n_plus_one_threshold(threshold: i64, detector_active: bool) -> ThresholdAnnotator {
    ThresholdAnnotator::new(threshold, detector_active)
}

impl ThresholdAnnotator {
    pub fn new(threshold: i64, detector_active: bool) -> Self {
        Self {
            threshold,
            detector_active,
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn is_active(&self) -> bool {
        self.detector_active
    }

    // blocking handlers
    pub fn decorate<H, Req, R>(&self, handler: H) -> Decorated<H>
    where
        H: Fn(Req) -> R,
        R: AnnotateResponse,
    {
        self.wrap(handler)
    }

    // suspending handlers
    pub fn decorate_async<H, Req, Fut>(&self, handler: H) -> Decorated<H>
    where
        H: Fn(Req) -> Fut,
        Fut: Future,
        Fut::Output: AnnotateResponse,
    {
        self.wrap(handler)
    }

    /// Adapter for service-style handlers (tower services, axum routes).
    pub fn layer(&self) -> ThresholdLayer {
        ThresholdLayer { annotator: *self }
    }

    fn wrap<H>(&self, handler: H) -> Decorated<H> {
        if self.detector_active {
            Decorated::Annotated {
                handler,
                threshold: self.threshold,
            }
        } else {
            Decorated::Unchanged(handler)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decorated<H> {
    // detector inactive: the handler itself
    Unchanged(H),
    Annotated { handler: H, threshold: i64 },
}

impl<H> Decorated<H> {
    pub fn threshold(&self) -> Option<i64> {
        match self {
            Self::Unchanged(_) => None,
            Self::Annotated { threshold, .. } => Some(*threshold),
        }
    }

    pub fn handle<Req, R>(&self, req: Req) -> R
    where
        H: Fn(Req) -> R,
        R: AnnotateResponse,
    {
        match self {
            Self::Unchanged(handler) => handler(req),
            Self::Annotated { handler, threshold } => {
                let mut response = handler(req);
                response.set_threshold(*threshold);
                response
            }
        }
    }

    pub async fn handle_async<Req, Fut>(&self, req: Req) -> Fut::Output
    where
        H: Fn(Req) -> Fut,
        Fut: Future,
        Fut::Output: AnnotateResponse,
    {
        match self {
            Self::Unchanged(handler) => handler(req).await,
            Self::Annotated { handler, threshold } => {
                let mut response = handler(req).await;
                response.set_threshold(*threshold);
                response
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThresholdLayer {
    annotator: ThresholdAnnotator,
}

impl<S> Layer<S> for ThresholdLayer {
    type Service = Decorated<S>;

    fn layer(&self, inner: S) -> Self::Service {
        self.annotator.wrap(inner)
    }
}

impl<S, ReqBody, ResBody> Service<axum::http::Request<ReqBody>> for Decorated<S>
where
    S: Service<axum::http::Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        match self {
            Self::Unchanged(inner) | Self::Annotated { handler: inner, .. } => inner.poll_ready(cx),
        }
    }

    fn call(&mut self, req: axum::http::Request<ReqBody>) -> Self::Future {
        match self {
            Self::Unchanged(inner) => Box::pin(inner.call(req)),
            Self::Annotated { handler, threshold } => {
                let threshold = *threshold;
                let fut = handler.call(req);
                Box::pin(async move {
                    let mut response = fut.await?;
                    response.set_threshold(threshold);
                    Ok(response)
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::convert::Infallible;
    use tower::ServiceExt;

    fn ok_response(_req: ()) -> Response<Body> {
        Response::new(Body::empty())
    }

    async fn ok_response_async(_req: ()) -> Response<Body> {
        Response::new(Body::empty())
    }

    #[test]
    fn inactive_annotator_returns_handler_unchanged() {
        let decorated = n_plus_one_threshold(5, false).decorate(ok_response);
        assert!(matches!(decorated, Decorated::Unchanged(_)));
        assert_eq!(decorated.threshold(), None);

        let mut response = decorated.handle(());
        assert_eq!(response.take_threshold(), None);
    }

    #[test]
    fn active_annotator_marks_blocking_response() {
        let decorated = n_plus_one_threshold(5, true).decorate(ok_response);
        assert_eq!(decorated.threshold(), Some(5));
        let mut response = decorated.handle(());

        assert_eq!(response.take_threshold(), Some(5));
        // read at most once
        assert_eq!(response.take_threshold(), None);
    }

    #[tokio::test]
    async fn active_annotator_marks_suspending_response() {
        let decorated = n_plus_one_threshold(3, true).decorate_async(ok_response_async);
        let mut response = decorated.handle_async(()).await;

        assert_eq!(response.take_threshold(), Some(3));
    }

    #[test]
    fn negative_threshold_is_accepted() {
        let decorated = n_plus_one_threshold(-1, true).decorate(ok_response);
        assert_eq!(decorated.handle(()).take_threshold(), Some(-1));
    }

    #[test]
    fn error_results_are_left_alone() {
        let decorated = n_plus_one_threshold(4, true)
            .decorate(|fail: bool| -> Result<Response<Body>, StatusCode> {
                if fail {
                    Err(StatusCode::INTERNAL_SERVER_ERROR)
                } else {
                    Ok(Response::new(Body::empty()))
                }
            });

        assert_eq!(decorated.handle(false).take_threshold(), Some(4));
        assert!(matches!(
            decorated.handle(true),
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        ));
    }

    #[tokio::test]
    async fn layer_annotates_service_responses() {
        let service = tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        });

        let annotated = n_plus_one_threshold(7, true).layer().layer(service);
        let mut response = annotated.oneshot(Request::new(Body::empty())).await.unwrap();
        assert_eq!(response.take_threshold(), Some(7));
    }

    #[tokio::test]
    async fn inactive_layer_passes_service_through() {
        let service = tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        });

        let decorated = n_plus_one_threshold(7, false).layer().layer(service);
        assert!(matches!(decorated, Decorated::Unchanged(_)));
        let mut response = decorated.oneshot(Request::new(Body::empty())).await.unwrap();
        assert_eq!(response.take_threshold(), None);
    }
}
