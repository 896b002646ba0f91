use crate::error::CoreResult;
use crate::http::{HttpRequest, HttpResponse};

// ---------------------------------------------------------------------------
// HttpTransport — the seam between the trust engine and the network
//
// Implementations send an already-signed request and hand back the response
// with its body fully buffered. They must not alter the body or the uri, since
// both are covered by the request signature.
// ---------------------------------------------------------------------------

pub trait HttpTransport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> CoreResult<HttpResponse>;
}

impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    fn send(&self, request: &HttpRequest) -> CoreResult<HttpResponse> {
        (**self).send(request)
    }
}
