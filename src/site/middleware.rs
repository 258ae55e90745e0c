use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;

use super::handlers::SiteState;
use crate::context::{append_set_cookies, ClientStorage, RequestContext};
use crate::tracking::capture;

/// Capture the click identifier on every page request.
///
/// Leaves the request context, the settings and the client storage in the
/// request extensions for page handlers, and appends the capture cookie to
/// whatever response they produce.
pub async fn capture_click_id(
    State(state): State<Arc<SiteState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let socket_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let ctx = RequestContext::new(
        request.method(),
        request.uri(),
        request.headers(),
        socket_ip,
        &state.context_options,
    );
    let settings = state.load_settings().await;
    let mut client = ClientStorage::from_headers(request.headers());

    capture(&ctx, &settings, &mut client, &state.diagnostics).await;
    let writes = client.drain_writes();

    request.extensions_mut().insert(ctx);
    request.extensions_mut().insert(settings);
    request.extensions_mut().insert(client);

    let mut response = next.run(request).await;
    append_set_cookies(response.headers_mut(), &writes);
    response
}
