//! Reload client injection.
//!
//! In watch mode every HTML response is buffered and the reload client script
//! is spliced in right before the first `</body>`. Everything else streams
//! through untouched.

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::header::{ACCEPT_RANGES, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Injection anchor.
pub const CLOSING_BODY: &str = "</body>";

/// Browser side of live reload, inserted before [`CLOSING_BODY`].
///
/// Reloads on every `reload` event. When the connection fails (usually
/// because the server restarted) it gives up on the stream and reloads after
/// a second, which reconnects against the new server.
pub const RELOAD_CLIENT_SCRIPT: &str = r"
<script>
(function() {
    const eventSource = new EventSource('/__livereload');
    eventSource.onmessage = (e) => {
        if (e.data === 'reload') {
            console.log('[Hot Reload] Reloading page...');
            location.reload();
        }
    };
    eventSource.onerror = () => {
        console.log('[Hot Reload] Connection lost, retrying...');
        eventSource.close();
        setTimeout(() => location.reload(), 1000);
    };
    console.log('[Hot Reload] Connected');
})();
</script>
";

/// Middleware that injects [`RELOAD_CLIENT_SCRIPT`] into HTML responses.
pub(crate) async fn inject_reload_client(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if !is_rewritable(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let buffer = match ResponseBuffer::collect(body).await {
        Ok(buffer) => buffer,
        Err(err) => {
            tracing::error!(error = %err, "Failed to buffer HTML response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match buffer.finalize() {
        Finalized::Injected(html) => {
            // Byte ranges of the file no longer match the rewritten body.
            parts.headers.remove(ACCEPT_RANGES);
            parts
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(html.len()));
            Response::from_parts(parts, Body::from(html))
        }
        Finalized::Unchanged(bytes) => Response::from_parts(parts, Body::from(bytes)),
    }
}

/// Only plain HTML bodies are rewritten. Encoded or partial bodies would be
/// corrupted by splicing text into them.
fn is_rewritable(response: &Response) -> bool {
    is_html(response.headers())
        && !response.headers().contains_key(CONTENT_ENCODING)
        && response.status() != StatusCode::PARTIAL_CONTENT
}

/// Whether the declared content type is some flavour of HTML.
fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("html"))
}

/// Fully collected body of one response.
struct ResponseBuffer {
    bytes: Bytes,
}

/// Outcome of finalizing a [`ResponseBuffer`].
#[derive(Debug, PartialEq, Eq)]
enum Finalized {
    /// The script was inserted; the length header must be rewritten.
    Injected(String),
    /// Emit the original bytes as they are.
    Unchanged(Bytes),
}

impl ResponseBuffer {
    async fn collect(body: Body) -> Result<Self, axum::Error> {
        let bytes = axum::body::to_bytes(body, usize::MAX).await?;
        Ok(Self { bytes })
    }

    fn finalize(self) -> Finalized {
        let Ok(html) = std::str::from_utf8(&self.bytes) else {
            return Finalized::Unchanged(self.bytes);
        };

        match inject_script(html) {
            Some(html) => Finalized::Injected(html),
            None => Finalized::Unchanged(self.bytes),
        }
    }
}

/// Insert the reload client before the first closing body tag.
fn inject_script(html: &str) -> Option<String> {
    let index = html.find(CLOSING_BODY)?;

    let mut injected = String::with_capacity(html.len() + RELOAD_CLIENT_SCRIPT.len());
    injected.push_str(&html[..index]);
    injected.push_str(RELOAD_CLIENT_SCRIPT);
    injected.push_str(&html[index..]);
    Some(injected)
}
