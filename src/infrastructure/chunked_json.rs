// Chunked NDJSON streaming utilities
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::Stream;
use serde::Serialize;
use tokio::sync::broadcast;

/// Create a chunked response with one JSON document per line
pub fn ndjson_stream<S, T>(stream: S) -> Result<Response<Body>, StatusCode>
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize + Send + 'static,
{
    let byte_stream = stream.map(|item| serialize_line(&item));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(byte_stream))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Serialize a single item as a newline-terminated chunk
fn serialize_line<T: Serialize>(item: &T) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(item).map_err(std::io::Error::other)?;
    let mut chunk = BytesMut::with_capacity(json.len() + 1);
    chunk.put_slice(&json);
    chunk.put_u8(b'\n');
    Ok(chunk.freeze())
}

/// Stream everything a broadcast receiver yields. Lagged listeners skip ahead.
pub fn stream_from_receiver<T>(mut rx: broadcast::Receiver<T>) -> impl IntoResponse
where
    T: Serialize + Clone + Send + 'static,
{
    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(item) => yield item,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Live feed listener lagged, skipped {} updates", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    match ndjson_stream(stream) {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
