use encoding_rs::Encoding;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// End-of-message marker appended to every outbound request. The peer scans
/// for it because there is no length-prefix framing on this protocol.
pub const SENTINEL: &str = "EOF";

/// Largest slice handed to the transport per write call.
pub const SEND_CHUNK_SIZE: usize = 1024;

/// Response bytes that the configured encoding could not decode.
#[derive(Debug, Error)]
#[error("response bytes are not valid {encoding} text")]
pub struct DecodeError {
    pub encoding: &'static str,
}

/// Append the end-of-message sentinel to a request body.
///
/// Callers must do this exactly once per session; the same payload is reused
/// verbatim by every retry attempt.
pub fn append_sentinel(request: &str) -> String {
    let mut payload = String::with_capacity(request.len() + SENTINEL.len());
    payload.push_str(request);
    payload.push_str(SENTINEL);
    payload
}

/// Write `payload` in chunks of at most `chunk_size` bytes, starting at
/// `*cursor` and advancing it by however many bytes the transport actually
/// accepted. A short write resumes from the unsent remainder on the next
/// iteration, so no byte is resent or dropped.
pub async fn write_chunked(
    writer: &mut (impl AsyncWrite + Unpin),
    payload: &[u8],
    chunk_size: usize,
    cursor: &mut usize,
) -> io::Result<()> {
    while *cursor < payload.len() {
        let end = usize::min(*cursor + chunk_size, payload.len());
        let written = writer.write(&payload[*cursor..end]).await?;
        if written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!(
                    "stream closed with {} of {} request bytes unsent",
                    payload.len() - *cursor,
                    payload.len()
                ),
            ));
        }
        *cursor += written;
        trace!(written, cursor = *cursor, total = payload.len(), "wrote request chunk");
    }
    Ok(())
}

/// Drain one readable burst from the transport into `inbound`. Returns the
/// number of bytes appended; 0 means the peer closed its write side and the
/// response is complete.
pub async fn read_into(
    reader: &mut (impl AsyncRead + Unpin),
    inbound: &mut Vec<u8>,
    scratch: &mut [u8],
) -> io::Result<usize> {
    let read = reader.read(scratch).await?;
    if read > 0 {
        inbound.extend_from_slice(&scratch[..read]);
        trace!(read, total = inbound.len(), "drained response bytes");
    }
    Ok(read)
}

/// Decode the accumulated response with a fixed encoding. Decoding happens
/// once, at finalization; malformed input surfaces as an error result rather
/// than a lossy string or a panic.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> Result<String, DecodeError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError {
            encoding: encoding.name(),
        });
    }
    Ok(text.into_owned())
}
