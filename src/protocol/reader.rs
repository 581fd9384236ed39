//! Async atom reader for inbound streams.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use super::atom::{AtomHeader, parse_header};
use super::message::Message;
use crate::core::{ATOM_HEADER_SIZE, FramingError};

/// Reads `warp` atoms from a byte stream.
///
/// End of stream is clean only on an atom boundary; anything else is a
/// [`FramingError`].
#[derive(Debug)]
pub struct AtomReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> AtomReader<R> {
    /// Wrap a stream.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read and validate the next header.
    ///
    /// Returns `Ok(None)` if the stream ended before any header byte.
    pub async fn read_header(&mut self) -> Result<Option<AtomHeader>, FramingError> {
        let mut buf = [0u8; ATOM_HEADER_SIZE];
        let mut filled = 0;

        while filled < ATOM_HEADER_SIZE {
            let n = self.inner.read(&mut buf[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(FramingError::TruncatedHeader(filled));
            }
            filled += n;
        }

        Ok(Some(parse_header(&buf)?))
    }

    /// Read the payload that follows `header`.
    pub async fn read_payload(&mut self, header: &AtomHeader) -> Result<Vec<u8>, FramingError> {
        let expected = header.payload_len();
        let mut payload = vec![0u8; expected];
        let mut filled = 0;

        while filled < expected {
            let n = self.inner.read(&mut payload[filled..]).await?;
            if n == 0 {
                return Err(FramingError::TruncatedPayload {
                    expected,
                    actual: filled,
                });
            }
            filled += n;
        }

        Ok(payload)
    }

    /// Read the next complete message.
    ///
    /// Atoms carrying no known message are skipped. Returns `Ok(None)` on
    /// clean end of stream.
    pub async fn read_message(&mut self) -> Result<Option<Message>, FramingError> {
        loop {
            let Some(header) = self.read_header().await? else {
                return Ok(None);
            };
            let payload = self.read_payload(&header).await?;

            match Message::from_payload(&payload)? {
                Some(msg) => return Ok(Some(msg)),
                None => trace!(size = header.size, "skipping atom without a known message"),
            }
        }
    }

    /// Get a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AtomError, MessageError};

    fn atom(size: u32, tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut buf = AtomHeader { size, tag: *tag }.to_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf
    }

    #[tokio::test]
    async fn test_read_messages_until_eof() {
        let mut data = Message::throttle(1000, 4096, 0.1).to_atom().unwrap().to_vec();
        data.extend_from_slice(&Message::init(1).to_atom().unwrap());

        let mut reader = AtomReader::new(&data[..]);
        assert_eq!(
            reader.read_message().await.unwrap(),
            Some(Message::throttle(1000, 4096, 0.1))
        );
        assert_eq!(reader.read_message().await.unwrap(), Some(Message::init(1)));
        assert_eq!(reader.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_messages_are_skipped() {
        let mut data = atom(10, b"warp", b"{}");
        data.extend_from_slice(&atom(18, b"warp", br#"{"ping":1}"#));
        data.extend_from_slice(&Message::throttle(1, 2, 0.0).to_atom().unwrap());

        let mut reader = AtomReader::new(&data[..]);
        assert_eq!(
            reader.read_message().await.unwrap(),
            Some(Message::throttle(1, 2, 0.0))
        );
        assert_eq!(reader.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_stream_is_clean() {
        let mut reader = AtomReader::new(&b""[..]);
        assert!(reader.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_header() {
        let data = [0u8, 0, 0];
        let mut reader = AtomReader::new(&data[..]);
        assert!(matches!(
            reader.read_message().await,
            Err(FramingError::TruncatedHeader(3))
        ));
    }

    #[tokio::test]
    async fn test_truncated_payload() {
        let data = atom(20, b"warp", b"{\"in");
        let mut reader = AtomReader::new(&data[..]);
        assert!(matches!(
            reader.read_message().await,
            Err(FramingError::TruncatedPayload {
                expected: 12,
                actual: 4
            })
        ));
    }

    #[tokio::test]
    async fn test_bad_header_consumes_only_header() {
        let data = atom(16, b"moof", b"trailing");
        let mut reader = AtomReader::new(&data[..]);
        assert!(matches!(
            reader.read_message().await,
            Err(FramingError::Atom(AtomError::UnsupportedType(_)))
        ));

        let rest = reader.into_inner();
        assert_eq!(rest, b"trailing");
    }

    #[tokio::test]
    async fn test_undecodable_payload() {
        let data = atom(12, b"warp", b"nope");
        let mut reader = AtomReader::new(&data[..]);
        assert!(matches!(
            reader.read_message().await,
            Err(FramingError::Message(MessageError::Json(_)))
        ));
    }
}
