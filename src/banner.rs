//! Banner grabbing for open TCP connections.
//!
//! Reads whatever the service volunteers first. If it stays silent and the
//! strategy allows it, sends the strategy payload and reads once more. The
//! raw text is then cleansed of markup and truncated for display.

use crate::plugins::ProbeStrategy;
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::trace;

/// Maximum bytes to read for a banner.
const MAX_BANNER_SIZE: usize = 4096;

/// Banners longer than this are cut and suffixed with [`ELLIPSIS`].
pub const MAX_BANNER_CHARS: usize = 80;

pub const ELLIPSIS: &str = "...";

/// Sentinel for an open port that produced no usable text.
pub const NO_BANNER: &str = "No banner";

/// Default timeout for each banner read.
pub const BANNER_TIMEOUT: Duration = Duration::from_secs(1);

static XML_DECL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<\?xml.*?\?>").unwrap());
static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!DOCTYPE.*?>").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<.*?>").unwrap());

/// Grab raw banner text from an established stream.
///
/// Never fails: resets, timeouts, closed streams and write errors all yield
/// `None`.
pub async fn grab_banner<S>(
    stream: &mut S,
    strategy: &dyn ProbeStrategy,
    host: Ipv4Addr,
    port: u16,
    read_timeout: Duration,
) -> Option<String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; MAX_BANNER_SIZE];

    // Some services banner immediately; give them a chance before writing
    if let Some(text) = read_text(stream, &mut buffer, read_timeout).await {
        return Some(text);
    }

    let payload = strategy.payload(host, port)?;
    trace!(port, strategy = strategy.name(), "peer silent, sending probe");

    match timeout(read_timeout, stream.write_all(&payload)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            trace!(port, error = %e, "probe write failed");
            return None;
        }
        Err(_) => return None,
    }

    read_text(stream, &mut buffer, read_timeout).await
}

async fn read_text<S>(stream: &mut S, buffer: &mut [u8], read_timeout: Duration) -> Option<String>
where
    S: AsyncRead + Unpin,
{
    match timeout(read_timeout, stream.read(buffer)).await {
        Ok(Ok(n)) if n > 0 => {
            let text = decode(&buffer[..n]);
            (!text.trim().is_empty()).then_some(text)
        }
        _ => None,
    }
}

/// UTF-8 decode, dropping invalid sequences rather than replacing them.
fn decode(data: &[u8]) -> String {
    data.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Strip XML/DOCTYPE declarations and tags, then trim.
pub fn clean_banner(raw: &str) -> String {
    let text = XML_DECL.replace_all(raw, "");
    let text = DOCTYPE.replace_all(&text, "");
    let text = TAG.replace_all(&text, "");
    text.trim().to_string()
}

/// Cut to [`MAX_BANNER_CHARS`] characters, appending [`ELLIPSIS`] if cut.
pub fn truncate_banner(text: &str) -> String {
    match text.char_indices().nth(MAX_BANNER_CHARS) {
        Some((idx, _)) => format!("{}{}", &text[..idx], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Turn an optional raw capture into the displayed banner.
pub fn finalize_banner(raw: Option<&str>) -> String {
    let cleaned = raw.map(clean_banner).unwrap_or_default();
    if cleaned.is_empty() {
        NO_BANNER.to_string()
    } else {
        truncate_banner(&cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{GenericProbe, HttpProbe, PassiveProbe};
    use tokio::io::duplex;

    const HOST: Ipv4Addr = Ipv4Addr::LOCALHOST;

    #[test]
    fn test_clean_banner_strips_markup() {
        let raw = r#"<?xml version="1.0"?><html><body>hi</body></html>"#;
        assert_eq!(clean_banner(raw), "hi");

        let raw = "<!DOCTYPE html>\n<html>\n<title>Router</title>\n</html>\n";
        assert_eq!(clean_banner(raw), "Router");
    }

    #[test]
    fn test_clean_banner_plain_text() {
        assert_eq!(clean_banner("SSH-2.0-OpenSSH_8.9\r\n"), "SSH-2.0-OpenSSH_8.9");
    }

    #[test]
    fn test_truncate_long_banner() {
        let long = "a".repeat(200);
        let cut = truncate_banner(&long);
        assert_eq!(cut.len(), 83);
        assert!(cut.ends_with("..."));
        assert_eq!(&cut[..80], &long[..80]);
    }

    #[test]
    fn test_truncate_exact_length_untouched() {
        let exact = "b".repeat(80);
        assert_eq!(truncate_banner(&exact), exact);
    }

    #[test]
    fn test_truncate_counts_characters() {
        let wide = "é".repeat(90);
        let cut = truncate_banner(&wide);
        assert_eq!(cut.chars().count(), 83);
    }

    #[test]
    fn test_finalize_sentinel() {
        assert_eq!(finalize_banner(None), NO_BANNER);
        assert_eq!(finalize_banner(Some("   ")), NO_BANNER);
        assert_eq!(finalize_banner(Some("<p></p>")), NO_BANNER);
        assert_eq!(finalize_banner(Some("220 ready\r\n")), "220 ready");
    }

    #[test]
    fn test_decode_drops_invalid_bytes() {
        assert_eq!(decode(b"ok\xff\xfe!"), "ok!");
        // U+FFFD sent by the peer is real text
        let mut bytes = "a\u{FFFD}b".as_bytes().to_vec();
        bytes.push(0xff);
        assert_eq!(decode(&bytes), "a\u{FFFD}b");
    }

    #[tokio::test]
    async fn test_unsolicited_banner_without_write() {
        let (mut client, mut server) = duplex(1024);
        server.write_all(b"220 ftp ready\r\n").await.unwrap();

        let banner = grab_banner(&mut client, &GenericProbe, HOST, 21, BANNER_TIMEOUT).await;
        assert_eq!(banner.as_deref(), Some("220 ftp ready\r\n"));

        // Nothing was written to the peer
        drop(client);
        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_probe_sent_when_silent() {
        let (mut client, mut server) = duplex(1024);
        let responder = tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            let n = server.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            server
                .write_all(b"HTTP/1.1 200 OK\r\nServer: test\r\n\r\n")
                .await
                .unwrap();
            request
        });

        let banner = grab_banner(
            &mut client,
            &HttpProbe,
            HOST,
            80,
            Duration::from_millis(100),
        )
        .await;
        let request = responder.await.unwrap();

        assert!(request.starts_with("GET / HTTP/1.1\r\nHost: 127.0.0.1"));
        assert!(banner.unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[tokio::test]
    async fn test_passive_never_writes() {
        let (mut client, mut server) = duplex(1024);
        let banner = grab_banner(
            &mut client,
            &PassiveProbe,
            HOST,
            22,
            Duration::from_millis(50),
        )
        .await;
        assert!(banner.is_none());

        drop(client);
        let mut rest = Vec::new();
        server.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_closed_peer_yields_none() {
        let (mut client, server) = duplex(1024);
        drop(server);
        let banner = grab_banner(
            &mut client,
            &GenericProbe,
            HOST,
            9,
            Duration::from_millis(50),
        )
        .await;
        assert!(banner.is_none());
    }
}
