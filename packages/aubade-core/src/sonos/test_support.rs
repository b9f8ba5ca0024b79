//! Loopback fake speaker for wire-level tests.
//!
//! Binds a real TCP listener so the production HTTP path is exercised end
//! to end. Responses are served from a scripted queue; anything beyond the
//! script gets a generic success envelope. Speaker addresses carry an
//! explicit port, which the URL helpers pass through verbatim.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const DEFAULT_BODY: &str = r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body/></s:Envelope>"#;

/// Builds a success envelope wrapping `inner` in an action response element.
pub(crate) fn soap_response(response_tag: &str, inner: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?><s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\">\
         <s:Body><u:{response_tag} xmlns:u=\"urn:schemas-upnp-org:service:AVTransport:1\">{inner}\
         </u:{response_tag}></s:Body></s:Envelope>"
    )
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub path: String,
    pub body: String,
    pub soap_action: Option<String>,
}

struct CannedResponse {
    status: u16,
    body: String,
}

pub(crate) struct FakeSpeaker {
    address: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<VecDeque<CannedResponse>>>,
}

impl FakeSpeaker {
    pub(crate) async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake speaker");
        let port = listener.local_addr().expect("local addr").port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(Mutex::new(VecDeque::new()));

        let accept_requests = Arc::clone(&requests);
        let accept_responses = Arc::clone(&responses);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let requests = Arc::clone(&accept_requests);
                let responses = Arc::clone(&accept_responses);
                tokio::spawn(async move {
                    let _ = handle_connection(stream, requests, responses).await;
                });
            }
        });

        Self {
            address: format!("127.0.0.1:{port}"),
            requests,
            responses,
        }
    }

    /// Address to hand to the client in place of a speaker IP.
    pub(crate) fn address(&self) -> &str {
        &self.address
    }

    /// Scripts the next response. Unscripted requests answer a generic
    /// success envelope.
    pub(crate) fn enqueue(&self, status: u16, body: &str) {
        self.responses.lock().push_back(CannedResponse {
            status,
            body: body.to_string(),
        });
    }

    /// All requests received so far, in arrival order.
    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

async fn handle_connection(
    mut stream: TcpStream,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<VecDeque<CannedResponse>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_subsequence(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let header_text = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = header_text.lines();
    let request_line = lines.next().unwrap_or_default();
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    let mut content_length = 0usize;
    let mut soap_action = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            } else if name == "soapaction" {
                soap_action = Some(value.to_string());
            }
        }
    }

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = (body_start + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[body_start..body_end]).to_string();

    // Record before answering so callers see the request as soon as their
    // await resolves.
    requests.lock().push(RecordedRequest {
        path,
        body,
        soap_action,
    });

    let (status, payload) = match responses.lock().pop_front() {
        Some(canned) => (canned.status, canned.body),
        None => (200, DEFAULT_BODY.to_string()),
    };
    let reason = if status < 400 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/xml; charset=\"utf-8\"\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    Ok(())
}
