use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;

use filing_source::error::{Result, SourceError};
use filing_source::http_client::{
    Credentials, HttpTransport, ResponseHeaders, TransportRequest, TransportResponse,
};
use filing_source::web_cache::CacheDelegate;

/// Scripted reply for one request
#[derive(Clone, Debug)]
pub enum MockReply {
    Ok {
        status: u16,
        headers: Vec<(String, String)>,
        chunks: Vec<Vec<u8>>,
    },
    /// Body stream breaks after `chunks`
    Incomplete { chunks: Vec<Vec<u8>> },
    Timeout,
    /// 401 with a basic challenge unless the request carries these credentials
    RequireAuth {
        user: String,
        password: String,
        realm: String,
        body: Vec<u8>,
    },
}

impl MockReply {
    pub fn body(body: &[u8]) -> Self {
        MockReply::Ok {
            status: 200,
            headers: vec![("content-length".to_string(), body.len().to_string())],
            chunks: vec![body.to_vec()],
        }
    }

    pub fn chunked(chunks: Vec<Vec<u8>>) -> Self {
        MockReply::Ok {
            status: 200,
            headers: Vec::new(),
            chunks,
        }
    }

    pub fn status(status: u16) -> Self {
        MockReply::Ok {
            status,
            headers: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn with_header(self, name: &str, value: &str) -> Self {
        match self {
            MockReply::Ok {
                status,
                mut headers,
                chunks,
            } => {
                headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
                headers.push((name.to_string(), value.to_string()));
                MockReply::Ok {
                    status,
                    headers,
                    chunks,
                }
            }
            other => other,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggedRequest {
    pub method: &'static str,
    pub url: String,
    pub credentials: Option<Credentials>,
}

type ChunkHook = Arc<dyn Fn(&str, usize) + Send + Sync>;

/// Transport answering from per-URL scripts.
///
/// Each call consumes the next scripted reply; the last one repeats. HEAD
/// requests without a script get an empty 200.
#[derive(Clone, Default)]
pub struct MockTransport {
    get_replies: Arc<Mutex<HashMap<String, VecDeque<MockReply>>>>,
    head_replies: Arc<Mutex<HashMap<String, VecDeque<MockReply>>>>,
    request_log: Arc<Mutex<Vec<LoggedRequest>>>,
    on_chunk: Arc<Mutex<Option<ChunkHook>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(&self, url: &str, reply: MockReply) -> &Self {
        self.get_replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn on_head(&self, url: &str, reply: MockReply) -> &Self {
        self.head_replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Called as each body chunk is handed to the cache
    pub fn set_chunk_hook(&self, hook: impl Fn(&str, usize) + Send + Sync + 'static) {
        *self.on_chunk.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn requests(&self) -> Vec<LoggedRequest> {
        self.request_log.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, url: &str) -> usize {
        self.request_log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub fn get_count(&self, url: &str) -> usize {
        self.count("GET", url)
    }

    pub fn head_count(&self, url: &str) -> usize {
        self.count("HEAD", url)
    }

    fn next_reply(
        replies: &Mutex<HashMap<String, VecDeque<MockReply>>>,
        url: &str,
    ) -> Option<MockReply> {
        let mut replies = replies.lock().unwrap();
        let queue = replies.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn log(&self, method: &'static str, request: &TransportRequest) {
        self.request_log.lock().unwrap().push(LoggedRequest {
            method,
            url: request.url.clone(),
            credentials: request.credentials.clone(),
        });
    }

    fn respond(&self, request: &TransportRequest, reply: MockReply) -> Result<TransportResponse> {
        let url = request.url.clone();
        let hook = self.on_chunk.lock().unwrap().clone();
        let (status, headers, chunks, broken) = match reply {
            MockReply::Ok {
                status,
                headers,
                chunks,
            } => (status, headers, chunks, false),
            MockReply::Incomplete { chunks } => (200, Vec::new(), chunks, true),
            MockReply::Timeout => {
                return Err(SourceError::Timeout {
                    url,
                    timeout_seconds: 1,
                });
            }
            MockReply::RequireAuth {
                user,
                password,
                realm,
                body,
            } => {
                if request.credentials == Some(Credentials::new(user, password)) {
                    (200, Vec::new(), vec![body], false)
                } else {
                    let challenge = format!("Basic realm=\"{}\"", realm);
                    (401, vec![("WWW-Authenticate".to_string(), challenge)], Vec::new(), false)
                }
            }
        };

        let stream_url = url.clone();
        let mut items: Vec<Result<Vec<u8>>> = chunks.into_iter().map(Ok).collect();
        if broken {
            items.push(Err(SourceError::IncompleteRead {
                url: url.clone(),
                details: "connection reset".to_string(),
            }));
        }
        let body = futures::stream::iter(items.into_iter().enumerate())
            .map(move |(index, item)| {
                if let Some(hook) = &hook {
                    hook(&stream_url, index);
                }
                item
            })
            .boxed();

        Ok(TransportResponse {
            status,
            final_url: url,
            headers: headers.into_iter().collect::<ResponseHeaders>(),
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn head(&self, request: &TransportRequest) -> Result<TransportResponse> {
        self.log("HEAD", request);
        let reply = Self::next_reply(&self.head_replies, &request.url)
            .unwrap_or_else(|| MockReply::status(200));
        let reply = match reply {
            MockReply::Ok {
                status, headers, ..
            } => MockReply::Ok {
                status,
                headers,
                chunks: Vec::new(),
            },
            other => other,
        };
        self.respond(request, reply)
    }

    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse> {
        self.log("GET", request);
        let reply =
            Self::next_reply(&self.get_replies, &request.url).unwrap_or_else(|| MockReply::status(404));
        self.respond(request, reply)
    }
}

/// Delegate that answers from presets and records what it was asked
#[derive(Default)]
pub struct RecordingDelegate {
    pub credentials: Option<Credentials>,
    pub accept_html: bool,
    pub go_offline: bool,
    pub credential_requests: Mutex<Vec<(String, String)>>,
    pub offline_offers: Mutex<Vec<String>>,
    pub progress_calls: Mutex<Vec<(String, u64, Option<u64>)>>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(user: &str, password: &str) -> Self {
        Self {
            credentials: Some(Credentials::new(user, password)),
            ..Self::default()
        }
    }
}

impl CacheDelegate for RecordingDelegate {
    fn credentials(&self, host: &str, realm: &str) -> Option<Credentials> {
        self.credential_requests
            .lock()
            .unwrap()
            .push((host.to_string(), realm.to_string()));
        self.credentials.clone()
    }

    fn confirm_unexpected_html(&self, _url: &str) -> bool {
        self.accept_html
    }

    fn offer_work_offline(&self, url: &str, _error: &SourceError) -> bool {
        self.offline_offers.lock().unwrap().push(url.to_string());
        self.go_offline
    }

    fn progress(&self, url: &str, downloaded: u64, total: Option<u64>) {
        self.progress_calls
            .lock()
            .unwrap()
            .push((url.to_string(), downloaded, total));
    }
}
