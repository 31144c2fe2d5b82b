//! Multipart uploads with progress reporting.
//!
//! Runs beside the JSON client rather than through it: the file part is
//! streamed chunk by chunk so progress can be observed, and uploads are
//! never retried.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt, TryStreamExt};
use reqwest::multipart::{Form, Part};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::api::client::ApiClient;
use crate::api::envelope::Envelope;
use crate::config::UploadConfig;
use crate::error::ApiError;

pub const UPLOAD_FAILED: &str = "Upload failed";

/// One progress report. `total` and `percent` are `None` when the size
/// of the upload is not known up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
    pub percent: Option<u8>,
}

impl UploadProgress {
    pub fn new(loaded: u64, total: Option<u64>) -> Self {
        let percent = total.map(|total| {
            if total == 0 {
                100
            } else {
                ((loaded as f64 / total as f64) * 100.0).round().min(100.0) as u8
            }
        });
        Self {
            loaded,
            total,
            percent,
        }
    }
}

pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

enum FileData {
    Bytes(Bytes),
    Reader {
        reader: Box<dyn AsyncRead + Send + Unpin>,
        len: Option<u64>,
    },
}

/// A file to attach to an upload.
pub struct UploadFile {
    name: String,
    mime: Option<String>,
    data: FileData,
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.len())
            .finish()
    }
}

impl UploadFile {
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            data: FileData::Bytes(data.into()),
        }
    }

    /// Stream from `reader`; pass `None` for `len` when the size is unknown.
    pub fn from_reader(
        name: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
        len: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            mime: None,
            data: FileData::Reader {
                reader: Box::new(reader),
                len,
            },
        }
    }

    /// Open a file on disk, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, ApiError> {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            ApiError::Validation(format!("Cannot open '{}': {}", path.display(), e))
        })?;
        let len = file.metadata().await.ok().map(|m| m.len());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let mut upload = Self::from_reader(name, file, len);
        upload.mime = guess_mime(path).map(str::to_string);
        Ok(upload)
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> Option<u64> {
        match &self.data {
            FileData::Bytes(bytes) => Some(bytes.len() as u64),
            FileData::Reader { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    fn into_part(self, chunk_size: usize, tracker: ProgressTracker) -> Result<Part, ApiError> {
        let len = self.len();
        let chunks: BoxStream<'static, std::io::Result<Bytes>> = match self.data {
            FileData::Bytes(bytes) => {
                let pieces: Vec<std::io::Result<Bytes>> = (0..bytes.len())
                    .step_by(chunk_size)
                    .map(|start| Ok(bytes.slice(start..(start + chunk_size).min(bytes.len()))))
                    .collect();
                stream::iter(pieces).boxed()
            }
            FileData::Reader { reader, .. } => ReaderStream::with_capacity(reader, chunk_size).boxed(),
        };

        let tracked = chunks.inspect_ok(move |chunk| tracker.advance(chunk.len() as u64));
        let body = reqwest::Body::wrap_stream(tracked);

        let part = match len {
            Some(len) => Part::stream_with_length(body, len),
            None => Part::stream(body),
        }
        .file_name(self.name);

        match self.mime {
            Some(mime) => part
                .mime_str(&mime)
                .map_err(|_| ApiError::Validation(format!("Invalid MIME type '{}'", mime))),
            None => Ok(part),
        }
    }
}

/// Content type for the file kinds teachers attach. Anything else is sent
/// without one and the backend sniffs it.
fn guess_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

/// Text fields plus file parts for a multipart POST.
#[derive(Debug, Default)]
pub struct UploadForm {
    text: Vec<(String, String)>,
    files: Vec<(String, UploadFile)>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.text.push((name.into(), value.to_string()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: UploadFile) -> Self {
        self.files.push((name.into(), file));
        self
    }

    /// Sum of file sizes, or `None` if any file has unknown length.
    pub fn total_len(&self) -> Option<u64> {
        self.files
            .iter()
            .try_fold(0u64, |acc, (_, f)| f.len().map(|len| acc + len))
    }
}

#[derive(Default, Clone)]
pub struct UploadOptions {
    pub on_progress: Option<ProgressFn>,
    pub cancel: Option<CancellationToken>,
    pub timeout: Option<Duration>,
}

impl UploadOptions {
    pub fn on_progress(mut self, f: impl Fn(UploadProgress) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

#[derive(Clone)]
struct ProgressTracker {
    loaded: Arc<AtomicU64>,
    total: Option<u64>,
    notify: Option<ProgressFn>,
}

impl ProgressTracker {
    fn advance(&self, n: u64) {
        let loaded = self.loaded.fetch_add(n, Ordering::SeqCst) + n;
        if let Some(notify) = &self.notify {
            notify(UploadProgress::new(loaded, self.total));
        }
    }
}

/// Upload client sharing the JSON client's base URL and cookie jar.
#[derive(Debug, Clone)]
pub struct Uploader {
    client: ApiClient,
    timeout: Duration,
    chunk_size: usize,
}

impl Uploader {
    pub fn new(client: ApiClient, config: &UploadConfig) -> Self {
        Self {
            client,
            timeout: config.timeout(),
            chunk_size: config.chunk_size.max(1),
        }
    }

    /// POST `form` as multipart to `path`.
    pub async fn upload(
        &self,
        path: &str,
        form: UploadForm,
        opts: UploadOptions,
    ) -> Result<Envelope, ApiError> {
        if opts.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            debug!(path, "Upload cancelled before sending");
            return Err(ApiError::Timeout);
        }

        let tracker = ProgressTracker {
            loaded: Arc::new(AtomicU64::new(0)),
            total: form.total_len(),
            notify: opts.on_progress.clone(),
        };

        let mut multipart = Form::new();
        for (name, value) in form.text {
            multipart = multipart.text(name, value);
        }
        for (name, file) in form.files {
            multipart = multipart.part(name, file.into_part(self.chunk_size, tracker.clone())?);
        }

        let send = self
            .client
            .http()
            .post(self.client.url(path))
            .multipart(multipart)
            .send();

        let exchange = async move {
            let resp = send.await?;
            let status = resp.status().as_u16();
            let body = resp.bytes().await.unwrap_or_default();
            Ok::<_, reqwest::Error>((status, Envelope::parse_lenient(&body)))
        };

        let timeout = opts.timeout.unwrap_or(self.timeout);
        let span = tracing::debug_span!("upload", request_id = %Uuid::new_v4(), path = %path);

        let raced = async {
            match &opts.cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => Err(ApiError::Timeout),
                        result = tokio::time::timeout(timeout, exchange) => {
                            result.map_err(|_| ApiError::UploadTimeout)
                        }
                    }
                }
                None => tokio::time::timeout(timeout, exchange)
                    .await
                    .map_err(|_| ApiError::UploadTimeout),
            }
        }
        .instrument(span)
        .await;

        let (status, envelope) = match raced? {
            Ok(pair) => pair,
            Err(e) if e.is_timeout() => return Err(ApiError::UploadTimeout),
            Err(e) => {
                debug!(path, error = %e, "Upload transport failed");
                return Err(ApiError::Upload {
                    message: UPLOAD_FAILED.to_string(),
                });
            }
        };

        if !(200..300).contains(&status) || envelope.is_explicit_failure() {
            let message = envelope.server_message().unwrap_or(UPLOAD_FAILED).to_string();
            debug!(path, status, %message, "Upload rejected");
            return Err(ApiError::Upload { message });
        }

        Ok(envelope)
    }
}
