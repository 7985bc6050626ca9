//! Photo side channel.
//!
//! A photo binary is posted to an external image host and the returned URL is stored in
//! the animal's PhotoRef cell. Failures never propagate: they become the `error` sentinel
//! plus a warning for the operator.

use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use herdbook_livestock::PhotoRef;

pub const DEFAULT_IMGBB_ENDPOINT: &str = "https://api.imgbb.com/1/upload";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("photo upload request failed: {0}")]
    Request(String),

    #[error("photo host answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("photo host response not understood: {0}")]
    Malformed(String),

    #[error("no photo host configured")]
    NotConfigured,
}

/// An external host that stores an image and returns a public URL for it.
pub trait PhotoHost: Send + Sync {
    fn upload(&self, image: &[u8]) -> Result<String, TransportError>;
}

impl<H> PhotoHost for Option<H>
where
    H: PhotoHost,
{
    fn upload(&self, image: &[u8]) -> Result<String, TransportError> {
        match self {
            Some(host) => host.upload(image),
            None => Err(TransportError::NotConfigured),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImgbbResponse {
    data: ImgbbImage,
}

#[derive(Debug, Deserialize)]
struct ImgbbImage {
    url: String,
}

/// ImgBB upload API: multipart `key` + `image`, answers 200 with `data.url`.
#[derive(Clone)]
pub struct ImgbbHost {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl core::fmt::Debug for ImgbbHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImgbbHost")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ImgbbHost {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, TransportError> {
        let http = Client::builder()
            .build()
            .map_err(|e| TransportError::Request(format!("http client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

impl PhotoHost for ImgbbHost {
    fn upload(&self, image: &[u8]) -> Result<String, TransportError> {
        let form = Form::new()
            .text("key", self.api_key.clone())
            .part("image", Part::bytes(image.to_vec()).file_name("photo"));

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        parse_imgbb(&body)
    }
}

fn parse_imgbb(body: &str) -> Result<String, TransportError> {
    let parsed: ImgbbResponse =
        serde_json::from_str(body).map_err(|e| TransportError::Malformed(e.to_string()))?;
    if parsed.data.url.trim().is_empty() {
        return Err(TransportError::Malformed("empty data.url".to_string()));
    }
    Ok(parsed.data.url)
}

/// Outcome of resolving a photo for a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub photo_ref: PhotoRef,
    /// Set when the upload failed and the `error` sentinel was substituted.
    pub warning: Option<String>,
}

/// Turns an optional photo binary into the value stored in the PhotoRef column.
#[derive(Debug, Clone)]
pub struct PhotoResolver<H> {
    host: H,
}

impl<H> PhotoResolver<H>
where
    H: PhotoHost,
{
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// `NoPhoto` without a binary, the hosted URL on success, `Error` plus a warning on
    /// any failure. One attempt, no retry.
    pub fn upload(&self, image: Option<&[u8]>) -> PhotoUpload {
        let Some(image) = image else {
            return PhotoUpload {
                photo_ref: PhotoRef::NoPhoto,
                warning: None,
            };
        };

        match self.host.upload(image) {
            Ok(url) => {
                tracing::info!(bytes = image.len(), %url, "photo uploaded");
                PhotoUpload {
                    photo_ref: PhotoRef::Url(url),
                    warning: None,
                }
            }
            Err(e) => {
                tracing::warn!(bytes = image.len(), error = %e, "photo upload failed");
                PhotoUpload {
                    photo_ref: PhotoRef::Error,
                    warning: Some(format!("photo not saved: {e}")),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Host that answers from a script of results, then fails.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedHost {
        answers: Mutex<Vec<Result<String, TransportError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedHost {
        pub(crate) fn answering(answers: Vec<Result<String, TransportError>>) -> Self {
            let mut answers = answers;
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
                calls: AtomicUsize::new(0),
            }
        }

        /// Uploads attempted so far.
        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PhotoHost for ScriptedHost {
        fn upload(&self, _image: &[u8]) -> Result<String, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(TransportError::Request("script exhausted".into())))
        }
    }

    #[test]
    fn no_binary_means_no_photo() {
        let resolver = PhotoResolver::new(ScriptedHost::default());
        let upload = resolver.upload(None);
        assert_eq!(upload.photo_ref, PhotoRef::NoPhoto);
        assert_eq!(upload.warning, None);
    }

    #[test]
    fn hosted_url_is_kept_verbatim() {
        let url = "https://i.ibb.co/xyz/luna.jpg";
        let resolver = PhotoResolver::new(ScriptedHost::answering(vec![Ok(url.into())]));
        let upload = resolver.upload(Some(&b"jpeg"[..]));
        assert_eq!(upload.photo_ref, PhotoRef::Url(url.into()));
        assert!(upload.warning.is_none());
    }

    #[test]
    fn failures_become_the_error_sentinel_with_a_warning() {
        let resolver = PhotoResolver::new(ScriptedHost::answering(vec![Err(
            TransportError::Status {
                status: 400,
                body: "bad key".into(),
            },
        )]));
        let upload = resolver.upload(Some(&b"jpeg"[..]));
        assert_eq!(upload.photo_ref, PhotoRef::Error);
        assert!(upload.warning.unwrap().contains("bad key"));
    }

    #[test]
    fn unconfigured_host_fails_softly() {
        let resolver = PhotoResolver::new(None::<ImgbbHost>);
        let upload = resolver.upload(Some(&b"jpeg"[..]));
        assert_eq!(upload.photo_ref, PhotoRef::Error);
        assert!(upload.warning.is_some());
        assert_eq!(resolver.upload(None).photo_ref, PhotoRef::NoPhoto);
    }

    #[test]
    fn imgbb_response_parsing() {
        let ok = r#"{"data":{"id":"x","url":"https://i.ibb.co/x/a.jpg"},"success":true,"status":200}"#;
        assert_eq!(parse_imgbb(ok).unwrap(), "https://i.ibb.co/x/a.jpg");
        assert!(matches!(parse_imgbb(r#"{"success":true}"#), Err(TransportError::Malformed(_))));
        assert!(matches!(
            parse_imgbb(r#"{"data":{"url":""}}"#),
            Err(TransportError::Malformed(_))
        ));
    }
}
