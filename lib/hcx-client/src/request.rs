/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use hcx_http::body::{BodyWriteError, HttpBodyEncodeWriter};
use http::{HeaderMap, Method, Uri, Version};
use mime::Mime;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::RequestConfig;
use crate::route::HttpHost;

const STREAM_COPY_BUFFER_SIZE: usize = 8192;

#[derive(Debug, Error)]
pub enum EntityWriteError {
    #[error("entity content already consumed")]
    AlreadyConsumed,
    #[error("failed to read entity content: {0:?}")]
    ReadFailed(io::Error),
    #[error("failed to write entity: {0}")]
    WriteFailed(#[from] BodyWriteError),
}

type SharedContent = Arc<Mutex<Option<Box<dyn AsyncRead + Send + Unpin>>>>;

#[derive(Clone)]
enum EntityContent {
    Bytes(Bytes),
    Stream {
        reader: SharedContent,
        length: Option<u64>,
    },
}

/// Body of a request.
///
/// In-memory content can be sent any number of times. Stream content is read
/// once, all clones of the entity share the same stream.
#[derive(Clone)]
pub struct HttpEntity {
    content: EntityContent,
    content_type: Option<Mime>,
    chunked: bool,
}

impl fmt::Debug for HttpEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEntity")
            .field("repeatable", &self.is_repeatable())
            .field("content_length", &self.content_length())
            .field("content_type", &self.content_type)
            .field("chunked", &self.chunked)
            .finish()
    }
}

impl HttpEntity {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        HttpEntity {
            content: EntityContent::Bytes(data.into()),
            content_type: None,
            chunked: false,
        }
    }

    /// Stream content, with `length` unknown the entity is sent chunked.
    pub fn from_reader<R>(reader: R, length: Option<u64>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        HttpEntity {
            content: EntityContent::Stream {
                reader: Arc::new(Mutex::new(Some(Box::new(reader)))),
                length,
            },
            content_type: None,
            chunked: false,
        }
    }

    pub fn with_content_type(mut self, content_type: Mime) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Force chunked transfer coding even if the length is known.
    pub fn with_chunked(mut self, chunked: bool) -> Self {
        self.chunked = chunked;
        self
    }

    #[inline]
    pub fn content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    pub fn content_length(&self) -> Option<u64> {
        match &self.content {
            EntityContent::Bytes(b) => Some(b.len() as u64),
            EntityContent::Stream { length, .. } => *length,
        }
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        self.chunked
    }

    #[inline]
    pub fn is_repeatable(&self) -> bool {
        matches!(self.content, EntityContent::Bytes(_))
    }

    pub async fn write_to<W>(
        &self,
        writer: &mut HttpBodyEncodeWriter<'_, W>,
    ) -> Result<(), EntityWriteError>
    where
        W: AsyncWrite + Unpin,
    {
        match &self.content {
            EntityContent::Bytes(b) => {
                writer.write_all(b).await?;
                Ok(())
            }
            EntityContent::Stream { reader, .. } => {
                let taken = reader.lock().unwrap_or_else(PoisonError::into_inner).take();
                let Some(mut reader) = taken else {
                    return Err(EntityWriteError::AlreadyConsumed);
                };
                let mut buf = vec![0u8; STREAM_COPY_BUFFER_SIZE];
                loop {
                    let nr = reader
                        .read(&mut buf)
                        .await
                        .map_err(EntityWriteError::ReadFailed)?;
                    if nr == 0 {
                        return Ok(());
                    }
                    writer.write_all(&buf[..nr]).await?;
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpRequest {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    entity: Option<HttpEntity>,
    config: Option<RequestConfig>,
}

impl HttpRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        HttpRequest {
            method,
            uri,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            entity: None,
            config: None,
        }
    }

    pub fn get(uri: Uri) -> Self {
        HttpRequest::new(Method::GET, uri)
    }

    pub fn head(uri: Uri) -> Self {
        HttpRequest::new(Method::HEAD, uri)
    }

    pub fn post(uri: Uri, entity: HttpEntity) -> Self {
        HttpRequest::new(Method::POST, uri).with_entity(entity)
    }

    pub fn put(uri: Uri, entity: HttpEntity) -> Self {
        HttpRequest::new(Method::PUT, uri).with_entity(entity)
    }

    pub fn with_entity(mut self, entity: HttpEntity) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[inline]
    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    #[inline]
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[inline]
    pub fn entity(&self) -> Option<&HttpEntity> {
        self.entity.as_ref()
    }

    #[inline]
    pub fn set_entity(&mut self, entity: Option<HttpEntity>) {
        self.entity = entity;
    }

    /// Config overriding the client defaults for this request.
    #[inline]
    pub fn config(&self) -> Option<&RequestConfig> {
        self.config.as_ref()
    }

    #[inline]
    pub fn set_config(&mut self, config: Option<RequestConfig>) {
        self.config = config;
    }
}

/// Working copy of a request, which stages may rewrite, next to the untouched original.
#[derive(Debug)]
pub struct RequestWrapper {
    original: HttpRequest,
    request: HttpRequest,
    target: Option<HttpHost>,
}

impl RequestWrapper {
    pub fn wrap(request: HttpRequest, target: Option<HttpHost>) -> Self {
        RequestWrapper {
            original: request.clone(),
            request,
            target,
        }
    }

    #[inline]
    pub fn original(&self) -> &HttpRequest {
        &self.original
    }

    #[inline]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    #[inline]
    pub fn request_mut(&mut self) -> &mut HttpRequest {
        &mut self.request
    }

    #[inline]
    pub fn target(&self) -> Option<&HttpHost> {
        self.target.as_ref()
    }

    /// A request without entity, or with in-memory content, can be sent again.
    pub fn is_repeatable(&self) -> bool {
        self.request.entity().is_none_or(|e| e.is_repeatable())
    }
}
