use anyhow::Result;
use async_trait::async_trait;
use http::{Request, Response};

/// Transport seam. Tests substitute a scripted executor; production uses
/// reqwest underneath.
#[async_trait]
pub trait HttpExec: Send + Sync {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>>;
}

pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl Default for ReqwestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestExecutor {
    pub fn new() -> Self {
        let client = reqwest::Client::builder().build().expect("reqwest client");
        Self { client }
    }
}

#[async_trait]
impl HttpExec for ReqwestExecutor {
    async fn execute(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>> {
        let (parts, body) = req.into_parts();
        let mut builder = self.client.request(parts.method, parts.uri.to_string());
        builder = builder.headers(parts.headers);
        let resp = builder.body(body).send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await?;
        let mut builder = Response::builder().status(status);
        if let Some(map) = builder.headers_mut() {
            *map = headers;
        }
        Ok(builder.body(bytes.to_vec())?)
    }
}
