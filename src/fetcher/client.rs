//! 대상 JSON 엔드포인트 HTTP 클라이언트
//!
//! Connection pooling과 타임아웃을 지원하는 비동기 HTTP 클라이언트입니다.

use reqwest::header::{HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, ClientBuilder, Method, RequestBuilder};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::FetchResult;
use crate::config::ModuleConfig;
use crate::error::FetchError;

/// JSON 엔드포인트 HTTP 클라이언트
///
/// 모든 모듈이 하나의 connection pool을 공유합니다. 모듈별 설정(헤더, 인증,
/// body)은 요청마다 적용됩니다.
#[derive(Clone)]
pub struct JsonFetcher {
    client: Client,
    timeout: Duration,
}

impl JsonFetcher {
    /// 새 클라이언트 생성
    ///
    /// # Arguments
    /// * `timeout` - 요청 타임아웃
    ///
    /// # Example
    /// ```ignore
    /// let fetcher = JsonFetcher::new(Duration::from_secs(30))?;
    /// let body = fetcher.fetch("http://localhost:8000/data.json", &module).await?;
    /// ```
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .user_agent(concat!("rjson-exporter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::HttpClientInit)?;

        Ok(Self { client, timeout })
    }

    /// 설정된 타임아웃
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 대상 URL에서 JSON 문서를 가져옴
    ///
    /// 응답 body를 그대로 반환합니다. JSON 유효성 검사는 호출자가 합니다.
    #[instrument(skip(self, module), fields(target = %target))]
    pub async fn fetch(&self, target: &str, module: &ModuleConfig) -> FetchResult<Vec<u8>> {
        let url = parse_target(target)?;
        let request = self.build_request(url, module)?;

        debug!("Sending request to target");

        let response = request.send().await.map_err(|e| self.map_error(e))?;

        let status = response.status().as_u16();
        if !is_valid_status(status, &module.valid_status_codes) {
            return Err(FetchError::HttpStatus(status));
        }

        let body = response.bytes().await.map_err(|e| self.map_error(e))?;
        debug!(bytes = body.len(), "Received response from target");

        Ok(body.to_vec())
    }

    fn build_request(&self, url: Url, module: &ModuleConfig) -> FetchResult<RequestBuilder> {
        let method = if module.body.is_some() {
            Method::POST
        } else {
            Method::GET
        };

        let mut req = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");

        for (name, value) in &module.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                FetchError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
            req = req.header(name, value);
        }

        if let Some(ref auth) = module.http_client.basic_auth {
            req = req.basic_auth(&auth.username, auth.password.as_ref());
        } else if let Some(ref token) = module.http_client.bearer_token {
            req = req.bearer_auth(token);
        }

        if let Some(ref body) = module.body {
            req = req.body(body.content.clone());
        }

        Ok(req)
    }

    fn map_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::timeout_with_duration(self.timeout.as_millis() as u64)
        } else {
            FetchError::from(err)
        }
    }
}

/// target은 http(s) 절대 URL이어야 함
fn parse_target(target: &str) -> FetchResult<Url> {
    let url = Url::parse(target).map_err(|e| FetchError::InvalidTarget {
        target: target.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(FetchError::InvalidTarget {
            target: target.to_string(),
            reason: format!("unsupported scheme '{}'", scheme),
        }),
    }
}

/// 설정이 비어 있으면 2xx 전체 허용
fn is_valid_status(status: u16, valid: &[u16]) -> bool {
    if valid.is_empty() {
        (200..300).contains(&status)
    } else {
        valid.contains(&status)
    }
}
