//! 대상 JSON 문서 수집 모듈
//!
//! probe 요청의 target URL에서 JSON 문서를 가져옵니다.
//!
//! # Example
//!
//! ```ignore
//! use rjson_exporter::fetcher::JsonFetcher;
//!
//! let fetcher = JsonFetcher::new(Duration::from_secs(30))?;
//! let body = fetcher.fetch("http://localhost:8000/data.json", &module).await?;
//! ```

mod client;

pub use client::JsonFetcher;

use crate::error::FetchError;

/// Fetch 결과 타입
pub type FetchResult<T> = Result<T, FetchError>;
