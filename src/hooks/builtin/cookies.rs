//! Cookie parsing pre-hook.

use async_trait::async_trait;
use axum::http::header;

use crate::context::ExecutionContext;
use crate::hooks::hook::PreHook;
use crate::http::cookie::RequestCookies;
use crate::http::error::BoxError;

/// Parses the `Cookie` header into a [`RequestCookies`] context extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct CookieParser;

#[async_trait]
impl PreHook for CookieParser {
    async fn before(&self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        let cookies = RequestCookies::parse(
            ctx.request()
                .headers()
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        ctx.insert(cookies);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Request;
    use axum::http::{HeaderMap, HeaderValue, Method};

    #[tokio::test]
    async fn test_cookies_become_extension() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; lang=en"));
        let ctx = ExecutionContext::new(Request::new(Method::GET, "/").with_headers(headers), None);

        CookieParser.before(&ctx).await.unwrap();

        let cookies = ctx.get::<RequestCookies>().unwrap();
        assert_eq!(cookies.get("theme"), Some("dark"));
        assert_eq!(cookies.get("lang"), Some("en"));
    }
}
