//! Cookie descriptors.
//!
//! Outbound cookies are rendered as one `Set-Cookie` value each; inbound
//! `Cookie` headers are parsed into a name → value map.
//!
//! Rendering validates every piece that lands in the header: the name must be
//! an RFC 6265 token, the value must be cookie-octets (optionally quoted), and
//! `Domain`/`Path` must not carry `;` or control characters.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime};

use thiserror::Error;

/// A cookie that cannot be rendered without altering its attributes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CookieError {
    #[error("invalid cookie name {0:?}")]
    InvalidName(String),

    #[error("invalid value for cookie {name:?}")]
    InvalidValue { name: String },

    #[error("invalid {attribute} attribute for cookie {name:?}")]
    InvalidAttribute {
        name: String,
        attribute: &'static str,
    },
}

/// `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SameSite::Strict => write!(f, "Strict"),
            SameSite::Lax => write!(f, "Lax"),
            SameSite::None => write!(f, "None"),
        }
    }
}

/// A cookie to be sent with the response.
#[derive(Debug, Clone, PartialEq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub max_age: Option<Duration>,
    pub expires: Option<SystemTime>,
    pub partitioned: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            http_only: false,
            secure: false,
            same_site: None,
            domain: None,
            path: None,
            max_age: None,
            expires: None,
            partitioned: false,
        }
    }

    /// A cookie that instructs the client to drop `name`.
    pub fn removal(name: impl Into<String>) -> Self {
        Self::new(name, "")
            .max_age(Duration::ZERO)
            .expires(SystemTime::UNIX_EPOCH)
    }

    pub fn http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn expires(mut self, expires: SystemTime) -> Self {
        self.expires = Some(expires);
        self
    }

    /// CHIPS partitioned cookie. Browsers require `Secure` alongside it.
    pub fn partitioned(mut self, on: bool) -> Self {
        self.partitioned = on;
        if on {
            self.secure = true;
        }
        self
    }

    /// Render as a `Set-Cookie` header value.
    ///
    /// Fails instead of emitting a header whose attributes differ from the
    /// builder's, e.g. a value containing `; Domain=`.
    pub fn to_header_value(&self) -> Result<String, CookieError> {
        if !is_token(&self.name) {
            return Err(CookieError::InvalidName(self.name.clone()));
        }
        if !is_cookie_value(&self.value) {
            return Err(CookieError::InvalidValue {
                name: self.name.clone(),
            });
        }

        let mut out = format!("{}={}", self.name, self.value);
        if let Some(domain) = &self.domain {
            self.check_attribute("Domain", domain)?;
            out.push_str("; Domain=");
            out.push_str(domain);
        }
        if let Some(path) = &self.path {
            self.check_attribute("Path", path)?;
            out.push_str("; Path=");
            out.push_str(path);
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        }
        if let Some(expires) = self.expires {
            out.push_str("; Expires=");
            out.push_str(&httpdate::fmt_http_date(expires));
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if let Some(same_site) = self.same_site {
            out.push_str(&format!("; SameSite={}", same_site));
        }
        if self.partitioned {
            out.push_str("; Partitioned");
        }
        Ok(out)
    }

    fn check_attribute(&self, attribute: &'static str, value: &str) -> Result<(), CookieError> {
        if value.bytes().any(|b| b == b';' || b.is_ascii_control()) {
            return Err(CookieError::InvalidAttribute {
                name: self.name.clone(),
                attribute,
            });
        }
        Ok(())
    }
}

/// RFC 6265 `cookie-name`: an RFC 2616 token.
fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
        })
}

/// RFC 6265 `cookie-value`: cookie-octets, optionally wrapped in one pair of quotes.
fn is_cookie_value(value: &str) -> bool {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    inner.bytes().all(|b| {
        matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
    })
}

/// Cookies sent by the client, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCookies(HashMap<String, String>);

impl RequestCookies {
    /// Parse one or more `Cookie` header values.
    ///
    /// Malformed pairs are skipped. The first occurrence of a name wins.
    pub fn parse<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = HashMap::new();
        for header in headers {
            for pair in header.split(';') {
                let Some((name, value)) = pair.split_once('=') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                let value = value.trim().trim_matches('"');
                map.entry(name.to_string())
                    .or_insert_with(|| value.to_string());
            }
        }
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
