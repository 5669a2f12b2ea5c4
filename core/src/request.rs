use std::mem;
use std::str::FromStr;

use http::header::HeaderName;
use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::Method;
use http::Uri;
use percent_encoding::{percent_encode, AsciiSet};

use crate::{Error, Result};

/// Signing context for request.
///
/// Query values are kept decoded while signing and re-encoded by
/// [`SigningRequest::apply`].
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, as sent on the wire (percent encoded).
    pub path: String,
    /// HTTP query parameters, decoded.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // We will return it back when apply the context.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    ///
    /// Query values are percent encoded with `encode_set`.
    pub fn apply(
        mut self,
        parts: &mut http::request::Parts,
        encode_set: &'static AsciiSet,
    ) -> Result<()> {
        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let mut s = self.path;
                for (i, (k, v)) in self.query.iter().enumerate() {
                    s.push(if i == 0 { '?' } else { '&' });
                    s.push_str(&percent_encode(k.as_bytes(), encode_set).to_string());
                    if !v.is_empty() {
                        s.push('=');
                        s.push_str(&percent_encode(v.as_bytes(), encode_set).to_string());
                    }
                }

                Some(PathAndQuery::from_str(&s)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get header value by name.
    ///
    /// Returns empty string if header not found.
    #[inline]
    pub fn header_get_or_default(&self, key: &HeaderName) -> Result<&str> {
        match self.headers.get(key) {
            Some(v) => Ok(v.to_str()?),
            None => Ok(""),
        }
    }

    /// Get lower-cased header pairs whose name starts with prefix.
    pub fn header_to_vec_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        self.headers
            .iter()
            .filter(|(k, _)| k.as_str().starts_with(prefix))
            .map(|(k, v)| -> Result<(String, String)> {
                Ok((k.as_str().to_lowercase(), v.to_str()?.trim().to_string()))
            })
            .collect()
    }

    /// Convert sorted pairs to string.
    ///
    /// ```shell
    /// [(a, b), (c, d)] => "a:b\nc:d"
    /// ```
    pub fn pairs_to_string(mut pairs: Vec<(String, String)>, sep: &str, join: &str) -> String {
        let mut s = String::with_capacity(16);

        pairs.sort();

        for (idx, (k, v)) in pairs.into_iter().enumerate() {
            if idx != 0 {
                s.push_str(join);
            }

            s.push_str(&k);
            s.push_str(sep);
            s.push_str(&v);
        }

        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::NON_ALPHANUMERIC;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_and_apply_round_trip() {
        let mut parts = http::Request::get(
            "https://account.blob.core.windows.net/container?restype=container&comp=list&marker=2%21a%2Bb",
        )
        .header("x-ms-version", "2023-11-03")
        .body(())
        .unwrap()
        .into_parts()
        .0;

        let req = SigningRequest::build(&mut parts).unwrap();
        assert_eq!(req.path, "/container");
        assert_eq!(
            req.query,
            vec![
                ("restype".to_string(), "container".to_string()),
                ("comp".to_string(), "list".to_string()),
                ("marker".to_string(), "2!a+b".to_string()),
            ]
        );

        req.apply(&mut parts, NON_ALPHANUMERIC).unwrap();
        assert_eq!(
            parts.uri.to_string(),
            "https://account.blob.core.windows.net/container?restype=container&comp=list&marker=2%21a%2Bb"
        );
        assert_eq!(parts.headers["x-ms-version"], "2023-11-03");
    }

    #[test]
    fn test_pairs_to_string() {
        let pairs = vec![
            ("x-ms-version".to_string(), "2023-11-03".to_string()),
            ("x-ms-blob-type".to_string(), "BlockBlob".to_string()),
        ];

        assert_eq!(
            SigningRequest::pairs_to_string(pairs, ":", "\n"),
            "x-ms-blob-type:BlockBlob\nx-ms-version:2023-11-03"
        );
    }

    #[test]
    fn test_build_without_authority() {
        let mut parts = http::Request::get("/container")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let err = SigningRequest::build(&mut parts).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RequestInvalid);
    }
}
