use std::collections::BTreeMap;
use std::fmt::Write;

use async_trait::async_trait;
use azblob_core::hash::{base64_decode, base64_hmac_sha256};
use azblob_core::time::{format_http_date, now, DateTime};
use azblob_core::{Context, Error, Result, SignRequest, SigningRequest};
use http::request::Parts;
use http::{header, HeaderName, HeaderValue};
use log::debug;

use crate::constants::*;
use crate::Credential;

/// RequestSigner that implement Azure Storage Shared Key Authorization.
///
/// - [Authorize with Shared Key](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
#[derive(Debug, Default)]
pub struct RequestSigner {
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for Azure Storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: &Self::Credential,
    ) -> Result<()> {
        let key = base64_decode(&credential.account_key).map_err(|e| {
            Error::credential_invalid("storage account key is not valid base64").with_source(e)
        })?;

        let mut ctx = SigningRequest::build(req)?;

        let now_time = self.time.unwrap_or_else(now);
        ctx.headers
            .insert(X_MS_DATE, format_http_date(now_time).parse()?);
        if !ctx.headers.contains_key(X_MS_VERSION) {
            ctx.headers
                .insert(X_MS_VERSION, HeaderValue::from_static(AZURE_VERSION));
        }

        let string_to_sign = string_to_sign(&ctx, &credential.account_name)?;
        let signature = base64_hmac_sha256(&key, string_to_sign.as_bytes());

        ctx.headers.insert(header::AUTHORIZATION, {
            let mut value: HeaderValue =
                format!("SharedKey {}:{signature}", credential.account_name).parse()?;
            value.set_sensitive(true);
            value
        });

        ctx.apply(req, &AZURE_QUERY_ENCODE_SET)
    }
}

/// Construct string to sign
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-Encoding + "\n" +
/// Content-Language + "\n" +
/// Content-Length + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// If-Modified-Since + "\n" +
/// If-Match + "\n" +
/// If-None-Match + "\n" +
/// If-Unmodified-Since + "\n" +
/// Range + "\n" +
/// CanonicalizedHeaders +
/// CanonicalizedResource;
/// ```
///
/// ## Reference
///
/// - [Blob, Queue, and File Services (Shared Key authorization)](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
fn string_to_sign(ctx: &SigningRequest, account_name: &str) -> Result<String> {
    let mut s = String::with_capacity(256);

    writeln!(&mut s, "{}", ctx.method.as_str())?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_ENCODING)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_LANGUAGE)?)?;
    writeln!(&mut s, "{}", {
        // Zero length must be signed as an empty string.
        let content_length = ctx.header_get_or_default(&header::CONTENT_LENGTH)?;
        if content_length == "0" {
            ""
        } else {
            content_length
        }
    })?;
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&HeaderName::from_static(CONTENT_MD5))?
    )?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_TYPE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::DATE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_MODIFIED_SINCE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_MATCH)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_NONE_MATCH)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_UNMODIFIED_SINCE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::RANGE)?)?;
    writeln!(&mut s, "{}", canonicalize_header(ctx)?)?;
    write!(&mut s, "{}", canonicalize_resource(ctx, account_name))?;

    debug!("string to sign: {}", &s);

    Ok(s)
}

/// ## Reference
///
/// - [Constructing the canonicalized headers string](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-headers-string)
fn canonicalize_header(ctx: &SigningRequest) -> Result<String> {
    Ok(SigningRequest::pairs_to_string(
        ctx.header_to_vec_with_prefix("x-ms-")?,
        ":",
        "\n",
    ))
}

/// ## Reference
///
/// - [Constructing the canonicalized resource string](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-resource-string)
fn canonicalize_resource(ctx: &SigningRequest, account_name: &str) -> String {
    if ctx.query.is_empty() {
        return format!("/{}{}", account_name, ctx.path);
    }

    // Repeated parameters are signed once, values sorted and comma separated.
    let mut params: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (k, v) in &ctx.query {
        params.entry(k.to_lowercase()).or_default().push(v);
    }

    let query = params
        .into_iter()
        .map(|(k, mut v)| {
            v.sort_unstable();
            (k, v.join(","))
        })
        .collect();

    format!(
        "/{}{}\n{}",
        account_name,
        ctx.path,
        SigningRequest::pairs_to_string(query, ":", "\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use http::Request;
    use pretty_assertions::assert_eq;

    const ACCOUNT_KEY: &str =
        "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

    fn signer() -> RequestSigner {
        RequestSigner::new().with_time(Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap())
    }

    fn credential() -> Credential {
        Credential::with_shared_key("devstoreaccount1", ACCOUNT_KEY)
    }

    #[tokio::test]
    async fn test_sign_put_blob() {
        let _ = env_logger::builder().is_test(true).try_init();

        let cred = credential();
        let (mut parts, _) = Request::put(
            "https://devstoreaccount1.blob.core.windows.net/mycontainer/hello.txt",
        )
        .header(header::CONTENT_LENGTH, "11")
        .header(header::CONTENT_TYPE, "text/plain")
        .header(X_MS_BLOB_TYPE, BLOCK_BLOB)
        .body(())
        .unwrap()
        .into_parts();

        signer()
            .sign_request(&Context::new(), &mut parts, &cred)
            .await
            .unwrap();

        assert_eq!(parts.headers[X_MS_DATE], "Tue, 01 Mar 2022 08:12:34 GMT");
        assert_eq!(parts.headers[X_MS_VERSION], AZURE_VERSION);
        assert_eq!(
            parts.headers[header::AUTHORIZATION],
            "SharedKey devstoreaccount1:CGK9HeyEPmc4B1ghvU8Af4BC5MUlh7xjlm4kge8vp2Q="
        );
    }

    #[tokio::test]
    async fn test_sign_list_blobs() {
        let (mut parts, _) = Request::get(
            "https://devstoreaccount1.blob.core.windows.net/mycontainer?restype=container&comp=list&marker=2%21a%2Bb",
        )
        .body(())
        .unwrap()
        .into_parts();

        signer()
            .sign_request(&Context::new(), &mut parts, &credential())
            .await
            .unwrap();

        assert_eq!(
            parts.headers[header::AUTHORIZATION],
            "SharedKey devstoreaccount1:uJE2QgyCgv1Wte2lUx1wzH17meZOAHroHKQaOD/bzp0="
        );
        assert_eq!(
            parts.uri.to_string(),
            "https://devstoreaccount1.blob.core.windows.net/mycontainer?restype=container&comp=list&marker=2%21a%2Bb"
        );
    }

    #[test]
    fn test_canonicalize_resource_repeated_params() {
        let (mut parts, _) = Request::get(
            "https://myaccount.blob.core.windows.net/mycontainer?COMP=list&include=snapshots&include=metadata",
        )
        .body(())
        .unwrap()
        .into_parts();
        let ctx = SigningRequest::build(&mut parts).unwrap();

        assert_eq!(
            canonicalize_resource(&ctx, "myaccount"),
            "/myaccount/mycontainer\ncomp:list\ninclude:metadata,snapshots"
        );
    }

    #[tokio::test]
    async fn test_invalid_account_key() {
        let (mut parts, _) = Request::get("https://myaccount.blob.core.windows.net/mycontainer")
            .body(())
            .unwrap()
            .into_parts();

        let err = signer()
            .sign_request(
                &Context::new(),
                &mut parts,
                &Credential::with_shared_key("myaccount", "not base64!"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), azblob_core::ErrorKind::CredentialInvalid);
        assert!(parts.headers.get(header::AUTHORIZATION).is_none());
        assert_eq!(parts.uri.path(), "/mycontainer");
    }
}
