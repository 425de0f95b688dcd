// Connection URL signing for both recognition protocols
//
// A SigningContext is captured once per connection attempt and never
// reused: every reconnect derives a new one with a fresh instant.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::Sha256;
use url::Url;

use crate::config::Credentials;
use crate::error::ClientError;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Signing material for one connection attempt.
pub struct SigningContext {
    credentials: Credentials,
    instant: DateTime<Utc>,
}

impl SigningContext {
    pub fn new(credentials: &Credentials) -> Self {
        Self::at(credentials, Utc::now())
    }

    /// Build a context at an explicit instant. Signatures are fully
    /// deterministic given the same credentials and instant.
    pub fn at(credentials: &Credentials, instant: DateTime<Utc>) -> Self {
        Self {
            credentials: credentials.clone(),
            instant,
        }
    }

    /// Signed dictation connection URL.
    ///
    /// HMAC-SHA256 over `host: {host}\ndate: {date}\nGET {path} HTTP/1.1`
    /// under the API secret; the base64 signature is embedded in an
    /// authorization value which is itself base64-encoded and appended as
    /// a query parameter alongside the raw date and host.
    pub fn dictation_url(&self, endpoint: &str) -> Result<String, ClientError> {
        let url = Url::parse(endpoint)
            .map_err(|e| ClientError::Handshake(format!("bad endpoint: {}", e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| ClientError::Handshake("endpoint has no host".to_string()))?;
        let path = url.path();

        let date = self.instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let origin = format!("host: {}\ndate: {}\nGET {} HTTP/1.1", host, date, path);

        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret.as_bytes())
            .map_err(|e| ClientError::Handshake(e.to_string()))?;
        mac.update(origin.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let authorization_origin = format!(
            "api_key=\"{}\", algorithm=\"hmac-sha256\", headers=\"host date request-line\", signature=\"{}\"",
            self.credentials.api_key, signature
        );
        let authorization = BASE64.encode(authorization_origin.as_bytes());

        Ok(format!(
            "{}?authorization={}&date={}&host={}",
            endpoint,
            authorization,
            urlencoding::encode(&date),
            host
        ))
    }

    /// Signed transcription connection URL.
    ///
    /// `signa` is the base64 HMAC-SHA1, under the API key, of the hex MD5
    /// digest of `app_id + ts`; URL-encoded and appended alongside appid
    /// and the unix-seconds timestamp.
    pub fn transcription_url(&self, endpoint: &str) -> Result<String, ClientError> {
        let ts = self.instant.timestamp().to_string();

        let mut hasher = Md5::new();
        hasher.update(self.credentials.app_id.as_bytes());
        hasher.update(ts.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        let mut mac = HmacSha1::new_from_slice(self.credentials.api_key.as_bytes())
            .map_err(|e| ClientError::Handshake(e.to_string()))?;
        mac.update(digest.as_bytes());
        let signa = BASE64.encode(mac.finalize().into_bytes());

        Ok(format!(
            "{}?appid={}&ts={}&signa={}",
            endpoint,
            self.credentials.app_id,
            ts,
            urlencoding::encode(&signa)
        ))
    }
}
