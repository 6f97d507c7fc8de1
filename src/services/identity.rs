//! Identity fingerprint resolution
//!
//! Anonymous clients are identified by (identity_key, user_agent). The key is
//! the client-supplied fingerprint when present, otherwise the network IP.
//! Both parts are truncated to the ledger column widths before comparison.
//! Collisions (shared NAT) and fragmentation (rotated fingerprints) are
//! accepted.

use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};

use crate::config::EngagementConfig;
use crate::errors::{EngagementError, Result};
use crate::storage::{ContentType, EngagementAction, NaturalKey};
use crate::utils::ip::extract_client_ip;
use crate::utils::truncate_chars;

pub const FINGERPRINT_HEADER: &str = "x-client-fingerprint";
pub const COUNTRY_HEADER: &str = "cf-ipcountry";
pub const CITY_HEADER: &str = "x-geo-city";

/// 调用方提供的客户端信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: String,
    #[serde(default)]
    pub fingerprint: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl ClientInfo {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.into(),
            ..Default::default()
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn with_geo(mut self, country: Option<String>, city: Option<String>) -> Self {
        self.country = country;
        self.city = city;
        self
    }

    fn fingerprint(&self) -> Option<&str> {
        self.fingerprint
            .as_deref()
            .map(str::trim)
            .filter(|fp| !fp.is_empty())
    }

    /// 至少需要 IP 或指纹之一
    pub fn validate(&self) -> Result<()> {
        if self.ip.trim().is_empty() && self.fingerprint().is_none() {
            return Err(EngagementError::validation(
                "Client identity requires an IP address or a fingerprint",
            ));
        }
        Ok(())
    }

    /// 指纹优先，否则使用 IP；截断到 max_len 个字符
    pub fn identity_key(&self, max_len: usize) -> String {
        let raw = self.fingerprint().unwrap_or_else(|| self.ip.trim());
        truncate_chars(raw, max_len).to_string()
    }

    pub fn truncated_user_agent(&self, max_len: usize) -> String {
        truncate_chars(&self.user_agent, max_len).to_string()
    }

    /// 从 HTTP 请求提取客户端信息
    ///
    /// 地理位置只读取上游（CDN/网关）注入的请求头，不做查询。
    pub fn from_request(req: &HttpRequest) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        Self {
            ip: extract_client_ip(req).unwrap_or_default(),
            user_agent: header("user-agent").unwrap_or_default(),
            fingerprint: header(FINGERPRINT_HEADER),
            // Cloudflare 用 XX 表示未知国家
            country: header(COUNTRY_HEADER).filter(|c| c != "XX"),
            city: header(CITY_HEADER),
        }
    }
}

/// 把 ClientInfo 映射为账本自然键
#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver {
    identity_max_len: usize,
    user_agent_max_len: usize,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::from(&EngagementConfig::default())
    }
}

impl From<&EngagementConfig> for IdentityResolver {
    fn from(config: &EngagementConfig) -> Self {
        Self {
            identity_max_len: config.identity_max_len,
            user_agent_max_len: config.user_agent_max_len,
        }
    }
}

impl IdentityResolver {
    pub fn resolve(
        &self,
        client: &ClientInfo,
        content_type: ContentType,
        content_id: i64,
        action: EngagementAction,
    ) -> Result<NaturalKey> {
        client.validate()?;
        Ok(NaturalKey {
            identity_key: client.identity_key(self.identity_max_len),
            user_agent: client.truncated_user_agent(self.user_agent_max_len),
            content_type,
            content_id,
            action,
        })
    }
}
