use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::errors::{EngagementError, Result};

/// 可被点赞/分享/浏览的内容类型，每种类型对应一张内容表
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContentType {
    Post,
    Article,
    Comment,
    Video,
    Event,
}

impl ContentType {
    /// Parse a content type from a route segment, accepting plural forms
    /// (`posts`, `articles`, ...).
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        trimmed
            .parse::<ContentType>()
            .or_else(|_| {
                trimmed
                    .strip_suffix('s')
                    .ok_or(strum::ParseError::VariantNotFound)
                    .and_then(|singular| singular.parse::<ContentType>())
            })
            .map_err(|_| {
                EngagementError::validation(format!("Unknown content type: '{}'", value))
            })
    }

    /// 内容表名
    pub fn table_name(&self) -> &'static str {
        match self {
            ContentType::Post => "posts",
            ContentType::Article => "articles",
            ContentType::Comment => "comments",
            ContentType::Video => "videos",
            ContentType::Event => "events",
        }
    }
}

/// 账本中记录的两种互动
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EngagementAction {
    Like,
    Share,
}

impl EngagementAction {
    /// `liked` / `shared`
    pub fn engaged_verb(&self) -> &'static str {
        match self {
            EngagementAction::Like => "liked",
            EngagementAction::Share => "shared",
        }
    }

    /// `unliked` / `unshared`
    pub fn disengaged_verb(&self) -> &'static str {
        match self {
            EngagementAction::Like => "unliked",
            EngagementAction::Share => "unshared",
        }
    }

    /// 对应的反规范化计数列
    pub fn counter(&self) -> CounterColumn {
        match self {
            EngagementAction::Like => CounterColumn::LikeCount,
            EngagementAction::Share => CounterColumn::SharedCount,
        }
    }
}

/// 内容表上的反规范化计数列
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CounterColumn {
    LikeCount,
    SharedCount,
    ViewCount,
}

/// 内容行（任意内容类型）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    pub content_type: ContentType,
    pub title: String,
    pub body: Option<String>,
    pub like_count: i64,
    pub shared_count: i64,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

/// 新建内容请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContent {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}
