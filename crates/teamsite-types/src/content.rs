//! Public site content: teams, publications, social links, admins.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::Lang;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name_en: String,
    pub name_es: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Team {
    pub fn name(&self, lang: Lang) -> &str {
        match lang {
            Lang::En => &self.name_en,
            Lang::Es => &self.name_es,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTeam {
    pub name_en: String,
    pub name_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Body for creating or replacing a member record (admin surface).
#[derive(Debug, Clone, Serialize)]
pub struct NewMember {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub career_en: String,
    pub career_es: String,
    pub role_en: String,
    pub role_es: String,
    pub charge_en: String,
    pub charge_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub team: i64,
    pub is_team_leader: bool,
}

/// A publication.
///
/// Localized list/detail responses carry `title`/`content`; write responses
/// carry the per-language fields instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub title_en: Option<String>,
    #[serde(default)]
    pub title_es: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub content_en: Option<String>,
    #[serde(default)]
    pub content_es: Option<String>,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default, alias = "team")]
    pub team_id: Option<i64>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

impl Publication {
    /// Title in the requested language, or whichever variant is present.
    pub fn title_for(&self, lang: Lang) -> &str {
        let localized = match lang {
            Lang::En => self.title_en.as_deref(),
            Lang::Es => self.title_es.as_deref(),
        };
        self.title
            .as_deref()
            .or(localized)
            .or(self.title_en.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPublication {
    pub title_en: String,
    pub title_es: String,
    pub content_en: String,
    pub content_es: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub id: i64,
    pub link: String,
    pub icon_url: String,
    #[serde(alias = "member")]
    pub member_id: i64,
    #[serde(default)]
    pub member_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSocialLink {
    pub link: String,
    pub icon_url: String,
    pub member: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: i64,
    #[serde(default)]
    pub member: Option<i64>,
    #[serde(default)]
    pub member_name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAdmin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<i64>,
    pub email: String,
}
