use serde::{Deserialize, Serialize};

use crate::Lang;

fn default_active() -> bool {
    true
}

/// A team member as returned by the backend.
///
/// List endpoints return the localized shape (`career`, `role`, `charge`,
/// `team_id`); write endpoints echo the serializer shape (`team`). Both
/// deserialize into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_es: Option<String>,
    /// Only present on authenticated responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub career: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub charge: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(alias = "team")]
    pub team_id: i64,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub is_team_leader: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// The signed-in member. Read-only cached copy of the backend record.
pub type Profile = Member;

impl Member {
    /// Returns the display name for a language, falling back to `name`.
    pub fn display_name(&self, lang: Lang) -> &str {
        let localized = match lang {
            Lang::En => self.name_en.as_deref(),
            Lang::Es => self.name_es.as_deref(),
        };
        localized
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }
}

/// `{ "member": ... }` wrapper used by `auth/me/`.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberEnvelope {
    pub member: Member,
}

/// Body for toggling a member's active flag.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MemberStatusUpdate {
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_member_from_localized_list_shape() {
        let member: Member = serde_json::from_value(json!({
            "id": 7,
            "name": "Ana",
            "career": "Physics",
            "role": "Developer",
            "charge": "Backend",
            "image_url": null,
            "team_id": 2,
            "team_name": "Robotics",
            "is_team_leader": true
        }))
        .unwrap();

        assert_eq!(member.team_id, 2);
        assert!(member.is_team_leader);
        assert!(member.is_active);
        assert_eq!(member.email, None);
    }

    #[test]
    fn test_member_from_serializer_shape_uses_team_alias() {
        let member: Member = serde_json::from_value(json!({
            "id": 3,
            "name": "Luis",
            "team": 5,
            "career_en": "Math"
        }))
        .unwrap();

        assert_eq!(member.team_id, 5);
        assert_eq!(member.career, "");
    }

    #[test]
    fn test_display_name_falls_back_to_name() {
        let member = Member {
            id: 1,
            name: "Juan Perez".to_string(),
            name_en: Some("John Perez".to_string()),
            name_es: Some("  ".to_string()),
            email: None,
            career: String::new(),
            role: String::new(),
            charge: String::new(),
            image_url: None,
            team_id: 1,
            team_name: None,
            is_team_leader: false,
            is_active: true,
        };

        assert_eq!(member.display_name(Lang::En), "John Perez");
        assert_eq!(member.display_name(Lang::Es), "Juan Perez");
    }
}
