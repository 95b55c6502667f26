//! Member dashboard: the signed-in member's team publications and, for team
//! leaders, the team roster with activation controls.

use teamsite_types::{Lang, Member, NewPublication, Profile, Publication};
use tracing::{info, warn};

use crate::api::{ApiError, ApiResult, MembersApi, PublicationsApi};
use crate::session::SessionManager;

/// Everything the dashboard shows on load.
#[derive(Debug, Clone)]
pub struct DashboardData {
    pub user: Profile,
    pub publications: Vec<Publication>,
    /// Empty unless the user is a team leader.
    pub team_members: Vec<Member>,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    session: SessionManager,
    lang: Lang,
    publications: PublicationsApi,
    members: MembersApi,
}

impl Dashboard {
    pub fn new(session: SessionManager, lang: Lang) -> Self {
        let publications = PublicationsApi::new(session.api().clone());
        let members = MembersApi::new(session.api().clone());
        Self {
            session,
            lang,
            publications,
            members,
        }
    }

    fn current_user(&self) -> ApiResult<Profile> {
        self.session.user().ok_or_else(ApiError::not_authenticated)
    }

    /// Loads the team's publications, plus the roster for team leaders.
    ///
    /// # Errors
    /// Returns `NotAuthenticated` without a profile, or the first request error.
    pub async fn load(&self) -> ApiResult<DashboardData> {
        let user = self.current_user()?;
        let publications = self.publications.list(self.lang, Some(user.team_id)).await?;

        let team_members = if user.is_team_leader {
            self.members.list(self.lang, Some(user.team_id)).await?
        } else {
            Vec::new()
        };

        Ok(DashboardData {
            user,
            publications,
            team_members,
        })
    }

    /// Creates a publication for the user's team.
    ///
    /// # Errors
    /// Returns `NotAuthenticated` without a profile, or the backend error.
    pub async fn create_publication(&self, mut draft: NewPublication) -> ApiResult<Publication> {
        let user = self.current_user()?;
        draft.team = Some(user.team_id);
        match self.publications.create(&draft).await {
            Ok(publication) => {
                info!(publication_id = publication.id, "Publication created");
                Ok(publication)
            }
            Err(e) => {
                warn!("Failed to create publication: {e}");
                Err(e.with_fallback_message("Failed to create publication"))
            }
        }
    }

    /// # Errors
    /// Returns `NotAuthenticated` without a profile, or the backend error.
    pub async fn delete_publication(&self, id: i64) -> ApiResult<()> {
        self.current_user()?;
        self.publications.delete(id).await.map_err(|e| {
            warn!("Failed to delete publication {id}: {e}");
            e.with_fallback_message("Failed to delete publication. You may not have permission.")
        })
    }

    /// Activates or deactivates a team member.
    ///
    /// Only offered to team leaders; the backend makes the final decision.
    ///
    /// # Errors
    /// Returns `NotPermitted` for non-leaders without calling the backend.
    pub async fn set_member_active(&self, member_id: i64, is_active: bool) -> ApiResult<Member> {
        let user = self.current_user()?;
        if !user.is_team_leader {
            return Err(ApiError::not_permitted(
                "Only team leaders can change member status",
            ));
        }

        self.members
            .set_active(member_id, is_active)
            .await
            .map_err(|e| {
                warn!("Failed to update member {member_id}: {e}");
                e.with_fallback_message("Failed to update member status.")
            })
    }

    /// Flips a member's active flag.
    ///
    /// # Errors
    /// Same as [`Dashboard::set_member_active`].
    pub async fn toggle_member(&self, member: &Member) -> ApiResult<Member> {
        self.set_member_active(member.id, !member.is_active).await
    }
}
