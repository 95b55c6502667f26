//! Typed CRUD resources: teams, members, publications, social links, admins.
//!
//! Every call goes through the shared [`ApiClient`], so the session's bearer
//! token is attached automatically.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use teamsite_types::{
    Admin, Lang, Member, MemberStatusUpdate, NewAdmin, NewMember, NewPublication, NewSocialLink,
    NewTeam, Publication, SocialLink, Team,
};

use super::{ApiClient, ApiResult};

type Query = Vec<(&'static str, String)>;

fn lang_query(lang: Lang) -> Query {
    vec![("lang", lang.as_str().to_string())]
}

/// One REST collection rooted at `base` (e.g. `teams/`).
#[derive(Debug, Clone)]
struct Collection {
    api: ApiClient,
    base: &'static str,
}

impl Collection {
    fn new(api: ApiClient, base: &'static str) -> Self {
        Self { api, base }
    }

    fn item_path(&self, id: i64) -> String {
        format!("{}{id}/", self.base)
    }

    async fn list<T: DeserializeOwned>(&self, query: &Query) -> ApiResult<Vec<T>> {
        self.api.get_json(self.base, query).await
    }

    async fn get<T: DeserializeOwned>(&self, id: i64, query: &Query) -> ApiResult<T> {
        self.api.get_json(&self.item_path(id), query).await
    }

    async fn create<B: Serialize, T: DeserializeOwned>(&self, body: &B) -> ApiResult<T> {
        self.api.send_json(Method::POST, self.base, body).await
    }

    async fn update<B: Serialize, T: DeserializeOwned>(&self, id: i64, body: &B) -> ApiResult<T> {
        self.api
            .send_json(Method::PUT, &self.item_path(id), body)
            .await
    }

    async fn delete(&self, id: i64) -> ApiResult<()> {
        self.api.delete(&self.item_path(id)).await
    }
}

#[derive(Debug, Clone)]
pub struct TeamsApi {
    items: Collection,
}

impl TeamsApi {
    pub fn new(api: ApiClient) -> Self {
        Self {
            items: Collection::new(api, "teams/"),
        }
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn list(&self, lang: Lang) -> ApiResult<Vec<Team>> {
        self.items.list(&lang_query(lang)).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn get(&self, id: i64, lang: Lang) -> ApiResult<Team> {
        self.items.get(id, &lang_query(lang)).await
    }

    /// Members of one team, localized.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn members(&self, id: i64, lang: Lang) -> ApiResult<Vec<Member>> {
        let path = format!("{}members/", self.items.item_path(id));
        self.items.api.get_json(&path, &lang_query(lang)).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn create(&self, team: &NewTeam) -> ApiResult<Team> {
        self.items.create(team).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn update(&self, id: i64, team: &NewTeam) -> ApiResult<Team> {
        self.items.update(id, team).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.items.delete(id).await
    }
}

#[derive(Debug, Clone)]
pub struct MembersApi {
    items: Collection,
}

impl MembersApi {
    pub fn new(api: ApiClient) -> Self {
        Self {
            items: Collection::new(api, "members/"),
        }
    }

    /// Lists members, optionally only those of one team.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn list(&self, lang: Lang, team: Option<i64>) -> ApiResult<Vec<Member>> {
        let mut query = lang_query(lang);
        if let Some(team) = team {
            query.push(("team", team.to_string()));
        }
        self.items.list(&query).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn get(&self, id: i64, lang: Lang) -> ApiResult<Member> {
        self.items.get(id, &lang_query(lang)).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn social_links(&self, id: i64) -> ApiResult<Vec<SocialLink>> {
        let path = format!("{}social-links/", self.items.item_path(id));
        self.items.api.get_json(&path, &[]).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn create(&self, member: &NewMember) -> ApiResult<Member> {
        self.items.create(member).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn update(&self, id: i64, member: &NewMember) -> ApiResult<Member> {
        self.items.update(id, member).await
    }

    /// `PATCH members/{id}/ {is_active}`.
    ///
    /// The backend decides whether the caller may do this; a 403 comes back
    /// as an `HttpStatus` error. The echoed member carries no `is_active`,
    /// so the returned value reports the state that was applied.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn set_active(&self, id: i64, is_active: bool) -> ApiResult<Member> {
        let mut member: Member = self
            .items
            .api
            .send_json(
                Method::PATCH,
                &self.items.item_path(id),
                &MemberStatusUpdate { is_active },
            )
            .await?;
        member.is_active = is_active;
        Ok(member)
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.items.delete(id).await
    }
}

#[derive(Debug, Clone)]
pub struct PublicationsApi {
    items: Collection,
}

impl PublicationsApi {
    pub fn new(api: ApiClient) -> Self {
        Self {
            items: Collection::new(api, "publications/"),
        }
    }

    /// Lists publications, optionally only those of one team.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn list(&self, lang: Lang, team: Option<i64>) -> ApiResult<Vec<Publication>> {
        let mut query = lang_query(lang);
        if let Some(team) = team {
            query.push(("team", team.to_string()));
        }
        self.items.list(&query).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn get(&self, id: i64, lang: Lang) -> ApiResult<Publication> {
        self.items.get(id, &lang_query(lang)).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn create(&self, publication: &NewPublication) -> ApiResult<Publication> {
        self.items.create(publication).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn update(&self, id: i64, publication: &NewPublication) -> ApiResult<Publication> {
        self.items.update(id, publication).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.items.delete(id).await
    }
}

#[derive(Debug, Clone)]
pub struct SocialLinksApi {
    items: Collection,
}

impl SocialLinksApi {
    pub fn new(api: ApiClient) -> Self {
        Self {
            items: Collection::new(api, "social-links/"),
        }
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn list(&self, member: Option<i64>) -> ApiResult<Vec<SocialLink>> {
        let query: Query = member
            .map(|id| vec![("member", id.to_string())])
            .unwrap_or_default();
        self.items.list(&query).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn get(&self, id: i64) -> ApiResult<SocialLink> {
        self.items.get(id, &Vec::new()).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn create(&self, link: &NewSocialLink) -> ApiResult<SocialLink> {
        self.items.create(link).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn update(&self, id: i64, link: &NewSocialLink) -> ApiResult<SocialLink> {
        self.items.update(id, link).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.items.delete(id).await
    }
}

#[derive(Debug, Clone)]
pub struct AdminsApi {
    items: Collection,
}

impl AdminsApi {
    pub fn new(api: ApiClient) -> Self {
        Self {
            items: Collection::new(api, "admins/"),
        }
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn list(&self) -> ApiResult<Vec<Admin>> {
        self.items.list(&Vec::new()).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn get(&self, id: i64) -> ApiResult<Admin> {
        self.items.get(id, &Vec::new()).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn create(&self, admin: &NewAdmin) -> ApiResult<Admin> {
        self.items.create(admin).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn update(&self, id: i64, admin: &NewAdmin) -> ApiResult<Admin> {
        self.items.update(id, admin).await
    }

    /// # Errors
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.items.delete(id).await
    }
}
