//! Read-only browsing of site content.

use anyhow::Result;
use teamsite_core::api::{AdminsApi, MembersApi, PublicationsApi, SocialLinksApi, TeamsApi};
use teamsite_core::session::SessionManager;
use teamsite_types::{Lang, Member, NewPublication, Publication};

#[derive(clap::Args, Debug)]
pub struct PublicationArgs {
    #[arg(long)]
    title_en: String,
    #[arg(long)]
    title_es: String,
    #[arg(long)]
    content_en: String,
    #[arg(long)]
    content_es: String,
    /// Cover image URL
    #[arg(long)]
    image_url: Option<String>,
}

impl From<PublicationArgs> for NewPublication {
    fn from(args: PublicationArgs) -> Self {
        NewPublication {
            title_en: args.title_en,
            title_es: args.title_es,
            content_en: args.content_en,
            content_es: args.content_es,
            image_url: args.image_url,
            team: None,
        }
    }
}

fn content_for(publication: &Publication, lang: Lang) -> &str {
    let localized = match lang {
        Lang::En => publication.content_en.as_deref(),
        Lang::Es => publication.content_es.as_deref(),
    };
    publication
        .content
        .as_deref()
        .or(localized)
        .unwrap_or_default()
}

pub(crate) fn print_member_line(member: &Member, lang: Lang) {
    let mut flags = Vec::new();
    if member.is_team_leader {
        flags.push("leader");
    }
    if !member.is_active {
        flags.push("inactive");
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", flags.join(", "))
    };
    println!("{:>5}  {}{flags}", member.id, member.display_name(lang));
}

pub(crate) fn print_publication_line(publication: &Publication, lang: Lang) {
    let date = publication
        .publication_date
        .map(|d| d.to_string())
        .unwrap_or_default();
    println!(
        "{:>5}  {:<10}  {}",
        publication.id,
        date,
        publication.title_for(lang)
    );
}

pub async fn teams_list(session: &SessionManager, lang: Lang) -> Result<()> {
    let teams = TeamsApi::new(session.api().clone()).list(lang).await?;
    if teams.is_empty() {
        println!("No teams.");
    }
    for team in &teams {
        println!("{:>5}  {}", team.id, team.name(lang));
    }
    Ok(())
}

pub async fn teams_show(session: &SessionManager, lang: Lang, id: i64) -> Result<()> {
    let team = TeamsApi::new(session.api().clone()).get(id, lang).await?;
    println!("{}", team.name(lang));
    println!("  English: {}", team.name_en);
    println!("  Spanish: {}", team.name_es);
    if let Some(url) = &team.image_url {
        println!("  Image: {url}");
    }
    Ok(())
}

pub async fn teams_members(session: &SessionManager, lang: Lang, id: i64) -> Result<()> {
    let members = TeamsApi::new(session.api().clone()).members(id, lang).await?;
    if members.is_empty() {
        println!("No members in team #{id}.");
    }
    for member in &members {
        print_member_line(member, lang);
    }
    Ok(())
}

pub async fn members_list(session: &SessionManager, lang: Lang, team: Option<i64>) -> Result<()> {
    let members = MembersApi::new(session.api().clone())
        .list(lang, team)
        .await?;
    if members.is_empty() {
        println!("No members.");
    }
    for member in &members {
        print_member_line(member, lang);
    }
    Ok(())
}

pub async fn members_show(session: &SessionManager, lang: Lang, id: i64) -> Result<()> {
    let member = MembersApi::new(session.api().clone()).get(id, lang).await?;
    println!("{}", member.display_name(lang));
    if let Some(team) = &member.team_name {
        println!("  Team: {team}");
    }
    for (label, value) in [
        ("Career", &member.career),
        ("Role", &member.role),
        ("Charge", &member.charge),
    ] {
        if !value.is_empty() {
            println!("  {label}: {value}");
        }
    }
    if !member.is_active {
        println!("  (inactive)");
    }
    Ok(())
}

pub async fn members_links(session: &SessionManager, id: i64) -> Result<()> {
    let links = MembersApi::new(session.api().clone())
        .social_links(id)
        .await?;
    if links.is_empty() {
        println!("No social links.");
    }
    for link in &links {
        println!("{}", link.link);
    }
    Ok(())
}

pub async fn publications_list(
    session: &SessionManager,
    lang: Lang,
    team: Option<i64>,
) -> Result<()> {
    let publications = PublicationsApi::new(session.api().clone())
        .list(lang, team)
        .await?;
    if publications.is_empty() {
        println!("No publications.");
    }
    for publication in &publications {
        print_publication_line(publication, lang);
    }
    Ok(())
}

pub async fn publications_show(session: &SessionManager, lang: Lang, id: i64) -> Result<()> {
    let publication = PublicationsApi::new(session.api().clone())
        .get(id, lang)
        .await?;
    println!("{}", publication.title_for(lang));
    if let Some(date) = publication.publication_date {
        println!("  Date: {date}");
    }
    if let Some(author) = &publication.author_name {
        println!("  Author: {author}");
    }
    if let Some(team) = &publication.team_name {
        println!("  Team: {team}");
    }
    println!();
    println!("{}", content_for(&publication, lang));
    Ok(())
}

/// Admin listing requires a session, so stored tokens are restored first.
pub async fn admins_list(session: &SessionManager) -> Result<()> {
    session.restore();
    let admins = AdminsApi::new(session.api().clone()).list().await?;
    if admins.is_empty() {
        println!("No administrators.");
    }
    for admin in &admins {
        match &admin.member_name {
            Some(name) => println!("{:>5}  {} <{}>", admin.id, name, admin.email),
            None => println!("{:>5}  {}", admin.id, admin.email),
        }
    }
    Ok(())
}
