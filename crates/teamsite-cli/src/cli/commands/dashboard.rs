use anyhow::{Result, bail};
use teamsite_core::dashboard::Dashboard;
use teamsite_core::session::SessionManager;
use teamsite_core::validation::validate_publication;
use teamsite_types::{Lang, NewPublication};

use super::content::{PublicationArgs, print_member_line, print_publication_line};
use super::require_user;

pub async fn show(session: &SessionManager, lang: Lang) -> Result<()> {
    require_user(session).await?;
    let data = Dashboard::new(session.clone(), lang).load().await?;

    let user = &data.user;
    print!("{}", user.display_name(lang));
    if let Some(team) = &user.team_name {
        print!(" · {team}");
    }
    if user.is_team_leader {
        print!(" · team leader");
    }
    println!();

    println!();
    println!("Publications ({})", data.publications.len());
    for publication in &data.publications {
        print_publication_line(publication, lang);
    }

    if user.is_team_leader {
        println!();
        println!("Team members ({})", data.team_members.len());
        for member in &data.team_members {
            print_member_line(member, lang);
        }
    }
    Ok(())
}

pub async fn set_member_active(
    session: &SessionManager,
    lang: Lang,
    id: i64,
    is_active: bool,
) -> Result<()> {
    require_user(session).await?;
    let member = Dashboard::new(session.clone(), lang)
        .set_member_active(id, is_active)
        .await?;
    let state = if member.is_active {
        "active"
    } else {
        "inactive"
    };
    println!("✓ {} is now {state}", member.display_name(lang));
    Ok(())
}

pub async fn create_publication(
    session: &SessionManager,
    lang: Lang,
    args: PublicationArgs,
) -> Result<()> {
    let draft = NewPublication::from(args);
    if let Err(errors) = validate_publication(&draft) {
        for (field, message) in errors.iter() {
            eprintln!("  {field}: {message}");
        }
        bail!("Publication has errors");
    }

    require_user(session).await?;
    let publication = Dashboard::new(session.clone(), lang)
        .create_publication(draft)
        .await?;
    println!(
        "✓ Created publication #{}: {}",
        publication.id,
        publication.title_for(lang)
    );
    Ok(())
}

pub async fn delete_publication(session: &SessionManager, lang: Lang, id: i64) -> Result<()> {
    require_user(session).await?;
    Dashboard::new(session.clone(), lang)
        .delete_publication(id)
        .await?;
    println!("✓ Deleted publication #{id}");
    Ok(())
}
