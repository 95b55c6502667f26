//! Auth command handlers.

use std::fmt::Display;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use teamsite_core::config::paths;
use teamsite_core::session::{SessionManager, SessionStatus};
use teamsite_core::storage::mask_token;
use teamsite_core::validation::{
    ChangePasswordForm, RegistrationForm, ValidationErrors, availability_hint,
};
use teamsite_types::Lang;

use super::{prompt, require_user};

#[derive(clap::Args, Debug)]
pub struct RegisterArgs {
    /// Account email
    #[arg(long)]
    email: String,
    /// Display name in English
    #[arg(long)]
    name_en: String,
    /// Display name in Spanish
    #[arg(long)]
    name_es: String,
    /// Team to join
    #[arg(long, value_name = "TEAM_ID")]
    team: Option<i64>,
    #[arg(long, default_value = "")]
    career: String,
    #[arg(long, default_value = "")]
    role: String,
    #[arg(long, default_value = "")]
    charge: String,
    /// Profile picture URL
    #[arg(long, default_value = "")]
    image_url: String,
    /// Password (read twice from stdin if omitted)
    #[arg(long, env = "TEAMSITE_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

fn print_field_errors<F: Display, M: Display>(errors: impl IntoIterator<Item = (F, M)>) {
    for (field, message) in errors {
        eprintln!("  {field}: {message}");
    }
}

fn report_invalid(errors: &ValidationErrors) {
    print_field_errors(errors.iter());
}

pub async fn login(
    session: &SessionManager,
    lang: Lang,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    let profile = session.login(email.trim(), &password).await?;

    println!(
        "✓ Logged in as {} <{}>",
        profile.display_name(lang),
        profile.email.as_deref().unwrap_or(email.trim())
    );
    println!("  Tokens saved to: {}", paths::tokens_path().display());
    Ok(())
}

pub async fn register(session: &SessionManager, lang: Lang, args: RegisterArgs) -> Result<()> {
    let (password, confirm_password) = match args.password {
        Some(password) => (password.clone(), password),
        None => (prompt("Password: ")?, prompt("Confirm password: ")?),
    };

    let verdict = if args.email.contains('@') {
        let verdict = session.check_email_availability(&args.email).await;
        if let Some(hint) = availability_hint(&verdict) {
            eprintln!("{hint}");
        }
        Some(verdict)
    } else {
        None
    };

    let form = RegistrationForm {
        email: args.email,
        password,
        confirm_password,
        name_en: args.name_en,
        name_es: args.name_es,
        team_id: args.team,
        career: args.career,
        role: args.role,
        charge: args.charge,
        image_url: args.image_url,
    };

    let request = match form.validate(verdict.as_ref()) {
        Ok(request) => request,
        Err(errors) => {
            report_invalid(&errors);
            bail!("Registration form has errors");
        }
    };

    let profile = match session.register(&request).await {
        Ok(profile) => profile,
        Err(e) => {
            print_field_errors(e.field_errors());
            return Err(e.into());
        }
    };

    println!(
        "✓ Registered and logged in as {} <{}>",
        profile.display_name(lang),
        request.email
    );
    println!("  Tokens saved to: {}", paths::tokens_path().display());
    Ok(())
}

pub async fn logout(session: &SessionManager) -> Result<()> {
    session.restore();
    let had_tokens = !session.snapshot().is_empty();

    session.logout().await;

    if had_tokens {
        println!("✓ Logged out");
        println!("  Tokens removed from: {}", paths::tokens_path().display());
    } else {
        println!("Not logged in (no stored tokens).");
    }
    Ok(())
}

pub async fn whoami(session: &SessionManager, lang: Lang) -> Result<()> {
    let Some(profile) = session.resume().await? else {
        println!("Not logged in.");
        return Ok(());
    };

    println!("{}", profile.display_name(lang));
    if let Some(email) = &profile.email {
        println!("  Email: {email}");
    }
    match &profile.team_name {
        Some(team) => println!("  Team: {team} (#{})", profile.team_id),
        None => println!("  Team: #{}", profile.team_id),
    }
    if !profile.role.is_empty() {
        println!("  Role: {}", profile.role);
    }
    println!(
        "  Team leader: {}",
        if profile.is_team_leader { "yes" } else { "no" }
    );
    Ok(())
}

pub async fn refresh(session: &SessionManager) -> Result<()> {
    session.restore();
    if session.snapshot().refresh_token.is_none() {
        bail!("Not logged in. Run `teamsite login` first.");
    }

    let access = session.refresh_access_token().await?;
    println!("✓ Access token refreshed (token: {})", mask_token(&access));
    Ok(())
}

pub async fn check_email(session: &SessionManager, email: &str) -> Result<()> {
    let verdict = session.check_email_availability(email).await;
    if verdict.can_register {
        println!("✓ {email} can register");
    } else {
        println!("✗ {email} cannot register");
        if let Some(hint) = availability_hint(&verdict) {
            println!("  {hint}");
        }
    }
    Ok(())
}

pub async fn change_password(session: &SessionManager) -> Result<()> {
    require_user(session).await?;

    let form = ChangePasswordForm {
        old_password: prompt("Current password: ")?,
        new_password: prompt("New password: ")?,
        confirm_password: prompt("Confirm new password: ")?,
    };
    if let Err(errors) = form.validate() {
        report_invalid(&errors);
        bail!("Password change form has errors");
    }

    let message = session
        .change_password(&form.old_password, &form.new_password)
        .await?;
    if message.is_empty() {
        println!("✓ Password changed");
    } else {
        println!("✓ {message}");
    }
    Ok(())
}

pub async fn keepalive(session: &SessionManager, interval: Duration) -> Result<()> {
    let profile = require_user(session).await?;
    println!(
        "Keeping session for {} alive (refresh every {}s). Press Ctrl+C to stop.",
        profile.name,
        interval.as_secs()
    );

    let mut status = session.subscribe();
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listen for Ctrl+C")?;
                println!();
                println!("Stopped.");
                return Ok(());
            }
            changed = status.changed() => {
                changed.context("session closed")?;
                if *status.borrow_and_update() == SessionStatus::Anonymous {
                    bail!("Session ended. Run `teamsite login` again.");
                }
            }
        }
    }
}
