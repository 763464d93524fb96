//! Session commands

use super::AppContext;
use anyhow::Result;
use colored::Colorize;
use ragline_client::SessionStore;
use ragline_core::ErrorCode;
use ragline_types::LoginRequest;

pub async fn login(username: Option<String>, password: Option<String>) -> Result<()> {
    println!("{}", "🔹 Login to Ragline".blue().bold());
    println!();

    let username: String = match username {
        Some(u) => u,
        None => dialoguer::Input::new().with_prompt("Username").interact_text()?,
    };
    let password: String = match password {
        Some(p) => p,
        None => dialoguer::Password::new().with_prompt("Password").interact()?,
    };

    println!();
    println!("{}", "🔐 Authenticating...".dimmed());

    let ctx = AppContext::init()?;
    let store = SessionStore::new(ctx.transport);

    match store.login(&LoginRequest { username, password }).await {
        Ok(user) => {
            println!();
            println!("{}", "✅ Login successful!".green().bold());
            println!();
            println!(
                "   Welcome, {}!",
                user.name.as_deref().unwrap_or(&user.username).cyan()
            );
            Ok(())
        }
        Err(e) if e.throttled => {
            anyhow::bail!("Too many attempts, please wait before retrying")
        }
        Err(e) if e.code == ErrorCode::Unauthorized => {
            anyhow::bail!("Invalid username or password")
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout() -> Result<()> {
    let ctx = AppContext::init()?;
    let store = SessionStore::new(ctx.transport);

    // Resets locally regardless of the network outcome
    store.logout().await;

    println!("{}", "✅ Logged out successfully".green());
    Ok(())
}

pub async fn whoami() -> Result<()> {
    let ctx = AppContext::init()?;
    let store = SessionStore::new(ctx.transport);

    match store.load_profile().await? {
        Some(user) => {
            println!("{}", "👤 User Info".blue().bold());
            println!();
            println!("   ID:       {}", user.id.to_string().dimmed());
            println!("   Username: {}", user.username.cyan());
            if let Some(email) = &user.email {
                println!("   Email:    {}", email);
            }
            println!("   Role:     {}", user.role);
        }
        None => {
            println!("{}", "⚠️  Not logged in".yellow());
        }
    }

    Ok(())
}
