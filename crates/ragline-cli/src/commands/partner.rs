//! Partner credential commands

use super::AppContext;
use anyhow::Result;
use colored::Colorize;
use ragline_client::{PartnerAuthStore, PartnerTokenManager};
use ragline_types::{PartnerAuthConfig, Scopes};
use std::sync::Arc;

fn build_store(ctx: AppContext) -> PartnerAuthStore {
    let manager = Arc::new(PartnerTokenManager::new(
        ctx.transport,
        ctx.storage.clone(),
    ));
    PartnerAuthStore::new(manager, ctx.storage)
}

pub async fn configure() -> Result<()> {
    println!("{}", "🔹 Partner credentials".blue().bold());
    println!();

    let partner_id: String = dialoguer::Input::new()
        .with_prompt("Partner ID")
        .interact_text()?;
    let partner_secret: String = dialoguer::Password::new()
        .with_prompt("Partner secret")
        .interact()?;
    let scopes: String = dialoguer::Input::new()
        .with_prompt("Scopes (space-separated)")
        .allow_empty(true)
        .interact_text()?;
    let audience: String = dialoguer::Input::new()
        .with_prompt("Audience (optional)")
        .allow_empty(true)
        .interact_text()?;

    let config = PartnerAuthConfig {
        partner_id,
        partner_secret,
        scopes: Scopes::One(scopes),
        audience: (!audience.is_empty()).then_some(audience),
    };
    if !config.has_credentials() {
        anyhow::bail!("Partner ID and secret must both be provided");
    }

    let store = build_store(AppContext::init()?);
    store.load().await?;
    store.save_config(config).await?;

    println!();
    println!("{}", "✅ Partner credentials saved".green().bold());
    Ok(())
}

pub async fn token(force: bool) -> Result<()> {
    let store = build_store(AppContext::init()?);
    store.load().await?;

    println!("{}", "🔐 Obtaining partner token...".dimmed());
    match store.fetch_token(force).await {
        Ok(token) => {
            println!();
            println!("{}", "✅ Token ready".green().bold());
            println!();
            println!("   {} {}", token.token_type.dimmed(), token.access_token);
            if let Some(scope) = &token.scope {
                println!("   Scope: {scope}");
            }
            if let Some(expires_at) = token.expires_at {
                println!("   Expires at: {}", format_epoch_ms(expires_at));
            }
            Ok(())
        }
        Err(e) if e.throttled => {
            anyhow::bail!("Token endpoint is throttling requests, please wait")
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn status() -> Result<()> {
    let store = build_store(AppContext::init()?);
    store.load().await?;
    let status = store.status().await;

    println!("{}", "🤝 Partner Status".blue().bold());
    println!();
    println!(
        "   Credentials: {}",
        if status.configured {
            "configured".green()
        } else {
            "not configured".yellow()
        }
    );
    match (status.has_token, status.expired) {
        (false, _) => println!("   Token:       {}", "none cached".dimmed()),
        (true, true) => println!("   Token:       {}", "cached, expired".yellow()),
        (true, false) => println!("   Token:       {}", "cached, valid".green()),
    }
    if let Some(expires_at) = status.expires_at {
        println!("   Expires at:  {}", format_epoch_ms(expires_at));
    }

    Ok(())
}

pub async fn clear() -> Result<()> {
    let store = build_store(AppContext::init()?);
    store.clear().await?;
    println!("{}", "✅ Partner credentials cleared".green());
    Ok(())
}

fn format_epoch_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ms.to_string())
}
