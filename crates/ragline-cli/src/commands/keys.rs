//! API-key commands

use super::AppContext;
use anyhow::Result;
use colored::Colorize;
use ragline_client::ApiKeyClient;
use ragline_types::{
    ApiKeyCreate, ApiKeyEventFilters, ApiKeyFilters, ApiKeyRecord, ApiKeyRevokeRequest,
    ApiKeyStatus,
};

pub async fn list(
    owner: Option<String>,
    scope: Option<String>,
    active: Option<bool>,
    search: Option<String>,
    limit: Option<u32>,
) -> Result<()> {
    let ctx = AppContext::init()?;
    let client = ApiKeyClient::new(ctx.transport);

    let page = client
        .list_api_keys(&ApiKeyFilters {
            search,
            owner,
            scope,
            is_active: active,
            limit,
            offset: None,
        })
        .await?;

    println!("{}", "🔑 API Keys".blue().bold());
    println!();
    if page.results.is_empty() {
        println!("   (No API keys)");
    } else {
        for key in &page.results {
            print_key(key);
        }
        println!();
        println!("   {} of {} shown", page.results.len(), page.count);
    }

    Ok(())
}

pub async fn create(owner: String, scopes: Vec<String>, rate_limit: Option<i64>) -> Result<()> {
    let ctx = AppContext::init()?;
    let client = ApiKeyClient::new(ctx.transport);

    let created = client
        .create_api_key(&ApiKeyCreate {
            owner,
            scope: scopes,
            rate_limit,
            expires_at: None,
        })
        .await?;

    println!("{}", "✅ API key created".green().bold());
    println!();
    print_key(&created.record);
    println!();
    println!("   Secret: {}", created.api_key.yellow().bold());
    println!("   {}", "Store it now; it will not be shown again.".dimmed());

    Ok(())
}

pub async fn rotate(id: &str) -> Result<()> {
    let ctx = AppContext::init()?;
    let client = ApiKeyClient::new(ctx.transport);

    let rotated = client.rotate_api_key(id, None).await?;

    println!("{}", "✅ API key rotated".green().bold());
    println!();
    println!("   New secret: {}", rotated.api_key.yellow().bold());
    println!("   {}", "Store it now; it will not be shown again.".dimmed());

    Ok(())
}

pub async fn revoke(id: &str, reason: Option<String>) -> Result<()> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!("Revoke key {id}? This cannot be undone"))
        .default(false)
        .interact()?;
    if !confirmed {
        println!("{}", "⚠️  Aborted".yellow());
        return Ok(());
    }

    let ctx = AppContext::init()?;
    let client = ApiKeyClient::new(ctx.transport);

    let record = client
        .revoke_api_key(id, Some(&ApiKeyRevokeRequest { reason }))
        .await?;

    println!("{}", "✅ API key revoked".green().bold());
    println!();
    print_key(&record);

    Ok(())
}

pub async fn events(
    key: Option<String>,
    event_type: Option<String>,
    limit: Option<u32>,
) -> Result<()> {
    let ctx = AppContext::init()?;
    let client = ApiKeyClient::new(ctx.transport);

    let page = client
        .list_api_key_events(&ApiKeyEventFilters {
            api_key_id: key,
            event_type,
            ip_address: None,
            limit,
            offset: None,
        })
        .await?;

    println!("{}", "📜 Key Events".blue().bold());
    println!();
    if page.results.is_empty() {
        println!("   (No events)");
    } else {
        for event in &page.results {
            let when = event
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "   {} {} {} {}",
                when.dimmed(),
                event.event_type.cyan(),
                event.api_key_id,
                event.ip_address.as_deref().unwrap_or("").dimmed()
            );
        }
    }

    Ok(())
}

fn print_key(key: &ApiKeyRecord) {
    let status = key.effective_status();
    let marker = match status {
        ApiKeyStatus::Active => "✓".green(),
        ApiKeyStatus::Inactive => "○".yellow(),
        ApiKeyStatus::Revoked => "❌".red(),
    };
    let rate = key
        .rate_limit
        .map(|r| format!("{r}/min"))
        .unwrap_or_else(|| "unlimited".to_string());
    println!(
        "   {} {} {} [{}] {} ({})",
        marker,
        key.id.cyan(),
        key.owner,
        key.scope,
        status,
        rate
    );
}
