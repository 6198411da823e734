//! Referral code commands

use crate::domain::ReferralId;
use crate::services::CreateReferral;
use crate::state::SharedState;

const CLI_ACTOR: &str = "cli";

pub async fn cmd_referral_create(
    shared: &SharedState,
    code: String,
    description: Option<String>,
    limit: Option<i64>,
    expires: Option<String>,
) -> anyhow::Result<()> {
    let created = shared
        .referral_service
        .create(
            CreateReferral {
                code,
                description,
                usage_limit: limit,
                expiration_date: expires,
            },
            CLI_ACTOR,
        )
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create referral code: {e}"))?;

    println!("Created referral code '{}' (ID: {})", created.code, created.id);
    if let Some(limit) = created.usage_limit {
        println!("  Usage limit: {limit}");
    }
    if let Some(expires) = &created.expiration_date {
        println!("  Expires:     {expires}");
    }
    Ok(())
}

pub async fn cmd_referral_list(shared: &SharedState) -> anyhow::Result<()> {
    let codes = shared
        .referral_service
        .list()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list referral codes: {e}"))?;

    if codes.is_empty() {
        println!("No referral codes.");
        println!();
        println!("Create one with: commission-desk referral create <CODE> [--limit N]");
        return Ok(());
    }

    println!("Referral codes ({} total)", codes.len());
    println!("{:-<70}", "");

    for code in codes {
        let usage = code.usage_limit.map_or_else(
            || format!("{} used", code.usage_count),
            |limit| format!("{}/{limit} used", code.usage_count),
        );
        println!("{:>5}  {:<24} {usage}", code.id, code.code);
        if let Some(expires) = &code.expiration_date {
            println!("       expires {expires}");
        }
        if let Some(description) = &code.description {
            println!("       {description}");
        }
    }

    Ok(())
}

pub async fn cmd_referral_delete(shared: &SharedState, id: i32) -> anyhow::Result<()> {
    if id <= 0 {
        anyhow::bail!("Invalid referral ID: {id}");
    }

    shared
        .referral_service
        .delete(ReferralId::new(id))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to delete referral code {id}: {e}"))?;

    println!("Deleted referral code {id}");
    Ok(())
}
