//! Account commands

use crate::state::SharedState;

pub async fn cmd_create_admin(
    shared: &SharedState,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    let admin = shared
        .auth_service
        .create_admin(username, password)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create admin: {e}"))?;

    println!("Created admin '{}' (ID: {})", admin.username, admin.id);
    Ok(())
}

pub async fn cmd_list_users(shared: &SharedState) -> anyhow::Result<()> {
    let users = shared
        .auth_service
        .list_users()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list users: {e}"))?;

    if users.is_empty() {
        println!("No accounts yet.");
        return Ok(());
    }

    println!("Accounts ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        println!(
            "{:>5}  {:<24} {:<6} referral: {}",
            user.id,
            user.username,
            user.role,
            user.referral_code_used.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
