//! User commands - existence, groups, membership checks, passwords

use super::CommandContext;
use anyhow::{Context, Result};

pub async fn exists(ctx: &CommandContext, login: &str) -> Result<bool> {
    let found = ctx.client.user_exists(login).await;
    ctx.answer(login, found)
}

pub async fn groups(ctx: &CommandContext, login: &str) -> Result<bool> {
    let groups = ctx
        .client
        .groups_for_user(login)
        .await
        .with_context(|| format!("Failed to list groups of {}", login))?;

    ctx.listing(login, &groups)?;
    Ok(!groups.is_empty())
}

pub async fn in_groups(ctx: &CommandContext, login: &str, groups: &[String], any: bool) -> Result<bool> {
    let member = ctx.client.is_user_in_groups(login, groups, any).await;
    ctx.answer(login, member)
}

pub async fn authenticate(ctx: &CommandContext, identity: &str, password: &str) -> Result<bool> {
    let accepted = ctx.client.authenticate(identity, password).await;
    ctx.answer(identity, accepted)
}
