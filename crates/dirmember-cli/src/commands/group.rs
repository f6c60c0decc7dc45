//! Group commands - existence and members

use super::CommandContext;
use anyhow::{Context, Result};

pub async fn exists(ctx: &CommandContext, group: &str) -> Result<bool> {
    let found = ctx.client.group_exists(group).await;
    ctx.answer(group, found)
}

pub async fn members(ctx: &CommandContext, group: &str) -> Result<bool> {
    let users = ctx
        .client
        .users_for_group(group)
        .await
        .with_context(|| format!("Failed to list members of {}", group))?;

    ctx.listing(group, &users)?;
    Ok(!users.is_empty())
}
