//! CLI command implementations
//!
//! Every command returns the yes/no answer that becomes the exit code.

pub mod group;
pub mod user;

use crate::OutputFormat;
use colored::Colorize;
use dirmember_auth::LdapClient;
use serde::Serialize;

/// Context passed to all commands
pub struct CommandContext {
    pub client: LdapClient,
    pub output_format: OutputFormat,
}

#[derive(Serialize)]
struct Answer<'a> {
    subject: &'a str,
    result: bool,
}

#[derive(Serialize)]
struct Listing<'a> {
    subject: &'a str,
    entries: &'a [String],
}

impl CommandContext {
    /// Print a yes/no answer
    pub fn answer(&self, subject: &str, result: bool) -> anyhow::Result<bool> {
        println!("{}", render_answer(self.output_format, subject, result)?);
        Ok(result)
    }

    /// Print a list of names, one per line
    pub fn listing(&self, subject: &str, entries: &[String]) -> anyhow::Result<()> {
        let rendered = render_listing(self.output_format, subject, entries)?;
        if !rendered.is_empty() {
            println!("{}", rendered);
        }
        Ok(())
    }
}

fn render_answer(format: OutputFormat, subject: &str, result: bool) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(&Answer { subject, result })?,
        OutputFormat::Text if result => format!("{}: {}", subject, "yes".green()),
        OutputFormat::Text => format!("{}: {}", subject, "no".red()),
    })
}

fn render_listing(format: OutputFormat, subject: &str, entries: &[String]) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(&Listing { subject, entries })?,
        OutputFormat::Text => entries.join("\n"),
    })
}
