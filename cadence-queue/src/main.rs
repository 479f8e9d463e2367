//! cadence-queue - Manage scheduled posts
//!
//! Unix-style tool for inspecting and managing the scheduled post queue.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use libcadence::logging::{LogFormat, LoggingConfig};
use libcadence::scheduling::parse_schedule;
use libcadence::{CadenceError, CadenceService, Platform, PostFilter, PostStatus, ScheduledPost};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "cadence-queue")]
#[command(version)]
#[command(about = "Manage scheduled posts")]
#[command(long_about = "\
cadence-queue - Manage scheduled posts

DESCRIPTION:
    cadence-queue is a Unix-style tool for managing scheduled posts in the
    Cadence queue. Use it to list, inspect, reschedule, cancel or publish
    posts, and to view statistics about the queue.

COMMANDS:
    list        List posts, optionally filtered
    show        Show one post
    upcoming    Scheduled posts due soon
    calendar    Posts scheduled within a date range
    failed      Posts that failed to sync or publish
    reschedule  Move a post to a different time
    cancel      Cancel a post and withdraw it remotely
    now         Publish a post immediately
    requeue     Return a failed post to the sync queue
    sync        Sweep posts waiting to be synced
    analytics   Show (or refresh) analytics for a published post
    stats       Show queue statistics

USAGE EXAMPLES:
    # List scheduled posts
    cadence-queue list --status scheduled

    # List posts in JSON format
    cadence-queue list --format json

    # Reschedule a post
    cadence-queue reschedule <POST_ID> \"tomorrow 3pm\"

    # Cancel a post
    cadence-queue cancel <POST_ID>

    # View queue statistics
    cadence-queue stats

CONFIGURATION:
    Configuration file: ~/.config/cadence/config.toml
    Database location: ~/.local/share/cadence/cadence.db

    Override with environment variables:
        CADENCE_CONFIG    - Path to config file
        CADENCE_DB_PATH   - Path to database file

EXIT CODES:
    0 - Success
    1 - Operation failed (publishing service error)
    2 - Database or configuration error
    3 - Invalid input (bad post ID, time format, state conflict)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    #[arg(help = "Enable verbose logging to stderr (useful for debugging)")]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List posts
    List {
        /// Filter by status (draft, pending_sync, scheduled, publishing, published, failed, cancelled)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by platform
        #[arg(short, long)]
        platform: Option<String>,

        /// Filter by account
        #[arg(short, long)]
        account: Option<String>,

        /// Maximum number of posts
        #[arg(short, long, default_value_t = 50)]
        limit: u32,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show one post
    Show {
        post_id: String,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Scheduled posts due within the next few hours
    Upcoming {
        #[arg(long, default_value_t = 24)]
        hours: u32,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Posts scheduled within a date range
    Calendar {
        /// Range start (e.g. "2026-03-01 00:00", "now")
        from: String,

        /// Range end (e.g. "2026-03-08 00:00", "7d")
        to: String,

        /// Restrict to these accounts (repeatable)
        #[arg(short, long = "account")]
        accounts: Vec<String>,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Posts that failed to sync or publish
    Failed {
        #[arg(short, long, default_value_t = 50)]
        limit: u32,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Reschedule a post
    Reschedule {
        /// Post ID to reschedule
        post_id: String,

        /// New schedule time (e.g., "tomorrow 3pm", "2h")
        time: String,

        /// New timezone label for the post
        #[arg(long)]
        timezone: Option<String>,
    },

    /// Cancel a post
    Cancel {
        /// Post ID to cancel
        post_id: String,
    },

    /// Publish immediately
    Now {
        /// Post ID to publish now
        post_id: String,
    },

    /// Return a failed post to the sync queue
    Requeue {
        post_id: String,
    },

    /// Sweep posts waiting to be synced
    Sync,

    /// Show analytics for a published post
    Analytics {
        post_id: String,

        /// Pull fresh numbers from the publishing service first
        #[arg(long)]
        refresh: bool,
    },

    /// Show queue statistics
    Stats {
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::new(LogFormat::Text, "error".to_string(), cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<CadenceError>()
            .map(CadenceError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let service = CadenceService::new().await?;

    match cli.command {
        Commands::List {
            status,
            platform,
            account,
            limit,
            format,
        } => {
            let filter = PostFilter {
                status: status.as_deref().map(str::parse::<PostStatus>).transpose()?,
                platform: platform.as_deref().map(str::parse::<Platform>).transpose()?,
                account_id: account,
                limit,
                ..PostFilter::default()
            };
            let posts = service.calendar().list(filter).await?;
            output_posts(&posts, format)?;
        }
        Commands::Show { post_id, format } => {
            let post = service.calendar().get(&post_id).await?;
            match format {
                OutputFormat::Json => print_json(&post)?,
                OutputFormat::Text => output_post_detail(&post),
            }
        }
        Commands::Upcoming { hours, format } => {
            let posts = service.calendar().upcoming(hours, 50).await?;
            output_posts(&posts, format)?;
        }
        Commands::Calendar {
            from,
            to,
            accounts,
            format,
        } => {
            let from = parse_schedule(&from)?;
            let to = parse_schedule(&to)?;
            let accounts = (!accounts.is_empty()).then_some(accounts);
            let posts = service
                .calendar()
                .range_query(from, to, accounts.as_deref())
                .await?;
            output_posts(&posts, format)?;
        }
        Commands::Failed { limit, format } => {
            let posts = service.calendar().failed(limit).await?;
            output_posts(&posts, format)?;
        }
        Commands::Reschedule {
            post_id,
            time,
            timezone,
        } => {
            let when = parse_schedule(&time)?;
            let post = service.calendar().reschedule(&post_id, when, timezone).await?;
            println!(
                "Rescheduled post {} to {} ({})",
                post.id,
                post.scheduled_for.to_rfc3339(),
                post.status
            );
        }
        Commands::Cancel { post_id } => {
            let post = service.calendar().cancel(&post_id).await?;
            println!("Cancelled post {}", post.id);
        }
        Commands::Now { post_id } => {
            let post = service.sync().publish_now(&post_id).await?;
            match &post.remote_post_url {
                Some(url) => println!("Published post {}: {}", post.id, url),
                None => println!("Published post {}", post.id),
            }
        }
        Commands::Requeue { post_id } => {
            let post = service.sync().requeue(&post_id).await?;
            println!("Requeued post {} ({})", post.id, post.status);
        }
        Commands::Sync => {
            let report = service.sync().sweep().await?;
            println!("Synced: {}, failed: {}", report.synced, report.failed);
        }
        Commands::Analytics { post_id, refresh } => {
            if refresh {
                service.analytics().sync_post_analytics(&post_id).await?;
            }
            match service.analytics().get_analytics(&post_id).await? {
                Some(analytics) => print_json(&analytics)?,
                None => {
                    return Err(CadenceError::NotFound(format!(
                        "no analytics for post {}",
                        post_id
                    ))
                    .into())
                }
            }
        }
        Commands::Stats { format } => {
            let stats = service.calendar().stats().await?;
            match format {
                OutputFormat::Json => print_json(&stats)?,
                OutputFormat::Text => {
                    println!("Total posts: {}", stats.total);
                    for (status, count) in &stats.by_status {
                        println!("  {}: {}", status, count);
                    }
                    if !stats.open_by_platform.is_empty() {
                        println!("Open by platform:");
                        for (platform, count) in &stats.open_by_platform {
                            println!("  {}: {}", platform, count);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn output_posts(posts: &[ScheduledPost], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&posts)?,
        OutputFormat::Text => {
            let now = Utc::now();
            for post in posts {
                println!(
                    "{} | {} | {} | {} | {}",
                    post.id,
                    post.platform.as_str(),
                    post.account_id,
                    post.status,
                    format_time_until(now, post.scheduled_for)
                );
            }
        }
    }
    Ok(())
}

fn output_post_detail(post: &ScheduledPost) {
    println!("ID:           {}", post.id);
    println!("Status:       {}", post.status);
    println!("Account:      {} ({})", post.account_id, post.platform.as_str());
    println!("Content:      {}", post.content_id);
    println!(
        "Scheduled:    {} ({})",
        post.scheduled_for.to_rfc3339(),
        post.timezone
    );
    if let Some(batch) = &post.batch_id {
        println!("Batch:        {}", batch);
    }
    if let Some(remote) = &post.remote_post_id {
        println!("Remote ID:    {}", remote);
    }
    if let Some(url) = &post.remote_post_url {
        println!("URL:          {}", url);
    }
    if let Some(err) = &post.error_message {
        println!("Last error:   {}", err);
    }
}

/// Format time until scheduled time in human-readable format
fn format_time_until(now: DateTime<Utc>, scheduled_for: DateTime<Utc>) -> String {
    let diff = scheduled_for - now;

    if diff.num_seconds() < 0 {
        return "overdue".to_string();
    }

    let minutes = diff.num_minutes();
    let hours = diff.num_hours();
    let days = diff.num_days();

    if days > 0 {
        format!("in {} day{}", days, if days == 1 { "" } else { "s" })
    } else if hours > 0 {
        format!("in {} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else if minutes > 0 {
        format!("in {} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    } else {
        "in <1 minute".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_time_until() {
        let now = Utc::now();
        assert_eq!(format_time_until(now, now - Duration::minutes(1)), "overdue");
        assert_eq!(format_time_until(now, now + Duration::seconds(30)), "in <1 minute");
        assert_eq!(format_time_until(now, now + Duration::minutes(5)), "in 5 minutes");
        assert_eq!(format_time_until(now, now + Duration::minutes(61)), "in 1 hour");
        assert_eq!(format_time_until(now, now + Duration::hours(49)), "in 2 days");
    }
}
