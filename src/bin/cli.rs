//! misslog CLI
//!
//! Command-line client for a running misslog API server:
//! - List and group misses
//! - Record a miss
//! - Delete by id, group value or filter
//! - Export and check status

use clap::{Args, Parser, Subcommand};
use misslog::filter::{FilterBy, FilterKey};
use misslog::query::{Direction, ListParams, OrderBy};
use misslog::store::GroupBy;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "misslog-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and prune the 404 miss log")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8404", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

/// Filter criteria shared by list, groups, purge and export
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Client IP, exact match
    #[arg(long)]
    pub ip: Option<String>,
    /// URL substring
    #[arg(long)]
    pub url: Option<String>,
    /// URL, exact match
    #[arg(long)]
    pub url_exact: Option<String>,
    /// Referrer substring
    #[arg(long)]
    pub referrer: Option<String>,
    /// User agent substring
    #[arg(long)]
    pub agent: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> FilterBy {
        let mut filter = FilterBy::new();
        let values = [
            (FilterKey::Ip, &self.ip),
            (FilterKey::Url, &self.url),
            (FilterKey::UrlExact, &self.url_exact),
            (FilterKey::Referrer, &self.referrer),
            (FilterKey::Agent, &self.agent),
        ];
        for (key, value) in values {
            if let Some(value) = value {
                filter.set(key, value.clone());
            }
        }
        filter
    }
}

/// Sorting and paging shared by list and groups
#[derive(Args, Debug)]
pub struct PageArgs {
    /// Sort key (url, ip, date, id, total)
    #[arg(long)]
    pub orderby: Option<String>,
    /// Sort direction (asc, desc)
    #[arg(long)]
    pub direction: Option<String>,
    /// Rows per page
    #[arg(long)]
    pub per_page: Option<u32>,
    /// Page number, starting at 1
    #[arg(short, long)]
    pub page: Option<u32>,
}

impl PageArgs {
    fn apply(&self, mut params: ListParams) -> ListParams {
        params.order_by = self.orderby.as_deref().and_then(OrderBy::parse);
        params.direction = self.direction.as_deref().and_then(Direction::parse);
        params.per_page = self.per_page;
        params.page = self.page;
        params
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List misses
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        paging: PageArgs,
    },

    /// Count misses per client IP or per URL
    Groups {
        /// Dimension to group by (ip, url)
        #[arg(default_value = "url")]
        by: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        paging: PageArgs,
    },

    /// Record a miss
    Log {
        /// Requested URL
        url: String,
        #[arg(long)]
        ip: Option<String>,
        #[arg(long)]
        referrer: Option<String>,
        #[arg(long)]
        agent: Option<String>,
    },

    /// Delete misses by id or group value
    Delete {
        /// Ids and group values, e.g. `12 /old-page`
        #[arg(required = true)]
        items: Vec<String>,
        /// Dimension group values refer to (ip, url; default url)
        #[arg(long)]
        group_by: Option<String>,
    },

    /// Delete every miss matching a filter
    Purge {
        #[command(flatten)]
        filter: FilterArgs,
        /// Delete the whole log when no filter is given
        #[arg(long)]
        all: bool,
    },

    /// Export misses
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// File format (csv, json)
        #[arg(long, default_value = "csv")]
        export_format: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::List { filter, paging } => {
            let params = paging.apply(ListParams::new().filter(filter.to_filter()));
            let data = fetch_list(&client, &cli.api_url, &params).await?;
            print_list(&data, &cli.format)?;
        }

        Commands::Groups { by, filter, paging } => {
            let Some(group_by) = GroupBy::parse(&by) else {
                eprintln!("Unknown group dimension: {} (use ip or url)", by);
                std::process::exit(1);
            };

            let params = paging.apply(
                ListParams::new()
                    .filter(filter.to_filter())
                    .group_by(group_by),
            );
            let data = fetch_list(&client, &cli.api_url, &params).await?;
            print_list(&data, &cli.format)?;
        }

        Commands::Log {
            url,
            ip,
            referrer,
            agent,
        } => {
            let body = serde_json::json!({
                "url": url,
                "ip": ip,
                "referrer": referrer,
                "user_agent": agent,
            });

            let response = client
                .post(format!("{}/api/v1/404/log", cli.api_url))
                .json(&body)
                .send()
                .await?;
            let event: Value = ok_or_exit(response, "Log failed").await?.json().await?;

            println!(
                "Logged miss #{} for {}",
                event["id"].as_i64().unwrap_or(0),
                event["url"].as_str().unwrap_or(&url)
            );
        }

        Commands::Delete { items, group_by } => {
            let mut body = serde_json::json!({ "items": items });

            if let Some(by) = group_by {
                let Some(group_by) = GroupBy::parse(&by) else {
                    eprintln!("Unknown group dimension: {} (use ip or url)", by);
                    std::process::exit(1);
                };
                body["groupBy"] = Value::String(group_by.to_string());
            }

            let response = client
                .post(format!("{}/api/v1/bulk/404/delete", cli.api_url))
                .json(&body)
                .send()
                .await?;
            let data: Value = ok_or_exit(response, "Delete failed").await?.json().await?;

            println!("Deleted. {}", remaining_summary(&data));
        }

        Commands::Purge { filter, all } => {
            let filter = filter.to_filter();

            if filter.is_empty() && !all {
                eprintln!("Refusing to purge the whole log without --all");
                std::process::exit(1);
            }

            let filter_body: serde_json::Map<String, Value> = filter
                .entries()
                .into_iter()
                .map(|(key, value)| (key.name().to_string(), Value::String(value.to_string())))
                .collect();

            let response = client
                .post(format!("{}/api/v1/404", cli.api_url))
                .json(&serde_json::json!({ "filterBy": filter_body }))
                .send()
                .await?;
            let data: Value = ok_or_exit(response, "Purge failed").await?.json().await?;

            println!("Purged. {}", remaining_summary(&data));
        }

        Commands::Export {
            filter,
            export_format,
            output,
        } => {
            let mut query = ListParams::new().filter(filter.to_filter()).to_query_pairs();
            query.push(("format".to_string(), export_format));

            let response = client
                .get(format!("{}/api/v1/404/export", cli.api_url))
                .query(&query)
                .send()
                .await?;
            let data = ok_or_exit(response, "Export failed").await?.text().await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &data)?;
                    println!("Exported to {:?}", path);
                }
                None => {
                    print!("{}", data);
                }
            }
        }

        Commands::Status => {
            let response = client.get(format!("{}/health", cli.api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: Value = resp.json().await?;

                    println!("misslog v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!(
                        "API Status: {}",
                        health["status"].as_str().unwrap_or("unknown")
                    );
                    println!(
                        "Storage: {}",
                        health["storage"].as_str().unwrap_or("unknown")
                    );
                    if let Some(events) = health["events"].as_u64() {
                        println!("Recorded misses: {}", events);
                    }

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    eprintln!("API returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to misslog API at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the misslog API server is running:");
                    eprintln!("  cargo run --bin misslog");
                    std::process::exit(1);
                }
            }
        }

        Commands::Config { output } => {
            let config = misslog::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

async fn fetch_list(
    client: &reqwest::Client,
    api_url: &str,
    params: &ListParams,
) -> anyhow::Result<Value> {
    let response = client
        .get(format!("{}/api/v1/404", api_url))
        .query(&params.to_query_pairs())
        .send()
        .await?;

    Ok(ok_or_exit(response, "List failed").await?.json().await?)
}

/// Pass a successful response through; print the API error and exit otherwise
async fn ok_or_exit(
    response: reqwest::Response,
    context: &str,
) -> anyhow::Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| body["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(text);

    eprintln!("{} ({}): {}", context, status, message);
    std::process::exit(1);
}

fn print_list(data: &Value, format: &str) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(data)?);
        return Ok(());
    }

    let items = data["items"].as_array().map(Vec::as_slice).unwrap_or_default();
    if items.is_empty() {
        println!("No misses recorded");
        return Ok(());
    }

    if data.get("group_by").is_some() {
        println!("{:>8}  {}", "Count", "Group");
        println!("{}", "-".repeat(60));
        for group in items {
            let key = group["group_key"].as_str().unwrap_or("");
            println!(
                "{:>8}  {}",
                group["count"].as_u64().unwrap_or(0),
                if key.is_empty() { "(none)" } else { key }
            );
        }
    } else {
        println!("{:>8}  {:<20}  {:<16}  {}", "ID", "When", "IP", "URL");
        println!("{}", "-".repeat(80));
        for event in items {
            let when = event["created_at"]
                .as_str()
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:>8}  {:<20}  {:<16}  {}",
                event["id"].as_i64().unwrap_or(0),
                when,
                event["ip"].as_str().unwrap_or("-"),
                event["url"].as_str().unwrap_or("-")
            );
        }
    }

    let total = data["total"].as_u64().unwrap_or(0);
    let page = data["page"].as_u64().unwrap_or(1);
    let per_page = data["per_page"].as_u64().unwrap_or(1).max(1);
    println!();
    println!(
        "Page {} of {} ({} total)",
        page,
        total.div_ceil(per_page).max(1),
        total
    );

    Ok(())
}

/// Describe what a refreshed view says is left. A grouped view counts
/// groups, not events.
fn remaining_summary(data: &Value) -> String {
    let total = data["total"].as_u64().unwrap_or(0);

    match data["group_by"].as_str() {
        Some(by) => format!("{} {} groups remain.", total, by),
        None => format!("{} misses remain.", total),
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_args_to_filter() {
        let args = FilterArgs {
            ip: Some("10.0.0.1".to_string()),
            url_exact: Some("/gone".to_string()),
            ..Default::default()
        };

        let filter = args.to_filter();
        assert_eq!(filter.get(FilterKey::Ip), Some("10.0.0.1"));
        assert_eq!(filter.get(FilterKey::UrlExact), Some("/gone"));
        assert!(filter.get(FilterKey::Url).is_none());
    }

    #[test]
    fn test_list_query_pairs() {
        let args = FilterArgs {
            url: Some("wp-".to_string()),
            ..Default::default()
        };
        let params = ListParams::new().filter(args.to_filter()).group_by(GroupBy::Ip);

        let pairs = params.to_query_pairs();
        assert!(pairs.contains(&("groupBy".to_string(), "ip".to_string())));
        assert!(pairs.contains(&("filterBy[url]".to_string(), "wp-".to_string())));
    }

    #[test]
    fn test_remaining_summary_flat() {
        let data = serde_json::json!({ "items": [], "total": 5, "page": 1, "per_page": 25 });
        assert_eq!(remaining_summary(&data), "5 misses remain.");
    }

    #[test]
    fn test_remaining_summary_grouped() {
        let data = serde_json::json!({
            "items": [],
            "total": 3,
            "page": 1,
            "per_page": 25,
            "group_by": "url",
        });
        assert_eq!(remaining_summary(&data), "3 url groups remain.");
    }

    #[test]
    fn test_delete_without_group_by_sends_flat_view() {
        let cli = Cli::try_parse_from(["misslog-cli", "delete", "2", "/gone"]).unwrap();
        match cli.command {
            Commands::Delete { items, group_by } => {
                assert_eq!(items, vec!["2".to_string(), "/gone".to_string()]);
                assert!(group_by.is_none());
            }
            _ => panic!("expected delete command"),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(3700), "1h 1m");
        assert_eq!(format_duration(90_000), "1d 1h");
    }
}
