//! clinic-cli: command-line client for the clinic-mirror HTTP API
//!
//! # Subcommands
//! - `list [--json]`: episode list, oldest first
//! - `show <doc_id> [--json]`: one episode's detail
//! - `image <doc_id> <index> [-o FILE]`: download a panel image
//! - `status`: show server health

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

const DEFAULT_SERVER: &str = "http://127.0.0.1:5042";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "clinic-cli", version, about = "Browse a clinic-mirror server from the terminal")]
struct Cli {
    /// clinic-mirror server URL (overrides CLINIC_HTTP_URL env var)
    #[arg(long, env = "CLINIC_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every episode in publication order
    List {
        /// Print the raw JSON array
        #[arg(long)]
        json: bool,
    },

    /// Show one episode's publish date, panel count and caption
    Show {
        doc_id: u64,

        /// Print the raw JSON object
        #[arg(long)]
        json: bool,
    },

    /// Download one panel image
    Image {
        doc_id: u64,

        /// 1-based panel index
        index: u32,

        /// Output file (defaults to `{doc_id}_{index:02}.png`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

/// One row of GET /api/docs
#[derive(Debug, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    pub doc_id: u64,
}

/// GET /api/docs/{doc_id}
#[derive(Debug, Serialize, Deserialize)]
pub struct EpisodeDetail {
    pub datetime: String,
    pub images: u32,
    pub message: String,
}

// ============================================================================
// Formatting
// ============================================================================

/// One line per episode: position, id, title.
pub fn format_episode_line(position: usize, episode: &Episode) -> String {
    format!("{:>4}  {:>8}  {}", position + 1, episode.doc_id, episode.title)
}

/// Human-readable detail block. An empty datetime means the server found nothing.
pub fn format_detail(doc_id: u64, detail: &EpisodeDetail) -> String {
    if detail.datetime.is_empty() {
        return format!("Episode {}: not found", doc_id);
    }

    let mut out = format!(
        "Episode {}\nPublished: {}\nPanels:    {}",
        doc_id, detail.datetime, detail.images
    );
    if !detail.message.is_empty() {
        out.push_str("\n\n");
        out.push_str(&detail.message);
    }
    out
}

pub fn default_image_path(doc_id: u64, index: u32) -> PathBuf {
    PathBuf::from(format!("{}_{:02}.png", doc_id, index))
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

/// GET `url`, exiting with a message on transport failure or non-2xx status.
fn fetch(client: &reqwest::blocking::Client, url: &str) -> reqwest::blocking::Response {
    let resp = match client.get(url).send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("clinic-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("clinic-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    resp
}

fn do_list(server: &str, json_output: bool) -> anyhow::Result<()> {
    // Listing scrapes every yearly index page server-side
    let client = client(120)?;
    let url = format!("{}/api/docs", server);
    let episodes: Vec<Episode> = fetch(&client, &url).json()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&episodes)?);
        return Ok(());
    }

    if episodes.is_empty() {
        eprintln!("No episodes found");
        return Ok(());
    }
    for (i, episode) in episodes.iter().enumerate() {
        println!("{}", format_episode_line(i, episode));
    }
    Ok(())
}

fn do_show(server: &str, doc_id: u64, json_output: bool) -> anyhow::Result<()> {
    let client = client(120)?;
    let url = format!("{}/api/docs/{}", server, doc_id);
    let detail: EpisodeDetail = fetch(&client, &url).json()?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        println!("{}", format_detail(doc_id, &detail));
    }
    Ok(())
}

fn do_image(server: &str, doc_id: u64, index: u32, output: Option<PathBuf>) -> anyhow::Result<()> {
    let client = client(60)?;
    let url = format!("{}/api/docs/{}/images/{}", server, doc_id, index);
    let bytes = fetch(&client, &url).bytes()?;

    if bytes.is_empty() {
        eprintln!("clinic-cli: image {} of episode {} not found", index, doc_id);
        std::process::exit(1);
    }

    let path = output.unwrap_or_else(|| default_image_path(doc_id, index));
    std::fs::write(&path, &bytes)?;
    println!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let client = client(10)?;

    let url = format!("{}/health", server);
    let resp = client.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("clinic-mirror: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:       {}", body["version"].as_str().unwrap_or("?"));
            println!("SQLite:        {}", body["sqlite"].as_str().unwrap_or("?"));
            println!("Read-only:     {}", body["read_only"].as_bool().unwrap_or(false));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("clinic-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("clinic-cli: cannot reach {} ({})", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::List { json } => do_list(&server, json),
        Commands::Show { doc_id, json } => do_show(&server, doc_id, json),
        Commands::Image { doc_id, index, output } => do_image(&server, doc_id, index, output),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("clinic-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
