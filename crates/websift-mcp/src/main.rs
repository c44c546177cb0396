use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use websift_core::{validate_search_args, Error};
use websift_local::config::{API_KEY_ENV, API_URL_ENV, DEFAULT_BASE_URL};
use websift_local::{Config, OpenRouterClient};

#[cfg(feature = "stdio")]
mod mcp;

const ENV_FILE_ENV: &str = "WEBSIFT_ENV_FILE";

#[derive(Parser, Debug)]
#[command(name = "websift")]
#[command(about = "Web search through OpenRouter citations (MCP stdio server)", long_about = None)]
struct Cli {
    /// Defaults to `mcp-stdio` when omitted.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as an MCP stdio server (for Cursor / Claude Desktop / other MCP clients).
    #[cfg(feature = "stdio")]
    McpStdio,
    /// Run one search and print the outcome as JSON.
    Search(SearchCmd),
    /// Diagnose configuration/launch issues (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    /// Search query.
    #[arg(long)]
    query: String,
    /// Number of results (1-10). Default: 5.
    #[arg(long)]
    num_results: Option<i64>,
    /// technical|development|general. Default: technical.
    #[arg(long)]
    focus: Option<String>,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    /// Spawn a child `websift mcp-stdio` and call `list_tools` to prove an MCP client can start it.
    ///
    /// No search is performed and no secret values are printed.
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    check_stdio: bool,
    /// Timeout for the stdio handshake (ms).
    #[arg(long, default_value_t = 3000)]
    timeout_ms: u64,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn init_tracing() {
    // stdout belongs to the MCP transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Opt-in env file; variables already set in the process win.
///
/// Runs before `init_tracing` so the file may set `RUST_LOG`.
fn load_env_file() -> Result<Option<String>> {
    let Some(p) = std::env::var(ENV_FILE_ENV)
        .ok()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
    else {
        return Ok(None);
    };
    dotenvy::from_path(&p).with_context(|| format!("{ENV_FILE_ENV}={p}"))?;
    Ok(Some(p))
}

fn has_env(k: &str) -> bool {
    std::env::var(k).ok().is_some_and(|v| !v.trim().is_empty())
}

async fn run_search(args: SearchCmd) -> Result<()> {
    let input = serde_json::json!({
        "query": args.query,
        "num_results": args.num_results,
        "focus": args.focus,
    });
    let req = validate_search_args(&input).map_err(Error::from)?;
    let client = OpenRouterClient::new(Config::from_env()?)?;
    let outcome = client.search_web(&req).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_doctor(args: DoctorCmd, env_file: Option<String>) -> Result<()> {
    let t0 = std::time::Instant::now();
    let key_configured = has_env(API_KEY_ENV);
    let base_url = std::env::var(API_URL_ENV)
        .ok()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty());
    let base_url_source = if base_url.is_some() { "env" } else { "default" };
    let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let mut checks: Vec<serde_json::Value> = Vec::new();
    checks.push(serde_json::json!({
        "name": "api_key",
        "ok": key_configured,
        "message": if key_configured {
            format!("{API_KEY_ENV} is set")
        } else {
            format!("{API_KEY_ENV} is missing; mcp-stdio will refuse to start")
        },
        "hint": if key_configured {
            String::new()
        } else {
            format!("Export {API_KEY_ENV}, or point {ENV_FILE_ENV} at a file that sets it.")
        },
    }));

    checks.push(if args.check_stdio {
        stdio_check(args.timeout_ms, key_configured).await
    } else {
        serde_json::json!({
            "name": "mcp_stdio_handshake",
            "ok": true,
            "skipped": true,
            "message": "stdio MCP handshake skipped",
        })
    });

    let ok = checks.iter().all(|c| c["ok"].as_bool().unwrap_or(false));
    let payload = serde_json::json!({
        "schema_version": 1,
        "kind": "doctor",
        "ok": ok,
        "name": "websift",
        "version": env!("CARGO_PKG_VERSION"),
        "platform": {
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        },
        "features": {
            "stdio": cfg!(feature = "stdio"),
        },
        "elapsed_ms": t0.elapsed().as_millis(),
        "configured": {
            "api_key": key_configured,
            "base_url": base_url,
            "base_url_source": base_url_source,
            "model": websift_local::config::DEFAULT_MODEL,
            "timeout_ms": websift_local::config::UPSTREAM_TIMEOUT.as_millis() as u64,
            "env_file": env_file,
        },
        "checks": checks,
    });
    match args.output.to_ascii_lowercase().as_str() {
        "text" => {
            println!("websift {} (ok={})", env!("CARGO_PKG_VERSION"), ok);
            println!(
                "base_url: {} ({})",
                payload["configured"]["base_url"].as_str().unwrap_or(""),
                base_url_source
            );
            println!("api_key: {}", if key_configured { "set" } else { "missing" });
            println!("checks:");
            if let Some(arr) = payload["checks"].as_array() {
                for c in arr {
                    let name = c["name"].as_str().unwrap_or("?");
                    let ok = c["ok"].as_bool().unwrap_or(false);
                    if c["skipped"].as_bool().unwrap_or(false) {
                        println!("- {}: skipped", name);
                    } else {
                        println!("- {}: {}", name, if ok { "ok" } else { "fail" });
                    }
                }
            }
        }
        _ => println!("{payload}"),
    }
    Ok(())
}

/// Start `websift mcp-stdio` as a child and list its tools. Inherits this process's env, so a
/// missing key shows up here as a child that exits before the handshake.
#[cfg(feature = "stdio")]
async fn stdio_check(timeout_ms: u64, key_configured: bool) -> serde_json::Value {
    use rmcp::service::ServiceExt;
    use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};

    let t0 = std::time::Instant::now();
    let handshake = async {
        let exe = std::env::current_exe().context("locate websift binary")?;
        let child = TokioChildProcess::new(tokio::process::Command::new(exe).configure(|cmd| {
            cmd.args(["mcp-stdio"]);
            cmd.env("RUST_LOG", "error");
        }))
        .context("spawn websift mcp-stdio")?;
        let service = ().serve(child).await.context("initialize")?;
        let tools = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            service.list_tools(Default::default()),
        )
        .await;
        let _ = service.cancel().await;
        let tools = tools
            .map_err(|_| anyhow::anyhow!("list_tools timed out after {timeout_ms}ms"))?
            .context("list_tools")?;
        anyhow::Ok(tools.tools.iter().map(|t| t.name.to_string()).collect::<Vec<_>>())
    };

    match handshake.await {
        Ok(tools) => serde_json::json!({
            "name": "mcp_stdio_handshake",
            "ok": tools.iter().any(|t| t == "search_web"),
            "skipped": false,
            "message": format!("child server listed {}", tools.join(", ")),
            "tool_count": tools.len(),
            "elapsed_ms": t0.elapsed().as_millis() as u64,
        }),
        Err(e) => serde_json::json!({
            "name": "mcp_stdio_handshake",
            "ok": false,
            "skipped": false,
            "message": format!("{e:#}"),
            "hint": if key_configured {
                "Make sure nothing else in the launch path writes to stdout."
            } else {
                "The child exits at startup without OPENROUTER_API_KEY; set it and rerun."
            },
            "elapsed_ms": t0.elapsed().as_millis() as u64,
        }),
    }
}

#[cfg(not(feature = "stdio"))]
async fn stdio_check(_timeout_ms: u64, _key_configured: bool) -> serde_json::Value {
    serde_json::json!({
        "name": "mcp_stdio_handshake",
        "ok": false,
        "skipped": false,
        "message": "built without the `stdio` feature",
    })
}

#[cfg(feature = "stdio")]
async fn run_stdio() -> Result<()> {
    // Missing credentials are fatal before anything is served.
    let config = Config::from_env()?;
    info!(base_url = %config.base_url, model = %config.model, "starting websift");
    mcp::serve_stdio(config).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_file = load_env_file();
    init_tracing();
    let env_file = env_file.unwrap_or_else(|e| {
        warn!(error = %format!("{e:#}"), "could not load env file");
        None
    });
    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "stdio")]
        None | Some(Commands::McpStdio) => run_stdio().await?,
        #[cfg(not(feature = "stdio"))]
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
        Some(Commands::Search(args)) => run_search(args).await?,
        Some(Commands::Doctor(args)) => run_doctor(args, env_file).await?,
        Some(Commands::Version(args)) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "websift",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("websift {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{}", v),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::try_parse_from(["websift"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn search_args_parse() {
        let cli = Cli::try_parse_from([
            "websift",
            "search",
            "--query",
            "rust lifetimes",
            "--num-results",
            "3",
            "--focus",
            "general",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Search(s)) => {
                assert_eq!(s.query, "rust lifetimes");
                assert_eq!(s.num_results, Some(3));
                assert_eq!(s.focus.as_deref(), Some("general"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn doctor_check_stdio_can_be_disabled() {
        let cli = Cli::try_parse_from(["websift", "doctor", "--check-stdio", "false"]).unwrap();
        match cli.command {
            Some(Commands::Doctor(d)) => assert!(!d.check_stdio),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
