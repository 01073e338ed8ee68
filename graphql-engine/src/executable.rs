//! Main entry point for the CLI running the demonstration schemas.

use std::io;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::configuration::Configuration;
use crate::demo::Demo;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::json_ext::Object;

/// Options for the demo runner
#[derive(Parser, Debug)]
#[command(name = "notes-demo", about = "Run GraphQL operations against the demo schemas")]
struct Opt {
    /// Log level (off|error|warn|info|debug|trace). `RUST_LOG` takes precedence when set.
    #[arg(long = "log", default_value = "info", alias = "log-level", env = "NOTES_DEMO_LOG")]
    log_level: String,

    /// Configuration file (YAML).
    #[arg(short, long = "config", env = "NOTES_DEMO_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the canned operations of a demo and print each response
    Demo {
        /// `greetings` or `notes`
        demo: Demo,
    },
    /// Execute one operation against a demo schema
    Exec {
        /// The operation document, or `-` for stdin
        query: String,

        /// Schema to run against, `greetings` or `notes`
        #[arg(long, default_value = "notes")]
        demo: Demo,

        /// Name of the operation to run
        #[arg(long)]
        operation_name: Option<String>,

        /// Variables, as a JSON object
        #[arg(long)]
        variables: Option<String>,
    },
    /// Print the effective configuration
    Config {
        /// Print the JSON schema of the configuration instead
        #[arg(long)]
        schema: bool,
    },
}

/// This is the main entry point.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("NOTES_DEMO_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(start())
}

async fn start() -> Result<()> {
    let opt = Opt::parse();

    let env_filter = std::env::var("RUST_LOG").ok().unwrap_or(opt.log_level);
    let builder = tracing_subscriber::fmt::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_new(&env_filter).context("could not parse log")?);
    if io::stderr().is_terminal() {
        builder.init();
    } else {
        builder.json().init();
    }

    let configuration = match &opt.config_path {
        Some(path) => Configuration::from_file(path)
            .with_context(|| format!("could not load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };

    match opt.command {
        Command::Demo { demo } => {
            let engine = demo.engine(configuration)?;
            tracing::info!(%demo, "running demo operations");
            for request in demo.operations() {
                print_response(&engine.execute(request).await)?;
            }
        }
        Command::Exec {
            query,
            demo,
            operation_name,
            variables,
        } => {
            let query = if query == "-" {
                io::read_to_string(io::stdin()).context("could not read the query from stdin")?
            } else {
                query
            };
            let variables: Object = match variables {
                Some(variables) => {
                    serde_json::from_str(&variables).context("variables must be a JSON object")?
                }
                None => Object::new(),
            };
            let engine = demo.engine(configuration)?;
            let request = Request::builder()
                .query(query)
                .and_operation_name(operation_name)
                .variables(variables)
                .build();

            let cancellation = CancellationToken::new();
            let on_ctrl_c = cancellation.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupted, cancelling the operation");
                    on_ctrl_c.cancel();
                }
            });
            let response = engine
                .execute_with_cancellation(request, cancellation)
                .await;
            print_response(&response)?;
        }
        Command::Config { schema } => {
            if schema {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&Configuration::json_schema())?
                );
            } else {
                print!("{}", serde_yaml::to_string(&configuration)?);
            }
        }
    }
    Ok(())
}

fn print_response(response: &Response) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Opt::command().debug_assert();
    }

    #[test]
    fn parse_exec() {
        let opt = Opt::try_parse_from([
            "notes-demo",
            "--log",
            "debug",
            "exec",
            "{ greet }",
            "--demo",
            "greetings",
            "--variables",
            r#"{"person":"Michael"}"#,
        ])
        .unwrap();
        assert_eq!(opt.log_level, "debug");
        match opt.command {
            Command::Exec {
                query,
                demo,
                operation_name,
                variables,
            } => {
                assert_eq!(query, "{ greet }");
                assert_eq!(demo, Demo::Greetings);
                assert_eq!(operation_name, None);
                assert_eq!(variables.as_deref(), Some(r#"{"person":"Michael"}"#));
            }
            command => panic!("unexpected command {command:?}"),
        }
    }

    #[test]
    fn unknown_demo() {
        assert!(Opt::try_parse_from(["notes-demo", "demo", "weather"]).is_err());
    }
}
