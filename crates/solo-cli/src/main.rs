//! `solo` command line

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod prompt;

use context::AppContext;

fn cluster_ref_arg() -> Arg {
    Arg::new("cluster-ref").long("cluster-ref").help("Cluster ref")
}

fn cluster_refs_arg() -> Arg {
    cluster_ref_arg()
        .value_delimiter(',')
        .action(ArgAction::Append)
        .help("Cluster refs; repeat or separate with commas")
}

fn required_flag(id: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(id).required(true).help(help)
}

fn cli() -> Command {
    Command::new("solo")
        .version(solo_core::VERSION)
        .about("Deploy and manage Hedera test networks on Kubernetes")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("home")
                .long("home")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Solo home directory (defaults to $SOLO_HOME or ~/.solo)"),
        )
        .arg(
            Arg::new("deployment")
                .long("deployment")
                .short('d')
                .global(true)
                .help("Deployment to act on (defaults to the current deployment)"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Never prompt; use flags and defaults"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
        .subcommand(Command::new("init").about("Create the solo home directory and default settings"))
        .subcommand(
            Command::new("context")
                .about("Operator context")
                .subcommand_required(true)
                .subcommand(
                    Command::new("connect")
                        .about("Create or extend the local config")
                        .arg(Arg::new("email").long("email").help("Operator email address"))
                        .arg(Arg::new("namespace").long("namespace").help("Deployment namespace"))
                        .arg(cluster_refs_arg())
                        .arg(Arg::new("context").long("context").help("Kube context for new clusters")),
                ),
        )
        .subcommand(
            Command::new("cluster")
                .about("Cluster setup and mappings")
                .subcommand_required(true)
                .subcommand(
                    Command::new("setup")
                        .about("Install the cluster setup chart")
                        .arg(Arg::new("context").long("context").help("Kube context (defaults to current)"))
                        .arg(Arg::new("chart-version").long("chart-version").help("Chart version")),
                )
                .subcommand(
                    Command::new("reset")
                        .about("Remove the remote config and the cluster setup chart")
                        .arg(
                            Arg::new("keep-setup")
                                .long("keep-setup")
                                .action(ArgAction::SetTrue)
                                .help("Leave the cluster setup chart installed"),
                        ),
                )
                .subcommand(
                    Command::new("connect")
                        .about("Map a cluster ref to a kube context")
                        .arg(cluster_ref_arg().required(true))
                        .arg(Arg::new("context").long("context").required(true).help("Kube context")),
                )
                .subcommand(Command::new("list").about("List cluster refs"))
                .subcommand(
                    Command::new("info")
                        .about("Show a cluster ref")
                        .arg(cluster_ref_arg().required(true)),
                ),
        )
        .subcommand(
            Command::new("deployment")
                .about("Deployments")
                .subcommand_required(true)
                .subcommand(
                    Command::new("create")
                        .about("Register a deployment and create its remote config")
                        .arg(Arg::new("name").required(true).help("Deployment name"))
                        .arg(Arg::new("namespace").long("namespace").required(true).help("Namespace"))
                        .arg(cluster_refs_arg().required(true))
                        .arg(
                            Arg::new("node-aliases")
                                .long("node-aliases")
                                .value_delimiter(',')
                                .action(ArgAction::Append)
                                .help("Consensus node aliases, e.g. node1,node2"),
                        )
                        .arg(Arg::new("ledger-phase").long("ledger-phase").help("Initial ledger phase"))
                        .arg(Arg::new("dns-base-domain").long("dns-base-domain").help("DNS base domain"))
                        .arg(
                            Arg::new("dns-consensus-node-pattern")
                                .long("dns-consensus-node-pattern")
                                .help("Consensus node service pattern"),
                        ),
                )
                .subcommand(Command::new("list").about("List deployments")),
        )
        .subcommand(
            Command::new("remote-config")
                .about("Remote config of a deployment")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Print the remote config"))
                .subcommand(
                    Command::new("validate")
                        .about("Record this command and check components against the cluster")
                        .arg(
                            Arg::new("skip-consensus-nodes")
                                .long("skip-consensus-nodes")
                                .action(ArgAction::SetTrue)
                                .help("Do not check consensus node pods"),
                        ),
                )
                .subcommand(
                    Command::new("add-node")
                        .about("Add a requested consensus node")
                        .arg(Arg::new("alias").long("alias").required(true).help("Node alias"))
                        .arg(cluster_ref_arg()),
                )
                .subcommand(
                    Command::new("set-phase")
                        .about("Move a component to a new phase")
                        .arg(required_flag("type", "Component type, e.g. consensus-node"))
                        .arg(
                            Arg::new("id")
                                .long("id")
                                .required(true)
                                .value_parser(value_parser!(u32))
                                .help("Component id"),
                        )
                        .arg(required_flag("phase", "Deployment phase, e.g. deployed")),
                )
                .subcommand(
                    Command::new("ledger-phase")
                        .about("Move the ledger to a new phase")
                        .arg(Arg::new("phase").required(true).help("Ledger phase")),
                )
                .subcommand(Command::new("delete-components").about("Remove every component")),
        )
        .subcommand(
            Command::new("local-config")
                .about("Local config")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Print the local config"))
                .subcommand(
                    Command::new("set")
                        .about("Set a field by dotted path")
                        .arg(Arg::new("key").required(true).help("Dotted path, e.g. deployments.0.realm"))
                        .arg(Arg::new("value").required(true).help("New value")),
                ),
        )
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let command = std::env::args().collect::<Vec<_>>().join(" ");
    let ctx = AppContext::new(
        matches.get_one::<PathBuf>("home").map(PathBuf::as_path),
        matches.get_flag("quiet"),
        command,
    )?;
    commands::run(&ctx, matches).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    match run(&matches).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
