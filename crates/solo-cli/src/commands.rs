//! Command handlers

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use solo_core::config::SETTINGS_FILE;
use solo_core::{prompt_local_config, ChartOptions, CreateRequest, HelmError, K8Error, PromptFlags, RemoteConfigError, Target};
use solo_mapper::{to_object, to_yaml_string};
use solo_model::{
    BaseComponent, ClusterRef, ComponentId, ComponentType, ConsensusNodeComponent, Deployment, DeploymentPhase,
    LedgerPhase, RemoteConfigData,
};

use crate::context::AppContext;
use crate::prompt::StdinPrompter;

fn required<'a>(args: &'a ArgMatches, id: &str) -> Result<&'a String> {
    args.get_one::<String>(id)
        .ok_or_else(|| anyhow!("missing required argument --{id}"))
}

fn cluster_refs(args: &ArgMatches) -> Vec<ClusterRef> {
    args.get_many::<String>("cluster-ref")
        .map(|refs| refs.map(|r| ClusterRef::new(r.as_str())).collect())
        .unwrap_or_default()
}

/// Dispatch a parsed command line
pub(crate) async fn run(ctx: &AppContext, matches: &ArgMatches) -> Result<()> {
    let deployment = matches.get_one::<String>("deployment").map(String::as_str);
    match matches.subcommand() {
        Some(("init", _)) => init(ctx),
        Some(("context", sub)) => match sub.subcommand() {
            Some(("connect", args)) => context_connect(ctx, args, deployment).await,
            _ => bail!("unknown context command"),
        },
        Some(("cluster", sub)) => match sub.subcommand() {
            Some(("setup", args)) => cluster_setup(ctx, args).await,
            Some(("reset", args)) => cluster_reset(ctx, args, deployment).await,
            Some(("connect", args)) => cluster_connect(ctx, args).await,
            Some(("list", _)) => cluster_list(ctx).await,
            Some(("info", args)) => cluster_info(ctx, args).await,
            _ => bail!("unknown cluster command"),
        },
        Some(("deployment", sub)) => match sub.subcommand() {
            Some(("create", args)) => deployment_create(ctx, args).await,
            Some(("list", _)) => deployment_list(ctx).await,
            _ => bail!("unknown deployment command"),
        },
        Some(("remote-config", sub)) => remote_config(ctx, sub, deployment).await,
        Some(("local-config", sub)) => match sub.subcommand() {
            Some(("show", _)) => local_show(ctx).await,
            Some(("set", args)) => local_set(ctx, args).await,
            _ => bail!("unknown local-config command"),
        },
        _ => bail!("no command given (see --help)"),
    }
}

fn init(ctx: &AppContext) -> Result<()> {
    let home = &ctx.settings.home;
    std::fs::create_dir_all(home).with_context(|| format!("creating {}", home.display()))?;

    let settings_path = home.join(SETTINGS_FILE);
    if !settings_path.exists() {
        let text = toml::to_string_pretty(&ctx.settings).context("rendering default settings")?;
        std::fs::write(&settings_path, text).with_context(|| format!("writing {}", settings_path.display()))?;
    }
    println!("solo home: {}", home.display());
    println!("settings:  {}", settings_path.display());
    Ok(())
}

async fn context_connect(ctx: &AppContext, args: &ArgMatches, deployment: Option<&str>) -> Result<()> {
    let flags = PromptFlags {
        email: args.get_one::<String>("email").cloned(),
        deployment: deployment.map(str::to_string),
        namespace: args.get_one::<String>("namespace").cloned(),
        clusters: cluster_refs(args),
        context: args.get_one::<String>("context").cloned(),
        quiet: ctx.quiet,
    };
    let local = prompt_local_config(&ctx.store, &flags, &StdinPrompter, ctx.k8.as_ref(), ctx.identity.clone())
        .await
        .context("connecting local config")?;

    println!(
        "current deployment: {}",
        local.current_deployment_name().unwrap_or("<none>")
    );
    for (cluster, context) in local.cluster_refs() {
        println!("  {cluster} -> {context}");
    }
    Ok(())
}

async fn cluster_setup(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let context = match args.get_one::<String>("context") {
        Some(context) => context.clone(),
        None => ctx.k8.current_context().await?,
    };
    let charts = &ctx.settings.charts;
    let target = Target::new(&context, &charts.cluster_setup_namespace);
    if !ctx.k8.namespace_exists(&target).await? {
        ctx.k8.create_namespace(&target).await?;
    }

    let mut options = ChartOptions::new(&charts.cluster_setup_namespace)
        .with_context(&context)
        .with_wait(true);
    if let Some(version) = args.get_one::<String>("chart-version") {
        options = options.with_version(version);
    }
    ctx.helm
        .install(&charts.cluster_setup_release, &charts.cluster_setup_chart, &options)
        .await
        .with_context(|| format!("installing {} on {context}", charts.cluster_setup_release))?;
    println!("cluster setup installed on {context}");
    Ok(())
}

async fn cluster_reset(ctx: &AppContext, args: &ArgMatches, deployment: Option<&str>) -> Result<()> {
    let local = ctx.local().await?;
    let target = ctx.target(&local, deployment)?;
    match ctx.remote.delete(&target).await {
        Ok(()) => println!("remote config removed from {target}"),
        Err(e) if e.is_not_found() => {
            tracing::info!(context = %target.context, namespace = %target.namespace, "no remote config to remove");
        }
        Err(e) => return Err(e).context("removing remote config"),
    }

    if args.get_flag("keep-setup") {
        return Ok(());
    }
    let charts = &ctx.settings.charts;
    let options = ChartOptions::new(&charts.cluster_setup_namespace).with_context(&target.context);
    match ctx.helm.uninstall(&charts.cluster_setup_release, &options).await {
        Ok(()) => println!("cluster setup removed from {}", target.context),
        Err(HelmError::ReleaseNotFound { .. }) => tracing::info!("cluster setup not installed"),
        Err(e) => return Err(e).context("removing cluster setup"),
    }
    Ok(())
}

async fn cluster_connect(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let cluster = ClusterRef::new(required(args, "cluster-ref")?.as_str());
    let context = required(args, "context")?;
    if !ctx.k8.list_contexts().await?.contains(context) {
        return Err(K8Error::ContextNotFound(context.clone()).into());
    }

    let mut local = ctx.local().await?;
    local.set_cluster_context(cluster.clone(), context.as_str())?;
    ctx.store.write(&local).await?;
    println!("{cluster} -> {context}");
    Ok(())
}

async fn cluster_list(ctx: &AppContext) -> Result<()> {
    let local = ctx.local().await?;
    for (cluster, context) in local.cluster_refs() {
        println!("{cluster}\t{context}");
    }
    Ok(())
}

async fn cluster_info(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let cluster = ClusterRef::new(required(args, "cluster-ref")?.as_str());
    let local = ctx.local().await?;
    let context = local
        .context_for(&cluster)
        .ok_or_else(|| anyhow!("cluster '{cluster}' has no kube context"))?;

    println!("cluster:  {cluster}");
    println!("context:  {context}");
    for deployment in local.deployments().iter().filter(|d| d.clusters.contains(&cluster)) {
        let target = Target::new(context, &deployment.namespace);
        let present = ctx.k8.namespace_exists(&target).await?;
        println!(
            "deployment {} in {} ({})",
            deployment.name,
            deployment.namespace,
            if present { "namespace present" } else { "namespace missing" }
        );
    }
    Ok(())
}

async fn deployment_create(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let name = required(args, "name")?.clone();
    let namespace = required(args, "namespace")?.clone();
    let clusters = cluster_refs(args);
    let Some(primary) = clusters.first().cloned() else {
        bail!("at least one --cluster-ref is required");
    };
    let ledger_phase = match args.get_one::<String>("ledger-phase") {
        Some(phase) => LedgerPhase::from_str(phase)?,
        None => LedgerPhase::Uninitialized,
    };

    let mut local = ctx.local().await?;
    local.add_deployment(Deployment::new(&name, &namespace, clusters))?;
    local.set_current_deployment(&name)?;
    let target = ctx.target(&local, Some(&name))?;
    if !ctx.k8.namespace_exists(&target).await? {
        ctx.k8.create_namespace(&target).await?;
    }

    let mut request = CreateRequest::new(&name, primary, &ctx.command)
        .with_ledger_phase(ledger_phase)
        .with_node_aliases(
            args.get_many::<String>("node-aliases")
                .map(|aliases| aliases.cloned().collect::<Vec<_>>())
                .unwrap_or_default(),
        );
    if let Some(base) = args.get_one::<String>("dns-base-domain") {
        let pattern = args
            .get_one::<String>("dns-consensus-node-pattern")
            .cloned()
            .unwrap_or_else(|| ctx.settings.dns_consensus_node_pattern.clone());
        request = request.with_dns(base, pattern);
    }

    let data = ctx
        .remote
        .create(&target, request, &local)
        .await
        .with_context(|| format!("creating remote config in {target}"))?;
    ctx.store.write(&local).await?;

    println!(
        "deployment {name} created in {target} with {} consensus node(s)",
        data.components.consensus_nodes().count()
    );
    Ok(())
}

async fn deployment_list(ctx: &AppContext) -> Result<()> {
    let local = ctx.local().await?;
    let current = local.current_deployment_name();
    for deployment in local.deployments() {
        let marker = if current == Some(deployment.name.as_str()) { "*" } else { " " };
        let clusters: Vec<&str> = deployment.clusters.iter().map(ClusterRef::as_str).collect();
        println!(
            "{marker} {}\t{}\t{}",
            deployment.name,
            deployment.namespace,
            clusters.join(",")
        );
    }
    Ok(())
}

fn print_yaml<T: serde::Serialize>(document: &T) -> Result<()> {
    print!("{}", to_yaml_string(&to_object(document)?)?);
    Ok(())
}

fn record(mut data: RemoteConfigData, ctx: &AppContext) -> RemoteConfigData {
    data.add_command_to_history(ctx.command.clone(), ctx.settings.max_command_history);
    data
}

async fn remote_config(ctx: &AppContext, sub: &ArgMatches, deployment: Option<&str>) -> Result<()> {
    let local = ctx.local().await?;
    let target = ctx.target(&local, deployment)?;

    match sub.subcommand() {
        Some(("show", _)) => {
            let data = ctx.remote.get(&target).await?;
            print_yaml(&*data)
        }
        Some(("validate", args)) => {
            let data = ctx
                .remote
                .load_and_validate(&target, &ctx.command, true, args.get_flag("skip-consensus-nodes"), &local)
                .await?;
            println!("remote config in {target} is valid ({} components)", data.components.len());
            Ok(())
        }
        Some(("add-node", args)) => {
            let alias = required(args, "alias")?.clone();
            let cluster = match args.get_one::<String>("cluster-ref") {
                Some(cluster) => ClusterRef::new(cluster.as_str()),
                None => local
                    .deployment(&target_deployment(&local, deployment)?)
                    .and_then(|d| d.clusters.first().cloned())
                    .ok_or_else(|| anyhow!("deployment has no clusters"))?,
            };
            let data = ctx
                .remote
                .modify(&target, |mut data| async move {
                    if data.components.consensus_node_by_name(&alias).is_some() {
                        return Err(RemoteConfigError::aborted(format!("consensus node '{alias}' already exists")));
                    }
                    let id = data.components.new_component_index(ComponentType::ConsensusNode);
                    let base = BaseComponent::new(
                        id,
                        alias,
                        cluster,
                        data.metadata.namespace.clone(),
                        DeploymentPhase::Requested,
                    );
                    data.components
                        .add_new_component(ConsensusNodeComponent::new(base, id.as_u32()))?;
                    Ok(record(data, ctx))
                })
                .await?;
            println!("consensus nodes: {}", data.components.consensus_nodes().count());
            Ok(())
        }
        Some(("set-phase", args)) => {
            let component_type = ComponentType::from_str(required(args, "type")?)?;
            let id = ComponentId::new(
                *args
                    .get_one::<u32>("id")
                    .ok_or_else(|| anyhow!("missing required argument --id"))?,
            );
            let phase = DeploymentPhase::from_str(required(args, "phase")?)?;
            ctx.remote
                .modify(&target, |mut data| async move {
                    data.components.change_component_phase(component_type, id, phase)?;
                    Ok(record(data, ctx))
                })
                .await?;
            println!("{component_type} {id} is now {phase}");
            Ok(())
        }
        Some(("ledger-phase", args)) => {
            let phase = LedgerPhase::from_str(required(args, "phase")?)?;
            ctx.remote
                .modify(&target, |mut data| async move {
                    data.set_ledger_phase(phase)?;
                    Ok(record(data, ctx))
                })
                .await?;
            println!("ledger phase is now {phase}");
            Ok(())
        }
        Some(("delete-components", _)) => {
            ctx.remote.delete_components(&target).await?;
            println!("components removed from {target}");
            Ok(())
        }
        _ => bail!("unknown remote-config command"),
    }
}

fn target_deployment(local: &solo_model::LocalConfig, deployment: Option<&str>) -> Result<String> {
    deployment
        .or_else(|| local.current_deployment_name())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("no current deployment (pass --deployment)"))
}

async fn local_show(ctx: &AppContext) -> Result<()> {
    let local = ctx.local().await?;
    print_yaml(&local)
}

async fn local_set(ctx: &AppContext, args: &ArgMatches) -> Result<()> {
    let key = required(args, "key")?;
    let value = required(args, "value")?;
    let mut local = ctx.local().await?;
    local
        .set_property(key, value)
        .with_context(|| format!("setting {key}"))?;
    ctx.store.write(&local).await?;
    println!("{key} = {value}");
    Ok(())
}
