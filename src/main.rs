//! Binary entry point for the Stevedore CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8PathBuf;
use clap::Parser;
use thiserror::Error;

use stevedore::{
    ApplyError, ApplyOrchestrator, ApplyOutcome, ConfigError, HttpProviderClient, MachineConfig,
    MachineController, MachineState, OperationHandle, ProviderConfig, ProviderError, ResourceId,
    StateFile,
};

mod cli;

use cli::{Cli, Command, ManifestArgs, WaitArgs};

#[cfg(test)]
mod test_helpers;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match dispatch(cli.command, &mut io::stdout()).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("STEVEDORE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn dispatch(command: Command, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        Command::Apply(args) => {
            let manifest = MachineConfig::load(&manifest_path(&args))?;
            let outcome = orchestrator(&args, &manifest)?.apply(&manifest).await?;
            write_outcome(out, &outcome)?;
        }
        Command::Destroy(args) => {
            let manifest = MachineConfig::load(&manifest_path(&args))?;
            match orchestrator(&args, &manifest)?.destroy().await? {
                Some(machine_id) => writeln!(out, "deleted machine {machine_id}")?,
                None => writeln!(out, "nothing to delete")?,
            }
        }
        Command::Show(args) => {
            let manifest = MachineConfig::load(&manifest_path(&args))?;
            let machine = orchestrator(&args, &manifest)?.show().await?;
            write_machine(out, &machine)?;
        }
        Command::Wait(args) => wait(args, out).await?,
    }
    Ok(())
}

fn load_config() -> Result<ProviderConfig, ConfigError> {
    let config = ProviderConfig::load_without_cli_args()?;
    config.validate()?;
    Ok(config)
}

fn manifest_path(args: &ManifestArgs) -> Utf8PathBuf {
    Utf8PathBuf::from(&args.manifest)
}

fn state_file(args: &ManifestArgs) -> StateFile {
    args.state.as_ref().map_or_else(
        || StateFile::beside(&manifest_path(args)),
        |path| StateFile::new(path.as_str()),
    )
}

fn orchestrator(
    args: &ManifestArgs,
    manifest: &MachineConfig,
) -> Result<ApplyOrchestrator<HttpProviderClient, StateFile>, CliError> {
    let config = load_config()?;
    let defaults = config.default_placement();
    let placement = manifest.placement(&defaults);
    let client = HttpProviderClient::from_config(&config, &placement.region)?;
    let controller = MachineController::new(client, config.poll_policy());
    Ok(ApplyOrchestrator::new(controller, state_file(args), defaults))
}

async fn wait(args: WaitArgs, out: &mut impl Write) -> Result<(), CliError> {
    let config = load_config()?;
    let region = args
        .region
        .unwrap_or_else(|| config.default_region.clone());
    let client = HttpProviderClient::from_config(&config, &region)?;
    let controller = MachineController::new(client, config.poll_policy());
    let handle = OperationHandle::new(args.operation_id);
    let resources = controller.tracker().await_completion(&handle).await?;
    write_resources(out, &handle, &resources)?;
    Ok(())
}

fn write_outcome(out: &mut impl Write, outcome: &ApplyOutcome) -> io::Result<()> {
    let verb = match outcome {
        ApplyOutcome::Created(_) => "created",
        ApplyOutcome::Updated(_) => "updated",
    };
    writeln!(out, "{verb} machine {}", outcome.machine().id)?;
    write_machine(out, outcome.machine())
}

fn write_machine(out: &mut impl Write, machine: &MachineState) -> io::Result<()> {
    writeln!(out, "id:         {}", machine.id)?;
    writeln!(out, "name:       {}", machine.name)?;
    writeln!(out, "status:     {}", machine.status)?;
    writeln!(out, "size class: {}", machine.size_class)?;
    writeln!(out, "image:      {}", machine.image)?;
    if let Some(description) = &machine.description {
        writeln!(out, "about:      {description}")?;
    }
    if !machine.tags.is_empty() {
        writeln!(out, "tags:       {}", machine.tags.join(", "))?;
    }
    if machine.volumes.is_empty() {
        writeln!(out, "volumes:    none")?;
    } else {
        writeln!(out, "volumes:")?;
        for volume in &machine.volumes {
            match &volume.name {
                Some(name) => writeln!(out, "  - {} ({name})", volume.id)?,
                None => writeln!(out, "  - {}", volume.id)?,
            }
        }
    }
    Ok(())
}

fn write_resources(
    out: &mut impl Write,
    handle: &OperationHandle,
    resources: &[ResourceId],
) -> io::Result<()> {
    writeln!(out, "operation {handle} finished")?;
    for resource in resources {
        writeln!(out, "  {resource}")?;
    }
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
