//! BOGO command line tool

use std::{
    io::{self, Write},
    process::ExitCode,
};

use anyhow::Context;
use tracing::info;

use bogo::{
    fixtures::Fixture,
    report,
    settings::{MemorySettings, SelectionInput, SettingsPatch, SettingsStore},
};

use crate::cli::{CliConfig, Command, ConfigureArgs, SimulateArgs};

mod cli;

fn main() -> ExitCode {
    let config = match CliConfig::load() {
        Ok(config) => config,
        Err(e) => {
            _ = e.print();

            return ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1));
        }
    };

    if let Err(e) = cli::logging::init_subscriber(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized, must use eprintln for setup errors"
        )]
        {
            eprintln!("Failed to initialise logging: {e}");
        }

        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            #[expect(
                clippy::print_stderr,
                reason = "command errors are reported to the user on stderr"
            )]
            {
                eprintln!("Error: {e:#}");
            }

            ExitCode::FAILURE
        }
    }
}

fn run(config: &CliConfig) -> anyhow::Result<()> {
    match &config.command {
        Command::Status => status(config),
        Command::Configure(args) => configure(config, args),
        Command::Simulate(args) => simulate(args),
    }
}

fn status(config: &CliConfig) -> anyhow::Result<()> {
    let settings = MemorySettings::load(&config.settings)
        .with_context(|| format!("loading {}", config.settings.display()))?;

    let out = io::stdout().lock();

    report::write_status(out, &settings.status(), settings.selected_products())?;

    Ok(())
}

fn configure(config: &CliConfig, args: &ConfigureArgs) -> anyhow::Result<()> {
    let mut settings = MemorySettings::load(&config.settings)
        .with_context(|| format!("loading {}", config.settings.display()))?;

    settings.apply(&SettingsPatch {
        enabled: args.enabled.clone(),
        scope: args.scope.clone(),
        selected_products: args.products.clone().map(SelectionInput::Csv),
    });

    settings
        .save(&config.settings)
        .with_context(|| format!("saving {}", config.settings.display()))?;

    info!(path = %config.settings.display(), status = ?settings.status(), "settings saved");

    let mut out = io::stdout().lock();

    writeln!(out, "Settings saved.")?;

    report::write_status(out, &settings.status(), settings.selected_products())?;

    Ok(())
}

fn simulate(args: &SimulateArgs) -> anyhow::Result<()> {
    let fixture = Fixture::from_set_in(&args.fixtures, &args.name)
        .with_context(|| format!("loading fixture set {}", args.name))?;

    let simulation = fixture.run()?;

    info!(
        name = %args.name,
        lines = simulation.order.lines.len(),
        total = %simulation.order.total,
        "simulation complete"
    );

    let mut out = io::stdout().lock();

    report::write_order(&mut out, &simulation.order, &simulation.display_names)?;

    if let Some(snapshot) = &simulation.snapshot {
        writeln!(out, "Last saved session:")?;
        writeln!(out, "{}", serde_norway::to_string(snapshot)?)?;
    }

    Ok(())
}
