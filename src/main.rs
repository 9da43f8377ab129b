use std::{io::Write, path::Path, process, sync::Arc};

use tessera::{
    application::{PageComposer, error::AppError},
    config,
    domain::region::{RegionCatalog, region_class},
    infra::{
        access::RoleAccessEvaluator, blocks::default_plugins, error::InfraError, layout::LayoutFile,
        telemetry, title::TokenTitleRenderer,
    },
};
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let report = error.report();
    if dispatcher::has_been_set() {
        error!(error = %report.chain(), source = report.source, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %report.chain(), source = report.source, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Regions(config::RegionsArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Compose(args) => run_compose(settings, args).await,
        config::Command::Regions(args) => run_regions(args).await,
    }
}

async fn run_compose(settings: config::Settings, args: config::ComposeArgs) -> Result<(), AppError> {
    let layout = LayoutFile::load(&args.layout).await?;
    let (variant, contexts) = layout.into_parts();

    let composer = PageComposer::new(
        default_plugins(),
        Arc::new(RoleAccessEvaluator),
        Arc::new(TokenTitleRenderer),
    )
    .with_config((&settings.composer).into());

    let node = composer.render(Arc::new(variant), contexts).await?;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&node)
    } else {
        serde_json::to_string(&node)
    }
    .map_err(|err| AppError::unexpected(format!("failed to encode render tree: {err}")))?;

    write_stdout(&rendered)
}

async fn run_regions(args: config::RegionsArgs) -> Result<(), AppError> {
    let catalog = match args.layout.as_deref() {
        Some(path) => load_catalog(path).await?,
        None => RegionCatalog::default(),
    };

    let mut output = String::new();
    for region in catalog.iter() {
        output.push_str(&format!(
            "{}\t{}\t{}\n",
            region.name,
            region.label,
            region_class(&region.name)
        ));
    }

    write_stdout(output.trim_end())
}

async fn load_catalog(path: &Path) -> Result<RegionCatalog, AppError> {
    let layout = LayoutFile::load(path).await?;
    Ok(layout.regions.unwrap_or_default())
}

fn write_stdout(text: &str) -> Result<(), AppError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{text}")
        .and_then(|_| stdout.flush())
        .map_err(|err| AppError::from(InfraError::from(err)))
}
