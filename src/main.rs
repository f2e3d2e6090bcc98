use clap::Parser;
use hybrid_build_kit::config::cli::Command;
use hybrid_build_kit::utils::{console, logger, validation::Validate};
use hybrid_build_kit::domain::ports::Storage;
use hybrid_build_kit::{
    BuildConfig, BuildContext, BuildError, CliConfig, Environment, Finalizer, Initializer,
    LocalStorage, Platform, Setup,
};
use std::path::PathBuf;
use std::sync::Arc;

type Context = Arc<BuildContext<LocalStorage>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    let root = match cli.root.clone() {
        Some(root) => root,
        None => std::env::current_dir()?,
    };

    let config = match BuildConfig::load(&root, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with(e, "Could not load build configuration."),
    };
    if let Err(e) = config.validate() {
        exit_with(e, "Configuration validation failed.");
    }

    let context = Arc::new(BuildContext::new(LocalStorage::new(root), config));

    match cli.command {
        Command::Initialize { env, platform } => initialize(&context, &env, &platform).await,
        Command::Finalize {
            env,
            platform,
            copy_output,
        } => finalize(&context, env, &platform, copy_output).await,
        Command::Setup { templates, force } => setup(&context, templates, force).await,
    }

    Ok(())
}

async fn initialize(context: &Context, env: &str, platform: &str) {
    const FAILED: &str = "Initialization failed.";
    console::heading("Initializing..");

    let (env, platform) = match parse_target(env, platform) {
        Ok(target) => target,
        Err(e) => exit_with(e, FAILED),
    };

    match Initializer::new(Arc::clone(context), env, platform).run().await {
        Ok(()) => console::finished("Finished initialization."),
        Err(e) => exit_with(e, FAILED),
    }
}

async fn finalize(context: &Context, env: Option<String>, platform: &str, copy_output: bool) {
    const FAILED: &str = "Finalization failed.";

    let Some(env) = env else {
        console::failure("env not specified");
        console::fatal(FAILED);
        std::process::exit(1);
    };
    let (env, platform) = match parse_target(&env, platform) {
        Ok(target) => target,
        Err(e) => exit_with(e, FAILED),
    };

    if !copy_output {
        tracing::info!("nothing to finalize without --copy-output");
        return;
    }

    console::heading("Finalizing..");
    match Finalizer::new(Arc::clone(context), env, platform).copy_output().await {
        Ok(target) => {
            if let Some(target) = target {
                let saved = context.storage().root().join(target);
                console::step(&format!("Output saved to {}", saved.display()));
            }
            console::finished("Finished finalization.");
        }
        Err(e) => exit_with(e, FAILED),
    }
}

async fn setup(context: &Context, templates: Option<PathBuf>, force: bool) {
    match Setup::new(Arc::clone(context), templates, force).run().await {
        Ok(()) => console::finished("Done setting up your project."),
        Err(e) => exit_with(e, "Failed to set up the project."),
    }

    initialize(
        context,
        Environment::Browser.as_str(),
        Platform::Android.as_str(),
    )
    .await;
}

fn parse_target(env: &str, platform: &str) -> Result<(Environment, Platform), BuildError> {
    Ok((env.parse()?, platform.parse()?))
}

fn exit_with(error: BuildError, failure: &str) -> ! {
    tracing::error!(
        "{} (Category: {:?}, Severity: {:?})",
        error,
        error.category(),
        error.severity()
    );

    console::failure(&error.user_friendly_message());
    eprintln!("Suggestion: {}", error.recovery_suggestion());
    console::fatal(failure);

    std::process::exit(error.severity().exit_code());
}
