use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use tokio::fs::File;
use tokio::io::{self, AsyncBufRead, AsyncWrite, BufReader};
use zbus::Connection;

use joyweave::cli::{load_profile, main_cli, Args, Commands};
use joyweave::constants::{BUS_NAME, BUS_PATH};
use joyweave::dbus::interface::remapper::RemapperInterface;
use joyweave::input::runtime::Runtime;
use joyweave::input::source::json::JsonLinesSource;
use joyweave::input::target::json::JsonLinesTarget;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();

    let args = Args::parse();
    let Some(cmd) = args.cmd else {
        eprintln!("No command given, see --help");
        process::exit(2);
    };

    let Commands::Run {
        profile,
        input,
        output,
        dbus,
    } = cmd
    else {
        if let Err(e) = main_cli(cmd).await {
            eprintln!("{e}");
            process::exit(1);
        }
        return Ok(());
    };

    run(profile, input, output, dbus).await
}

/// Run the remapper until the input is exhausted, or until interrupted when
/// the control interface is exposed.
async fn run(
    profile: String,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    dbus: bool,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::info!("Starting joyweave v{}", VERSION);

    let (path, profile) = load_profile(&profile)?;
    log::info!("Loaded profile '{}' from {path:?}", profile.name);

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
        Some(input) => Box::new(BufReader::new(File::open(input).await?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let writer: Box<dyn AsyncWrite + Unpin + Send> = match output {
        Some(output) => Box::new(File::create(output).await?),
        None => Box::new(io::stdout()),
    };

    let mut runtime = Runtime::new(&profile)?;
    let client = runtime.client();
    let mut source = JsonLinesSource::new(reader, client.clone());
    let mut target = JsonLinesTarget::new(writer, runtime.subscribe());

    // Setup CTRL+C handler
    let ctrl_c_client = client.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for interrupt: {e}");
            return;
        }
        log::info!("Shutting down");
        if let Err(e) = ctrl_c_client.stop().await {
            log::error!("Failed to stop runtime: {e}");
            process::exit(1);
        }
    });

    // Keep the connection alive for as long as the runtime runs
    let _connection = if dbus {
        let connection = Connection::session().await?;
        let iface = RemapperInterface::new(client.clone(), Some(path.display().to_string()));
        connection.object_server().at(BUS_PATH, iface).await?;
        connection.request_name(BUS_NAME).await?;
        log::info!("Listening on session bus as {BUS_NAME}");
        Some(connection)
    } else {
        None
    };

    let runtime_task = tokio::spawn(async move { runtime.run().await });
    let target_task = tokio::spawn(async move { target.run().await });

    match source.run().await {
        Ok(count) => log::debug!("Forwarded {count} input events"),
        Err(e) => log::error!("Input source failed: {e}"),
    }
    if !dbus {
        client.stop().await?;
    }

    runtime_task.await?;
    match target_task.await? {
        Ok(count) => log::debug!("Wrote {count} output events"),
        Err(e) => log::error!("Output target failed: {e}"),
    }
    log::info!("joyweave has stopped");

    Ok(())
}
