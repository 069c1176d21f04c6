use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use zeroize::Zeroizing;

use protondrive_common::models::SyncProgressLine;
use protondrive_core::eventbus::spawn_observer_task;
use protondrive_core::{ConnectionController, ControllerConfig, EventBus};

mod console;
use console::ConsoleObserver;

const PASSWORD_ENV: &str = "PROTONDRIVE_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "protondrive")]
#[command(author, version, about = "Configure, test and use a Proton Drive remote through rclone")]
struct Args {
    /// JSON configuration file (defaults to <config dir>/protondrive-linux/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Name of the rclone remote
    #[arg(long, global = true)]
    remote: Option<String>,

    /// Path to the rclone executable
    #[arg(long, global = true)]
    rclone: Option<PathBuf>,

    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check rclone and test the stored remote
    Status,

    /// Create (or replace) the remote. The password is read from
    /// PROTONDRIVE_PASSWORD or from one line of stdin.
    Configure {
        #[arg(long)]
        email: String,

        /// Current two-factor code
        #[arg(long)]
        otp: Option<String>,
    },

    /// List the folders under a remote path
    Browse {
        #[arg(default_value = "")]
        path: String,
    },

    /// Sync a local directory into the remote
    Sync {
        local: PathBuf,

        #[arg(default_value = "")]
        remote: String,
    },

    /// Mount the remote until Ctrl-C
    Mount { mount_point: PathBuf },

    /// Poll the connection and print changes until Ctrl-C
    Watch,

    /// Print the stored remote without secrets
    Show,
}

fn init_tracing(verbose: bool) {
    let directive = if verbose { "protondrive=debug" } else { "protondrive=info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(directive.parse().unwrap_or_default());
    let sub = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {}", e);
    }
}

fn load_config(args: &Args) -> anyhow::Result<ControllerConfig> {
    let mut config = ControllerConfig::load(args.config.as_deref())?;
    if let Some(remote) = &args.remote {
        config.remote_name = remote.clone();
    }
    if let Some(binary) = &args.rclone {
        config.rclone_binary = binary.clone();
    }
    config.validate()?;
    Ok(config)
}

fn read_password() -> anyhow::Result<Zeroizing<String>> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(Zeroizing::new(password));
    }
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = Zeroizing::new(String::new());
    std::io::stdin().read_line(&mut line)?;
    Ok(Zeroizing::new(line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(&args)?;
    info!("Using remote '{}' via {}", config.remote_name, config.rclone_binary.display());

    let bus = EventBus::new();
    let controller = Arc::new(ConnectionController::with_rclone(config, bus.clone()));
    let observer = spawn_observer_task(&bus, Arc::new(ConsoleObserver), None).await;

    let result = run(args.command, &controller).await;

    bus.shutdown();
    if let Err(e) = observer.await {
        warn!("Observer task failed: {:?}", e);
    }
    result
}

async fn run(command: Command, controller: &Arc<ConnectionController>) -> anyhow::Result<()> {
    let state = controller.initialize().await?;

    match command {
        Command::Status => {
            if state.has_profile() {
                if let Err(e) = controller.probe().await {
                    debug!("Connection test failed: {}", e);
                }
            }
            println!("{} ({})", controller.state().await, controller.status().await);
        }
        Command::Configure { email, otp } => {
            if let Some(user) = controller.stored_user().await {
                if user != email {
                    info!("Replacing remote configured for {}", user);
                }
            }
            let password = read_password()?;
            controller.configure(&email, password, otp.as_deref()).await?;
            println!("{}", controller.state().await);
        }
        Command::Browse { path } => {
            let listing = controller.list_remote_folder(&path).await?;
            for entry in &listing.entries {
                match &entry.modified {
                    Some(modified) => println!("{}  {}", modified, entry.name),
                    None => println!("{}", entry.name),
                }
            }
        }
        Command::Sync { local, remote } => {
            let mut progress = controller.sync_local_to_remote(&local, &remote).await?;
            loop {
                tokio::select! {
                    line = progress.next() => match line {
                        Some(SyncProgressLine::Output { text, .. }) => println!("{}", text),
                        Some(SyncProgressLine::Finished { .. }) => {}
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        warn!("Interrupted, stopping sync");
                        progress.cancel();
                    }
                }
            }
            let summary = progress.finish().await?;
            println!("{} lines, {} transfer updates", summary.lines, summary.transfer_lines);
        }
        Command::Mount { mount_point } => {
            let mut handle = controller.mount(&mount_point).await?;
            println!("Mounted {} on {} (Ctrl-C to unmount)", handle.remote_root(), mount_point.display());
            loop {
                tokio::select! {
                    line = handle.next_line() => match line {
                        Some(line) => println!("{}", line),
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            handle.unmount().await;
        }
        Command::Watch => {
            if state.has_profile() {
                if let Err(e) = controller.probe().await {
                    debug!("Connection test failed: {}", e);
                }
            }
            let poll = controller.start_polling();
            tokio::signal::ctrl_c().await?;
            poll.stop().await;
        }
        Command::Show => {
            println!("{}", controller.show_profile_redacted().await?);
        }
    }
    Ok(())
}
