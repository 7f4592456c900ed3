use anyhow::Result;
use barcam::{
    BarcamConfig, CaptureDeviceBuilder, KeyboardInputHandler, ScanResult, SessionController,
};
use clap::Parser;
use tracing::{error, info};

const EXIT_DECODED: i32 = 0;
const EXIT_FAILED: i32 = 1;
const EXIT_CANCELLED: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "barcam")]
#[command(about = "Scan a barcode from a live camera feed")]
#[command(version)]
#[command(long_about = "Samples frames from a live camera, normalizes their pixel format and \
tries to decode a barcode from each one until a code is found or the scan is cancelled. \
Press ESC, q, SPACE or Ctrl+C to cancel. Prints the decoded text on stdout.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "barcam.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without scanning")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting barcam v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match BarcamConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match config.validate() {
        Ok(()) if args.validate_config => {
            info!("Configuration validation successful");
            println!("✓ Configuration is valid");
            return Ok(());
        }
        Ok(()) => {}
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            eprintln!("✗ Configuration validation failed: {}", e);
            std::process::exit(EXIT_FAILED);
        }
    }

    let device = CaptureDeviceBuilder::new()
        .config(config.camera.clone())
        .build()
        .map_err(|e| {
            error!("Failed to create capture device: {}", e);
            e
        })?;

    let controller = SessionController::builder()
        .config(config.scan.clone())
        .device(device)
        .build()?;

    let handle = controller.start()?;
    info!("Scan session {} started", handle.id());

    let keyboard = KeyboardInputHandler::new(controller.clone());
    keyboard.start().await?;

    let ctrl_c_controller = controller.clone();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received SIGINT signal (Ctrl+C)");
            ctrl_c_controller.cancel();
        }
    });

    let result = handle.result().await;
    keyboard.stop().await?;

    let exit_code = match result {
        ScanResult::Decoded(text) => {
            println!("{}", text);
            EXIT_DECODED
        }
        ScanResult::Cancelled => {
            info!("Scan cancelled");
            EXIT_CANCELLED
        }
        ScanResult::Failed(e) => {
            error!("Scan failed: {}", e);
            eprintln!("✗ Scan failed: {}", e);
            EXIT_FAILED
        }
    };

    info!("barcam exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("barcam={}", log_level)));

    // Logs go to stderr; stdout carries only the decoded text
    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# barcam configuration file");
    println!("# Override any value with BARCAM_<SECTION>__<KEY> (BARCAM_SCAN__MAX_ATTEMPTS=50)");
    println!("# camera.preview_rotation (optional): \"Rotate90\", \"Rotate180\", \"Rotate270\"");
    println!();

    let default_config = BarcamConfig::default().to_toml()?;
    println!("{}", default_config);

    Ok(())
}
