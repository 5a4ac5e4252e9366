//! # Etiqueta CLI
//!
//! Command-line interface for BLE thermal label printing.
//!
//! ## Usage
//!
//! ```bash
//! # Scan for nearby devices (10 seconds)
//! etiqueta scan
//!
//! # Print text to a printer found by scan
//! etiqueta --address AA:BB:CC:DD:EE:FF text "<C><B>Hello"
//!
//! # Remember the printer, then print without --address
//! etiqueta --address AA:BB:CC:DD:EE:FF --remember text "hi"
//! etiqueta text "hi again"
//!
//! # Preview text as a PNG without a printer
//! etiqueta text "<C>Hello" --png preview.png
//!
//! # Print an image or a QR code
//! etiqueta image photo.png
//! etiqueta qr "https://example.com"
//!
//! # Forget the remembered printer
//! etiqueta forget
//! ```

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use etiqueta::{
    EtiquetaError,
    backend::BtleBackend,
    discovery::Discovery,
    manager::{ConnectionManager, Notifier},
    prefs::{FilePreferenceStore, PreferenceStore},
    printer::Printer,
    render::{self, TextAlign},
};

/// Etiqueta - BLE thermal label printer utility
#[derive(Parser, Debug)]
#[command(name = "etiqueta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Printer address (from `scan`); falls back to the remembered printer
    #[arg(long, global = true)]
    address: Option<String>,

    /// Remember this printer and reconnect silently next time
    #[arg(long, global = true)]
    remember: bool,

    /// Preference file location
    #[arg(long, global = true, default_value = "etiqueta-printer.json")]
    prefs: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan for nearby Bluetooth devices
    Scan {
        /// How long to scan, in seconds
        #[arg(long, default_value = "10")]
        duration: u64,
    },

    /// Print styled text (inline tags: <L> <C> <R> <B> <I> <U>)
    Text {
        text: String,

        /// Default alignment for untagged lines
        #[arg(long, value_enum, default_value = "left")]
        align: AlignArg,

        /// Render to a PNG file instead of printing
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,
    },

    /// Print an image file, scaled to the paper width
    Image { path: PathBuf },

    /// Encode text as a QR code and print it
    Qr { data: String },

    /// Forget the remembered printer
    Forget,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AlignArg {
    Left,
    Center,
    Right,
}

impl From<AlignArg> for TextAlign {
    fn from(value: AlignArg) -> Self {
        match value {
            AlignArg::Left => TextAlign::Left,
            AlignArg::Center => TextAlign::Center,
            AlignArg::Right => TextAlign::Right,
        }
    }
}

/// Notifier printing toasts to stdout and asking confirmations on stdin.
struct ConsoleNotifier {
    /// When set, confirmations are answered yes without prompting
    /// (the `--remember` flag).
    assume_yes: bool,
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn toast(&self, message: &str) {
        println!("{message}");
    }

    async fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        println!("{question} [y/N]");
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        if reader.read_line(&mut line).await.is_err() {
            return false;
        }
        matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), EtiquetaError> {
    let cli = Cli::parse();
    let prefs = Arc::new(FilePreferenceStore::new(&cli.prefs));

    match cli.command {
        Commands::Scan { duration } => {
            let backend = Arc::new(BtleBackend::new().await?);
            scan(backend, duration).await
        }
        Commands::Text { text, align, png } => {
            if let Some(path) = png {
                let bitmap = render::render_text(&text, align.into(), &Default::default());
                bitmap
                    .save(&path)
                    .map_err(|e| EtiquetaError::App(format!("failed to save PNG: {e}")))?;
                println!("Saved to {}", path.display());
                return Ok(());
            }
            let manager = connect(&cli.address, cli.remember, prefs).await?;
            let peripheral = connected_peripheral(&manager).await?;
            Printer::new(&*peripheral)
                .print_text(&text, align.into())
                .await?;
            finish(&manager)
        }
        Commands::Image { path } => {
            let bytes = tokio::fs::read(&path).await?;
            let manager = connect(&cli.address, cli.remember, prefs).await?;
            let peripheral = connected_peripheral(&manager).await?;
            Printer::new(&*peripheral).print_image(&bytes).await?;
            finish(&manager)
        }
        Commands::Qr { data } => {
            let bytes = encode_qr(&data)?;
            let manager = connect(&cli.address, cli.remember, prefs).await?;
            let peripheral = connected_peripheral(&manager).await?;
            Printer::new(&*peripheral).print_qr(&bytes).await?;
            finish(&manager)
        }
        Commands::Forget => {
            prefs.clear().await?;
            println!("Forgot the remembered printer");
            Ok(())
        }
    }
}

async fn scan(backend: Arc<BtleBackend>, duration: u64) -> Result<(), EtiquetaError> {
    use std::time::Duration;

    let discovery = Discovery::new(backend);
    let mut session = discovery.start().await?;

    println!("Scanning for {duration}s...");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(duration);
    loop {
        let device = tokio::select! {
            d = session.recv() => d,
            _ = tokio::time::sleep_until(deadline) => break,
        };
        match device {
            Some(d) => println!("  [{}] {} ({})", d.icon, d.name, d.address),
            None => break,
        }
    }
    Ok(())
}

/// Resolve the target printer and connect: explicit `--address` first,
/// remembered printer second.
async fn connect(
    address: &Option<String>,
    remember: bool,
    prefs: Arc<FilePreferenceStore>,
) -> Result<ConnectionManager<BtleBackend>, EtiquetaError> {
    let backend = Arc::new(BtleBackend::new().await?);
    let notifier = Arc::new(ConsoleNotifier {
        assume_yes: remember,
    });
    let manager = ConnectionManager::new(backend, prefs, notifier);

    match address {
        Some(address) => manager.connect(address).await?,
        None => {
            if !manager.reconnect_on_startup().await? {
                return Err(EtiquetaError::App(
                    "no printer remembered; run `etiqueta scan` and pass --address".to_string(),
                ));
            }
        }
    }
    Ok(manager)
}

async fn connected_peripheral(
    manager: &ConnectionManager<BtleBackend>,
) -> Result<Arc<etiqueta::backend::btle::BtlePeripheral>, EtiquetaError> {
    manager
        .peripheral()
        .await
        .ok_or_else(|| EtiquetaError::App("not connected".to_string()))
}

// Note: no disconnect here. A manual disconnect forgets the remembered
// printer; ending the process just drops the link.
fn finish(_manager: &ConnectionManager<BtleBackend>) -> Result<(), EtiquetaError> {
    println!("Printed successfully!");
    Ok(())
}

/// Encode text as a QR code, returned as PNG bytes for the image
/// render pipeline.
fn encode_qr(data: &str) -> Result<Vec<u8>, EtiquetaError> {
    let code = qrcode::QrCode::new(data.as_bytes())
        .map_err(|e| EtiquetaError::App(format!("QR encoding failed: {e}")))?;
    let bitmap = code
        .render::<image::Luma<u8>>()
        .quiet_zone(false)
        .module_dimensions(4, 4)
        .build();

    let mut bytes = Vec::new();
    bitmap
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| EtiquetaError::App(format!("QR render failed: {e}")))?;
    Ok(bytes)
}
