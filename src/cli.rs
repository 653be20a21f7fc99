//! Command-line parsing into a [`CaptureConfig`].
//!
//! Parsing never touches the filesystem or the network, so a bad invocation
//! aborts before any output directory or browser exists.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

use crate::{
    BrowserChannel, CaptureConfig, Error, Result, Viewport, DEFAULT_BROWSER_CHANNEL,
    DEFAULT_EXAMPLES_PATH, DEFAULT_EXPLORER_URL, DEFAULT_OUTPUT_DIR,
};

#[derive(Parser, Debug)]
#[command(
    name = "exshot",
    version,
    about = "Capture screenshots of every page in the examples catalog"
)]
struct Cli {
    /// Path to the examples catalog (JSON)
    #[arg(long = "examples", value_name = "PATH", default_value = DEFAULT_EXAMPLES_PATH)]
    examples: PathBuf,

    /// Output directory for screenshots and manifest.json
    #[arg(long = "out", value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    out: PathBuf,

    /// Fallback URL when an item has no url
    #[arg(long = "default-url", value_name = "URL", default_value = DEFAULT_EXPLORER_URL)]
    default_url: String,

    /// Skip items that do not define their own url
    #[arg(long = "skip-default")]
    skip_default: bool,

    /// Viewport width in pixels
    #[arg(long, value_name = "PX", default_value = "1440", allow_hyphen_values = true)]
    width: String,

    /// Viewport height in pixels
    #[arg(long, value_name = "PX", default_value = "900", allow_hyphen_values = true)]
    height: String,

    /// Navigation timeout in milliseconds (0 disables it)
    #[arg(long, value_name = "MS", default_value = "30000", allow_hyphen_values = true)]
    timeout: String,

    /// Extra delay before each screenshot in milliseconds
    #[arg(long, value_name = "MS", default_value = "1000", allow_hyphen_values = true)]
    delay: String,

    /// Browser channel: chromium, chrome, msedge, an executable, or none
    #[arg(long, value_name = "NAME|none", default_value = DEFAULT_BROWSER_CHANNEL)]
    channel: String,

    /// Number of pages captured concurrently (0 = one per CPU)
    #[arg(long, value_name = "N", default_value_t = 1)]
    jobs: usize,
}

/// What the command line asked for.
#[derive(Debug)]
pub enum ParseOutcome {
    /// Run a capture with this configuration
    Run(CaptureConfig),
    /// Print this text (help or version) and exit successfully
    Help(String),
}

/// Parse command-line tokens (excluding the program name).
pub fn parse_args<I, T>(args: I) -> Result<ParseOutcome>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let argv = std::iter::once(OsString::from("exshot")).chain(args.into_iter().map(Into::into));

    let cli = match Cli::try_parse_from(argv) {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                return Ok(ParseOutcome::Help(e.render().to_string()));
            }
            _ => return Err(Error::Usage(e.render().to_string().trim_end().to_string())),
        },
    };

    cli.into_config().map(ParseOutcome::Run)
}

impl Cli {
    fn into_config(self) -> Result<CaptureConfig> {
        let width = parse_non_negative("width", &self.width)?;
        let height = parse_non_negative("height", &self.height)?;
        let timeout_ms = parse_non_negative("timeout", &self.timeout)?;
        let delay_ms = parse_non_negative("delay", &self.delay)?;

        let jobs = if self.jobs == 0 { num_cpus::get().max(1) } else { self.jobs };

        Ok(CaptureConfig {
            examples_path: self.examples,
            out_dir: self.out,
            default_url: self.default_url,
            skip_default: self.skip_default,
            viewport: Viewport {
                width: to_u32(width),
                height: to_u32(height),
            },
            timeout_ms: to_u64(timeout_ms),
            delay_ms: to_u64(delay_ms),
            channel: BrowserChannel::parse(&self.channel),
            jobs,
        })
    }
}

/// Parse a finite, non-negative decimal number for `option`.
fn parse_non_negative(option: &str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Usage(format!("Missing value for --{}", option)));
    }

    match trimmed.parse::<f64>().ok() {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(Error::InvalidOption {
            option: option.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn to_u32(v: f64) -> u32 {
    v.round().min(u32::MAX as f64) as u32
}

fn to_u64(v: f64) -> u64 {
    v.round().min(u64::MAX as f64) as u64
}
