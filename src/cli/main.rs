// CLI main entry point
// Reads and sets the backlight of every RandR output on the display

use anyhow::Context;
use clap::{Parser, Subcommand};
use randr_backlight::brightness::{BrightnessEngine, OutputReport};
use randr_backlight::config::Config;
use randr_backlight::x11::X11Connector;
use tracing::debug;

#[derive(Parser)]
#[command(name = "randr-backlight")]
#[command(about = "Backlight control through RandR output properties", long_about = None)]
struct Cli {
    /// X display to use instead of the configured one or $DISPLAY
    #[arg(long, global = true)]
    display: Option<String>,

    /// Log every output that is probed or skipped
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current brightness percentage
    Get,

    /// Set every output to a brightness percentage
    Set {
        #[arg(value_parser = parse_percentage)]
        percent: f64,
    },

    /// Raise brightness by a number of percent
    Inc {
        #[arg(value_parser = parse_percentage)]
        percent: f64,
    },

    /// Lower brightness by a number of percent
    Dec {
        #[arg(value_parser = parse_percentage)]
        percent: f64,
    },

    /// List every output and its backlight property
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_percentage(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if !(0.0..=100.0).contains(&value) {
        return Err(format!("{} is outside 0-100", value));
    }
    Ok(value)
}

fn setup_logs(verbose: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,{}={}",
            env!("CARGO_CRATE_NAME"),
            default_level
        ))
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logs(cli.verbose);

    let config = Config::load().context("Failed to load configuration")?;
    let display_name = cli.display.or_else(|| config.display.clone());
    debug!("Using display {:?}", display_name);

    let mut engine =
        BrightnessEngine::new(X11Connector::new(display_name)).with_settle_delay(config.settle_delay());

    match cli.command {
        Commands::Get => {
            let percentage = engine.get_session_brightness()?;
            println!("{:.0}", percentage);
        }
        Commands::Set { percent } => {
            let written = engine.set_session_brightness(percent)?;
            println!("Brightness set to {:.0}% on {} output(s)", percent, written);
        }
        Commands::Inc { percent } => step(&mut engine, percent)?,
        Commands::Dec { percent } => step(&mut engine, -percent)?,
        Commands::List { json } => {
            let reports = engine.probe()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print_reports(&reports);
            }
        }
    }

    Ok(())
}

/// Move the brightness by `delta` percent from its current value
fn step(engine: &mut BrightnessEngine<X11Connector>, delta: f64) -> anyhow::Result<()> {
    let current = engine
        .get_session_brightness()
        .context("Failed to read current brightness")?;
    let target = (current + delta).clamp(0.0, 100.0);
    engine.set_session_brightness(target)?;
    println!("Brightness: {:.0}% -> {:.0}%", current, target);
    Ok(())
}

fn print_reports(reports: &[OutputReport]) {
    println!("Outputs");
    println!("=======");
    for report in reports {
        let name = report.name.as_deref().unwrap_or("?");
        let label = format!(
            "screen {} output {:#x} ({})",
            report.target.screen_index, report.target.output, name
        );
        match (&report.backlight, report.percentage) {
            (Some(backlight), Some(percentage)) => println!(
                "{}: {:?} = {} in [{}, {}] ({:.0}%)",
                label,
                backlight.property,
                backlight.reading.raw,
                backlight.reading.range.min,
                backlight.reading.range.max,
                percentage
            ),
            _ => println!(
                "{}: skipped ({})",
                label,
                report.skipped.as_deref().unwrap_or("no backlight")
            ),
        }
    }
}
