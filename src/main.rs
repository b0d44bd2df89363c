mod configuration;
mod dispatch;
mod extract;
mod forward;
mod normalize;
mod scrape;
mod session;
mod utilities;
mod vessel;

use clap::Parser;

use crate::utilities::message;

lazy_static::lazy_static! {
    pub static ref DEFAULT_WAIT_TIMEOUT: chrono::Duration = chrono::Duration::seconds(30);
    pub static ref DEFAULT_WAIT_INTERVAL: chrono::Duration = chrono::Duration::seconds(2);
    pub static ref DATETIME_FORMAT: String = "%Y-%m-%d %H:%M:%S".to_string();
    pub static ref LOG_LEVEL: log::Level = log::Level::Info;
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// YAML run configuration; environment variables fill anything it leaves out
    #[arg(long, global = true)]
    configuration: Option<std::path::PathBuf>,

    /// show debug messages
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Command {
    /// scrape one vessel and print its record as JSON
    Scrape {
        provider: crate::vessel::Provider,

        #[arg(long, required_unless_present = "imo")]
        mmsi: Option<String>,

        #[arg(long)]
        imo: Option<String>,

        /// opaque token grouping related events
        #[arg(long)]
        comparison_id: Option<String>,

        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        headless: bool,

        #[arg(long, default_value_t = false)]
        send_to_posthog: bool,
    },
    /// run the scrape described by a repository dispatch event (JSON)
    Dispatch { event: std::path::PathBuf },
    /// send a repository dispatch that starts scrapes in CI
    Trigger {
        target: TriggerTarget,

        #[arg(long)]
        mmsi: Option<String>,

        #[arg(long)]
        imo: Option<String>,

        #[arg(long)]
        comparison_id: Option<String>,

        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        headless: bool,

        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        send_to_posthog: bool,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TriggerTarget {
    Marinetraffic,
    Vesselfinder,
    All,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let arguments = Cli::parse();
    let level = if arguments.verbose {
        log::Level::Debug
    } else {
        *LOG_LEVEL
    };

    let configuration = match &arguments.configuration {
        Some(path) => crate::configuration::RunConfiguration::from_file(path)?,
        None => crate::configuration::RunConfiguration::default(),
    }
    .with_environment(|key| std::env::var(key).ok());

    let mut log = crate::utilities::MessageLog::new(&configuration, level)?;

    match arguments.command {
        Command::Scrape {
            provider,
            mmsi,
            imo,
            comparison_id,
            headless,
            send_to_posthog,
        } => {
            let identifier = match (mmsi, imo) {
                (Some(mmsi), _) => crate::vessel::VesselIdentifier::mmsi(&mmsi)?,
                (None, Some(imo)) => crate::vessel::VesselIdentifier::imo(&imo)?,
                (None, None) => {
                    return Err(Box::new(crate::scrape::ScrapeError::Configuration {
                        message: String::from("either --mmsi or --imo is required"),
                    }))
                }
            };

            let request = crate::scrape::ScrapeRequest {
                provider,
                identifier,
                comparison_id,
                headless,
                send_to_posthog,
            };
            run_scrape(request, &configuration, &mut log)?;
        }
        Command::Dispatch { event } => {
            let event = crate::dispatch::DispatchEvent::from_file(&event)?;
            let record = run_scrape(event.to_request()?, &configuration, &mut log)?;

            if let Ok(path) = std::env::var("GITHUB_OUTPUT") {
                report_step_outputs(std::path::Path::new(&path), &record, &mut log);
            }
        }
        Command::Trigger {
            target,
            mmsi,
            imo,
            comparison_id,
            headless,
            send_to_posthog,
        } => {
            let dispatch = crate::dispatch::RepositoryDispatch::new(&configuration.github)?;
            let payload = crate::dispatch::ClientPayload {
                mmsi,
                imo,
                comparison_id,
                headless,
                send_to_posthog,
            };

            let results = match target {
                TriggerTarget::All => dispatch.trigger_all(&payload),
                TriggerTarget::Marinetraffic | TriggerTarget::Vesselfinder => {
                    let provider = match target {
                        TriggerTarget::Vesselfinder => crate::vessel::Provider::VesselFinder,
                        _ => crate::vessel::Provider::MarineTraffic,
                    };
                    let event = crate::dispatch::DispatchEvent::new(provider, payload);
                    vec![(provider, dispatch.trigger(&event))]
                }
            };

            let total = results.len();
            let mut failed = 0;
            for (provider, result) in results {
                match result {
                    Ok(()) => log.write(&message(
                        format!("triggered {:} scrape", provider),
                        log::Level::Info,
                    )),
                    Err(error) => {
                        failed += 1;
                        log.write(&message(
                            format!("could not trigger {:} scrape; {:}", provider, error),
                            log::Level::Error,
                        ));
                    }
                }
            }

            if failed > 0 {
                return Err(format!("{:} of {:} dispatch(es) failed", failed, total).into());
            }
        }
    }

    Ok(())
}

/// scrape, print the record on stdout and report messages; fails only when no record was produced
fn run_scrape(
    mut request: crate::scrape::ScrapeRequest,
    configuration: &crate::configuration::RunConfiguration,
    log: &mut crate::utilities::MessageLog,
) -> Result<crate::vessel::VesselRecord, Box<dyn std::error::Error>> {
    let mut sink = None;
    if request.send_to_posthog {
        match crate::forward::posthog::PostHogSink::new(&configuration.posthog) {
            Ok(posthog) => sink = Some(posthog),
            Err(warning) => {
                log.write(&message(warning.to_string(), log::Level::Warn));
                request.send_to_posthog = false;
            }
        }
    }

    match crate::scrape::scrape(
        &request,
        configuration,
        sink.as_ref()
            .map(|sink| sink as &dyn crate::forward::EventSink),
    ) {
        Ok(outcome) => {
            log.write_all(&outcome.messages);
            if let Some((lat, lon)) = outcome.record.position() {
                log.write(&message(
                    format!("position {:}, {:}", lat, lon),
                    log::Level::Info,
                ));
            }
            println!("{:}", serde_json::to_string_pretty(&outcome.record)?);
            Ok(outcome.record)
        }
        Err((error, messages)) => {
            log.write_all(&messages);
            log.write(&message(error.to_string(), log::Level::Error));
            Err(Box::new(error))
        }
    }
}

/// the record is already out, so a step output that cannot be written is only a warning
fn report_step_outputs(
    path: &std::path::Path,
    record: &crate::vessel::VesselRecord,
    log: &mut crate::utilities::MessageLog,
) -> bool {
    match write_github_output(path, record) {
        Ok(()) => true,
        Err(error) => {
            log.write(&message(
                format!(
                    "could not write step outputs to {:}; {:}",
                    path.display(),
                    error
                ),
                log::Level::Warn,
            ));
            false
        }
    }
}

/// step outputs for the CI job that ran the scrape
fn write_github_output(
    path: &std::path::Path,
    record: &crate::vessel::VesselRecord,
) -> Result<(), std::io::Error> {
    let optional = |value: Option<f64>| match value {
        Some(value) => value.to_string(),
        None => String::from("N/A"),
    };

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    std::io::Write::write_all(
        &mut file,
        format!(
            "ship_name={:}\nlatitude={:}\nlongitude={:}\n",
            record.name.as_deref().unwrap_or("Unknown"),
            optional(record.lat),
            optional(record.lon),
        )
        .as_bytes(),
    )
}
