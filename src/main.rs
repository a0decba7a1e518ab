use std::process::ExitCode;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use clap::Parser;
use tracing::{error, Level};

use ntp_query::{ClientConfig, NtpClient, QueryResult, DEFAULT_PORT};

#[derive(Parser)]
#[command(name = "ntp-query", version, about = "Query an NTP server once and report clock offset")]
struct Cli {
    /// NTP server host name or address
    #[arg(default_value = ntp_query::core::DEFAULT_SERVER)]
    server: String,

    /// NTP server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Reply timeout in milliseconds
    #[arg(short, long, default_value_t = 5000)]
    timeout: u64,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn local(time: DateTime<Utc>) -> DateTime<Local> {
    time.with_timezone(&Local)
}

fn print_result(result: &QueryResult) {
    let packet = &result.packet;
    println!(
        "NTP: {} (stratum {}, ref {}, {})",
        local(result.server_transmit_instant()),
        packet.stratum,
        packet.reference_id(),
        packet.leap_indicator,
    );
    println!(
        "LOC: {} (rtt: {:.0}ms, offset: {:.0}ms)",
        local(result.local_transmit_instant),
        result.round_trip_delay * 1000.0,
        result.clock_offset * 1000.0,
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig {
        timeout: Duration::from_millis(cli.timeout),
        ..ClientConfig::new(cli.server, cli.port)
    };

    let result = match NtpClient::from_config(config) {
        Ok(client) => client.query().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(result) if cli.json => match serde_json::to_string_pretty(&result) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("failed to serialize result: {e}");
                ExitCode::FAILURE
            }
        },
        Ok(result) => {
            print_result(&result);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
