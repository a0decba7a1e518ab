use ntp_query::{ClientConfig, NtpClient};
use std::time::Duration;

#[tokio::main]
async fn main() {
    let server = std::env::args().nth(1).unwrap_or_else(|| "pool.ntp.org".to_string());

    let config = ClientConfig {
        timeout: Duration::from_secs(2),
        ..ClientConfig::new(server, 123)
    };
    println!("Querying {}", config.server_addr());

    let client = match NtpClient::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };

    // Three independent samples, one exchange each
    for i in 0..3 {
        match client.query().await {
            Ok(result) => {
                let packet = &result.packet;
                println!("\nSample {}:", i + 1);
                println!("- Leap indicator: {}", packet.leap_indicator);
                println!("- Version: {}", packet.version_number);
                println!("- Mode: {}", packet.mode);
                println!("- Stratum: {}", packet.stratum);
                println!("- Reference: {}", packet.reference_id());
                println!("- Root delay: {:.6} s", packet.root_delay_seconds());
                println!("- Root dispersion: {:.6} s", packet.root_dispersion_seconds());
                println!("- Server transmit: {}", result.server_transmit_instant());
                println!("- Round-trip delay: {:.3} ms", result.round_trip_delay * 1000.0);
                println!("- Clock offset: {:.3} ms", result.clock_offset * 1000.0);
            }
            Err(e) => eprintln!("Query error: {}", e),
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
