use clap::Parser;
use server::network::Server;
use shared::WorldConfig;

/// Authoritative server for the Neonfall multiplayer world.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of concurrent sessions
    #[clap(short, long, default_value = "64")]
    max_sessions: usize,

    /// Shared secret for the /login admin command
    #[clap(long, default_value = "letmein")]
    admin_password: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    let mut server = Server::new(
        &address,
        args.max_sessions,
        args.admin_password,
        WorldConfig::default(),
    )
    .await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
