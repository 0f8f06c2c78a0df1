use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use shared::{ClientEvent, RegisterClient, ServerEvent, ShootDart, SubmitInfo, TargetId};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

/// Plays one phone against a running server: register, submit, shoot.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket URL of the server
    #[arg(short, long, default_value = "ws://127.0.0.1:3000")]
    url: String,

    /// Display name to submit
    #[arg(short, long, default_value = "Tester")]
    name: String,

    /// Supplier labels, up to three
    #[arg(short, long, num_args = 1..=3, default_values = ["Acme", "Globex", "Initech"])]
    supplier: Vec<String>,

    /// Balloon ids to shoot at
    #[arg(
        short,
        long,
        num_args = 2,
        allow_negative_numbers = true,
        default_values = ["1", "2"]
    )]
    targets: Vec<TargetId>,

    /// Wait for the screen to start the game before shooting
    #[arg(short, long)]
    wait_start: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to {}", args.url);
    let (ws, _) = tokio_tungstenite::connect_async(args.url.as_str()).await?;
    let (mut sink, mut stream) = ws.split();

    sink.send(frame(&ClientEvent::RegisterClient(RegisterClient {
        kind: "mobile".to_string(),
    }))?)
    .await?;

    let mut suppliers = args.supplier.into_iter();
    let info = SubmitInfo {
        name: args.name.clone(),
        supplier1: suppliers.next().unwrap_or_default(),
        supplier2: suppliers.next().unwrap_or_default(),
        supplier3: suppliers.next().unwrap_or_default(),
    };
    println!("Submitting {:?}", info);
    sink.send(frame(&ClientEvent::SubmitInfo(info))?).await?;

    let mut shot_sent = false;
    if !args.wait_start {
        sink.send(frame(&shoot(&args.targets))?).await?;
        shot_sent = true;
    }

    // Print everything the server says until our shot result arrives
    loop {
        let message = match timeout(Duration::from_secs(60), stream.next()).await {
            Ok(Some(message)) => message?,
            Ok(None) => {
                println!("Server closed the connection");
                break;
            }
            Err(_) => {
                println!("Timed out waiting for the server");
                break;
            }
        };

        let Message::Text(text) = message else {
            continue;
        };

        match ServerEvent::from_json(&text) {
            Ok(ServerEvent::StartGame) if !shot_sent => {
                println!("Game started, shooting at {:?}", args.targets);
                sink.send(frame(&shoot(&args.targets))?).await?;
                shot_sent = true;
            }
            Ok(ServerEvent::ShotResult(outcomes)) => {
                for outcome in outcomes {
                    println!(
                        "Shot {}: {} ({})",
                        outcome.shot,
                        outcome.message,
                        if outcome.success { "hit" } else { "miss" }
                    );
                }
                break;
            }
            Ok(event) => println!("Received {:?}", event),
            Err(e) => println!("Failed to decode server event: {}", e),
        }
    }

    sink.close().await?;
    println!("Test client finished");

    Ok(())
}

fn shoot(targets: &[TargetId]) -> ClientEvent {
    ClientEvent::ShootDart(ShootDart {
        target_balloon_id1: targets.first().copied().unwrap_or(1),
        target_balloon_id2: targets.get(1).copied().unwrap_or(2),
    })
}

fn frame(event: &ClientEvent) -> Result<Message, serde_json::Error> {
    Ok(Message::Text(event.to_json()?))
}
