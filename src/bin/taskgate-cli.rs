use std::time::Duration;

use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use taskgate::resilience::backoff::Backoff;

#[derive(Parser)]
#[command(name = "taskgate-cli")]
#[command(about = "Submit tasks to a taskgate server and collect their results", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a task and print its ticket
    Submit {
        /// Task payload as JSON; anything that is not JSON is sent as a string
        msg: String,
    },
    /// Fetch a completion by id
    Poll {
        id: String,
        /// Keep polling until the result is ready
        #[arg(long)]
        follow: bool,
        /// Give up following after this many seconds
        #[arg(long, default_value_t = 60)]
        max_secs: u64,
    },
    /// Submit over WebSocket and wait for the result on the same connection
    Wait {
        msg: String,
        /// Ask for a specific correlation id
        #[arg(long)]
        id: Option<String>,
    },
    /// Submit and hold the HTTP request until the result is ready
    Call {
        msg: String,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn payload(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Submit { msg } => {
            let res = client
                .post(format!("{base}/trigger"))
                .json(&json!({ "msg": payload(&msg) }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Poll { id, follow, max_secs } => {
            let url = format!("{base}/done/{id}");
            let deadline = tokio::time::Instant::now() + Duration::from_secs(max_secs);
            let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(2));
            loop {
                let res = client.get(&url).send().await?;
                let pending = res.status() == reqwest::StatusCode::NOT_FOUND;
                if !(follow && pending) || tokio::time::Instant::now() >= deadline {
                    print_response(res).await?;
                    break;
                }
                tokio::time::sleep(backoff.next_delay()).await;
            }
        }
        Commands::Wait { msg, id } => {
            let ws_url = format!("{}/ws", base.replacen("http", "ws", 1));
            let (mut socket, _) = connect_async(ws_url.as_str()).await?;

            let mut frame = json!({ "msg": payload(&msg) });
            if let Some(id) = id {
                frame["id"] = Value::String(id);
            }
            socket.send(Message::Text(frame.to_string().into())).await?;

            // Ack first, then the terminal frame.
            while let Some(message) = socket.next().await {
                let Message::Text(text) = message? else { continue };
                let value: Value = serde_json::from_str(text.as_str())?;
                println!("{}", serde_json::to_string_pretty(&value)?);
                if value.get("status").and_then(Value::as_str) != Some("started") {
                    break;
                }
            }
            let _ = socket.close(None).await;
        }
        Commands::Call { msg, timeout_ms } => {
            let mut request = client
                .post(format!("{base}/call"))
                .json(&json!({ "msg": payload(&msg) }));
            if let Some(ms) = timeout_ms {
                request = request.query(&[("timeout_ms", ms)]);
            }
            print_response(request.send().await?).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };
    if status.is_success() {
        println!("{rendered}");
    } else {
        eprintln!("Error: server returned status {status}");
        eprintln!("{rendered}");
    }
    Ok(())
}
