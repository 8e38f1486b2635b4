use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use roomlink::events::{
    ERROR, GAME_STARTED, PLAYER_LEFT, PLAYER_REJOINED, ROOM_DESTROYED, ROOM_UPDATED,
};
use roomlink::EventTransport;
use roomlink::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum LobbyError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("invalid JSON argument: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("failed to wait for ctrl-c: {0}")]
    Signal(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "lobby", about = "Create, join and watch rooms on a room server")]
struct Cli {
    #[arg(long, env = "ROOMLINK_SERVER_URL", default_value = roomlink::DEFAULT_SERVER_URL)]
    server_url: String,

    /// File holding the resumption token between runs.
    #[arg(long, env = "ROOMLINK_SESSION_FILE", default_value = ".roomlink-session.json")]
    session_file: PathBuf,

    /// Query timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a room and join it.
    Create {
        #[arg(long)]
        name: String,
        /// Room settings as a JSON object.
        #[arg(long, default_value = "{}")]
        settings: String,
    },
    /// Join a room by code.
    Join {
        room_code: String,
        #[arg(long)]
        name: String,
    },
    /// Print the current room.
    Get,
    /// Leave the current room.
    Leave,
    /// Update this player's name.
    Rename { name: String },
    /// Start the game in the current room.
    Start,
    /// Print room pushes until ctrl-c.
    Watch,
}

#[tokio::main]
async fn main() -> Result<(), LobbyError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::default()
        .with_server_url(cli.server_url)
        .with_query_timeout(Duration::from_millis(cli.timeout_ms));
    let client: RoomClient<WebSocketTransport> = RoomClient::builder()
        .config(config)
        .store(Arc::new(FileStore::new(cli.session_file)))
        .connect()
        .await?;

    tracing::debug!(command = ?cli.command, session = ?client.session(), "running lobby command");
    let reply = match cli.command {
        Command::Create { name, settings } => {
            let args = CreateRoomArgs {
                player_name: name,
                room_settings: serde_json::from_str(&settings)?,
                ..Default::default()
            };
            client.create_room(&args).await?
        }
        Command::Join { room_code, name } => {
            let args = JoinRoomArgs {
                player_name: name,
                room_code,
                ..Default::default()
            };
            client.join_room(&args).await?
        }
        Command::Get => client.get_room().await?,
        Command::Leave => client.leave_room().await?,
        Command::Rename { name } => {
            let args = SetPlayerArgs {
                player_name: name,
                ..Default::default()
            };
            client.set_player(&args).await?
        }
        Command::Start => client.start_game().await?,
        Command::Watch => {
            watch(&client).await?;
            Payload::Null
        }
    };

    if !reply.is_null() {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    }
    client.close().await?;
    Ok(())
}

async fn watch(client: &RoomClient<WebSocketTransport>) -> Result<(), LobbyError> {
    for event in [
        ROOM_UPDATED,
        ROOM_DESTROYED,
        GAME_STARTED,
        PLAYER_LEFT,
        PLAYER_REJOINED,
        ERROR,
    ] {
        client.subscribe(
            event,
            Listener::new(move |payload| println!("{event}: {payload}")),
        );
    }
    tracing::info!(id = %client.transport().id(), "watching rooms; ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("stopped watching");
    Ok(())
}
