use anyhow::Result;
use options::{Command, LogFormat, MainOptions};
use peril::domain::event::{Unit, UnitRank};
use peril::library::communication::event::{open_channel, BrokerChannel, BrokerConnection};
use peril::library::communication::implementation::amqp::AmqpConnection;
use peril::module::authority::{Authority, GameLogWriter};
use peril::module::participant::Participant;
use structopt::StructOpt;
use tracing::{info, warn};

mod options;

#[tokio::main]
async fn main() -> Result<()> {
    let options = init();

    let connection = AmqpConnection::connect(&options.amqp.url).await?;
    let result = run(options.command, &connection).await;

    if let Err(error) = connection.close().await {
        warn!(?error, "Failed to close broker connection");
    }

    result
}

fn init() -> MainOptions {
    let options = MainOptions::from_args();

    let formatter = tracing_subscriber::fmt().with_env_filter(options.log.as_str());

    match options.log_format {
        LogFormat::Text => formatter.init(),
        LogFormat::Compact => formatter.compact().init(),
        LogFormat::Json => formatter.json().init(),
    };

    info!("Peril {}", env!("CARGO_PKG_VERSION"));

    options
}

async fn run(command: Command, connection: &AmqpConnection) -> Result<()> {
    match command {
        Command::Serve => serve(connection).await,
        Command::Pause => {
            let authority = Authority::start(connection).await?;
            let result = authority.pause().await;
            authority.stop().await;
            Ok(result?)
        }
        Command::Resume => {
            let authority = Authority::start(connection).await?;
            let result = authority.resume().await;
            authority.stop().await;
            Ok(result?)
        }
        Command::Join { participant } => join(connection, participant).await,
        Command::Move {
            participant,
            destination,
            units,
        } => move_units(connection, participant, &destination, units).await,
    }
}

async fn serve(connection: &AmqpConnection) -> Result<()> {
    let authority = Authority::start(connection).await?;
    let writer = GameLogWriter::default();
    let subscription = authority
        .collect_game_logs(connection, writer.clone())
        .await?;

    info!("Collecting game logs, press Ctrl-C to stop");

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = subscription.closed() => warn!("Game log subscription ended unexpectedly"),
    }

    info!(written = writer.written(), "Shutting down");
    authority.stop().await;

    Ok(())
}

async fn join(connection: &AmqpConnection, name: String) -> Result<()> {
    let participant = Participant::new(name);
    let membership = participant.join(connection).await?;

    let publisher = open_channel(connection).await?;
    participant
        .log(&publisher, &format!("{} joined the game", participant.name()))
        .await?;

    info!("Watching the game, press Ctrl-C to leave");

    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = membership.closed() => warn!("Lost subscriptions to the broker"),
    }

    info!(
        observed = participant.observed_moves().len(),
        paused = participant.is_paused(),
        "Leaving game"
    );

    Ok(())
}

async fn move_units(
    connection: &AmqpConnection,
    name: String,
    destination: &str,
    ranks: Vec<UnitRank>,
) -> Result<()> {
    let units = ranks
        .into_iter()
        .zip(1..)
        .map(|(rank, id)| Unit { id, rank })
        .collect();

    let publisher = open_channel(connection).await?;
    let result = Participant::new(name)
        .move_units(&publisher, units, destination)
        .await;

    if let Err(error) = publisher.close().await {
        warn!(?error, "Failed to close publishing channel");
    }

    let movement = result?;
    info!(
        units = movement.units.len(),
        destination = %movement.destination,
        "Move published"
    );

    Ok(())
}
