use peril::domain::event::UnitRank;
use peril::module::options::AmqpOptions;
use std::str::FromStr;
use structopt::StructOpt;
use thiserror::Error;

#[derive(Debug, StructOpt)]
#[structopt(about = "Strategy game coordinated over an AMQP message broker.")]
pub struct MainOptions {
    /// Log level, scopable to different modules
    ///
    /// Levels: trace, debug, info, warn, error
    #[structopt(
        short,
        long,
        global = true,
        default_value = "info,lapin=warn,pinky_swear=warn",
        env = "RUST_LOG",
        value_name = "level"
    )]
    pub log: String,

    /// Output format of log lines
    ///
    /// Formats: text, compact, json
    #[structopt(
        long,
        global = true,
        default_value = "text",
        env = "LOG_FORMAT",
        value_name = "format"
    )]
    pub log_format: LogFormat,

    #[structopt(flatten)]
    pub amqp: AmqpOptions,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Declare exchanges and collect game logs until interrupted
    Serve,
    /// Forbid all participants from moving
    Pause,
    /// Allow all participants to move again
    Resume,
    /// Join the game and watch moves and pause broadcasts until interrupted
    Join {
        /// Unique name of the participant
        #[structopt(short, long, env = "PERIL_PARTICIPANT")]
        participant: String,
    },
    /// Move units of a participant to a destination
    ///
    /// The move is published without joining the game, so pause broadcasts are never
    /// received and the move is sent even while the game is paused. Only a participant
    /// that joined within the same process refuses to move while paused.
    Move {
        /// Unique name of the participant
        #[structopt(short, long, env = "PERIL_PARTICIPANT")]
        participant: String,

        /// Location the units move to
        #[structopt(short, long)]
        destination: String,

        /// Rank of a unit to move, repeat for multiple units
        #[structopt(short, long = "unit", value_name = "rank", required = true)]
        units: Vec<UnitRank>,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Text,
    Compact,
    Json,
}

#[derive(Debug, Error)]
#[error("unknown log format '{0}', expected text, compact or json")]
pub struct UnknownLogFormat(String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(UnknownLogFormat(s.to_owned())),
        }
    }
}
