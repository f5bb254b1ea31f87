use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use cyberdeejay::{
    cli::{self, LibraryCommand, PlayerCommand},
    config::{self, Config},
    error,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the local player server
    Serve,

    /// Authorize with Spotify in the browser
    Auth,

    /// Forget the stored credential
    Logout,

    /// Check the stored credential
    Status,

    /// Play a track, album, playlist or artist URI
    Play(PlayOptions),

    /// Pause playback
    Pause,

    /// Resume playback
    Resume,

    /// Skip to the next track
    Next,

    /// Go back to the previous track
    Previous,

    /// Set the volume
    Volume(VolumeOptions),

    /// Show the current track
    Now,

    /// List your playlists
    Playlists(ListOptions),

    /// List your liked tracks
    Liked(ListOptions),

    /// List your saved albums
    Albums(ListOptions),

    /// List the artists you follow
    Artists(ListOptions),

    /// Search for tracks
    Search(SearchOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct PlayOptions {
    /// Spotify URI, e.g. spotify:track:4uLU6hMCjMI75M1A2tKUQC
    uri: String,
}

#[derive(Parser, Debug, Clone)]
pub struct VolumeOptions {
    /// Volume in percent
    #[clap(value_parser = clap::value_parser!(u8).range(0..=100))]
    percent: u8,
}

#[derive(Parser, Debug, Clone)]
pub struct ListOptions {
    /// Number of entries to show, at most 50
    #[clap(short, long, value_parser = clap::value_parser!(u32).range(1..=50))]
    limit: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// Search terms
    query: String,

    /// Number of results to show, at most 50
    #[clap(short, long, value_parser = clap::value_parser!(u32).range(1..=50))]
    limit: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("Invalid configuration: {}", e),
    };

    match cli.command {
        Command::Serve => cli::serve(config).await,
        Command::Auth => cli::auth(config).await,
        Command::Logout => cli::logout(config).await,
        Command::Status => cli::status(config).await,
        Command::Play(opt) => cli::player(config, PlayerCommand::Play(opt.uri)).await,
        Command::Pause => cli::player(config, PlayerCommand::Pause).await,
        Command::Resume => cli::player(config, PlayerCommand::Resume).await,
        Command::Next => cli::player(config, PlayerCommand::Next).await,
        Command::Previous => cli::player(config, PlayerCommand::Previous).await,
        Command::Volume(opt) => cli::player(config, PlayerCommand::Volume(opt.percent)).await,
        Command::Now => cli::player(config, PlayerCommand::Now).await,
        Command::Playlists(opt) => cli::library(config, LibraryCommand::Playlists, opt.limit).await,
        Command::Liked(opt) => cli::library(config, LibraryCommand::Liked, opt.limit).await,
        Command::Albums(opt) => cli::library(config, LibraryCommand::Albums, opt.limit).await,
        Command::Artists(opt) => cli::library(config, LibraryCommand::Artists, opt.limit).await,
        Command::Search(opt) => {
            cli::library(config, LibraryCommand::Search(opt.query), opt.limit).await
        }
        Command::Completions(_) => {}
    }
}
