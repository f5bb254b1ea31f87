use tabled::{Table, Tabled};

use crate::{
    config::Config,
    error, info,
    spotify::{ApiError, MAX_PAGE_SIZE},
    types::{AlbumTableRow, ArtistTableRow, PlaylistTableRow, TrackListRow},
    warning,
};

use super::{Context, auth::spinner};

/// Page size used for search when none is given.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum LibraryCommand {
    Playlists,
    Liked,
    Albums,
    Artists,
    Search(String),
}

impl LibraryCommand {
    fn default_limit(&self) -> u32 {
        match self {
            LibraryCommand::Search(_) => DEFAULT_SEARCH_LIMIT,
            _ => MAX_PAGE_SIZE,
        }
    }
}

/// Lists one part of the user's library, or search results, as a table.
///
/// Every row ends in the URI that `play` accepts.
pub async fn library(config: Config, command: LibraryCommand, limit: Option<u32>) {
    let ctx = Context::new(config);
    let Some(credential) = ctx.store.load().await else {
        error!("Not logged in, run auth first");
    };
    let limit = limit.unwrap_or_else(|| command.default_limit());

    match command {
        LibraryCommand::Playlists => {
            let spinner = spinner("Fetching playlists...");
            let result = ctx.api.playlists(&credential, limit).await;
            spinner.finish_and_clear();
            print_rows(result.map(|items| items.iter().map(PlaylistTableRow::from).collect()));
        }
        LibraryCommand::Liked => {
            let spinner = spinner("Fetching liked tracks...");
            let result = ctx.api.saved_tracks(&credential, limit).await;
            spinner.finish_and_clear();
            print_rows(result.map(|items| items.iter().map(TrackListRow::from).collect()));
        }
        LibraryCommand::Albums => {
            let spinner = spinner("Fetching saved albums...");
            let result = ctx.api.saved_albums(&credential, limit).await;
            spinner.finish_and_clear();
            print_rows(result.map(|items| items.iter().map(AlbumTableRow::from).collect()));
        }
        LibraryCommand::Artists => {
            let spinner = spinner("Fetching followed artists...");
            let result = ctx.api.followed_artists(&credential, limit).await;
            spinner.finish_and_clear();
            print_rows(result.map(|items| items.iter().map(ArtistTableRow::from).collect()));
        }
        LibraryCommand::Search(query) => {
            let spinner = spinner("Searching tracks...");
            let result = ctx.api.search_tracks(&credential, &query, limit).await;
            spinner.finish_and_clear();
            print_rows(result.map(|items| items.iter().map(TrackListRow::from).collect()));
        }
    }
}

fn print_rows<R: Tabled>(rows: Result<Vec<R>, ApiError>) {
    match rows {
        Ok(rows) if rows.is_empty() => info!("Nothing found"),
        Ok(rows) => println!("{}", Table::new(rows)),
        Err(e) if e.status() == Some(401) => {
            warning!("Stored credential was rejected, run auth again")
        }
        Err(e) => warning!("Failed to fetch from Spotify. Err: {}", e),
    }
}
