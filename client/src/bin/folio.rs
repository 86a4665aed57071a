use camino::Utf8PathBuf as PathBuf;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use eyre::{eyre, Context, Result};
use itertools::Itertools;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing_error::ErrorLayer;
use tracing_subscriber::{prelude::*, EnvFilter};

use folio::{
    api::{HttpAlbumApi, UploadFile},
    download::{download_album, download_item},
    gallery::{Gallery, GalleryError, Outcome, UploadFailure},
};
use folio_core::{
    access::{AccessError, BcryptHasher},
    config::{read_config, Config},
    mime_type::guess_mime_type_path,
    model::{Album, AlbumDraft, AlbumEdit, AlbumId, LockChange, PasswordEntry},
    view::{LockFilter, SortKey},
};

type Session = Gallery<HttpAlbumApi, BcryptHasher>;
type Input = Lines<BufReader<Stdin>>;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long)]
    config: Option<String>,
    /// Overrides the api url from the config file
    #[arg(long)]
    api_url: Option<String>,
}

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List albums at the current level
    Ls,
    /// Show an album's details and media
    Show { id: String },
    /// Enter an album
    Open { id: String },
    /// Go up one level
    Back,
    /// Go to the top level, or to an album on the current path
    Up { id: Option<String> },
    /// Filter by title or publisher, no query clears the search
    Search { query: Vec<String> },
    /// all, locked or unlocked
    Filter { filter: LockFilter },
    /// title, date-newest, date-oldest or items
    Sort { key: SortKey },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        publisher: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        cover: Option<String>,
        /// Create inside this album instead of at the top level
        #[arg(long)]
        parent: Option<String>,
        /// Protect the album with a password
        #[arg(long)]
        lock: bool,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        publisher: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        cover: Option<String>,
        /// Set a new password
        #[arg(long, conflicts_with = "unlock")]
        lock: bool,
        /// Remove the password
        #[arg(long)]
        unlock: bool,
    },
    Delete { id: String },
    /// Upload files into an album
    Add { id: String, files: Vec<PathBuf> },
    /// Remove the media item at a position (starting at 0)
    RmMedia { id: String, index: usize },
    /// Save all media of an album into a directory
    Download {
        id: String,
        dir: PathBuf,
        /// Only the media item at this position (starting at 0)
        #[arg(long)]
        item: Option<usize>,
    },
    Reload,
    Quit,
}

/// Splits a command line into words. Single and double quotes group words,
/// a backslash escapes the next character.
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (_, '\\') => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| eyre!("line ends with a backslash"))?;
                current.push(escaped);
                in_word = true;
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err(eyre!("unterminated quote"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

async fn prompt(input: &mut Input, text: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(input.next_line().await?)
}

async fn prompt_new_password(input: &mut Input) -> Result<PasswordEntry> {
    let password = prompt(input, "New password: ").await?.unwrap_or_default();
    let confirm = prompt(input, "Confirm password: ").await?.unwrap_or_default();
    Ok(PasswordEntry::new(password, confirm))
}

/// Asks for the password until the pending action went through or the user gives up
async fn resolve_challenge(
    session: &mut Session,
    input: &mut Input,
    outcome: Outcome,
) -> Result<Outcome> {
    let mut outcome = outcome;
    while outcome == Outcome::Challenged {
        let title = session
            .challenge()
            .map(|pending| pending.album.title.clone())
            .unwrap_or_default();
        let password = prompt(input, &format!("Password for '{}' (empty to cancel): ", title))
            .await?
            .unwrap_or_default();
        if password.is_empty() {
            session.cancel_challenge();
            println!("cancelled");
            break;
        }
        match session.submit_password(&password).await {
            Ok(next) => outcome = next,
            Err(GalleryError::Access(AccessError::WrongPassword)) => {
                println!("incorrect password")
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(outcome)
}

fn album_line(album: &Album) -> String {
    format!(
        "{:<36}  {:<28}  {}  {:>3} media  {:>2} albums{}",
        album.id.as_str(),
        album.title,
        album.publish_date,
        album.media_count(),
        album.album_count(),
        if album.is_locked { "  [locked]" } else { "" }
    )
}

fn print_album(album: &Album) {
    println!("{}", album.title);
    println!("  id:        {}", album.id.as_str());
    println!("  publisher: {}", album.publisher_name);
    println!("  published: {}", album.publish_date);
    println!("  cover:     {}", album.cover_url().unwrap_or("-"));
    for (index, item) in album.media.iter().enumerate() {
        println!("  [{}] {} {} ({})", index, item.ty, item.filename, item.url);
    }
}

async fn read_upload(path: &PathBuf) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .wrap_err(format!("Error reading {}", path))?;
    let mime = guess_mime_type_path(path)
        .map(|m| m.into_owned())
        .unwrap_or_else(|| "application/octet-stream".to_owned());
    Ok(UploadFile {
        filename: path.file_name().unwrap_or(path.as_str()).to_owned(),
        mime,
        bytes,
    })
}

/// Reads every file that can be read. The others are reported and left out.
async fn read_uploads(paths: &[PathBuf]) -> (Vec<UploadFile>, Vec<UploadFailure>) {
    let mut uploads = Vec::with_capacity(paths.len());
    let mut failed = Vec::new();
    for path in paths {
        match read_upload(path).await {
            Ok(upload) => uploads.push(upload),
            Err(err) => failed.push(UploadFailure {
                filename: path.file_name().unwrap_or(path.as_str()).to_owned(),
                reason: format!("{:#}", err),
            }),
        }
    }
    (uploads, failed)
}

enum Flow {
    Continue,
    Quit,
}

async fn run_command(session: &mut Session, input: &mut Input, command: Command) -> Result<Flow> {
    match command {
        Command::Ls => {
            let crumbs = session.breadcrumbs().iter().map(|a| a.title.as_str()).join(" / ");
            println!("/ {}", crumbs);
            if session.view.has_active_filters() {
                println!(
                    "(showing {}, sorted by {})",
                    session.view.lock_filter, session.view.sort_key
                );
            }
            let visible = session.visible_albums();
            if visible.is_empty() && session.view.is_filtering() {
                println!("no albums match the current search or filter");
            }
            for album in visible {
                println!("{}", album_line(album));
            }
        }
        Command::Show { id } => {
            print_album(session.accessible(&id.into())?);
        }
        Command::Open { id } => {
            let outcome = session.open(&id.into()).await?;
            resolve_challenge(session, input, outcome).await?;
        }
        Command::Back => session.back(),
        Command::Up { id } => session.go_to(id.map(AlbumId::from).as_ref())?,
        Command::Search { query } => {
            session.view.query = query.join(" ");
            if !session.view.query.is_empty() {
                let titles = session.suggestions().iter().map(|a| a.title.as_str()).join(", ");
                println!("suggestions: {}", titles);
            }
        }
        Command::Filter { filter } => session.view.lock_filter = filter,
        Command::Sort { key } => session.view.sort_key = key,
        Command::Create {
            title,
            publisher,
            date,
            cover,
            parent,
            lock,
        } => {
            let mut draft = AlbumDraft::new(title, publisher);
            if let Some(date) = date {
                draft.publish_date = date;
            }
            draft.cover_image = cover.unwrap_or_default();
            if lock {
                draft.lock = Some(prompt_new_password(input).await?);
            }
            let parent = parent.map(AlbumId::from);
            let id = session.create(&draft, parent.as_ref()).await?;
            println!("created {}", id.as_str());
        }
        Command::Edit {
            id,
            title,
            publisher,
            date,
            cover,
            lock,
            unlock,
        } => {
            let outcome = session.request_edit(&id.into()).await?;
            if resolve_challenge(session, input, outcome).await? == Outcome::Challenged {
                return Ok(Flow::Continue);
            }
            let lock = if lock {
                LockChange::Lock(prompt_new_password(input).await?)
            } else if unlock {
                LockChange::Unlock
            } else {
                LockChange::Keep
            };
            let edit = AlbumEdit {
                title,
                publisher_name: publisher,
                publish_date: date,
                cover_image: cover,
                lock,
            };
            if let Err(err) = session.update(&edit).await {
                session.cancel_edit();
                return Err(err.into());
            }
            println!("saved");
        }
        Command::Delete { id } => {
            let outcome = session.request_delete(&id.into()).await?;
            if resolve_challenge(session, input, outcome).await? == Outcome::Done {
                println!("deleted");
            }
        }
        Command::Add { id, files } => {
            let (uploads, unreadable) = read_uploads(&files).await;
            let report = session.add_media(&id.into(), uploads).await?;
            println!("added {} file(s)", report.added);
            for failure in unreadable.into_iter().chain(report.failed) {
                println!("  {} failed: {}", failure.filename, failure.reason);
            }
        }
        Command::RmMedia { id, index } => session.remove_media(&id.into(), index).await?,
        Command::Download { id, dir, item } => {
            let album = session.accessible(&id.into())?;
            match item {
                Some(index) => {
                    let saved = download_item(session.api(), album, index, &dir).await?;
                    println!("saved {}", saved);
                }
                None => {
                    let report = download_album(session.api(), album, &dir).await?;
                    println!("saved {}, failed {}", report.saved, report.failed);
                }
            }
        }
        Command::Reload => session.reload().await?,
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("FOLIO_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(ErrorLayer::default())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => read_config(&PathBuf::from(path)).await?,
        None => Config::default(),
    };
    let api_url = args.api_url.unwrap_or(config.client.api_url);
    let api = HttpAlbumApi::new(&api_url).wrap_err("Error setting up http client")?;
    let mut session = Gallery::new(api, BcryptHasher::new(config.client.bcrypt_cost));
    session.view.sort_key = config.client.default_sort;
    if let Err(err) = session.reload().await {
        eprintln!("could not load albums from {}: {}", api_url, err);
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = prompt(&mut input, "folio> ").await? else {
            break;
        };
        let words = match split_words(&line) {
            Ok(words) if words.is_empty() => continue,
            Ok(words) => words,
            Err(err) => {
                eprintln!("{}", err);
                continue;
            }
        };
        let command = match ShellLine::try_parse_from(words) {
            Ok(line) => line.command,
            Err(err) => {
                let _ = err.print();
                continue;
            }
        };
        match run_command(&mut session, &mut input, command).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(err) => eprintln!("error: {:#}", err),
        }
    }
    Ok(())
}
