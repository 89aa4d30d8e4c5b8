//! CLI command definitions and handlers.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use flasher_core::{render_card, serialize_deck, Deck, DeckFileRef, DECK_EXTENSION};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use crate::config::Config;
use crate::debounce::debounce_async;
use crate::generate::{extract_deck, AzureOpenAiGenerator, DeckGenerator, GeminiGenerator};
use crate::github::DeckSource;
use crate::http::HttpClient;
use crate::session::SessionTracker;
use crate::store::KeyValueStore;

/// Quiet period before an interactive search query is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Parser, Debug)]
#[command(name = "flasher")]
#[command(about = "Study flashcard decks hosted on GitHub", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Repository owner (default: FLASHER_OWNER)
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Repository name (default: FLASHER_REPO)
    #[arg(long, global = true)]
    pub repo: Option<String>,

    /// Folder holding the decks (default: FLASHER_DECKS_PATH)
    #[arg(long, global = true)]
    pub folder: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the decks in the deck folder
    List {
        /// Only show decks whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Search decks interactively, one query per line
    Search,

    /// Print the cards of a deck
    Show {
        /// Deck name or path inside the repository
        path: String,

        /// Print rendered HTML instead of Markdown
        #[arg(long)]
        html: bool,
    },

    /// Study a deck and record the session
    Study {
        /// Deck name or path inside the repository
        path: String,

        /// Shuffle the cards
        #[arg(short, long)]
        shuffle: bool,
    },

    /// Show when a deck was last studied
    Last {
        /// Deck name
        deck: String,
    },

    /// Generate a deck with a hosted model
    Generate {
        #[arg(short, long, value_enum, default_value = "gemini")]
        provider: Provider,

        /// File to attach to the prompt (gemini only)
        #[arg(short, long)]
        file: Vec<PathBuf>,

        /// Write the deck here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Topic, source text or links to build the deck from
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Azure,
    Gemini,
}

/// Repository coordinates a command works against.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub owner: String,
    pub repo: String,
    pub folder: String,
}

impl Target {
    /// Configured coordinates with command-line overrides applied.
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        Self {
            owner: cli.owner.clone().unwrap_or_else(|| config.owner.clone()),
            repo: cli.repo.clone().unwrap_or_else(|| config.repo.clone()),
            folder: cli.folder.clone().unwrap_or_else(|| config.decks_path.clone()),
        }
    }

    /// Path of a deck inside the repository. Bare names are looked up in the deck folder.
    pub fn deck_path(&self, name_or_path: &str) -> String {
        if name_or_path.contains('/') {
            return name_or_path.to_string();
        }
        let file = if name_or_path.ends_with(DECK_EXTENSION) {
            name_or_path.to_string()
        } else {
            format!("{}{}", name_or_path, DECK_EXTENSION)
        };
        let folder = self.folder.trim_matches('/');
        if folder.is_empty() {
            file
        } else {
            format!("{}/{}", folder, file)
        }
    }
}

pub async fn list<C: HttpClient>(
    source: &DeckSource<C>,
    target: &Target,
    filter: Option<&str>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let files = source
        .search_deck_files(&target.owner, &target.repo, &target.folder, filter)
        .await;
    print_files(&files, out)
}

/// Read queries from stdin and print matches for the last query of each burst.
pub async fn search<C: HttpClient + 'static>(
    source: Arc<DeckSource<C>>,
    target: Target,
) -> anyhow::Result<()> {
    let input = BufReader::new(tokio::io::stdin());
    search_lines(source, target, input, Arc::new(Mutex::new(std::io::stdout()))).await
}

/// Debounced search over the lines of `input`. Returns once every search that ran
/// has been printed.
pub async fn search_lines<C, R, W>(
    source: Arc<DeckSource<C>>,
    target: Target,
    input: R,
    out: Arc<Mutex<W>>,
) -> anyhow::Result<()>
where
    C: HttpClient + 'static,
    R: AsyncBufRead + Unpin,
    W: Write + Send + 'static,
{
    let target = Arc::new(target);
    let searcher = debounce_async(
        move |query: String| {
            let source = Arc::clone(&source);
            let target = Arc::clone(&target);
            async move {
                let filter = Some(query.trim()).filter(|q| !q.is_empty());
                source
                    .search_deck_files(&target.owner, &target.repo, &target.folder, filter)
                    .await
            }
        },
        SEARCH_DEBOUNCE,
    );

    let mut lines = input.lines();
    let mut printing = JoinSet::new();
    while let Some(line) = lines.next_line().await? {
        let pending = searcher.call(line);
        let out = Arc::clone(&out);
        printing.spawn(async move {
            if let Some(files) = pending.await {
                let mut out = out.lock().unwrap_or_else(|e| e.into_inner());
                if let Err(e) = print_files(&files, &mut *out) {
                    tracing::warn!("Failed to print results: {}", e);
                }
            }
        });
    }

    while let Some(finished) = printing.join_next().await {
        finished?;
    }
    Ok(())
}

pub async fn show<C: HttpClient>(
    source: &DeckSource<C>,
    target: &Target,
    path: &str,
    html: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let deck = fetch(source, target, path).await?;

    writeln!(out, "# {} ({} cards)", deck.name, deck.len())?;
    for (index, card) in deck.cards.iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "## Card {}", index + 1)?;
        if html {
            let rendered = render_card(card);
            writeln!(out, "{}", rendered.front_html.trim_end())?;
            writeln!(out, "<hr>")?;
            writeln!(out, "{}", rendered.back_html.trim_end())?;
        } else {
            writeln!(out, "{}", card.front.trim_end())?;
            writeln!(out, "---")?;
            writeln!(out, "{}", card.back.trim_end())?;
        }
    }
    Ok(())
}

pub async fn study<C: HttpClient, S: KeyValueStore>(
    source: &DeckSource<C>,
    tracker: &SessionTracker<S>,
    target: &Target,
    path: &str,
    shuffle: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let mut deck = fetch(source, target, path).await?;
    if shuffle {
        deck = deck.shuffled(&mut rand::thread_rng());
    }

    let previous = tracker.relative_label(&deck.name)?;
    tracker.record_session(&deck.name)?;

    match previous {
        Some(label) => writeln!(out, "Studying {} (last session {})", deck.name, label)?,
        None => writeln!(out, "Studying {} (first session)", deck.name)?,
    }
    for (index, card) in deck.cards.iter().enumerate() {
        let rendered = render_card(card);
        writeln!(out)?;
        writeln!(out, "<section class=\"card\" data-index=\"{}\">", index + 1)?;
        writeln!(out, "<div class=\"front\">{}</div>", rendered.front_html.trim_end())?;
        writeln!(out, "<div class=\"back\">{}</div>", rendered.back_html.trim_end())?;
        writeln!(out, "</section>")?;
    }
    Ok(())
}

pub fn last<S: KeyValueStore>(
    tracker: &SessionTracker<S>,
    deck: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let name = Deck::name_from_path(deck);
    match tracker.relative_label(&name)? {
        Some(label) => writeln!(out, "{}: {}", name, label)?,
        None => writeln!(out, "{}: never studied", name)?,
    }
    Ok(())
}

pub async fn generate(
    config: &Config,
    provider: Provider,
    files: &[PathBuf],
    message: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let text = match provider {
        Provider::Azure => {
            if !files.is_empty() {
                bail!("file attachments are only supported by the gemini provider");
            }
            let azure = config.azure()?;
            let generator =
                AzureOpenAiGenerator::new(azure.endpoint, azure.api_key, azure.deployment)?;
            run_generator(&generator, message).await?
        }
        Provider::Gemini => {
            let gemini = config.gemini()?;
            let generator =
                GeminiGenerator::new(gemini.api_key, gemini.model)?.with_api_url(gemini.api_url);

            let mut uploaded = Vec::with_capacity(files.len());
            for file in files {
                let uploaded_file = generator
                    .upload_file(file, mime_type_for(file))
                    .await
                    .with_context(|| format!("failed to upload {}", file.display()))?;
                uploaded.push(uploaded_file);
            }
            generator.wait_for_active(&uploaded).await?;
            generator.generate_with_files(message, &uploaded).await?
        }
    };

    let cards = extract_deck(&text).context("model answer is not a valid deck")?;
    tracing::info!("Generated {} cards", cards.len());
    write!(out, "{}", serialize_deck(&cards)?)?;
    Ok(())
}

async fn run_generator(generator: &dyn DeckGenerator, message: &str) -> anyhow::Result<String> {
    tracing::info!("Generating deck with {}", generator.name());
    Ok(generator.generate(message).await?)
}

/// MIME type announced for an uploaded attachment.
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("deck") => "text/plain",
        Some("md") | Some("markdown") => "text/markdown",
        Some("html") | Some("htm") => "text/html",
        Some("csv") => "text/csv",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

async fn fetch<C: HttpClient>(
    source: &DeckSource<C>,
    target: &Target,
    path: &str,
) -> anyhow::Result<Deck> {
    let path = target.deck_path(path);
    let deck = source
        .fetch_deck(&target.owner, &target.repo, &path)
        .await
        .with_context(|| format!("failed to load {}", path))?;
    Ok(deck)
}

fn print_files(files: &[DeckFileRef], out: &mut impl Write) -> anyhow::Result<()> {
    if files.is_empty() {
        writeln!(out, "No decks found")?;
        return Ok(());
    }
    for file in files {
        writeln!(out, "{}\t{}", Deck::name_from_path(&file.name), file.path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{FixtureClient, HttpResponse, TransportError};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::AsyncWriteExt;
    use flasher_core::{Card, RelativeLabel};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const API: &str = "https://api.test";

    fn target() -> Target {
        Target {
            owner: "o".to_string(),
            repo: "r".to_string(),
            folder: "decks".to_string(),
        }
    }

    fn source_with_deck(cards: &[Card]) -> DeckSource<FixtureClient> {
        let client = FixtureClient::new()
            .with(
                format!("{API}/repos/o/r/contents/decks"),
                200,
                json!([
                    { "name": "physics.deck", "path": "decks/physics.deck", "sha": "1", "download_url": "https://raw.test/physics.deck" },
                    { "name": "notes.txt", "path": "decks/notes.txt", "sha": "2", "download_url": "https://raw.test/notes.txt" }
                ])
                .to_string(),
            )
            .with(
                format!("{API}/repos/o/r/contents/decks/physics.deck"),
                200,
                json!({ "name": "physics.deck", "path": "decks/physics.deck", "sha": "1", "download_url": "https://raw.test/physics.deck" })
                    .to_string(),
            )
            .with(
                "https://raw.test/physics.deck",
                200,
                serialize_deck(cards).unwrap(),
            );
        DeckSource::with_api_url(client, API)
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn parses_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from(["flasher", "list", "--filter", "alg", "--owner", "me"]).unwrap();
        assert_eq!(cli.owner.as_deref(), Some("me"));
        assert!(matches!(cli.command, Commands::List { filter: Some(ref f) } if f == "alg"));
    }

    #[test]
    fn parses_generate() {
        let cli = Cli::try_parse_from([
            "flasher", "generate", "--provider", "azure", "-f", "notes.pdf", "Rust lifetimes",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate {
                provider,
                file,
                message,
                output,
            } => {
                assert_eq!(provider, Provider::Azure);
                assert_eq!(file, vec![PathBuf::from("notes.pdf")]);
                assert_eq!(message, "Rust lifetimes");
                assert_eq!(output, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn target_uses_config_unless_overridden() {
        let config = Config::from_lookup(|_| None);
        let cli = Cli::try_parse_from(["flasher", "--repo", "other", "search"]).unwrap();
        assert_eq!(
            Target::resolve(&cli, &config),
            Target {
                owner: "danielrod02".to_string(),
                repo: "other".to_string(),
                folder: "decks".to_string(),
            }
        );
    }

    #[test]
    fn deck_path_resolution() {
        let target = target();
        assert_eq!(target.deck_path("physics"), "decks/physics.deck");
        assert_eq!(target.deck_path("physics.deck"), "decks/physics.deck");
        assert_eq!(target.deck_path("other/physics.deck"), "other/physics.deck");

        let root = Target {
            folder: "/".to_string(),
            ..target
        };
        assert_eq!(root.deck_path("physics"), "physics.deck");
    }

    #[test]
    fn mime_types() {
        assert_eq!(mime_type_for(Path::new("a/notes.PDF")), "application/pdf");
        assert_eq!(mime_type_for(Path::new("readme.md")), "text/markdown");
        assert_eq!(mime_type_for(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn list_prints_only_decks() {
        let source = source_with_deck(&[]);
        let mut out = Vec::new();
        list(&source, &target(), None, &mut out).await.unwrap();
        assert_eq!(output(out), "physics\tdecks/physics.deck\n");
    }

    #[tokio::test]
    async fn list_reports_no_matches() {
        let source = source_with_deck(&[]);
        let mut out = Vec::new();
        list(&source, &target(), Some("chem"), &mut out).await.unwrap();
        assert_eq!(output(out), "No decks found\n");
    }

    #[tokio::test]
    async fn show_prints_markdown() {
        let source = source_with_deck(&[Card::new("What is $F$?", "$ma$")]);
        let mut out = Vec::new();
        show(&source, &target(), "physics", false, &mut out)
            .await
            .unwrap();
        assert_eq!(
            output(out),
            "# physics (1 cards)\n\n## Card 1\nWhat is $F$?\n---\n$ma$\n"
        );
    }

    #[tokio::test]
    async fn show_missing_deck_fails() {
        let source = source_with_deck(&[]);
        let mut out = Vec::new();
        let err = show(&source, &target(), "chemistry", false, &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("decks/chemistry.deck"));
    }

    #[tokio::test]
    async fn study_records_session_and_renders() {
        let source = source_with_deck(&[Card::new("**Q**", "A")]);
        let tracker = SessionTracker::new(MemoryStore::new());

        let mut out = Vec::new();
        study(&source, &tracker, &target(), "physics", false, &mut out)
            .await
            .unwrap();
        let text = output(out);
        assert!(text.starts_with("Studying physics (first session)\n"));
        assert!(text.contains("<strong>Q</strong>"));

        assert_eq!(
            tracker.relative_label("physics").unwrap(),
            Some(RelativeLabel::Minutes(0))
        );

        let mut out = Vec::new();
        study(&source, &tracker, &target(), "physics", true, &mut out)
            .await
            .unwrap();
        assert!(output(out).starts_with("Studying physics (last session 0 minutes ago)\n"));
    }

    /// Makes the first request slow so an earlier search finishes after a later one.
    struct SlowFirstRequest {
        inner: FixtureClient,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for SlowFirstRequest {
        async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            self.inner.get(url).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn search_prints_every_burst_before_returning() {
        let client = FixtureClient::new().with(
            format!("{API}/repos/o/r/contents/decks"),
            200,
            json!([
                { "name": "algebra.deck", "path": "decks/algebra.deck", "sha": "1", "download_url": null },
                { "name": "calculus.deck", "path": "decks/calculus.deck", "sha": "2", "download_url": null }
            ])
            .to_string(),
        );
        let source = Arc::new(DeckSource::with_api_url(
            SlowFirstRequest {
                inner: client,
                calls: AtomicUsize::new(0),
            },
            API,
        ));

        let (reader, mut writer) = tokio::io::duplex(64);
        tokio::spawn(async move {
            writer.write_all(b"alg\n").await.unwrap();
            tokio::time::sleep(SEARCH_DEBOUNCE * 2).await;
            writer.write_all(b"calc\n").await.unwrap();
        });

        let out = Arc::new(Mutex::new(Vec::new()));
        search_lines(source, target(), BufReader::new(reader), Arc::clone(&out))
            .await
            .unwrap();

        let text = String::from_utf8(out.lock().unwrap().clone()).unwrap();
        assert_eq!(
            text,
            "calculus\tdecks/calculus.deck\nalgebra\tdecks/algebra.deck\n"
        );
    }

    #[test]
    fn last_reports_never_studied() {
        let tracker = SessionTracker::new(MemoryStore::new());
        let mut out = Vec::new();
        last(&tracker, "decks/physics.deck", &mut out).unwrap();
        assert_eq!(output(out), "physics: never studied\n");

        tracker.record_session("physics").unwrap();
        let mut out = Vec::new();
        last(&tracker, "physics", &mut out).unwrap();
        assert_eq!(output(out), "physics: 0 minutes ago\n");
    }
}
