use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use client_core::{
    config::normalize_base_url, load_settings, view, ClientError, ConfirmPrompt,
    DocumentAnalyzerClient, DraftTab, FileCandidate, FileSource, HistoryState, ResultTab, SignerInfo,
};
use shared::domain::DocumentId;
use tracing_subscriber::EnvFilter;

mod events;
mod prompts;

use prompts::{AssumeYes, SystemClipboard, TerminalConfirm};

#[derive(Parser, Debug)]
#[command(name = "docanalyzer", about = "Client for the document analyzer API")]
struct Cli {
    /// API base URL, overriding config file and environment.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Settings file. Defaults to ./docanalyzer.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a PDF or Word document and print its analysis.
    Analyze {
        file: PathBuf,
        /// Print only one result tab.
        #[arg(long, value_enum)]
        tab: Option<TabArg>,
        /// Replace the extracted text before regenerating.
        #[arg(long)]
        edited_text: Option<PathBuf>,
        #[arg(long)]
        save: bool,
        #[arg(long)]
        regenerate: bool,
    },
    /// List saved documents.
    History {
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: i64,
    },
    Delete {
        id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Extract a Nota Dinas and draft a reply.
    Memo {
        file: PathBuf,
        #[arg(long, default_value = "")]
        unit: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, value_enum, default_value_t = DraftArg::Formal)]
        draft: DraftArg,
        #[arg(long)]
        extract_only: bool,
        /// Copy the chosen draft to the clipboard.
        #[arg(long)]
        copy: bool,
    },
    Health,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TabArg {
    Summary,
    Keywords,
    Entities,
    Enriched,
    FullText,
}

impl From<TabArg> for ResultTab {
    fn from(tab: TabArg) -> Self {
        match tab {
            TabArg::Summary => ResultTab::Summary,
            TabArg::Keywords => ResultTab::Keywords,
            TabArg::Entities => ResultTab::Entities,
            TabArg::Enriched => ResultTab::Enriched,
            TabArg::FullText => ResultTab::FullText,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DraftArg {
    Formal,
    Short,
}

impl From<DraftArg> for DraftTab {
    fn from(draft: DraftArg) -> Self {
        match draft {
            DraftArg::Formal => DraftTab::Formal,
            DraftArg::Short => DraftTab::Short,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings(cli.config.as_deref()).context("loading settings")?;
    if let Some(url) = &cli.api_url {
        settings.api_base_url = normalize_base_url(url)?;
    }
    tracing::debug!(api = %settings.api_base_url, "settings loaded");

    let client = DocumentAnalyzerClient::new(&settings)?;
    let printer = events::spawn_printer(client.subscribe_events());

    let outcome = run(&client, cli.command).await;
    drop(client);
    let _ = printer.await;
    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) if already_reported(&err) => {
            tracing::debug!(error = %err, "command failed");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err),
    }
}

/// Failures the event printer has already shown as a notice. File reads
/// happen before any workflow runs and produce none.
fn already_reported(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ClientError>(),
        Some(client_err) if !matches!(client_err, ClientError::Io { .. } | ClientError::Superseded)
    )
}

async fn run(client: &DocumentAnalyzerClient, command: Command) -> Result<()> {
    match command {
        Command::Analyze {
            file,
            tab,
            edited_text,
            save,
            regenerate,
        } => {
            let session = client.analysis_session();
            session
                .select(FileCandidate::from_path(&file).await?, FileSource::Dialog)
                .await?;
            session.analyze().await?;

            if let Some(path) = edited_text {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?;
                session.set_edited_text(text).await;
            }
            match (save, regenerate) {
                (true, true) => {
                    session.save_then_regenerate().await?;
                }
                (true, false) => {
                    session.save().await?;
                }
                (false, true) => {
                    session.regenerate().await?;
                }
                (false, false) => {}
            }

            if let Some(tab) = tab {
                session.select_tab(tab.into()).await;
            }
            let snapshot = session.snapshot().await;
            if let Some(analysis) = snapshot.analysis {
                let rendered = view::render_analysis(&analysis);
                match tab {
                    Some(_) => println!("{}", rendered.section(snapshot.active_tab)),
                    None => print!("{rendered}"),
                }
            }
        }
        Command::History { search } => {
            let history = client.history();
            history.refresh().await?;
            if history.state().await == HistoryState::Empty {
                println!("Belum ada dokumen tersimpan.");
                return Ok(());
            }
            let documents = match search {
                Some(query) => history.search(&query).await,
                None => history.visible().await,
            };
            if documents.is_empty() {
                println!("Tidak ada dokumen yang cocok.");
            }
            for doc in &documents {
                println!("{}", view::render_history_row(doc));
            }
        }
        Command::Show { id } => {
            let doc = client.history().view_detail(DocumentId(id)).await?;
            print!("{}", view::render_document_detail(&doc));
        }
        Command::Delete { id, yes } => {
            let prompt: &dyn ConfirmPrompt = if yes { &AssumeYes } else { &TerminalConfirm };
            let deleted = client.history().delete(DocumentId(id), prompt).await?;
            if !deleted {
                println!("Dibatalkan.");
            }
        }
        Command::Memo {
            file,
            unit,
            name,
            title,
            draft,
            extract_only,
            copy,
        } => {
            let memo = client.memo_workflow();
            memo.select(FileCandidate::from_path(&file).await?, FileSource::Dialog)
                .await?;
            let context = memo.extract().await?;
            print!("{}", view::render_memo(&context.memo));
            if extract_only {
                return Ok(());
            }

            let reply = memo
                .generate_reply(SignerInfo::new(&unit, &name, &title))
                .await?;
            memo.select_draft_tab(draft.into()).await;
            println!();
            print!("{}", view::render_reply(&reply.draft));
            if let Some(workspace) = memo.reply().await {
                println!("\n{}", workspace.active_text());
            }
            if copy {
                memo.copy_active_draft(&SystemClipboard).await?;
            }
        }
        Command::Health => {
            let status = client.health().await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}
