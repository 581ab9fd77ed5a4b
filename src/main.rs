use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use ropey::Rope;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{info, warn, Level};

use cakeview::completion::{completions, line_prefix, trigger_characters};
use cakeview::config::Settings;
use cakeview::hover::hover;
use cakeview::index::IndexKind;
use cakeview::links::document_links;
use cakeview::resolver::DocumentContext;
use cakeview::watcher::InvalidationController;
use cakeview::workspace::Workspace;

const REFRESH_COMMAND: &str = "cakeview.refreshMaps";

#[derive(Parser)]
#[command(name = "cakeview", version, about = "Go-to-view navigation for CakePHP projects")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the language server over stdio
    Serve,
    /// Print the files every reference in TEXT resolves to
    Resolve {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// File the text is taken from; drives plugin and controller context
        #[arg(long)]
        file: PathBuf,
        text: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the names of an index
    Keys {
        #[arg(long, default_value = ".")]
        root: PathBuf,
        index: IndexKind,
        prefix: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Resolve {
            root,
            file,
            text,
            json,
        } => resolve(&root, &file, &text, json),
        Command::Keys {
            root,
            index,
            prefix,
        } => keys(&root, index, prefix.as_deref()),
    }
}

fn init_logging(settings: &Settings) {
    let level = if settings.enable_logging {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .try_init();
}

fn open_workspace(root: &Path) -> anyhow::Result<Workspace> {
    let root = root
        .canonicalize()
        .map_err(|err| anyhow!("Can't open project root {}: {err}", root.display()))?;
    let settings = Settings::new(&root)?;
    init_logging(&settings);
    Ok(Workspace::open(root, settings))
}

fn resolve(root: &Path, file: &Path, text: &str, json: bool) -> anyhow::Result<()> {
    let workspace = open_workspace(root)?;
    let file = workspace.root_dir().join(file);
    let source = workspace.read_source(&file).unwrap_or_default();

    let snapshot = workspace.snapshot();
    let files = snapshot
        .resolver(workspace.root_dir())
        .resolve_text(text, &DocumentContext::new(&file, &source));

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else {
        for file in files {
            match file.method_location {
                Some(location) => println!("{}:{}", file.display_path, location.line + 1),
                None => println!("{}", file.display_path),
            }
        }
    }
    Ok(())
}

fn keys(root: &Path, index: IndexKind, prefix: Option<&str>) -> anyhow::Result<()> {
    let workspace = open_workspace(root)?;
    let snapshot = workspace.snapshot();
    for name in snapshot.indices.get(index).names_with_prefix(prefix.unwrap_or("")) {
        println!("{name}");
    }
    Ok(())
}

async fn serve() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

struct Backend {
    client: Client,
    workspace: RwLock<Option<Arc<Workspace>>>,
    documents: RwLock<HashMap<Url, Rope>>,
    watcher: parking_lot::Mutex<Option<InvalidationController>>,
}

impl Backend {
    fn new(client: Client) -> Backend {
        Backend {
            client,
            workspace: RwLock::new(None),
            documents: RwLock::new(HashMap::new()),
            watcher: parking_lot::Mutex::new(None),
        }
    }

    async fn workspace(&self) -> Option<Arc<Workspace>> {
        self.workspace.read().await.clone()
    }

    /// Path and full text of an open document.
    async fn document(&self, uri: &Url) -> Option<(PathBuf, String)> {
        let path = uri.to_file_path().ok()?;
        let text = self.documents.read().await.get(uri)?.to_string();
        Some((path, text))
    }

    async fn rebuild(&self) {
        let Some(workspace) = self.workspace().await else {
            return;
        };

        let installed = tokio::task::spawn_blocking(move || workspace.rebuild(&CancellationToken::new()))
            .await
            .unwrap_or(false);
        info!("Manual rebuild finished (installed: {installed})");
    }
}

fn root_dir(params: &InitializeParams) -> Option<PathBuf> {
    if let Some(folder) = params.workspace_folders.as_ref().and_then(|folders| folders.first()) {
        return folder.uri.to_file_path().ok();
    }

    #[allow(deprecated)]
    let root_uri = params.root_uri.as_ref();
    root_uri.and_then(|uri| uri.to_file_path().ok())
}

fn is_manifest(uri: &Url) -> bool {
    uri.path().ends_with("/composer.json") || uri.path().ends_with("/composer.lock")
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root_dir = root_dir(&params)
            .or_else(|| std::env::current_dir().ok())
            .ok_or_else(|| tower_lsp::jsonrpc::Error::invalid_params("No workspace root"))?;

        let settings = match Settings::with_overrides(&root_dir, params.initialization_options.as_ref()) {
            Ok(settings) => settings,
            Err(err) => {
                self.client
                    .log_message(MessageType::WARNING, format!("Invalid settings, using defaults: {err}"))
                    .await;
                Settings::default()
            }
        };
        init_logging(&settings);

        let workspace = tokio::task::spawn_blocking(move || Arc::new(Workspace::open(root_dir, settings)))
            .await
            .map_err(|_| tower_lsp::jsonrpc::Error::internal_error())?;

        match InvalidationController::start(workspace.clone()) {
            Ok(controller) => *self.watcher.lock() = Some(controller),
            Err(err) => warn!("File watching disabled: {err}"),
        }
        *self.workspace.write().await = Some(workspace);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_link_provider: Some(DocumentLinkOptions {
                    resolve_provider: Some(false),
                    work_done_progress_options: Default::default(),
                }),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(trigger_characters()),
                    ..Default::default()
                }),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![REFRESH_COMMAND.to_string()],
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: String::from("cakeview"),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "cakeview initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.watcher.lock().take();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.documents
            .write()
            .await
            .insert(params.text_document.uri, Rope::from_str(&params.text_document.text));
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        self.documents
            .write()
            .await
            .insert(params.text_document.uri, Rope::from_str(&change.text));
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.write().await.remove(&params.text_document.uri);
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if is_manifest(&params.text_document.uri) {
            self.rebuild().await;
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params.position;
        let uri = params.text_document_position_params.text_document.uri;
        let (Some(workspace), Some((path, text))) = (self.workspace().await, self.document(&uri).await) else {
            return Ok(None);
        };

        Ok(hover(&workspace, &path, &text, position))
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        let uri = params.text_document.uri;
        let (Some(workspace), Some((path, text))) = (self.workspace().await, self.document(&uri).await) else {
            return Ok(None);
        };

        Ok(document_links(&workspace, &path, &text))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let position = params.text_document_position.position;
        let uri = params.text_document_position.text_document.uri;
        let Some(workspace) = self.workspace().await else {
            return Ok(None);
        };

        let line_prefix = {
            let documents = self.documents.read().await;
            let Some(rope) = documents.get(&uri) else {
                return Ok(None);
            };
            let Some(line) = rope.get_line(position.line as usize) else {
                return Ok(None);
            };
            line_prefix(&line.to_string(), position.character).to_string()
        };

        let items = completions(&workspace, &line_prefix, position);
        Ok((!items.is_empty()).then_some(CompletionResponse::Array(items)))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<serde_json::Value>> {
        if params.command == REFRESH_COMMAND {
            self.rebuild().await;
            self.client
                .show_message(MessageType::INFO, "CakePHP maps refreshed")
                .await;
        }
        Ok(None)
    }
}
