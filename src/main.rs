use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

use laravel_goto_route::candidates::CandidatePattern;
use laravel_goto_route::config::{find_project_root, LspSettings, ResolverConfig};
use laravel_goto_route::error::{ResolveError, WorkspaceError};
use laravel_goto_route::extractor::route_reference_at;
use laravel_goto_route::provider::{provider_for, Definition, FileKind};
use laravel_goto_route::workspace::{Document, FsWorkspace, Workspace};
use laravel_goto_route::{RouteName, RouteResolver};

/// Command revealing a route declaration, argument: { "routeName": "users.index" }
const GOTO_ROUTE_COMMAND: &str = "laravel-goto-route.gotoRoute";

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct GotoRouteArgs {
    route_name: String,
}

/// `command:` link running the goto command for `name`, JSON arguments percent-encoded
fn goto_route_link(name: &RouteName) -> Option<Url> {
    let args = serde_json::json!({ "routeName": name.as_str() });
    let mut link = Url::parse(&format!("command:{}", GOTO_ROUTE_COMMAND)).ok()?;
    link.set_query(Some(&args.to_string()));
    Some(link)
}

fn hover_markdown(name: &RouteName, location: &str) -> String {
    match goto_route_link(name) {
        Some(link) => format!("[Go to route definition]({})\n\nRoute: `{}`\n\n{}", link, name, location),
        None => format!("Route: `{}`\n\n{}", name, location),
    }
}

/// Project files as the editor sees them: open buffers win over disk contents
struct EditorWorkspace {
    fs: FsWorkspace,
    documents: Arc<RwLock<HashMap<Url, String>>>,
}

#[tower_lsp::async_trait]
impl Workspace for EditorWorkspace {
    async fn find_files(&self, pattern: &CandidatePattern) -> Result<Vec<PathBuf>, WorkspaceError> {
        self.fs.find_files(pattern).await
    }

    async fn open_document(&self, path: &Path) -> Result<Document, WorkspaceError> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.fs.root().join(path)
        };

        if let Ok(uri) = Url::from_file_path(&absolute) {
            if let Some(text) = self.documents.read().await.get(&uri) {
                debug!("Using open buffer for {:?}", absolute);
                return Ok(Document::new(absolute, text.clone()));
            }
        }

        self.fs.open_document(&absolute).await
    }
}

/// The Laravel Goto Route language server
#[derive(Clone)]
struct LaravelRouteServer {
    /// LSP client for sending messages to the editor
    client: Client,
    /// Open document contents (full sync)
    documents: Arc<RwLock<HashMap<Url, String>>>,
    /// The root path of the Laravel project
    root_path: Arc<RwLock<Option<PathBuf>>>,
    /// Where to look for route files and controllers
    settings: Arc<RwLock<ResolverConfig>>,
    /// Cancelled on shutdown; aborts lookups still in flight
    shutdown_token: CancellationToken,
}

impl LaravelRouteServer {
    fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(RwLock::new(HashMap::new())),
            root_path: Arc::new(RwLock::new(None)),
            settings: Arc::new(RwLock::new(ResolverConfig::default())),
            shutdown_token: CancellationToken::new(),
        }
    }

    async fn update_settings(&self, settings: LspSettings) {
        info!("⚙️  Settings: {:?}", settings.laravel);
        *self.settings.write().await = settings.laravel;
    }

    /// Discover the project root from a file if the client did not send one
    async fn ensure_root(&self, uri: &Url) {
        if self.root_path.read().await.is_some() {
            return;
        }

        let Ok(path) = uri.to_file_path() else {
            return;
        };

        if let Some(root) = find_project_root(&path) {
            info!("✅ Root path discovered from {:?}: {:?}", path, root);
            *self.root_path.write().await = Some(root);
        }
    }

    /// A request-scoped resolver over the current root and settings
    async fn resolver(&self) -> Option<RouteResolver<EditorWorkspace>> {
        let root = self.root_path.read().await.clone()?;
        let config = self.settings.read().await.clone();

        let workspace = EditorWorkspace {
            fs: FsWorkspace::new(root),
            documents: Arc::clone(&self.documents),
        };
        Some(RouteResolver::new(workspace, config).with_cancellation(self.shutdown_token.child_token()))
    }

    /// Text of one line, from the open buffer or from disk
    async fn line_at(&self, uri: &Url, line: u32) -> Option<String> {
        if let Some(text) = self.documents.read().await.get(uri) {
            return text.lines().nth(line as usize).map(str::to_string);
        }

        let path = uri.to_file_path().ok()?;
        let text = tokio::fs::read_to_string(&path).await.ok()?;
        Document::new(path, text).line_at(line as usize).map(str::to_string)
    }

    /// Turn a failed lookup into a user-facing message where one is due
    async fn report(&self, err: &ResolveError) {
        match err {
            ResolveError::NotFound(reason) if reason.is_user_visible() => {
                info!("❌ {}", reason);
                self.client
                    .show_message(MessageType::WARNING, format!("❌ {}", reason))
                    .await;
            }
            ResolveError::NotFound(reason) => {
                debug!("Nothing to resolve: {}", reason);
            }
            ResolveError::Workspace(e) => {
                error!("Error finding route: {}", e);
                self.client
                    .show_message(MessageType::ERROR, format!("Error finding route: {}", e))
                    .await;
            }
            ResolveError::Cancelled => {
                debug!("Route lookup cancelled");
            }
        }
    }

    /// Build the goto response for a resolved definition
    fn location_link(line: &str, position: Position, definition: &Definition) -> Option<GotoDefinitionResponse> {
        let target_uri = Url::from_file_path(definition.path()).ok()?;
        let target_range = definition.span().to_lsp_range();

        let (origin_selection_range, target_selection_range) = match definition {
            Definition::Route(route) => {
                let origin = route_reference_at(line, position.character as usize).map(|reference| Range {
                    start: Position { line: position.line, character: reference.start as u32 },
                    end: Position { line: position.line, character: reference.end as u32 },
                });
                (origin, route.selection_range())
            }
            Definition::Controller(_) => (None, target_range),
        };

        Some(GotoDefinitionResponse::Link(vec![LocationLink {
            origin_selection_range,
            target_uri,
            target_range,
            target_selection_range,
        }]))
    }

    /// Open a file in the editor and place the selection
    async fn reveal(&self, path: &Path, selection: Range) {
        let Ok(uri) = Url::from_file_path(path) else {
            warn!("Cannot reveal non-file path {:?}", path);
            return;
        };

        let params = ShowDocumentParams {
            uri,
            external: Some(false),
            take_focus: Some(true),
            selection: Some(selection),
        };

        if let Err(e) = self.client.show_document(params).await {
            warn!("window/showDocument failed: {}", e);
        }
    }

    async fn goto_route(&self, arguments: Vec<serde_json::Value>) {
        let args = arguments
            .into_iter()
            .next()
            .and_then(|value| serde_json::from_value::<GotoRouteArgs>(value).ok());

        let Some(args) = args else {
            self.client
                .show_message(MessageType::ERROR, "Failed to open route definition: missing routeName")
                .await;
            return;
        };

        let name = match RouteName::parse(&args.route_name) {
            Ok(name) => name,
            Err(e) => {
                self.client
                    .show_message(MessageType::WARNING, format!("❌ {}", e))
                    .await;
                return;
            }
        };

        let Some(resolver) = self.resolver().await else {
            self.client
                .show_message(MessageType::ERROR, "Failed to open route definition: no Laravel project root")
                .await;
            return;
        };

        match resolver.resolve_route(&name).await {
            Ok(definition) => {
                self.reveal(definition.span.path(), definition.selection_range())
                    .await
            }
            Err(e) => self.report(&e).await,
        }
    }

    /// Path shown to the user, relative to the project root when possible
    async fn display_path(&self, path: &Path) -> String {
        let root = self.root_path.read().await.clone();
        root.as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for LaravelRouteServer {
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        info!("Laravel Goto Route: INITIALIZE");

        if let Some(init_options) = params.initialization_options {
            match serde_json::from_value::<LspSettings>(init_options) {
                Ok(settings) => self.update_settings(settings).await,
                Err(e) => debug!("Could not parse initialization_options: {}", e),
            }
        }

        if let Some(root_uri) = params.root_uri {
            if let Ok(path) = root_uri.to_file_path() {
                info!("✅ Root path set to {:?}", path);
                *self.root_path.write().await = Some(path);
            }
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                definition_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![GOTO_ROUTE_COMMAND.to_string()],
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("🚀 Laravel Goto Route: INITIALIZED");
    }

    async fn shutdown(&self) -> jsonrpc::Result<()> {
        info!("Laravel Goto Route: Shutting down");
        self.shutdown_token.cancel();
        self.documents.write().await.clear();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        self.ensure_root(&uri).await;
        self.documents.write().await.insert(uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the last change carries the whole document
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents
                .write()
                .await
                .insert(params.text_document.uri, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.write().await.remove(&params.text_document.uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        match serde_json::from_value::<LspSettings>(params.settings) {
            Ok(settings) => self.update_settings(settings).await,
            Err(e) => debug!("Could not parse settings: {}", e),
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> jsonrpc::Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        info!("🎯 goto_definition called: {}:{}:{}", uri, position.line, position.character);

        let Ok(file_path) = uri.to_file_path() else {
            return Ok(None);
        };
        let Some(kind) = FileKind::classify(&file_path) else {
            return Ok(None);
        };
        let Some(line) = self.line_at(&uri, position.line).await else {
            return Ok(None);
        };

        self.ensure_root(&uri).await;
        let Some(resolver) = self.resolver().await else {
            debug!("No project root, skipping goto_definition");
            return Ok(None);
        };

        let provider = provider_for(kind, &resolver);
        match provider.provide_definition(&line, position.character as usize).await {
            Ok(definition) => Ok(Self::location_link(&line, position, &definition)),
            Err(e) => {
                self.report(&e).await;
                Ok(None)
            }
        }
    }

    async fn hover(&self, params: HoverParams) -> jsonrpc::Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(line) = self.line_at(&uri, position.line).await else {
            return Ok(None);
        };
        let Some(reference) = route_reference_at(&line, position.character as usize) else {
            return Ok(None);
        };

        self.ensure_root(&uri).await;
        let Some(resolver) = self.resolver().await else {
            return Ok(None);
        };

        let location = match resolver.resolve_route(&reference.name).await {
            Ok(definition) => format!(
                "Defined in `{}:{}`",
                self.display_path(definition.span.path()).await,
                definition.anchor.line + 1
            ),
            Err(e) if e.is_not_found() => "⚠️ Not found in route files".to_string(),
            Err(e) => {
                warn!("Hover lookup for '{}' failed: {}", reference.name, e);
                return Ok(None);
            }
        };

        Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: hover_markdown(&reference.name, &location),
            }),
            range: Some(Range {
                start: Position { line: position.line, character: reference.start as u32 },
                end: Position { line: position.line, character: reference.end as u32 },
            }),
        }))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> jsonrpc::Result<Option<serde_json::Value>> {
        if params.command == GOTO_ROUTE_COMMAND {
            self.goto_route(params.arguments).await;
        } else {
            debug!("Unknown command: {}", params.command);
        }
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout is the LSP channel, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("🚀 Laravel Goto Route language server starting");

    let (service, socket) = LspService::new(LaravelRouteServer::new);

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    Server::new(stdin, stdout, socket)
        .serve(service)
        .await;

    info!("Laravel Goto Route language server stopped");
    Ok(())
}
