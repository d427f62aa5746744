//! The client shell: providers, guards, and feeds wired together.
//!
//! [`App`] owns one [`SessionProvider`] and one [`AdminSessionProvider`]
//! for its lifetime, a shared navigation [`History`], and the table
//! backend every feed reads from. Pages are visited through
//! [`App::visit`], which runs the route's guard until it settles and
//! follows its redirects.

use std::sync::Arc;

use edudash_guard::{
    AdminLayout, DashboardRedirector, Dispatch, GuardState, History, Navigator, ProtectedRoute,
    spawn_guard,
};
use edudash_protocol::{ConversationId, Role, Route};
use edudash_realtime::{ChatMessagesFeed, HostedTables, LeaderboardFeed, TableBackend};
use edudash_session::{AdminSessionProvider, AuthEvent, IdentityBackend, SessionProvider};
use edudash_summarizer::{ProcessResponse, SummarizerClient, Upload};

use crate::{ClientConfig, EduError, RouteKind, RouteTable};

/// Upper bound on guard redirects followed by one visit.
const MAX_REDIRECTS: usize = 4;

/// What a visit ended up showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    /// An unguarded page.
    Public(Route),
    /// A guard is still waiting on a provider.
    Loading,
    /// A guard denied access and had nowhere to send the user.
    Blank,
    /// The dashboard of this role, rendered.
    Dashboard(Role),
    /// No page at this path.
    NotFound(String),
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for an [`App`].
///
/// # Example
///
/// ```rust,ignore
/// use edudash::prelude::*;
///
/// let app = AppBuilder::new()
///     .config(ClientConfig::from_env()?)
///     .build(identity_backend, MemoryTables::new());
/// let page = app.visit(Route::Dashboard).await?;
/// ```
#[derive(Debug, Default)]
pub struct AppBuilder {
    config: ClientConfig,
    history: Option<History>,
    access_token: Option<String>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares an existing history instead of starting an empty one.
    pub fn history(mut self, history: History) -> Self {
        self.history = Some(history);
        self
    }

    /// User token for the hosted table backend. Without one, requests
    /// carry the anon key only.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Starts both providers on `identity` and wires `tables` in as the
    /// feed backend.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build<I, T>(self, identity: I, tables: T) -> App<T>
    where
        I: IdentityBackend,
        T: TableBackend,
    {
        let identity = Arc::new(identity);
        let session = SessionProvider::spawn(Arc::clone(&identity));
        let admin = AdminSessionProvider::spawn(identity);

        tracing::info!(backend = %self.config.backend_url, "edudash client started");

        App {
            routes: RouteTable::new(self.config.default_redirect.clone()),
            history: self.history.unwrap_or_default(),
            summarizer: SummarizerClient::new(self.config.summarizer_endpoint.clone()),
            session,
            admin,
            tables: Arc::new(tables),
            config: self.config,
        }
    }

    /// Like [`build`](Self::build), reading tables from the hosted backend
    /// named in the configuration.
    pub fn build_hosted<I: IdentityBackend>(self, identity: I) -> App<HostedTables> {
        let mut hosted = self.config.hosted_config();
        if let Some(token) = &self.access_token {
            hosted = hosted.access_token(token.clone());
        }
        let tables = HostedTables::new(hosted);
        self.build(identity, tables)
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// A running client.
pub struct App<T: TableBackend> {
    config: ClientConfig,
    routes: RouteTable,
    history: History,
    session: SessionProvider,
    admin: AdminSessionProvider,
    tables: Arc<T>,
    summarizer: SummarizerClient,
}

impl<T: TableBackend> App<T> {
    /// Navigates to `route` and returns the page the user lands on.
    ///
    /// Guarded routes wait until their providers have resolved. A guard
    /// redirect is recorded in the history and then visited in turn.
    ///
    /// # Errors
    /// [`EduError::Guard`] if a provider stopped while a guard waited.
    pub async fn visit(&self, route: Route) -> Result<Page, EduError> {
        self.history.navigate(&route);
        let mut current = route;

        for _ in 0..MAX_REDIRECTS {
            let kind = self.routes.resolve(&current);
            if let Some(page) = unguarded(&kind, &current) {
                return Ok(page);
            }

            let before = self.history.len();
            let state = self.run_guard(&kind).await?;

            if state == GuardState::Authorized {
                return Ok(authorized_page(&kind));
            }
            match self.history.current() {
                Some(next) if self.history.len() > before => current = next,
                _ => return Ok(Page::Blank),
            }
        }

        tracing::warn!(route = %current, "too many redirects");
        Ok(Page::Blank)
    }

    /// Renders `route` from the current snapshots without navigating.
    pub fn peek(&self, route: &Route) -> Page {
        let kind = self.routes.resolve(route);
        if let Some(page) = unguarded(&kind, route) {
            return page;
        }

        let session = self.session.snapshot();
        let admin = self.admin.snapshot();
        let state = match &kind {
            RouteKind::Protected(role) => {
                ProtectedRoute::new(self.routes.requirement(role.clone()))
                    .decide(&session, &admin)
                    .state
            }
            RouteKind::AdminLayout => AdminLayout::new().decide(&admin).state,
            _ => match DashboardRedirector::target(&session) {
                Dispatch::Wait => GuardState::Pending,
                Dispatch::Go(_) | Dispatch::Stuck(_) => GuardState::Unauthorized,
            },
        };

        match state {
            GuardState::Pending => Page::Loading,
            GuardState::Unauthorized => Page::Blank,
            GuardState::Authorized => authorized_page(&kind),
        }
    }

    async fn run_guard(&self, kind: &RouteKind) -> Result<GuardState, EduError> {
        let session = self.session.subscribe();
        let admin = self.admin.subscribe();
        let navigator = self.history.clone();

        let handle = match kind {
            RouteKind::Protected(role) => spawn_guard(
                ProtectedRoute::new(self.routes.requirement(role.clone())),
                session,
                admin,
                navigator,
            ),
            RouteKind::AdminLayout => spawn_guard(AdminLayout::new(), session, admin, navigator),
            _ => spawn_guard(DashboardRedirector::new(), session, admin, navigator),
        };
        Ok(handle.settled().await?)
    }

    /// Opens the chat feed of the signed-in user, on `conversation` if
    /// given.
    ///
    /// # Errors
    /// [`EduError::NotSignedIn`] if nobody is signed in.
    pub async fn chat(&self, conversation: Option<ConversationId>) -> Result<ChatMessagesFeed, EduError> {
        let snapshot = self.session.ready().await?;
        let user = snapshot.identity.ok_or(EduError::NotSignedIn)?.id;

        Ok(ChatMessagesFeed::spawn_with_config(
            Arc::clone(&self.tables),
            user,
            conversation,
            self.config.feed_config(),
        ))
    }

    /// Opens the leaderboard feed.
    pub fn leaderboard(&self) -> LeaderboardFeed {
        LeaderboardFeed::spawn(Arc::clone(&self.tables), self.config.feed_config())
    }

    /// Sends a document to the processing endpoint as the signed-in user.
    pub async fn summarize(&self, upload: Upload, access_token: &str) -> ProcessResponse {
        let user = match self.session.ready().await {
            Ok(snapshot) => snapshot.identity.map(|i| i.id),
            Err(_) => None,
        };
        match user {
            Some(user) => self.summarizer.process(upload, &user, access_token).await,
            None => ProcessResponse::failure(EduError::NotSignedIn.to_string()),
        }
    }

    /// Forwards an auth state change to both providers.
    pub async fn notify(&self, event: AuthEvent) -> Result<(), EduError> {
        self.session.notify(event.clone()).await?;
        self.admin.notify(event).await?;
        Ok(())
    }

    /// Signs out and clears both sessions.
    ///
    /// On return neither provider reports an identity. Both are cleared
    /// even when the backend call fails; that failure is still returned.
    pub async fn sign_out(&self) -> Result<(), EduError> {
        let result = self.session.sign_out().await;
        self.admin.clear().await?;
        Ok(result?)
    }

    /// Stops both providers.
    pub async fn shutdown(&self) -> Result<(), EduError> {
        self.session.shutdown().await?;
        self.admin.shutdown().await?;
        tracing::info!("edudash client stopped");
        Ok(())
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn session(&self) -> &SessionProvider {
        &self.session
    }

    pub fn admin(&self) -> &AdminSessionProvider {
        &self.admin
    }

    pub fn tables(&self) -> &T {
        &self.tables
    }

    pub fn summarizer(&self) -> &SummarizerClient {
        &self.summarizer
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

fn unguarded(kind: &RouteKind, route: &Route) -> Option<Page> {
    match kind {
        RouteKind::Public => Some(Page::Public(route.clone())),
        RouteKind::NotFound => Some(Page::NotFound(route.path().to_string())),
        _ => None,
    }
}

fn authorized_page(kind: &RouteKind) -> Page {
    match kind {
        RouteKind::Protected(role) => Page::Dashboard(role.clone()),
        RouteKind::AdminLayout => Page::Dashboard(Role::Admin),
        // The dispatcher never authorizes; it only redirects.
        _ => Page::Blank,
    }
}
