use crate::{
    auth::{AccountService, AuthRateLimiter, FlowContext, LoginFlowConfig, TokenIssuer},
    clock::{Clock, SystemClock},
    config::Config,
    error::{AccountError, Result},
    http,
    jobs::CleanupSweeper,
    notify::{MessageTemplates, Notifier},
    store::{AccountStore, TimedStore},
};
use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// A configured account service ready to serve.
///
/// Owns the [`AccountService`], the store it was built over and the
/// configuration for the HTTP listener and cleanup sweeper.
///
/// # Example
///
/// ```rust,ignore
/// let config = ConfigBuilder::new().from_env().build()?;
/// let app = App::new(config, Arc::new(InMemoryAccountStore::new()), Arc::new(ConsoleNotifier::new()))?
///     .merge_protected(Router::new().route("/me", get(me)));
///
/// app.serve().await?;
/// ```
pub struct App {
    config: Config,
    store: Arc<dyn AccountStore>,
    clock: Arc<dyn Clock>,
    service: Arc<AccountService>,
    protected: Vec<Router>,
}

impl App {
    /// Wire the service from configuration.
    ///
    /// The store is wrapped in a [`TimedStore`] using `config.store.timeout`.
    pub fn new(
        config: Config,
        store: Arc<dyn AccountStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        Self::with_clock(config, store, notifier, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: Config,
        store: Arc<dyn AccountStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let secret = config
            .auth
            .jwt_secret
            .clone()
            .ok_or_else(|| AccountError::configuration("JWT secret is required"))?;

        let store: Arc<dyn AccountStore> = Arc::new(TimedStore::new(store, config.store.timeout));

        let ctx = FlowContext::new(
            store.clone(),
            notifier,
            MessageTemplates::new(config.auth.app_base_url.clone()),
        )
        .with_clock(clock.clone())
        .with_token_ttl(chrono_duration(config.auth.token_ttl, "token TTL")?);

        let mut issuer = TokenIssuer::new(secret, clock.clone())?
            .with_ttl(chrono_duration(config.auth.session_ttl, "session TTL")?);
        if let Some(iss) = &config.auth.issuer {
            issuer = issuer.with_issuer(iss.clone());
        }

        let service = AccountService::new(
            AuthRateLimiter::new(&config.rate_limit)?,
            ctx,
            issuer,
            LoginFlowConfig::default().conceal_account_state(config.auth.conceal_account_state),
        );

        Ok(Self {
            config,
            store,
            clock,
            service: Arc::new(service),
            protected: Vec::new(),
        })
    }

    pub fn service(&self) -> &Arc<AccountService> {
        &self.service
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Add routes that use [`AuthSession`](crate::auth::AuthSession).
    ///
    /// The session verifier is layered onto these routes only.
    pub fn merge_protected(mut self, router: Router) -> Self {
        self.protected.push(router);
        self
    }

    /// Build the full router: account endpoints, protected routes and
    /// the tracing, request-id and body-limit layers.
    pub fn router(&self) -> Router {
        let mut router = http::routes(self.service.clone());

        for protected in &self.protected {
            router = router.merge(protected.clone().layer(http::session_layer(&self.service)));
        }

        router
            .layer(DefaultBodyLimit::max(self.config.server.max_body_size))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Cleanup sweeper over the same (timed) store the flows use.
    pub fn sweeper(&self) -> Result<CleanupSweeper> {
        CleanupSweeper::new(self.store.clone(), self.clock.clone(), self.config.cleanup.clone())
    }

    /// Bind, start the cleanup sweeper and serve until Ctrl+C or SIGTERM.
    ///
    /// The sweeper is stopped after the listener drains.
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.addr().map_err(|e| {
            AccountError::configuration(format!("Invalid server address: {}", e))
        })?;

        let router = self.router();
        let sweeper = self.sweeper()?.start();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AccountError::internal(format!("failed to bind {}: {}", addr, e)))?;

        tracing::info!("Server starting on http://{}", addr);

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.shutdown().await;

        served.map_err(|e| AccountError::internal(format!("server error: {}", e)))?;
        tracing::info!("Shutdown complete");
        Ok(())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

fn chrono_duration(value: Duration, name: &str) -> Result<chrono::Duration> {
    chrono::Duration::from_std(value)
        .map_err(|_| AccountError::configuration(format!("{} is out of range", name)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
