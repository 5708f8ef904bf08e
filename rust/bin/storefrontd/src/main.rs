//! `storefrontd`: the storefront server binary.
//!
//! Usage:
//!   storefrontd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/storefront/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use storefront_core::{Authenticator, JwtAuthenticator, Module};
use tracing::info;

use config::ServerConfig;

/// Storefront server.
#[derive(Parser, Debug)]
#[command(name = "storefrontd", about = "Storefront server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides default 0.0.0.0:8080).
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let cfg = ServerConfig::load(&config_path)?;
    bootstrap::verify_config(&cfg)?;
    bootstrap::report_disabled(&cfg);

    // Storage.
    let data_dir = std::path::PathBuf::from(&cfg.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    let core_config = storefront_core::ServiceConfig {
        data_dir: Some(data_dir),
        listen: cli.listen.clone(),
        ..Default::default()
    };

    let kv: Arc<dyn storefront_kv::KVStore> = Arc::new(
        storefront_kv::RedbStore::open(&core_config.resolve_db_path())
            .map_err(|e| anyhow::anyhow!("failed to open KV store: {}", e))?,
    );
    let sql: Arc<dyn storefront_sql::SQLStore> = Arc::new(
        storefront_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    let auth: Arc<dyn Authenticator> = Arc::new(JwtAuthenticator::new(
        &cfg.auth.jwt_secret,
        cfg.auth.admin_emails.clone(),
    ));

    // Catalog and pricing.
    let catalog = Arc::new(catalog::service::CatalogService::new(Arc::clone(&sql))?);

    let mut sources: Vec<Arc<dyn shop::currency::RateSource>> = Vec::new();
    if !cfg.currency.open_exchange_rates_app_id.is_empty() {
        sources.push(Arc::new(shop::currency::OpenExchangeRates::new(
            cfg.currency.open_exchange_rates_app_id.clone(),
        )));
    }
    sources.push(Arc::new(shop::currency::Frankfurter::new()));
    let rates = Arc::new(shop::currency::RateBook::new(sources, Arc::clone(&kv)));
    let carts = Arc::new(shop::cart::CartStore::new(Arc::clone(&kv)));

    // Orders and notifications.
    let orders = Arc::new(orders::service::OrderService::new(Arc::clone(&sql))?);

    let mut notify_svc = notify::service::NotifyService::new(Arc::clone(&orders));
    if !cfg.email.api_key.is_empty() {
        notify_svc = notify_svc.with_mailer(
            Arc::new(notify::mailer::ResendMailer::new(cfg.email.api_key.clone())),
            cfg.email.from.clone(),
        );
    }
    if !cfg.helpdesk.api_key.is_empty() && !cfg.helpdesk.domain.is_empty() {
        notify_svc = notify_svc.with_helpdesk(Arc::new(notify::helpdesk::Freshdesk::new(
            &cfg.helpdesk.domain,
            cfg.helpdesk.api_key.clone(),
        )));
    }
    if !cfg.turnstile.secret_key.is_empty() {
        notify_svc = notify_svc.with_captcha(Arc::new(notify::captcha::Turnstile::new(
            cfg.turnstile.secret_key.clone(),
        )));
    }
    let notify_svc = Arc::new(notify_svc);

    // Payments.
    let mut payment_svc = payments::service::PaymentService::new(
        Arc::clone(&orders),
        Arc::clone(&catalog),
        Arc::clone(&rates),
        Arc::clone(&notify_svc),
    )
    .with_webhook_secret(cfg.stripe.webhook_secret.clone())
    .with_public_url(cfg.server.public_url.clone());
    if !cfg.stripe.secret_key.is_empty() {
        let gateway = match &cfg.stripe.api_base {
            Some(base) => payments::gateway::StripeGateway::with_base_url(base, cfg.stripe.secret_key.clone()),
            None => payments::gateway::StripeGateway::new(cfg.stripe.secret_key.clone()),
        };
        payment_svc = payment_svc.with_gateway(Arc::new(gateway));
    }

    // Content.
    let mut content_svc = content::service::ContentService::new(Arc::clone(&catalog))
        .with_cache_ttl(Duration::from_secs(cfg.cms.cache_ttl_secs));
    if !cfg.cms.project_id.is_empty() {
        content_svc = content_svc.with_cms(
            Arc::new(content::client::SanityClient::new(
                &cfg.cms.project_id,
                &cfg.cms.dataset,
                &cfg.cms.api_version,
                cfg.cms.token.clone(),
            )),
            content::image::ImageUrlBuilder::new(cfg.cms.project_id.clone(), cfg.cms.dataset.clone()),
        );
    }

    // Account.
    let provider: Option<Arc<dyn account::provider::AuthProvider>> = if cfg.auth.url.is_empty() {
        None
    } else {
        Some(Arc::new(account::provider::GoTrue::new(
            &cfg.auth.url,
            cfg.auth.anon_key.clone(),
        )))
    };
    let account_svc = account::service::AccountService::new(provider, cfg.server.public_url.clone());

    let modules: Vec<Box<dyn Module>> = vec![
        Box::new(catalog::CatalogModule::new(Arc::clone(&catalog), auth.clone())),
        Box::new(shop::ShopModule::new(carts, Arc::clone(&rates), Arc::clone(&catalog), auth.clone())),
        Box::new(orders::OrdersModule::new(
            Arc::clone(&orders),
            Arc::clone(&catalog),
            Arc::clone(&rates),
            auth.clone(),
        )),
        Box::new(notify::NotifyModule::new(notify_svc, auth.clone())),
        Box::new(payments::PaymentsModule::new(Arc::new(payment_svc), auth.clone())),
        Box::new(content::ContentModule::new(Arc::new(content_svc), auth.clone())),
        Box::new(account::AccountModule::new(Arc::new(account_svc), auth)),
    ];
    let app = routes::build_router(&modules);

    // Background exchange-rate refresh.
    let refresher = shop::worker::start(rates, Duration::from_secs(cfg.currency.refresh_secs.max(60)));

    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("Storefront server listening on {}", core_config.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    refresher.cancel();
    Ok(())
}
