use std::sync::Arc;

use poem::{Server, listener::TcpListener};
use sqlx::postgres::PgPoolOptions;
use tokio::main;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    application::{
        handlers::{batch_dispatcher::BatchDispatcher, status_reconciler::StatusReconciler},
        services::{ledger::DeliveryLedger, pacer::TokioPacer},
        usecases::{
            list_messages::ListMessagesUseCase, send_bulk::SendBulkUseCase,
            send_reply::SendReplyUseCase,
        },
    },
    config::Config,
    domain::repositories::{ContactDirectory, DeliveryLedgerRepository, MessageLogRepository},
    infrastructure::{
        provider::whatsapp::WhatsAppClient,
        repositories::{
            in_memory::{
                InMemoryContactDirectory, InMemoryDeliveryLedgerRepository,
                InMemoryMessageLogRepository,
            },
            postgres::{
                PostgresContactDirectory, PostgresDeliveryLedgerRepository,
                PostgresMessageLogRepository,
            },
        },
    },
    presentation::http::{endpoints::root::ApiState, routes},
};

mod application;
mod config;
mod domain;
mod infrastructure;
mod presentation;
#[cfg(test)]
mod testing;

struct Repositories {
    ledger: Arc<dyn DeliveryLedgerRepository>,
    contacts: Arc<dyn ContactDirectory>,
    messages: Arc<dyn MessageLogRepository>,
}

async fn repositories(config: &Config) -> anyhow::Result<Repositories> {
    let Some(database_url) = config.database_url.as_deref() else {
        info!("DATABASE_URL not set, using in-memory repositories");
        return Ok(Repositories {
            ledger: Arc::new(InMemoryDeliveryLedgerRepository::new()),
            contacts: Arc::new(InMemoryContactDirectory::new()),
            messages: Arc::new(InMemoryMessageLogRepository::new()),
        });
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database migrations applied");

    Ok(Repositories {
        ledger: PostgresDeliveryLedgerRepository::new(pool.clone()),
        contacts: PostgresContactDirectory::new(pool.clone()),
        messages: PostgresMessageLogRepository::new(pool),
    })
}

#[main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("campaigns=info".parse()?))
        .init();

    let config = Config::try_parse()?;
    let server_url = format!("{}://{}:{}", config.scheme, config.host, config.port);

    let repos = repositories(&config).await?;
    let gateway = WhatsAppClient::new(&config.whatsapp)?;
    let ledger = DeliveryLedger::new(repos.ledger, repos.contacts.clone());

    let dispatcher = Arc::new(BatchDispatcher::new(
        gateway.clone(),
        ledger.clone(),
        Arc::new(TokioPacer),
        config.batch,
    ));

    let state = Arc::new(ApiState {
        send_bulk_usecase: Arc::new(SendBulkUseCase::new(dispatcher)),
        send_reply_usecase: Arc::new(SendReplyUseCase::new(
            gateway,
            repos.contacts,
            repos.messages.clone(),
        )),
        list_messages_usecase: Arc::new(ListMessagesUseCase::new(repos.messages.clone())),
        reconciler: Arc::new(StatusReconciler::new(ledger, repos.messages)),
        verify_token: config.verify_token.clone(),
    });

    info!(
        %server_url,
        batch_size = config.batch.batch_size,
        batch_delay_ms = config.batch.inter_batch_delay.as_millis() as u64,
        "starting server"
    );

    Server::new(TcpListener::bind(format!("0.0.0.0:{}", config.port)))
        .run(routes(state, &server_url))
        .await?;
    Ok(())
}
