//! carebook server binary.
//!
//! Loads configuration, wires adapters into the booking router, runs the
//! schedule maintenance loop, and serves HTTP until Ctrl-C.

use std::sync::Arc;

use axum::http::HeaderValue;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use carebook::adapters::events::{HttpEventPublisher, TracingEventPublisher};
use carebook::adapters::http::{booking_router, BookingAppState};
use carebook::adapters::memory::{
    InMemoryAppointmentRepository, InMemorySettlementStore, InMemorySlotStore,
};
use carebook::adapters::paystack::{MockPaymentGateway, PaystackConfig, PaystackGateway};
use carebook::adapters::postgres::{
    PostgresAppointmentRepository, PostgresSettlementStore, PostgresSlotStore, MIGRATOR,
};
use carebook::application::{AppointmentLifecycle, Notifier, ScheduleMaintenance};
use carebook::config::{AppConfig, NotificationConfig, PaymentConfig, ServerConfig};
use carebook::ports::{
    AppointmentRepository, Clock, EventPublisher, PaymentGateway, SettlementStore, SlotStore,
    SystemClock,
};
use secrecy::ExposeSecret;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct Stores {
    slots: Arc<dyn SlotStore>,
    appointments: Arc<dyn AppointmentRepository>,
    settlements: Arc<dyn SettlementStore>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        database = config.database.is_some(),
        payment = config.payment.is_some(),
        "Starting carebook"
    );

    let stores = build_stores(&config).await?;
    let gateway = build_gateway(config.payment.as_ref())?;
    let notifier = Notifier::new(build_publisher(&config.notifications)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Background sweep
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let lifecycle = Arc::new(AppointmentLifecycle::new(
        stores.appointments.clone(),
        stores.slots.clone(),
        notifier.clone(),
        clock.clone(),
    ));
    let maintenance = ScheduleMaintenance::new(
        stores.appointments.clone(),
        stores.slots.clone(),
        stores.settlements.clone(),
        lifecycle,
        notifier.clone(),
        clock.clone(),
        config.booking.maintenance(),
    );
    let maintenance_task = tokio::spawn(async move { maintenance.run(shutdown_rx).await });

    let state = BookingAppState::new(
        stores.slots,
        stores.appointments,
        stores.settlements,
        gateway,
        notifier,
        clock,
    )
    .with_callback_url(config.payment.as_ref().and_then(|p| p.callback_url.clone()));

    let app = booking_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(config.server.origins()?))
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = maintenance_task.await {
        tracing::warn!(error = %e, "Maintenance task ended abnormally");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_filter.as_str()));

    if server.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn build_stores(config: &AppConfig) -> Result<Stores, BoxError> {
    let Some(database) = &config.database else {
        tracing::warn!("No database configured; using in-memory stores");
        return Ok(Stores {
            slots: Arc::new(InMemorySlotStore::new()),
            appointments: Arc::new(InMemoryAppointmentRepository::new()),
            settlements: Arc::new(InMemorySettlementStore::new()),
        });
    };

    let pool = database.connect().await?;
    if database.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    Ok(Stores {
        slots: Arc::new(PostgresSlotStore::new(pool.clone())),
        appointments: Arc::new(PostgresAppointmentRepository::new(pool.clone())),
        settlements: Arc::new(PostgresSettlementStore::new(pool)),
    })
}

fn build_gateway(payment: Option<&PaymentConfig>) -> Result<Arc<dyn PaymentGateway>, BoxError> {
    let Some(payment) = payment else {
        tracing::warn!("No payment gateway configured; using the mock gateway");
        return Ok(Arc::new(MockPaymentGateway::new()));
    };

    if payment.is_test_mode() {
        tracing::info!("Paystack running in test mode");
    }
    let gateway_config = PaystackConfig::new(
        payment.secret_key.expose_secret().clone(),
        payment.webhook_secret().expose_secret().clone(),
    )
    .with_base_url(payment.base_url.clone())
    .with_currency(payment.currency.clone())
    .with_timeout(payment.timeout());

    Ok(Arc::new(PaystackGateway::new(gateway_config)?))
}

fn build_publisher(config: &NotificationConfig) -> Result<Arc<dyn EventPublisher>, BoxError> {
    match &config.url {
        Some(url) => Ok(Arc::new(HttpEventPublisher::new(url.clone(), config.timeout())?)),
        None => Ok(Arc::new(TracingEventPublisher)),
    }
}

fn cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
