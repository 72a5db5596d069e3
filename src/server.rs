//! # Server Configuration
//!
//! Router assembly and server startup for the Retail API. Every entity router
//! is nested under `/api/<collection>` behind the bearer auth middleware;
//! health checks and documentation stay public.

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::handlers::{
    self, cash_registers, catalog, currencies, invoices, purchases, rentals, sales, schools,
    tools, tournaments,
};
use crate::telemetry::{TRACE_ID_HEADER, trace_middleware};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
}

/// Every authenticated router with the collection it is mounted under.
fn api_routers() -> Vec<(&'static str, Router<AppState>)> {
    vec![
        ("clients", catalog::client_routes()),
        ("warehouses", catalog::warehouse_routes()),
        ("products", catalog::product_routes()),
        ("sales", sales::routes()),
        ("purchases", purchases::routes()),
        ("rentals", rentals::routes()),
        ("cash-registers", cash_registers::routes()),
        ("invoices", invoices::routes()),
        ("schools", schools::school_routes()),
        ("courses", schools::course_routes()),
        ("fee-payments", schools::fee_payment_routes()),
        ("currencies", currencies::currency_routes()),
        ("expense-types", currencies::expense_type_routes()),
        ("exchanges", currencies::exchange_routes()),
        ("players", tournaments::player_routes()),
        ("tournaments", tournaments::tournament_routes()),
        ("matches", tournaments::match_routes()),
        ("payments", tools::payment_routes()),
        ("tools", tools::tool_routes()),
    ]
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, TRACE_ID_HEADER])
        .expose_headers([header::LOCATION, TRACE_ID_HEADER]);

    if config.cors_allowed_origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    cors.allow_origin(origins)
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let auth = from_fn_with_state(Arc::clone(&state.config), auth_middleware);

    let api = api_routers()
        .into_iter()
        .fold(Router::new(), |api, (collection, router)| {
            api.nest(&format!("/{collection}"), router.route_layer(auth.clone()))
        });

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .nest("/api", api)
        .with_state(state.clone())
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .layer(from_fn(trace_middleware))
}

/// Starts the server with the given configuration and runs until Ctrl-C.
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .map_err(|e| anyhow::anyhow!("Invalid server address: {e}"))?;
    let profile = config.profile.clone();

    let state = AppState {
        config: Arc::new(config),
        db,
    };
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Operator token or HS256 JWT"))
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::readyz,
        crate::handlers::catalog::low_stock,
        crate::handlers::sales::checkout,
        crate::handlers::sales::detail,
        crate::handlers::sales::void,
        crate::handlers::purchases::receive,
        crate::handlers::purchases::detail,
        crate::handlers::purchases::cancel,
        crate::handlers::rentals::open,
        crate::handlers::rentals::return_rental,
        crate::handlers::rentals::cancel,
        crate::handlers::cash_registers::open,
        crate::handlers::cash_registers::close,
        crate::handlers::invoices::issue,
        crate::handlers::invoices::print,
        crate::handlers::invoices::void,
        crate::handlers::schools::list_courses,
        crate::handlers::schools::list_fee_payments,
        crate::handlers::currencies::convert,
        crate::handlers::currencies::list_expense_types,
        crate::handlers::currencies::record_exchange,
        crate::handlers::tournaments::list_match_players,
        crate::handlers::tournaments::add_match_player,
        crate::handlers::tournaments::remove_match_player,
        crate::handlers::tournaments::finalize,
        crate::handlers::tournaments::roster,
        crate::handlers::tools::payment_quote,
        crate::handlers::tools::amount_words,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::handlers::types::HealthStatus,
            crate::pagination::PaginationInfo,
            crate::billing::Tender,
            crate::billing::TenderMethod,
            crate::billing::PaymentQuote,
            crate::repositories::client::ClientInput,
            crate::repositories::warehouse::WarehouseInput,
            crate::repositories::product::ProductInput,
            crate::repositories::sale::CheckoutRequest,
            crate::repositories::sale::CheckoutItem,
            crate::repositories::sale::SaleUpdate,
            crate::repositories::sale::SaleDetail,
            crate::repositories::purchase::PurchaseInput,
            crate::repositories::purchase::PurchaseItemInput,
            crate::repositories::purchase::PurchaseUpdate,
            crate::repositories::purchase::PurchaseDetail,
            crate::repositories::rental::RentalInput,
            crate::repositories::rental::RentalUpdate,
            crate::repositories::rental::ReturnRequest,
            crate::repositories::rental::RentalSettlement,
            crate::repositories::cash_register::CashRegisterInput,
            crate::repositories::cash_register::OpenRegisterRequest,
            crate::repositories::cash_register::CloseRegisterRequest,
            crate::repositories::invoice::IssueInvoiceRequest,
            crate::repositories::invoice::InvoiceUpdate,
            crate::repositories::school::SchoolInput,
            crate::repositories::school::CourseInput,
            crate::repositories::school::FeePaymentInput,
            crate::repositories::currency::CurrencyInput,
            crate::repositories::currency::ExpenseTypeInput,
            crate::repositories::currency::ExchangeInput,
            crate::repositories::currency::ExchangeUpdate,
            crate::repositories::currency::Conversion,
            crate::repositories::tournament::PlayerInput,
            crate::repositories::tournament::TournamentInput,
            crate::repositories::tournament::MatchInput,
            crate::repositories::tournament::MatchPlayerInput,
            crate::repositories::tournament::LineupEntry,
            crate::repositories::tournament::TeamRoster,
            crate::repositories::tournament::TournamentRoster,
            crate::handlers::tools::QuoteRequest,
            crate::handlers::tools::AmountInWords,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "root", description = "Service information and health checks"),
        (name = "products", description = "Product catalog and stock"),
        (name = "sales", description = "Checkout and sale lifecycle"),
        (name = "purchases", description = "Supplier purchases"),
        (name = "rentals", description = "Rentals and returns"),
        (name = "cash-registers", description = "Register open/close transitions"),
        (name = "invoices", description = "Invoice issuing and printing"),
        (name = "schools", description = "Schools, courses and fee payments"),
        (name = "currencies", description = "Currencies, rates and exchanges"),
        (name = "tournaments", description = "Tournaments, matches and lineups"),
        (name = "tools", description = "Payment and amount-in-words calculators")
    ),
    info(
        title = "Retail API",
        description = "Point of sale, inventory, rentals, school fees, currency exchange and tournaments",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
