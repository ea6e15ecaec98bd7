//! Shared application state and the store backends it can run on.

use std::sync::Arc;

use checkout::{CancellationCompensator, OrderFactory, PaymentCallbackHandler};
use domain::{
    CartSettings, CartStore, CheckoutSettings, InventoryLedger, OrderQueries, OrderStateMachine,
};
use sqlx::PgPool;
use storage::{
    CartRepository, InMemoryCartRepository, InMemoryOrderRepository, InMemoryProductCatalog,
    OrderRepository, PgCartRepository, PgOrderRepository, PgProductCatalog, Product,
    ProductCatalog,
};

/// A family of stores the services are built over.
pub trait Backend: Send + Sync + 'static {
    type Carts: CartRepository + Clone + 'static;
    type Catalog: ProductCatalog + Clone + 'static;
    type Orders: OrderRepository + Clone + 'static;
}

/// Process-local stores. Nothing survives a restart.
#[derive(Debug)]
pub struct InMemoryBackend;

impl Backend for InMemoryBackend {
    type Carts = InMemoryCartRepository;
    type Catalog = InMemoryProductCatalog;
    type Orders = InMemoryOrderRepository;
}

/// PostgreSQL stores sharing one pool.
#[derive(Debug)]
pub struct PostgresBackend;

impl Backend for PostgresBackend {
    type Carts = PgCartRepository;
    type Catalog = PgProductCatalog;
    type Orders = PgOrderRepository;
}

/// Shared application state accessible from all handlers.
pub struct AppState<B: Backend> {
    pub cart: CartStore<B::Carts, B::Catalog>,
    pub factory: OrderFactory<B::Carts, B::Catalog, B::Orders>,
    pub machine: OrderStateMachine<B::Orders>,
    pub queries: OrderQueries<B::Orders>,
    pub compensator: CancellationCompensator<B::Catalog, B::Orders>,
    pub payments: PaymentCallbackHandler<B::Orders>,
}

impl<B: Backend> AppState<B> {
    /// Wires every service over the given stores.
    pub fn new(
        carts: B::Carts,
        catalog: B::Catalog,
        orders: B::Orders,
        cart_settings: CartSettings,
        checkout_settings: CheckoutSettings,
    ) -> Self {
        let cart = CartStore::new(carts, catalog.clone(), cart_settings);
        let ledger = InventoryLedger::new(catalog);
        let machine = OrderStateMachine::new(orders.clone());

        Self {
            factory: OrderFactory::new(
                cart.clone(),
                ledger.clone(),
                orders.clone(),
                checkout_settings,
            ),
            compensator: CancellationCompensator::new(machine.clone(), ledger),
            payments: PaymentCallbackHandler::new(machine.clone()),
            queries: OrderQueries::new(orders),
            machine,
            cart,
        }
    }
}

/// Creates state over fresh in-memory stores. The catalog handle is returned
/// so callers can seed products.
pub fn in_memory_state(
    cart_settings: CartSettings,
    checkout_settings: CheckoutSettings,
) -> (Arc<AppState<InMemoryBackend>>, InMemoryProductCatalog) {
    let catalog = InMemoryProductCatalog::new();
    let state = AppState::new(
        InMemoryCartRepository::new(),
        catalog.clone(),
        InMemoryOrderRepository::new(),
        cart_settings,
        checkout_settings,
    );
    (Arc::new(state), catalog)
}

/// Creates state over PostgreSQL stores sharing `pool`.
pub fn postgres_state(
    pool: PgPool,
    cart_settings: CartSettings,
    checkout_settings: CheckoutSettings,
) -> Arc<AppState<PostgresBackend>> {
    Arc::new(AppState::new(
        PgCartRepository::new(pool.clone()),
        PgProductCatalog::new(pool.clone()),
        PgOrderRepository::new(pool),
        cart_settings,
        checkout_settings,
    ))
}

/// Loads a JSON array of products into an in-memory catalog and returns how
/// many were inserted. A missing `status` means active.
pub async fn seed_catalog(
    catalog: &InMemoryProductCatalog,
    json: &str,
) -> serde_json::Result<usize> {
    let products: Vec<Product> = serde_json::from_str(json)?;
    let count = products.len();
    for product in products {
        catalog.insert(product).await;
    }
    Ok(count)
}
