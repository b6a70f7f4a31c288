#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use storefront_settlement::{
    config::{NotificationConfig, PaymentConfig},
    dto::cart::AddToCartRequest,
    error::{AppError, AppResult},
    models::{Order, OrderStatus},
    notifications::{
        InMemoryPublisher, NotificationGenerator, NotificationMessage, NotificationPublisher,
        PublishError,
    },
    processor::{CardTransaction, PaymentProcessor, ProcessorOutcome, TerminalTransaction},
    repository::{
        InMemoryNotificationPreferences, InMemoryOrderRepository, InMemoryProductCatalog,
        OrderFilter, OrderRepository, OrderTransaction, ProductSnapshot,
    },
    services::cart_service,
    state::AppState,
};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Processor that answers every call with a fixed outcome and records what it saw.
#[derive(Clone)]
pub struct ScriptedProcessor {
    outcome: ProcessorOutcome,
    calls: Arc<AtomicUsize>,
    amounts: Arc<Mutex<Vec<Decimal>>>,
    terminal: Arc<Mutex<Vec<TerminalTransaction>>>,
}

impl ScriptedProcessor {
    pub fn new(outcome: ProcessorOutcome) -> Self {
        Self {
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
            amounts: Arc::new(Mutex::new(Vec::new())),
            terminal: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn amounts(&self) -> Vec<Decimal> {
        self.amounts.lock().await.clone()
    }

    pub async fn terminal_transactions(&self) -> Vec<TerminalTransaction> {
        self.terminal.lock().await.clone()
    }
}

#[async_trait]
impl PaymentProcessor for ScriptedProcessor {
    async fn card_transaction(&self, transaction: &CardTransaction) -> ProcessorOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.amounts.lock().await.push(transaction.amount);
        self.outcome
    }

    async fn terminal_transaction(&self, transaction: &TerminalTransaction) -> ProcessorOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.amounts.lock().await.push(transaction.amount);
        self.terminal.lock().await.push(transaction.clone());
        self.outcome
    }
}

/// Wraps the in-memory repository; every commit fails and rolls back.
#[derive(Clone, Default)]
pub struct FailingCommitRepository {
    pub inner: InMemoryOrderRepository,
}

#[async_trait]
impl OrderRepository for FailingCommitRepository {
    async fn active_order(&self, customer_id: Uuid) -> AppResult<Option<Order>> {
        self.inner.active_order(customer_id).await
    }

    async fn find_order(&self, order_id: Uuid) -> AppResult<Option<Order>> {
        self.inner.find_order(order_id).await
    }

    async fn list_orders(&self, customer_id: Uuid, filter: &OrderFilter) -> AppResult<(Vec<Order>, u64)> {
        self.inner.list_orders(customer_id, filter).await
    }

    async fn save_cart(&self, order: &Order) -> AppResult<()> {
        self.inner.save_cart(order).await
    }

    async fn begin(&self) -> AppResult<Box<dyn OrderTransaction>> {
        Ok(Box::new(FailingCommit {
            inner: self.inner.begin().await?,
        }))
    }
}

struct FailingCommit {
    inner: Box<dyn OrderTransaction>,
}

#[async_trait]
impl OrderTransaction for FailingCommit {
    async fn transition(
        &mut self,
        order_id: Uuid,
        expected: &[OrderStatus],
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.inner.transition(order_id, expected, next, at).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.inner.rollback().await?;
        Err(AppError::Internal(anyhow::anyhow!("connection reset during commit")))
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.inner.rollback().await
    }
}

/// Records the order's stored status at the moment each payload is published.
#[derive(Clone)]
pub struct StatusSnapshotPublisher {
    orders: InMemoryOrderRepository,
    pub seen: Arc<Mutex<Vec<OrderStatus>>>,
}

impl StatusSnapshotPublisher {
    pub fn new(orders: InMemoryOrderRepository) -> Self {
        Self {
            orders,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl NotificationPublisher for StatusSnapshotPublisher {
    async fn publish(&self, message: &NotificationMessage) -> Result<(), PublishError> {
        let status = self
            .orders
            .find_order(message.order_id())
            .await
            .map_err(|e| PublishError(e.to_string()))?
            .map(|o| o.status)
            .ok_or_else(|| PublishError("order vanished".into()))?;
        self.seen.lock().await.push(status);
        Ok(())
    }
}

pub struct Harness {
    pub state: AppState,
    pub orders: InMemoryOrderRepository,
    pub catalog: InMemoryProductCatalog,
    pub preferences: InMemoryNotificationPreferences,
    pub publisher: InMemoryPublisher,
    pub processor: ScriptedProcessor,
    pub chess: Uuid,
    pub go: Uuid,
}

pub async fn harness(outcome: ProcessorOutcome) -> Harness {
    let orders = InMemoryOrderRepository::new();
    build(outcome, Arc::new(orders.clone()), orders, None).await
}

pub async fn harness_failing_commit(outcome: ProcessorOutcome) -> Harness {
    let repo = FailingCommitRepository::default();
    let orders = repo.inner.clone();
    build(outcome, Arc::new(repo), orders, None).await
}

pub async fn harness_with_publisher(
    outcome: ProcessorOutcome,
    orders: InMemoryOrderRepository,
    publisher: Arc<dyn NotificationPublisher>,
) -> Harness {
    build(outcome, Arc::new(orders.clone()), orders, Some(publisher)).await
}

async fn build(
    outcome: ProcessorOutcome,
    repository: Arc<dyn OrderRepository>,
    orders: InMemoryOrderRepository,
    publisher_override: Option<Arc<dyn NotificationPublisher>>,
) -> Harness {
    let catalog = InMemoryProductCatalog::new();
    let chess = Uuid::new_v4();
    let go = Uuid::new_v4();
    catalog
        .insert(ProductSnapshot {
            id: chess,
            name: "Chess".into(),
            price: dec!(20.00),
            discount: dec!(0),
        })
        .await;
    catalog
        .insert(ProductSnapshot {
            id: go,
            name: "Go".into(),
            price: dec!(15.00),
            discount: dec!(0.10),
        })
        .await;

    let preferences = InMemoryNotificationPreferences::new();
    let publisher = InMemoryPublisher::new();
    let processor = ScriptedProcessor::new(outcome);

    let notifier = NotificationGenerator::new(
        Arc::new(preferences.clone()),
        publisher_override.unwrap_or_else(|| Arc::new(publisher.clone())),
        NotificationConfig {
            image_base_url: "https://img.example.com/products".into(),
            sms_sender_phone: "+15550100".into(),
            ..NotificationConfig::default()
        },
    );

    let state = AppState {
        orders: repository,
        catalog: Arc::new(catalog.clone()),
        processor: Arc::new(processor.clone()),
        notifier,
        payment: PaymentConfig {
            terminal_account_number: "TEST-TERMINAL".into(),
            ..PaymentConfig::default()
        },
    };

    Harness {
        state,
        orders,
        catalog,
        preferences,
        publisher,
        processor,
        chess,
        go,
    }
}

impl Harness {
    /// A customer with the given channel and a cart holding 1 Chess and 3 Go.
    pub async fn customer_with_cart(&self, channel: &str) -> (Uuid, Order) {
        let customer_id = Uuid::new_v4();
        self.preferences.set(customer_id, channel).await;
        self.add(customer_id, self.chess, 1).await;
        let order = self.add(customer_id, self.go, 3).await;
        (customer_id, order)
    }

    pub async fn add(&self, customer_id: Uuid, product_id: Uuid, quantity: i32) -> Order {
        cart_service::add_to_cart(
            &self.state,
            customer_id,
            AddToCartRequest {
                product_id,
                quantity,
            },
        )
        .await
        .expect("add to cart")
        .data
        .expect("cart data")
    }

    pub async fn status_of(&self, order_id: Uuid) -> OrderStatus {
        self.orders
            .find_order(order_id)
            .await
            .expect("find order")
            .expect("order exists")
            .status
    }
}
