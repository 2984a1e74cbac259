use rust_decimal::Decimal;

use commerce_orders::{
    CreateOrder, LineItemRequest, MemoryStore, OrderConfig, OrderService, PaymentMethod, Product,
    ProductId, Role, ShippingDetails, User, UserId,
};

pub type MemoryService = OrderService<MemoryStore, MemoryStore>;

/// Amount in cents as a decimal, e.g. `money(1000)` is 10.00.
pub fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn shipping() -> ShippingDetails {
    ShippingDetails {
        address: "12 Harbour Road".to_string(),
        city: "Douala".to_string(),
        state: "Littoral".to_string(),
        country: "Cameroon".to_string(),
        postal_code: "00237".to_string(),
        phone_number: "+237600000000".to_string(),
    }
}

pub fn service_with(store: &MemoryStore, config: OrderConfig) -> MemoryService {
    OrderService::new(store.clone(), store.clone(), config)
}

/// A seeded store: one buyer and two products.
pub struct Shop {
    pub store: MemoryStore,
    pub service: MemoryService,
    pub buyer: User,
    /// Price 10.00, stock 5.
    pub widget: Product,
    /// Price 2.50, stock 100.
    pub gadget: Product,
}

impl Shop {
    pub async fn new() -> Self {
        Self::with_config(OrderConfig::default()).await
    }

    pub async fn with_config(config: OrderConfig) -> Self {
        let store = MemoryStore::new();
        let buyer = store.add_user("amina", "amina@example.com", Role::User).await;
        let widget = store.add_product("Widget", "WID-001", money(1000), 5).await;
        let gadget = store.add_product("Gadget", "GAD-001", money(250), 100).await;
        let service = service_with(&store, config);
        Self {
            store,
            service,
            buyer,
            widget,
            gadget,
        }
    }

    pub fn request(&self, items: &[(ProductId, i32)]) -> CreateOrder {
        self.request_for(self.buyer.id, items)
    }

    pub fn request_for(&self, user_id: UserId, items: &[(ProductId, i32)]) -> CreateOrder {
        CreateOrder {
            user_id,
            items: items
                .iter()
                .map(|&(product_id, quantity)| LineItemRequest {
                    product_id,
                    quantity,
                    unit_price: Decimal::ZERO,
                })
                .collect(),
            payment_method: PaymentMethod::CreditCard,
            shipping: Some(shipping()),
        }
    }

    pub async fn stock(&self, product_id: ProductId) -> i32 {
        self.store
            .stock_of(product_id)
            .await
            .expect("product should exist")
    }
}
