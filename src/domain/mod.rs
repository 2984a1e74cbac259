pub mod catalog;
pub mod ids;
pub mod order;

pub use catalog::{Product, Role, User};
pub use ids::{OrderId, OrderItemId, ProductId, ShippingInfoId, UserId};
pub use order::{
    validate_price, CreateOrder, LineItemRequest, NewOrder, NewOrderItem, Order, OrderFilter,
    OrderItem, OrderPatch, OrderStatus, OrderSummary, Page, PaymentMethod, ShippingDetails,
    ShippingInfo, UnknownVariant, MAX_AMOUNT,
};
