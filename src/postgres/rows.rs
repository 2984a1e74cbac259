//! Row decoding shared by the session and the catalog.

use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::domain::{
    OrderId, OrderItem, OrderItemId, OrderSummary, Product, ProductId, ShippingDetails,
    ShippingInfo, ShippingInfoId, User, UserId,
};
use crate::StoreResult;

pub(crate) const ORDER_COLUMNS: &str =
    "id, user_id, status, total_amount, payment_method, created_at, updated_at";

pub(crate) const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, quantity, price, created_at, updated_at";

pub(crate) const SHIPPING_COLUMNS: &str = "id, order_id, address, city, state, country, \
     postal_code, phone_number, created_at, updated_at";

pub(crate) fn order_summary(row: &PgRow) -> StoreResult<OrderSummary> {
    let status: String = row.try_get("status")?;
    let payment_method: String = row.try_get("payment_method")?;
    Ok(OrderSummary {
        id: OrderId(row.try_get("id")?),
        user_id: UserId(row.try_get("user_id")?),
        status: status.parse()?,
        total_amount: row.try_get("total_amount")?,
        payment_method: payment_method.parse()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn order_item(row: &PgRow) -> StoreResult<OrderItem> {
    Ok(OrderItem {
        id: OrderItemId(row.try_get("id")?),
        order_id: OrderId(row.try_get("order_id")?),
        product_id: ProductId(row.try_get("product_id")?),
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn shipping_info(row: &PgRow) -> StoreResult<ShippingInfo> {
    Ok(ShippingInfo {
        id: ShippingInfoId(row.try_get("id")?),
        order_id: OrderId(row.try_get("order_id")?),
        details: ShippingDetails {
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            country: row.try_get("country")?,
            postal_code: row.try_get("postal_code")?,
            phone_number: row.try_get("phone_number")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn user(row: &PgRow) -> StoreResult<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        role: role.parse()?,
    })
}

pub(crate) fn product(row: &PgRow) -> StoreResult<Product> {
    Ok(Product {
        id: ProductId(row.try_get("id")?),
        name: row.try_get("name")?,
        sku: row.try_get("sku")?,
        price: row.try_get("price")?,
        stock: row.try_get("stock")?,
        category_id: row.try_get("category_id")?,
    })
}
