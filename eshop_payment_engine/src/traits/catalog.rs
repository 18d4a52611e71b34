use std::future::Future;

use crate::{db_types::SellableProduct, traits::PaymentStoreError};

/// Read access to the product catalogue.
pub trait ProductCatalog: Clone + Send + Sync + 'static {
    /// Returns the product if it exists and is on sale.
    fn fetch_sellable_product(
        &self,
        product_id: &str,
    ) -> impl Future<Output = Result<Option<SellableProduct>, PaymentStoreError>> + Send;
}

pub trait CartManagement: Clone + Send + Sync + 'static {
    /// Removes the product from the user's cart. Returns `true` if anything was removed.
    fn remove_cart_item(
        &self,
        user_id: &str,
        product_id: &str,
    ) -> impl Future<Output = Result<bool, PaymentStoreError>> + Send;
}
