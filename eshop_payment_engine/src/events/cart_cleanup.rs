use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::{
    events::{CheckoutCompletedEvent, Handler},
    traits::CartManagement,
};

/// A [`Handler`] that takes the purchased product out of the buyer's cart once checkout completes.
///
/// The cleanup is best-effort. Failures are logged and otherwise ignored.
pub fn cart_cleanup_hook<C: CartManagement>(carts: C) -> Handler<CheckoutCompletedEvent> {
    Arc::new(move |ev: CheckoutCompletedEvent| {
        let carts = carts.clone();
        Box::pin(async move {
            match carts.remove_cart_item(&ev.user_id, &ev.product_id).await {
                Ok(true) => debug!("📬️ Removed {} from the cart of user {}", ev.product_id, ev.user_id),
                Ok(false) => trace!("📬️ {} was not in the cart of user {}", ev.product_id, ev.user_id),
                Err(e) => warn!("📬️ Could not remove {} from the cart of user {}. {e}", ev.product_id, ev.user_id),
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    })
}
