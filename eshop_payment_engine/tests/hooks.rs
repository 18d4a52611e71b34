use std::{future::Future, pin::Pin, time::Duration};

use eshop_payment_engine::{
    checkout_objects::CheckoutRequest,
    events::{cart_cleanup_hook, CheckoutCompletedEvent, EventHooks, PaymentSettledEvent, PaymentTimedOutEvent},
    test_utils::prepare_env::{count_cart_items, seed_cart_item},
};
use log::*;

use crate::support::{HookCalled, TestEngine};

mod support;

type BoxedUnit = Pin<Box<dyn Future<Output = ()> + Send>>;

#[tokio::test]
async fn completed_checkouts_clear_the_cart() {
    let engine = TestEngine::with_hooks(|db, hooks| {
        hooks.on_checkout_completed = Some(cart_cleanup_hook(db.clone()));
    })
    .await
    .with_product("P1", 1000)
    .await;

    seed_cart_item(&engine.db, "alice", "P1").await;
    seed_cart_item(&engine.db, "alice", "P2").await;
    assert_eq!(count_cart_items(&engine.db, "alice").await, 2);

    engine.checkout.initiate_payment("alice", CheckoutRequest::single("P1")).await.unwrap();
    let mut remaining = 2;
    for _ in 0..100 {
        remaining = count_cart_items(&engine.db, "alice").await;
        if remaining == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(remaining, 1, "Only the purchased product leaves the cart");
    engine.tear_down().await;
}

fn register_counters(hooks: &mut EventHooks, checkouts: HookCalled, settled: HookCalled, timed_out: HookCalled) {
    hooks.on_checkout_completed(move |ev: CheckoutCompletedEvent| {
        let c = checkouts.clone();
        Box::pin(async move {
            info!("🪝️ Checkout completed: {}", ev.order_id);
            c.called();
        }) as BoxedUnit
    });
    hooks.on_payment_settled(move |ev: PaymentSettledEvent| {
        let s = settled.clone();
        Box::pin(async move {
            info!("🪝️ Payment settled: {}", ev.payment.id);
            assert_eq!(ev.entitlements_created, 1);
            s.called();
        }) as BoxedUnit
    });
    hooks.on_payment_timed_out(move |ev: PaymentTimedOutEvent| {
        let t = timed_out.clone();
        Box::pin(async move {
            info!("🪝️ Payment timed out: {}", ev.payment.id);
            t.called();
        }) as BoxedUnit
    });
}

#[tokio::test]
async fn settlement_and_timeout_hooks_fire() {
    let checkouts = HookCalled::default();
    let settled = HookCalled::default();
    let timed_out = HookCalled::default();
    let (c, s, t) = (checkouts.clone(), settled.clone(), timed_out.clone());
    let engine = TestEngine::with_hooks(move |_db, hooks| register_counters(hooks, c, s, t))
        .await
        .with_product("P1", 1000)
        .await;

    let paid = engine.checkout.initiate_payment("alice", CheckoutRequest::single("P1")).await.unwrap();
    engine.clock.advance(chrono::Duration::minutes(2));
    let _unpaid = engine.checkout.initiate_payment("bob", CheckoutRequest::single("P1")).await.unwrap();
    assert_eq!(checkouts.wait_for(2).await, 2);

    let payment = engine.payment(&paid.payment_id).await;
    engine.gateway.mark_paid(&payment.gateway_id);
    engine.reconciler.run_pass().await.unwrap().join().await;
    assert_eq!(settled.wait_for(1).await, 1);

    // Alice's payment is settled, so only Bob's can time out
    engine.clock.advance(chrono::Duration::minutes(4));
    engine.reconciler.run_pass().await.unwrap().join().await;
    assert_eq!(timed_out.wait_for(1).await, 1);
    assert_eq!(settled.count(), 1);
    engine.tear_down().await;
}
