use cucumber::{then, when};
use eshop_payment_engine::{
    checkout_objects::CheckoutRequest,
    db_types::{Cents, PaymentStatus},
    traits::GatewayError,
};

use crate::cucumber::EngineWorld;

#[when(expr = "customer {word} checks out {word}")]
async fn checkout(world: &mut EngineWorld, customer: String, product_id: String) {
    let result = world.engine().checkout.initiate_payment(&customer, CheckoutRequest::single(product_id)).await;
    match result {
        Ok(receipt) => {
            world.receipts.insert(customer, receipt);
        },
        Err(e) => {
            world.failures.insert(customer, e);
        },
    }
}

#[when(expr = "the gateway fails the next {int} order requests")]
async fn gateway_fails_orders(world: &mut EngineWorld, n: usize) {
    world.engine().gateway.fail_next_creates(n, GatewayError::Order("system busy".into()));
}

#[when(expr = "{word} pays at the gateway")]
async fn customer_pays(world: &mut EngineWorld, customer: String) {
    let payment = world.payment_of(&customer).await;
    world.engine().gateway.mark_paid(&payment.gateway_id);
}

#[when(expr = "{int} seconds pass")]
async fn seconds_pass(world: &mut EngineWorld, secs: i64) {
    world.engine().clock.advance(chrono::Duration::seconds(secs));
}

#[when(expr = "{int} minutes pass")]
async fn minutes_pass(world: &mut EngineWorld, mins: i64) {
    world.engine().clock.advance(chrono::Duration::minutes(mins));
}

#[when("the reconciler runs")]
async fn reconciler_runs(world: &mut EngineWorld) {
    let pass = world.engine().reconciler.run_pass().await.expect("Reconciliation pass failed");
    pass.join().await;
}

#[then(expr = "the order of {word} reports status code {int}")]
async fn order_status_code(world: &mut EngineWorld, customer: String, code: i32) {
    let order_id = world.receipt(&customer).order_id.clone();
    let view = world.engine().status.order_status(&customer, &order_id).await.expect("Error fetching order status");
    assert_eq!(view.code, code, "Unexpected status for {customer}: {}", view.description);
}

#[then(expr = "the payment of {word} is {word}")]
async fn payment_status(world: &mut EngineWorld, customer: String, status: String) {
    let expected = status.parse::<PaymentStatus>().expect("Not a payment status");
    let payment = world.payment_of(&customer).await;
    assert_eq!(payment.status, expected);
}

#[then(expr = "the payment of {word} is for {float}")]
async fn payment_amount(world: &mut EngineWorld, customer: String, amount: f64) {
    let payment = world.payment_of(&customer).await;
    assert_eq!(payment.final_amount, Cents::from_decimal(amount).expect("Not a valid amount"));
}

#[then(expr = "{word} owns {int} product(s)")]
async fn purchases(world: &mut EngineWorld, customer: String, count: usize) {
    let history = world.engine().status.purchase_history(&customer).await.expect("Error fetching purchase history");
    assert_eq!(history.len(), count);
}

#[then(expr = "the checkout of {word} fails with code {int}")]
async fn checkout_fails(world: &mut EngineWorld, customer: String, code: i32) {
    let err = world.failures.get(&customer).unwrap_or_else(|| panic!("The checkout of {customer} did not fail"));
    assert_eq!(err.code(), code);
}

#[then(expr = "the gateway was asked for {int} remote order(s)")]
async fn remote_orders(world: &mut EngineWorld, count: usize) {
    assert_eq!(world.engine().gateway.create_count(), count);
}

#[then(expr = "the gateway was asked about {int} payment(s)")]
async fn remote_checks(world: &mut EngineWorld, count: usize) {
    assert_eq!(world.engine().gateway.check_count(), count);
}
