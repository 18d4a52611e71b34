use cucumber::given;
use eshop_payment_engine::{db_types::Cents, test_utils::prepare_env::seed_product};

use crate::{cucumber::EngineWorld, support::TestEngine};

#[given("a fresh install")]
async fn fresh_database(world: &mut EngineWorld) {
    let system = TestEngine::new().await;
    world.system = Some(system);
}

#[given(expr = "product {word} is on sale for {float}")]
async fn product_on_sale(world: &mut EngineWorld, product_id: String, price: f64) {
    let price = Cents::from_decimal(price).expect("Not a valid price");
    seed_product(&world.engine().db, &product_id, price, &format!("ext-{product_id}")).await;
}
