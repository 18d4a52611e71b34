use std::collections::HashMap;

use cucumber::World;
use eshop_payment_engine::{checkout_objects::CheckoutReceipt, db_types::Payment, traits::PaymentStore, CheckoutError};

use crate::support::TestEngine;

#[derive(Default, World)]
pub struct EngineWorld {
    pub system: Option<TestEngine>,
    pub receipts: HashMap<String, CheckoutReceipt>,
    pub failures: HashMap<String, CheckoutError>,
}

impl std::fmt::Debug for EngineWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let url = self.system.as_ref().map(|s| s.url.as_str()).unwrap_or("<none>");
        write!(f, "EngineWorld ({url}, {} receipts, {} failures)", self.receipts.len(), self.failures.len())
    }
}

impl EngineWorld {
    pub fn engine(&self) -> &TestEngine {
        self.system.as_ref().expect("Engine not initialised")
    }

    pub fn receipt(&self, customer: &str) -> &CheckoutReceipt {
        self.receipts.get(customer).unwrap_or_else(|| panic!("{customer} has not checked out"))
    }

    pub async fn payment_of(&self, customer: &str) -> Payment {
        let id = &self.receipt(customer).payment_id;
        self.engine().db.fetch_payment(id).await.expect("Error fetching payment").expect("Payment does not exist")
    }
}
