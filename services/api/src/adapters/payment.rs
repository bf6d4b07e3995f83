//! services/api/src/adapters/payment.rs
//!
//! A mock payment gateway implementing the `PaymentService` port. It simulates
//! provider latency and fails at a configured random rate regardless of input.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use quickcart_core::domain::PaymentMethod;
use quickcart_core::ports::{PaymentDecline, PaymentReceipt, PaymentRequest, PaymentService};
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_FAILURE_RATE: f64 = 0.05;
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

//=========================================================================================
// Random Source
//=========================================================================================

/// Source of the uniform `[0, 1)` roll that decides a random decline.
pub trait FailureRoll: Send + Sync {
    fn roll(&self) -> f64;
}

/// Production source backed by the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngRoll;

impl FailureRoll for ThreadRngRoll {
    fn roll(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Always returns the same value. `FixedRoll(0.0)` forces a decline whenever the
/// failure rate is positive; `FixedRoll(1.0)` never declines.
#[derive(Debug, Clone, Copy)]
pub struct FixedRoll(pub f64);

impl FailureRoll for FixedRoll {
    fn roll(&self) -> f64 {
        self.0
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct MockPaymentGateway {
    failure_rate: f64,
    delay: Duration,
    rng: Arc<dyn FailureRoll>,
}

impl MockPaymentGateway {
    pub fn new(failure_rate: f64, delay: Duration, rng: Arc<dyn FailureRoll>) -> Self {
        Self {
            failure_rate,
            delay,
            rng,
        }
    }

    /// A gateway that never declines valid amounts and answers immediately.
    pub fn always_approve() -> Self {
        Self::new(0.0, Duration::ZERO, Arc::new(FixedRoll(1.0)))
    }

    /// A gateway that declines every valid amount.
    pub fn always_decline() -> Self {
        Self::new(1.0, Duration::ZERO, Arc::new(FixedRoll(0.0)))
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_RATE, DEFAULT_DELAY, Arc::new(ThreadRngRoll))
    }
}

/// Builds a method-specific payment identifier from a fresh random token.
pub fn payment_id_for(method: &PaymentMethod) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    match method {
        PaymentMethod::Stripe => format!("pi_{}", &hex[..24]),
        PaymentMethod::Paypal => format!("PAYID-{}", hex[..20].to_uppercase()),
        PaymentMethod::ApplePay => format!("ap_{}", &hex[..24]),
        PaymentMethod::Other(_) => format!("mock_{}", &hex[..16]),
    }
}

//=========================================================================================
// `PaymentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PaymentService for MockPaymentGateway {
    async fn process_payment(&self, request: PaymentRequest) -> Result<PaymentReceipt, PaymentDecline> {
        // 1. Reject non-positive amounts before doing any work.
        if request.amount <= Decimal::ZERO {
            return Err(PaymentDecline::InvalidAmount);
        }

        // 2. Simulate the provider round trip.
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        // 3. Random decline, independent of the request.
        if self.rng.roll() < self.failure_rate {
            warn!(method = request.method.tag(), amount = %request.amount, "mock payment declined");
            return Err(PaymentDecline::Declined("Payment declined by bank".to_string()));
        }

        // 4. Method-specific identifier.
        let payment_id = payment_id_for(&request.method);
        debug!(method = request.method.tag(), payment_id = %payment_id, "mock payment approved");
        Ok(PaymentReceipt {
            payment_id,
            method: request.method,
        })
    }
}
