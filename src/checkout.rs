//! Three-step checkout: customer details, KHQR payment with receipt upload, confirmation.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::fs;
use std::path::Path;

use crate::error::StoreError;
use crate::khqr::{self, Currency, EncodingRequest};
use crate::order::{CustomerInfo, Order};
use crate::store::Storefront;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    Info,
    Payment,
    Done,
}

/// Payment receipt image supplied by the customer.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Receipt {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| anyhow!("Failed to read receipt {}: {}", path.display(), e))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("receipt.jpg")
            .to_string();

        Ok(Self {
            file_name,
            mime: guess_mime(path).to_string(),
            bytes,
        })
    }
}

/// Guess an image content type from the file extension.
pub fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    }
}

/// Where order notifications go. Only success or failure is observed.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn notify(&self, caption: &str, receipt: &Receipt) -> Result<()>;
}

/// Payee details encoded into the payment code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merchant {
    pub id: String,
    pub name: String,
}

pub struct Checkout {
    merchant: Merchant,
    step: CheckoutStep,
    customer: CustomerInfo,
}

impl Checkout {
    pub fn new(merchant: Merchant) -> Self {
        Self {
            merchant,
            step: CheckoutStep::Info,
            customer: CustomerInfo::default(),
        }
    }

    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    fn expect_step(&self, expected: CheckoutStep) -> Result<(), StoreError> {
        if self.step != expected {
            return Err(StoreError::WrongStep {
                expected,
                actual: self.step,
            });
        }
        Ok(())
    }

    /// Step 1: both name and Telegram username are required to move on.
    pub fn submit_info(&mut self, customer: CustomerInfo) -> Result<(), StoreError> {
        self.expect_step(CheckoutStep::Info)?;
        if !customer.is_complete() {
            return Err(StoreError::IncompleteCustomer);
        }
        self.customer = customer;
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// Step 2: the KHQR payload for the current cart total, in USD.
    pub fn payment_payload(&self, store: &Storefront) -> Result<String, StoreError> {
        self.expect_step(CheckoutStep::Payment)?;
        if store.cart().is_empty() {
            return Err(StoreError::EmptyCart);
        }
        let request = EncodingRequest::new(
            self.merchant.id.as_str(),
            self.merchant.name.as_str(),
            store.cart_total(),
            Currency::Usd,
        )?;
        Ok(khqr::encode(&request))
    }

    /// Step 2 → 3: send the order with its receipt, then empty the cart.
    ///
    /// On a failed send the checkout stays at the payment step and the cart is kept.
    pub async fn submit_payment(
        &mut self,
        store: &mut Storefront,
        receipt: Option<&Receipt>,
        notifier: &dyn OrderNotifier,
    ) -> Result<Order, StoreError> {
        self.expect_step(CheckoutStep::Payment)?;
        let receipt = receipt.ok_or(StoreError::MissingReceipt)?;
        if store.cart().is_empty() {
            return Err(StoreError::EmptyCart);
        }

        let order = Order::new(self.customer.clone(), store.cart_items().to_vec(), store.cart_total());
        tracing::info!("Submitting order {} for {}", order.id, order.customer.name);

        if let Err(e) = notifier.notify(&order.caption(), receipt).await {
            tracing::error!("Error sending order {}: {}", order.id, e);
            return Err(StoreError::Notification(e));
        }

        store.clear_cart()?;
        self.step = CheckoutStep::Done;
        Ok(order)
    }
}
