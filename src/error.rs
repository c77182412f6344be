use thiserror::Error;

use crate::checkout::CheckoutStep;
use crate::khqr::KhqrError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sign in to add items to your cart")]
    AuthRequired,
    #[error("no product with id {0}")]
    UnknownProduct(u32),
    #[error("cart is empty")]
    EmptyCart,
    #[error("name and Telegram username are required")]
    IncompleteCustomer,
    #[error("upload the payment receipt to proceed")]
    MissingReceipt,
    #[error("checkout is at {actual:?}, expected {expected:?}")]
    WrongStep {
        expected: CheckoutStep,
        actual: CheckoutStep,
    },
    #[error("cannot build payment code: {0}")]
    Payload(#[from] KhqrError),
    #[error("failed to send order: {0}")]
    Notification(anyhow::Error),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
