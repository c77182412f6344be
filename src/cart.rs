use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::{CartItem, Product};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit of `product`, bumping the quantity if it is already in the cart.
    pub fn add(&mut self, product: &Product) {
        match self.items.iter_mut().find(|item| item.product.id == product.id) {
            Some(item) => item.quantity += 1,
            None => self.items.push(CartItem {
                product: product.clone(),
                quantity: 1,
            }),
        }
    }

    /// Drop the whole line for `product_id`. Returns whether anything was removed.
    pub fn remove(&mut self, product_id: u32) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != product_id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of price × quantity, rounded to cents.
    pub fn total(&self) -> BigDecimal {
        self.items
            .iter()
            .map(|item| {
                let price = BigDecimal::from_str(&item.product.price.to_string())
                    .unwrap_or_else(|_| BigDecimal::from(0));
                price * BigDecimal::from(item.quantity)
            })
            .fold(BigDecimal::from(0), |acc, line| acc + line)
            .with_scale_round(2, RoundingMode::HalfUp)
    }
}
