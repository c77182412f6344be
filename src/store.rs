//! Storefront state: signed-in user, cart and theme, mirrored into the local store.

use anyhow::Result;
use bigdecimal::BigDecimal;

use crate::cart::Cart;
use crate::catalog;
use crate::error::StoreError;
use crate::storage::{LocalStore, CART_KEY, THEME_KEY};
use crate::supabase::{Session, SupabaseClient};
use crate::types::{CartItem, Theme, User};

pub const SESSION_KEY: &str = "purat_session";

pub struct Storefront {
    auth: SupabaseClient,
    storage: LocalStore,
    cart: Cart,
    theme: Theme,
}

impl Storefront {
    /// Load cart, theme and any saved session from `storage`.
    pub fn open(auth: SupabaseClient, storage: LocalStore) -> Self {
        let cart = storage.get_json::<Cart>(CART_KEY).unwrap_or_default();
        let theme = match storage.get(THEME_KEY) {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        };
        if let Some(session) = storage.get_json::<Session>(SESSION_KEY) {
            auth.restore(session);
        }

        tracing::debug!("Storefront opened with {} cart lines, {} theme", cart.items().len(), theme.as_str());
        Self {
            auth,
            storage,
            cart,
            theme,
        }
    }

    pub fn auth(&self) -> &SupabaseClient {
        &self.auth
    }

    pub fn user(&self) -> Option<User> {
        self.auth.current_user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<User> {
        let session = self.auth.sign_in(email, password).await?;
        self.storage.set_json(SESSION_KEY, &session)?;
        Ok(crate::supabase::map_user(&session.user))
    }

    /// Returns the signed-in user when the project confirms sign-ups immediately.
    pub async fn sign_up(&mut self, email: &str, password: &str, display_name: &str) -> Result<Option<User>> {
        match self.auth.sign_up(email, password, display_name).await? {
            Some(session) => {
                self.storage.set_json(SESSION_KEY, &session)?;
                Ok(Some(crate::supabase::map_user(&session.user)))
            }
            None => Ok(None),
        }
    }

    /// Sign out and forget the cart. Local state is cleared even when the remote call fails.
    pub async fn logout(&mut self) -> Result<()> {
        let remote = self.auth.sign_out().await;
        self.cart.clear();
        let session = self.storage.remove(SESSION_KEY);
        let cart = self.storage.remove(CART_KEY);
        session.and(cart).and(remote)
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn cart_items(&self) -> &[CartItem] {
        self.cart.items()
    }

    pub fn cart_total(&self) -> BigDecimal {
        self.cart.total()
    }

    pub fn add_to_cart(&mut self, product_id: u32) -> Result<(), StoreError> {
        if !self.is_authenticated() {
            return Err(StoreError::AuthRequired);
        }
        let product = catalog::find(product_id).ok_or(StoreError::UnknownProduct(product_id))?;
        self.cart.add(product);
        self.save_cart()?;
        tracing::info!("Added {} to cart", product.name);
        Ok(())
    }

    pub fn remove_from_cart(&mut self, product_id: u32) -> Result<bool, StoreError> {
        let removed = self.cart.remove(product_id);
        if removed {
            self.save_cart()?;
        }
        Ok(removed)
    }

    pub fn clear_cart(&mut self) -> Result<(), StoreError> {
        self.cart.clear();
        self.save_cart()?;
        Ok(())
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        self.theme = self.theme.toggled();
        self.storage.set(THEME_KEY, self.theme.as_str())?;
        Ok(self.theme)
    }

    fn save_cart(&mut self) -> Result<()> {
        self.storage.set_json(CART_KEY, &self.cart)
    }
}
