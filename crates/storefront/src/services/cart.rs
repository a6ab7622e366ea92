//! Session-scoped cart.
//!
//! Each visitor's cart lives in their session under one key. Handlers
//! extract a [`SessionCart`], mutate it, and call [`SessionCart::save`].
//! Concurrent requests from the same visitor are last-write-wins.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use threadline_core::cart::Cart;

use crate::error::AppError;
use crate::models::session_keys;

/// The visitor's cart, loaded from the session.
pub struct SessionCart {
    session: Session,
    cart: Cart,
}

impl SessionCart {
    /// Current cart contents.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Mutable access; call [`Self::save`] afterwards.
    pub const fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    /// The session the cart was loaded from.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Write the cart back to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects the write.
    pub async fn save(&self) -> Result<(), tower_sessions::session::Error> {
        self.session.insert(session_keys::CART, &self.cart).await
    }

    /// Empty the cart and drop it from the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects the write.
    pub async fn clear(&mut self) -> Result<(), tower_sessions::session::Error> {
        self.cart.clear();
        self.session.remove::<Cart>(session_keys::CART).await?;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for SessionCart
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

        let cart = session
            .get::<Cart>(session_keys::CART)
            .await?
            .unwrap_or_default();

        Ok(Self { session, cart })
    }
}
