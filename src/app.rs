//! Application root context
//!
//! [`AppContext`] owns everything that used to be ambient global state in a
//! storefront frontend: the session, the HTTP gateway, the query cache and
//! the cart and wishlist contexts. Create one per application root and pass
//! it by reference; dropping it ends the session in memory.
//!
//! The context listens to the session's events: when a session ends, for
//! whatever reason, the cart and wishlist of that user are forgotten before
//! they are read again.

use crate::catalog::CatalogSource;
use crate::client::{
    ApiClient, CartContext, LogoutReason, Session, SessionEvent, TokenPair, WishlistContext,
};
use crate::config::StorefrontConfig;
use crate::core::Result;
use crate::geocode::Geocoder;
use crate::shop::{QueryCache, ShopPage, ShopPageBuilder};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Root context of a storefront client
pub struct AppContext {
    config: StorefrontConfig,
    session: Arc<Session>,
    session_events: Mutex<broadcast::Receiver<SessionEvent>>,
    api: Arc<ApiClient>,
    cache: Arc<QueryCache>,
    cart: CartContext,
    wishlist: WishlistContext,
    geocoder: Geocoder,
}

impl AppContext {
    /// Build a context with an anonymous session
    pub fn new(config: StorefrontConfig) -> Result<Self> {
        Self::with_session(config, Session::new())
    }

    /// Build a context from previously stored tokens
    pub fn with_tokens(config: StorefrontConfig, tokens: TokenPair) -> Result<Self> {
        Self::with_session(config, Session::with_tokens(tokens))
    }

    fn with_session(config: StorefrontConfig, session: Session) -> Result<Self> {
        config.validate()?;

        let session = Arc::new(session);
        let session_events = Mutex::new(session.subscribe());
        let api = Arc::new(ApiClient::new(&config.api, session.clone())?);
        let cache = Arc::new(QueryCache::new(config.catalog.stale_after()));
        let geocoder = Geocoder::new(&config.geocoder)?;

        Ok(Self {
            cart: CartContext::new(api.clone()),
            wishlist: WishlistContext::new(api.clone()),
            config,
            session,
            session_events,
            api,
            cache,
            geocoder,
        })
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn cart(&self) -> &CartContext {
        self.sync_session();
        &self.cart
    }

    pub fn wishlist(&self) -> &WishlistContext {
        self.sync_session();
        &self.wishlist
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    /// Mount a shop page against the backend catalog
    pub fn shop_page(&self) -> ShopPage {
        self.shop_page_with(self.api.clone())
    }

    /// Mount a shop page against any catalog source
    pub fn shop_page_with(&self, source: Arc<dyn CatalogSource>) -> ShopPage {
        self.sync_session();
        let wishlisted = if self.session.is_authenticated() {
            self.wishlist.product_ids()
        } else {
            Default::default()
        };
        ShopPageBuilder::new(source)
            .with_cache(self.cache.clone())
            .with_catalog_config(&self.config.catalog)
            .with_layout(self.config.grid.clone())
            .with_wishlisted(wishlisted)
            .mount()
    }

    /// Log in, then bring cart and wishlist up to date
    ///
    /// A guest cart known before login is merged into the user's cart. Sync
    /// failures after a successful login are logged, not returned.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        self.sync_session();
        let guest_key = if self.session.is_authenticated() {
            None
        } else {
            self.cart.snapshot().and_then(|cart| cart.session_key)
        };

        self.api.login(email, password).await?;

        let cart = match guest_key {
            Some(key) => self.cart.merge_guest_cart(&key).await,
            None => self.cart.refresh().await,
        };
        if let Err(error) = cart {
            tracing::warn!(%error, "Cart sync after login failed");
        }
        if let Err(error) = self.wishlist.refresh().await {
            tracing::warn!(%error, "Wishlist sync after login failed");
        }
        Ok(())
    }

    /// End the session and forget user-specific state
    pub fn logout(&self) {
        self.session.clear(LogoutReason::UserRequested);
        self.sync_session();
        // Clearing an anonymous session publishes nothing
        self.cart.reset();
        self.wishlist.reset();
    }

    /// Apply session events published since the last call
    ///
    /// A missed event (lagged receiver) is treated as a logout when the
    /// session is anonymous by now.
    fn sync_session(&self) {
        let mut events = match self.session_events.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut ended = None;
        loop {
            match events.try_recv() {
                Ok(SessionEvent::LoggedOut { reason }) => ended = Some(reason),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session events missed");
                    if !self.session.is_authenticated() {
                        ended = Some(LogoutReason::SessionExpired);
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        if let Some(reason) = ended {
            tracing::debug!(?reason, "Session ended, user state reset");
            self.cart.reset();
            self.wishlist.reset();
        }
    }
}
