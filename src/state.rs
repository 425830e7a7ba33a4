//! Application state
//!
//! Everything a request needs, built once at startup and shared by clone.

use std::sync::Arc;

use crate::audit::SecurityLog;
use crate::auth::AuthService;
use crate::config::Config;
use crate::gateway::SimulatedGateway;
use crate::handlers::{AdminHandler, PurchaseHandler, QueryHandler, TopUpHandler};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub audit: SecurityLog,
    pub auth: AuthService,
    pub gateway: SimulatedGateway,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        let audit = SecurityLog::new(store.clone());
        let auth = AuthService::new(store.clone(), audit.clone(), &config);
        let gateway = SimulatedGateway::new(config.gateway_delay());

        Self {
            config: Arc::new(config),
            store,
            audit,
            auth,
            gateway,
        }
    }

    pub fn purchases(&self) -> PurchaseHandler {
        PurchaseHandler::new(self.store.clone())
    }

    pub fn topups(&self) -> TopUpHandler {
        TopUpHandler::new(self.store.clone(), self.gateway.clone())
    }

    pub fn admin(&self) -> AdminHandler {
        AdminHandler::new(self.store.clone(), self.audit.clone())
    }

    pub fn queries(&self) -> QueryHandler {
        QueryHandler::new(self.store.clone())
    }
}
