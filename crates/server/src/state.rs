use std::sync::Arc;
use std::time::Duration;

use sendit_core::{
    create_authenticator, AccountService, AdminConsole, AuditHandle, AuditStore, AuthError,
    Authenticator, Config, DistanceOracle, Mailer, OrderManager, QuoteEngine, SanitizedConfig,
    ShipmentStore, StatusNotifier, UserStore,
};

/// Oracle timeout used when no `[directions]` section is configured.
const DEFAULT_QUOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Persistence backends the services run on.
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub shipments: Arc<dyn ShipmentStore>,
    pub audit: Arc<dyn AuditStore>,
}

/// External services. `oracle` is `None` when directions are not configured.
pub struct Collaborators {
    pub oracle: Option<Arc<dyn DistanceOracle>>,
    pub mailer: Arc<dyn Mailer>,
}

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    accounts: AccountService,
    orders: Arc<OrderManager>,
    admin: AdminConsole,
    shipments: Arc<dyn ShipmentStore>,
    audit_store: Arc<dyn AuditStore>,
}

impl AppState {
    /// Wire the services together. Every service emits to `audit`.
    pub fn new(
        config: Config,
        stores: Stores,
        collaborators: Collaborators,
        audit: AuditHandle,
    ) -> Result<Self, AuthError> {
        let authenticator: Arc<dyn Authenticator> = Arc::from(create_authenticator(
            &config.auth,
            Arc::clone(&stores.users),
        )?);

        let timeout = config
            .directions
            .as_ref()
            .map(|d| Duration::from_secs(d.timeout_secs))
            .unwrap_or(DEFAULT_QUOTE_TIMEOUT);
        let quotes = Arc::new(QuoteEngine::new(
            collaborators.oracle,
            config.pricing.rate_per_km,
            timeout,
        ));

        let accounts =
            AccountService::new(Arc::clone(&stores.users), &config.auth).with_audit(audit.clone());

        let orders = Arc::new(
            OrderManager::new(
                Arc::clone(&stores.shipments),
                Arc::clone(&stores.users),
                quotes,
                &config.pricing,
                &config.lifecycle,
            )
            .with_audit(audit.clone()),
        );

        let admin = AdminConsole::new(
            Arc::clone(&orders),
            StatusNotifier::new(collaborators.mailer),
        )
        .with_audit(audit);

        Ok(Self {
            config,
            authenticator,
            accounts,
            orders,
            admin,
            shipments: stores.shipments,
            audit_store: stores.audit,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn orders(&self) -> &OrderManager {
        &self.orders
    }

    pub fn admin(&self) -> &AdminConsole {
        &self.admin
    }

    pub fn shipments(&self) -> &dyn ShipmentStore {
        self.shipments.as_ref()
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }
}
