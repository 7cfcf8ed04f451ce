pub mod account;
pub mod admin;
pub mod audit;
pub mod auth;
pub mod config;
pub mod directions;
pub mod lifecycle;
pub mod metrics;
pub mod notify;
pub mod quote;
pub mod shipment;
pub mod testing;
pub mod validation;

pub use account::{
    AccountError, AccountService, LoginRequest, ProfileUpdate, Role, Session, SignupRequest,
    SqliteUserStore, User, UserStore, UserSummary,
};
pub use admin::{AdminConsole, StatusUpdate};
pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditFilter, AuditHandle, AuditRecord,
    AuditStore, SqliteAuditStore,
};
pub use auth::{
    clear_session_cookie, create_authenticator, extract_session_token, session_cookie,
    AuthError, AuthRequest, Authenticator, Identity, SessionContext, SESSION_COOKIE,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthMethod, Config, ConfigError,
    SanitizedConfig,
};
pub use directions::{DirectionsError, DistanceOracle, GoogleDirectionsClient, Route};
pub use lifecycle::{
    DestinationChange, Order, OrderError, OrderManager, OrderRequest, ParcelRequest,
    ParcelView, StatusChange,
};
pub use notify::{create_mailer, Mailer, MailerError, OutgoingMail, StatusNotifier};
pub use quote::{Quote, QuoteEngine, QuoteError};
pub use shipment::{
    Address, ContactUpdate, Parcel, ParcelInfo, ParcelStatus, Recipient, RecipientInfo,
    ShipmentError, ShipmentStore, SqliteShipmentStore,
};
pub use validation::FieldErrors;
