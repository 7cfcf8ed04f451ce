use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::{
    DestinationChange, Order, OrderError, OrderRequest, ParcelView, StatusChange,
};
use crate::account::{User, UserStore};
use crate::audit::{AuditEvent, AuditHandle};
use crate::auth::Identity;
use crate::config::{LifecycleConfig, PricingConfig};
use crate::metrics;
use crate::quote::{Quote, QuoteEngine};
use crate::shipment::{
    round_money, Address, ContactUpdate, NewParcel, Parcel, ParcelFilter, ParcelInfo,
    ParcelStatus, Recipient, RecipientInfo, ShipmentError, ShipmentStore,
};
use crate::validation::{
    validate, validate_supplied, FieldErrors, ADDRESS_FORM, LOCALITY_FORM, PARCEL_FORM,
    RECIPIENT_FORM,
};

/// Creates orders and applies every lifecycle change to stored parcels.
pub struct OrderManager {
    shipments: Arc<dyn ShipmentStore>,
    users: Arc<dyn UserStore>,
    quotes: Arc<QuoteEngine>,
    destination_change_fine: Decimal,
    enforce_forward_transitions: bool,
    audit: Option<AuditHandle>,
}

impl OrderManager {
    pub fn new(
        shipments: Arc<dyn ShipmentStore>,
        users: Arc<dyn UserStore>,
        quotes: Arc<QuoteEngine>,
        pricing: &PricingConfig,
        lifecycle: &LifecycleConfig,
    ) -> Self {
        Self {
            shipments,
            users,
            quotes,
            destination_change_fine: pricing.destination_change_fine,
            enforce_forward_transitions: lifecycle.enforce_forward_transitions,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn destination_change_fine(&self) -> Decimal {
        self.destination_change_fine
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.try_emit(event);
        }
    }

    fn reject(&self, operation: &'static str, parcel: &Parcel, reason: String) -> OrderError {
        warn!(parcel_id = parcel.id, status = %parcel.status, operation, "{}", reason);
        metrics::REJECTED_TRANSITIONS
            .with_label_values(&[operation])
            .inc();
        OrderError::InvalidTransition {
            parcel_id: parcel.id,
            reason,
        }
    }

    /// The store refused a write because the parcel moved on since it was read.
    fn reject_stale(&self, operation: &'static str, err: ShipmentError) -> OrderError {
        if let ShipmentError::ParcelFinal { id, status } = &err {
            warn!(parcel_id = id, status = %status, operation, "Parcel changed state before the write");
            metrics::REJECTED_TRANSITIONS
                .with_label_values(&[operation])
                .inc();
        }
        err.into()
    }

    fn load_user(&self, id: i64) -> Result<User, OrderError> {
        self.users
            .get_user(id)?
            .ok_or(OrderError::NotFound { kind: "User", id })
    }

    /// The sender's profile must carry a city and country to route from.
    fn sender_with_locality(&self, actor: &Identity) -> Result<User, OrderError> {
        let sender = self.load_user(actor.user_id)?;
        let mut errors = FieldErrors::new();
        errors.merge_prefixed("sender", validate(&sender.address, LOCALITY_FORM));
        errors.into_result().map_err(OrderError::Validation)?;
        Ok(sender)
    }

    /// Parcel visible to `actor`: their own, or any for admins.
    fn visible_parcel(&self, actor: &Identity, id: i64) -> Result<Parcel, OrderError> {
        match self.shipments.get_parcel(id)? {
            Some(parcel) if parcel.user_id == actor.user_id || actor.is_admin() => Ok(parcel),
            _ => Err(OrderError::parcel_not_found(id)),
        }
    }

    /// Parcel owned by `actor`. Admins get no exception here.
    fn owned_parcel(&self, actor: &Identity, id: i64) -> Result<Parcel, OrderError> {
        match self.shipments.get_parcel(id)? {
            Some(parcel) if parcel.user_id == actor.user_id => Ok(parcel),
            _ => Err(OrderError::parcel_not_found(id)),
        }
    }

    fn visible_recipient(&self, actor: &Identity, id: i64) -> Result<Recipient, OrderError> {
        match self.shipments.get_recipient(id)? {
            Some(recipient) if recipient.created_by == actor.user_id || actor.is_admin() => {
                Ok(recipient)
            }
            _ => Err(OrderError::recipient_not_found(id)),
        }
    }

    // =========================================================================
    // Quotes
    // =========================================================================

    /// Quote a shipment from the caller's profile address to `destination`.
    pub async fn quote(
        &self,
        actor: &Identity,
        destination: &Address,
        parcel: &ParcelInfo,
    ) -> Result<Quote, OrderError> {
        let sender = self.load_user(actor.user_id)?;
        Ok(self
            .quotes
            .compute_quote(&sender.address, destination, parcel)
            .await?)
    }

    // =========================================================================
    // Recipients
    // =========================================================================

    pub fn create_recipient(
        &self,
        actor: &Identity,
        info: &RecipientInfo,
    ) -> Result<Recipient, OrderError> {
        validate(info, RECIPIENT_FORM)
            .into_result()
            .map_err(OrderError::Validation)?;

        let recipient = self.shipments.create_recipient(actor.user_id, info)?;
        debug!(recipient_id = recipient.id, user_id = actor.user_id, "Recipient created");
        Ok(recipient)
    }

    pub fn get_recipient(&self, actor: &Identity, id: i64) -> Result<Recipient, OrderError> {
        self.visible_recipient(actor, id)
    }

    /// Edit a recipient's name, email or phone number.
    pub fn update_recipient_contact(
        &self,
        actor: &Identity,
        id: i64,
        update: &ContactUpdate,
    ) -> Result<Recipient, OrderError> {
        let recipient = self.visible_recipient(actor, id)?;
        if update.is_empty() {
            return Ok(recipient);
        }

        validate_supplied(
            RECIPIENT_FORM,
            &[
                ("first_name", update.first_name.as_deref()),
                ("last_name", update.last_name.as_deref()),
                ("email", update.email.as_deref()),
                ("phone_number", update.phone_number.as_deref()),
            ],
        )
        .into_result()
        .map_err(OrderError::Validation)?;

        Ok(self.shipments.update_recipient_contact(id, update)?)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Validate and price an order, then persist its recipient and a `Pending` parcel.
    pub async fn create_order(
        &self,
        actor: &Identity,
        request: &OrderRequest,
    ) -> Result<Order, OrderError> {
        let mut errors = FieldErrors::new();
        errors.merge_prefixed("recipient", validate(&request.recipient, RECIPIENT_FORM));
        errors.merge_prefixed("parcel", validate(&request.parcel, PARCEL_FORM));
        errors.into_result().map_err(OrderError::Validation)?;

        let sender = self.sender_with_locality(actor)?;
        let quote = self
            .quotes
            .quote_route(&sender.address, &request.recipient.address)
            .await?;

        let recipient = self
            .shipments
            .create_recipient(actor.user_id, &request.recipient)?;
        let parcel = self.store_parcel(&sender, &recipient, request.parcel, quote.cost)?;

        Ok(Order { recipient, parcel })
    }

    /// Price and persist a parcel for a recipient the caller created earlier.
    pub async fn create_parcel(
        &self,
        actor: &Identity,
        recipient_id: i64,
        info: ParcelInfo,
    ) -> Result<Parcel, OrderError> {
        let mut errors = FieldErrors::new();
        errors.merge_prefixed("parcel", validate(&info, PARCEL_FORM));
        errors.into_result().map_err(OrderError::Validation)?;

        let recipient = self.visible_recipient(actor, recipient_id)?;
        let sender = self.sender_with_locality(actor)?;
        let quote = self
            .quotes
            .quote_route(&sender.address, &recipient.address)
            .await?;

        self.store_parcel(&sender, &recipient, info, quote.cost)
    }

    fn store_parcel(
        &self,
        sender: &User,
        recipient: &Recipient,
        info: ParcelInfo,
        cost: Decimal,
    ) -> Result<Parcel, OrderError> {
        let parcel = self.shipments.create_parcel(NewParcel {
            user_id: sender.id,
            recipient_id: recipient.id,
            info,
            cost,
        })?;

        info!(
            parcel_id = parcel.id,
            user_id = sender.id,
            tracking_number = %parcel.tracking_number,
            cost = %parcel.cost,
            "Parcel created"
        );
        metrics::PARCELS_CREATED.inc();
        self.emit(AuditEvent::ParcelCreated {
            parcel_id: parcel.id,
            user_id: sender.id,
            recipient_id: recipient.id,
            tracking_number: parcel.tracking_number.clone(),
            cost: parcel.cost,
        });

        Ok(parcel)
    }

    // =========================================================================
    // Reading
    // =========================================================================

    pub fn get_parcel(&self, actor: &Identity, id: i64) -> Result<Parcel, OrderError> {
        self.visible_parcel(actor, id)
    }

    /// A visible parcel with its sender and recipient.
    pub fn parcel_view(&self, actor: &Identity, id: i64) -> Result<ParcelView, OrderError> {
        let parcel = self.visible_parcel(actor, id)?;
        self.view_of(parcel)
    }

    pub(crate) fn view_of(&self, parcel: Parcel) -> Result<ParcelView, OrderError> {
        let sender = self.load_user(parcel.user_id)?;
        let recipient = self
            .shipments
            .get_recipient(parcel.recipient_id)?
            .ok_or_else(|| OrderError::recipient_not_found(parcel.recipient_id))?;
        Ok(ParcelView {
            parcel,
            sender: sender.summary(),
            recipient,
        })
    }

    /// Every parcel the caller sent, newest first.
    pub fn list_user_parcels(&self, actor: &Identity) -> Result<Vec<Parcel>, OrderError> {
        let filter = ParcelFilter::new()
            .with_user_id(actor.user_id)
            .with_limit(-1);
        Ok(self.shipments.list_parcels(&filter)?)
    }

    pub(crate) fn all_parcels(&self) -> Result<Vec<Parcel>, OrderError> {
        Ok(self
            .shipments
            .list_parcels(&ParcelFilter::new().with_limit(-1))?)
    }

    // =========================================================================
    // Lifecycle changes
    // =========================================================================

    /// Remove an undelivered parcel. Returns it with status `Cancelled`.
    pub fn cancel_order(&self, actor: &Identity, id: i64) -> Result<Parcel, OrderError> {
        let parcel = self.visible_parcel(actor, id)?;
        if !parcel.status.is_mutable_by_owner() {
            return Err(self.reject(
                "cancel",
                &parcel,
                format!("cannot cancel a parcel that is {}", parcel.status),
            ));
        }

        let mut removed = self
            .shipments
            .delete_parcel(id)
            .map_err(|e| self.reject_stale("cancel", e))?;
        let previous = removed.status;
        removed.status = ParcelStatus::Cancelled;

        info!(parcel_id = id, cancelled_by = actor.user_id, previous = %previous, "Parcel cancelled");
        metrics::PARCELS_CANCELLED.inc();
        self.emit(AuditEvent::ParcelCancelled {
            parcel_id: id,
            cancelled_by: actor.user_id,
            previous_status: previous.as_str().to_string(),
        });

        Ok(removed)
    }

    /// Send an undelivered parcel to a new address.
    ///
    /// The new cost is the price of the sender-to-new-address route plus the
    /// destination change fine, replacing the previous cost. Each call is a
    /// separate paid change. The route is priced before anything is written.
    pub async fn update_destination(
        &self,
        actor: &Identity,
        id: i64,
        address: &Address,
    ) -> Result<DestinationChange, OrderError> {
        let parcel = self.owned_parcel(actor, id)?;
        if !parcel.status.is_mutable_by_owner() {
            return Err(self.reject(
                "update_destination",
                &parcel,
                format!("cannot re-route a parcel that is {}", parcel.status),
            ));
        }

        validate(address, ADDRESS_FORM)
            .into_result()
            .map_err(OrderError::Validation)?;

        let sender = self.sender_with_locality(actor)?;
        let quote = self.quotes.quote_route(&sender.address, address).await?;

        let base_cost = quote.cost;
        let fine = self.destination_change_fine;
        let new_cost = round_money(base_cost + fine);

        let (parcel, recipient) = self
            .shipments
            .reroute(id, address, new_cost)
            .map_err(|e| self.reject_stale("update_destination", e))?;

        info!(
            parcel_id = id,
            base_cost = %base_cost,
            fine = %fine,
            new_cost = %new_cost,
            change_number = parcel.destination_changes,
            "Parcel destination changed"
        );
        metrics::DESTINATION_CHANGES.inc();
        self.emit(AuditEvent::DestinationChanged {
            parcel_id: id,
            changed_by: actor.user_id,
            new_city: address.city.clone(),
            new_country: address.country.clone(),
            base_cost,
            fine,
            new_cost,
            change_number: parcel.destination_changes,
        });

        Ok(DestinationChange {
            parcel,
            recipient,
            base_cost,
            fine,
        })
    }

    /// Admin status override.
    ///
    /// Any of the four delivery states may be set; `Cancelled` may not. Moves
    /// to an earlier state are rejected only when forward transitions are enforced.
    pub fn set_status(
        &self,
        actor: &Identity,
        id: i64,
        status: ParcelStatus,
    ) -> Result<StatusChange, OrderError> {
        if !actor.is_admin() {
            return Err(OrderError::Forbidden);
        }

        let parcel = self
            .shipments
            .get_parcel(id)?
            .ok_or_else(|| OrderError::parcel_not_found(id))?;

        let Some(target_rank) = status.rank() else {
            return Err(self.reject(
                "set_status",
                &parcel,
                format!("status cannot be set to {}", status),
            ));
        };

        if self.enforce_forward_transitions {
            if let Some(current_rank) = parcel.status.rank() {
                if target_rank < current_rank {
                    return Err(self.reject(
                        "set_status",
                        &parcel,
                        format!("cannot move from {} back to {}", parcel.status, status),
                    ));
                }
            }
        }

        let previous = parcel.status;
        let parcel = self.shipments.update_status(id, status)?;

        info!(
            parcel_id = id,
            admin_id = actor.user_id,
            from = %previous,
            to = %status,
            "Parcel status changed"
        );
        metrics::STATUS_TRANSITIONS
            .with_label_values(&[status.as_str()])
            .inc();
        self.emit(AuditEvent::ParcelStatusChanged {
            parcel_id: id,
            changed_by: actor.user_id,
            from_status: previous.as_str().to_string(),
            to_status: status.as_str().to_string(),
        });

        Ok(StatusChange { parcel, previous })
    }
}
