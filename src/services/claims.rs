use uuid::Uuid;
use validator::Validate;

use crate::models::checkout::{
    Checkout, CheckoutPrefill, CheckoutResponse, CheckoutStatus, PaymentFailureRequest,
    PaymentSuccessRequest,
};
use crate::models::surplus::{ClaimRecord, SurplusItem};
use crate::models::user::User;
use crate::services::database::{ClaimOutcome, DatabaseService};
use crate::services::razorpay::RazorpayService;
use crate::utils::{AppError, AppResult};

/// Purchase and claim flow. The gateway only moves money; whether an item
/// is taken is decided by the conditional update in `DatabaseService`.
#[derive(Clone)]
pub struct ClaimService {
    db: DatabaseService,
    gateway: RazorpayService,
}

impl ClaimService {
    pub fn new(db: DatabaseService, gateway: RazorpayService) -> Self {
        Self { db, gateway }
    }

    async fn claimable_item(&self, user: &User, item_id: &str) -> AppResult<SurplusItem> {
        let item = self
            .db
            .get_surplus(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Surplus item {}", item_id)))?;

        if item.is_claimed() {
            return Err(AppError::AlreadyClaimed { item_id: item.id });
        }
        if item.created_by == user.id {
            return Err(AppError::Forbidden("You cannot claim your own listing".to_string()));
        }
        Ok(item)
    }

    /// Opens a gateway order for a priced item.
    pub async fn begin_checkout(&self, user: &User, item_id: &str) -> AppResult<CheckoutResponse> {
        let item = self.claimable_item(user, item_id).await?;
        if item.is_free() {
            return Err(AppError::Validation(
                "This item is free; claim it directly".to_string(),
            ));
        }

        let amount = item.amount_minor_units()?;
        let receipt = Uuid::new_v4().simple().to_string();
        let order = self
            .gateway
            .create_order(amount, &item.currency, &receipt)
            .await
            .map_err(|e| {
                log::error!("Gateway order for item {} failed: {}", item.id, e);
                AppError::Upstream("Payment gateway is unavailable".to_string())
            })?;

        let checkout = Checkout::new(&item, &user.id, order.order_id, order.amount);
        let checkout = self.db.create_checkout(&checkout).await?;
        log::info!(
            "Checkout {} opened by {} for item {} ({} {})",
            checkout.id,
            user.id,
            item.id,
            checkout.amount,
            checkout.currency
        );

        Ok(CheckoutResponse {
            checkout_id: checkout.id,
            key: self.gateway.key_id().to_string(),
            order_id: checkout.order_id,
            amount: checkout.amount,
            currency: checkout.currency,
            name: self.gateway.merchant_name().to_string(),
            description: item.title,
            prefill: CheckoutPrefill {
                name: user.display_name.clone(),
                email: user.email.clone(),
            },
        })
    }

    pub async fn get_checkout(&self, user: &User, checkout_id: &str) -> AppResult<Checkout> {
        match self.db.get_checkout(checkout_id).await? {
            Some(checkout) if checkout.user_id == user.id => Ok(checkout),
            _ => Err(AppError::NotFound(format!("Checkout {}", checkout_id))),
        }
    }

    /// Handles the gateway's success callback. Nothing is written unless the
    /// signature verifies. Re-submitting the same payment returns the item.
    pub async fn confirm_payment(
        &self,
        user: &User,
        checkout_id: &str,
        request: PaymentSuccessRequest,
    ) -> AppResult<SurplusItem> {
        request.validate()?;
        let mut checkout = self.get_checkout(user, checkout_id).await?;

        if request.order_id != checkout.order_id {
            log::warn!(
                "Checkout {} received payment for foreign order {}",
                checkout.id,
                request.order_id
            );
            return Err(AppError::PaymentFailed(
                "Payment does not belong to this checkout".to_string(),
            ));
        }
        if !self
            .gateway
            .verify_payment_signature(&request.order_id, &request.payment_id, &request.signature)
        {
            log::warn!("Invalid payment signature for checkout {}", checkout.id);
            return Err(AppError::PaymentFailed(
                "Payment signature verification failed".to_string(),
            ));
        }

        if checkout.status == CheckoutStatus::Created {
            self.db.mark_checkout_paid(&checkout.id, &request.payment_id).await?;
            checkout = self.get_checkout(user, checkout_id).await?;
        }

        match checkout.status {
            CheckoutStatus::Paid | CheckoutStatus::Claimed => {}
            CheckoutStatus::Failed => {
                return Err(AppError::PaymentFailed(
                    checkout
                        .failure_reason
                        .unwrap_or_else(|| "Payment was reported as failed".to_string()),
                ));
            }
            CheckoutStatus::Orphaned => {
                return Err(AppError::ClaimNotRecorded {
                    payment_id: request.payment_id,
                    reason: checkout
                        .failure_reason
                        .unwrap_or_else(|| "Item was claimed by someone else".to_string()),
                });
            }
            CheckoutStatus::Created => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "Checkout {} is still awaiting payment",
                    checkout.id
                )));
            }
        }

        if checkout.payment_id.as_deref() != Some(request.payment_id.as_str()) {
            return Err(AppError::Conflict(format!(
                "Checkout {} was settled by a different payment",
                checkout.id
            )));
        }

        let claim = ClaimRecord::new(user, Some(request.payment_id.clone()));
        match self.db.claim_surplus(&checkout.item_id, &claim).await {
            Ok(ClaimOutcome::Claimed(item)) => {
                self.db
                    .set_checkout_status(&checkout.id, CheckoutStatus::Claimed, None)
                    .await?;
                log::info!(
                    "Item {} claimed by {} with payment {}",
                    item.id,
                    user.id,
                    request.payment_id
                );
                Ok(item)
            }
            Ok(ClaimOutcome::AlreadyClaimed(item))
                if item.payment_id.as_deref() == Some(request.payment_id.as_str()) =>
            {
                if checkout.status != CheckoutStatus::Claimed {
                    self.db
                        .set_checkout_status(&checkout.id, CheckoutStatus::Claimed, None)
                        .await?;
                }
                Ok(item)
            }
            Ok(ClaimOutcome::AlreadyClaimed(item)) => {
                let reason = format!("Item {} was claimed by someone else", item.id);
                Err(self.orphan(&checkout, request.payment_id, reason).await)
            }
            Err(e) => {
                let reason = format!("Claim could not be written: {}", e);
                Err(self.orphan(&checkout, request.payment_id, reason).await)
            }
        }
    }

    async fn orphan(&self, checkout: &Checkout, payment_id: String, reason: String) -> AppError {
        log::error!(
            "Payment {} captured for checkout {} but the claim was not recorded: {}",
            payment_id,
            checkout.id,
            reason
        );
        if let Err(e) = self
            .db
            .set_checkout_status(&checkout.id, CheckoutStatus::Orphaned, Some(reason.clone()))
            .await
        {
            log::error!("Could not mark checkout {} orphaned: {}", checkout.id, e);
        }
        AppError::ClaimNotRecorded { payment_id, reason }
    }

    /// Records a failure reported by the gateway widget. The item is untouched.
    pub async fn fail_payment(
        &self,
        user: &User,
        checkout_id: &str,
        request: PaymentFailureRequest,
    ) -> AppResult<Checkout> {
        request.validate()?;
        let checkout = self.get_checkout(user, checkout_id).await?;

        let updated = self
            .db
            .mark_checkout_failed(&checkout.id, &request.description, request.payment_id.clone())
            .await?;
        let checkout = self.get_checkout(user, checkout_id).await?;

        if !updated && checkout.status != CheckoutStatus::Failed {
            return Err(AppError::Conflict(format!(
                "Checkout {} is already {}",
                checkout.id,
                checkout.status.as_str()
            )));
        }

        log::warn!(
            "Payment failed for checkout {} ({}): {}",
            checkout.id,
            request.code.as_deref().unwrap_or("no code"),
            request.description
        );
        Ok(checkout)
    }

    /// Claims a free item directly.
    pub async fn claim_free(&self, user: &User, item_id: &str) -> AppResult<SurplusItem> {
        let item = self.claimable_item(user, item_id).await?;
        if !item.is_free() {
            return Err(AppError::Validation(
                "This item must be purchased before it can be claimed".to_string(),
            ));
        }

        match self.db.claim_surplus(&item.id, &ClaimRecord::new(user, None)).await? {
            ClaimOutcome::Claimed(item) => {
                log::info!("Free item {} claimed by {}", item.id, user.id);
                Ok(item)
            }
            ClaimOutcome::AlreadyClaimed(item) => Err(AppError::AlreadyClaimed { item_id: item.id }),
        }
    }
}
