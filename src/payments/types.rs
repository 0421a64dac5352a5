use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_PLATFORM_FEE: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    Razorpay,
    Other,
}

// Gateway outcomes that move a payment out of Pending
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Confirmed {
        payment_id: String,
        signature: String,
    },
    Declined,
}

/// A payment attempt for a booking. A booking may own several of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub id: String,
    pub booking_id: String,
    pub external_order_id: String,
    pub external_payment_id: Option<String>,
    pub external_signature: Option<String>,
    pub amount: f64,
    pub platform_fee: f64,
    pub total_amount: f64,
    pub payment_status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    /// New pending payment with the default platform fee.
    pub fn pending(
        booking_id: impl Into<String>,
        external_order_id: impl Into<String>,
        amount: f64,
    ) -> Result<Self> {
        Self::pending_with_fee(booking_id, external_order_id, amount, DEFAULT_PLATFORM_FEE)
    }

    /// New pending payment. `total_amount` is always `amount + platform_fee`.
    pub fn pending_with_fee(
        booking_id: impl Into<String>,
        external_order_id: impl Into<String>,
        amount: f64,
        platform_fee: f64,
    ) -> Result<Self> {
        let booking_id = booking_id.into();
        let external_order_id = external_order_id.into();

        if booking_id.trim().is_empty() {
            return Err(Error::payment("booking id is required"));
        }
        if external_order_id.trim().is_empty() {
            return Err(Error::payment("external order id is required"));
        }
        for (name, value) in [("amount", amount), ("platform fee", platform_fee)] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::payment(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        let now = Utc::now();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            booking_id,
            external_order_id,
            external_payment_id: None,
            external_signature: None,
            amount,
            platform_fee,
            total_amount: amount + platform_fee,
            payment_status: PaymentStatus::Pending,
            payment_date: now,
            payment_method: PaymentMethod::default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.payment_status.is_terminal()
    }

    /// Applies a gateway outcome. Only Pending payments may move; everything else is
    /// rejected with [`Error::InvalidTransition`] and leaves the record untouched.
    pub fn apply(&mut self, event: PaymentEvent) -> Result<()> {
        let requested = match event {
            PaymentEvent::Confirmed { .. } => PaymentStatus::Paid,
            PaymentEvent::Declined => PaymentStatus::Failed,
        };

        if self.payment_status != PaymentStatus::Pending {
            warn!(
                "Rejected payment transition for order {}: {} -> {}",
                self.external_order_id, self.payment_status, requested
            );
            return Err(Error::InvalidTransition {
                current: self.payment_status.to_string(),
                requested: requested.to_string(),
            });
        }

        if let PaymentEvent::Confirmed {
            payment_id,
            signature,
        } = event
        {
            self.external_payment_id = Some(payment_id);
            self.external_signature = Some(signature);
        }

        info!(
            "Payment for order {} moved {} -> {}",
            self.external_order_id, self.payment_status, requested
        );
        self.payment_status = requested;
        self.updated_at = Utc::now();
        Ok(())
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Failed)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            other => Err(Error::payment(format!("unknown payment status: {other}"))),
        }
    }
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Razorpay => "Razorpay",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Razorpay" => Ok(Self::Razorpay),
            "Other" => Ok(Self::Other),
            other => Err(Error::payment(format!("unknown payment method: {other}"))),
        }
    }
}
