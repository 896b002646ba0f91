use chrono::{DateTime, FixedOffset};
use paytrust_auth::EncryptedResource;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// EventKind — closed set of notification types, with a catch-all
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    TransactionSuccess,
    RefundSuccess,
    RefundAbnormal,
    RefundClosed,
    CouponSend,
    CouponUse,
    Unknown(String),
}

impl EventKind {
    /// Every kind this crate has a typed parser for.
    pub const KNOWN: [EventKind; 6] = [
        EventKind::TransactionSuccess,
        EventKind::RefundSuccess,
        EventKind::RefundAbnormal,
        EventKind::RefundClosed,
        EventKind::CouponSend,
        EventKind::CouponUse,
    ];

    pub fn parse(value: &str) -> Self {
        match value {
            "TRANSACTION.SUCCESS" => EventKind::TransactionSuccess,
            "REFUND.SUCCESS" => EventKind::RefundSuccess,
            "REFUND.ABNORMAL" => EventKind::RefundAbnormal,
            "REFUND.CLOSED" => EventKind::RefundClosed,
            "COUPON.SEND" => EventKind::CouponSend,
            "COUPON.USE" => EventKind::CouponUse,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::TransactionSuccess => "TRANSACTION.SUCCESS",
            EventKind::RefundSuccess => "REFUND.SUCCESS",
            EventKind::RefundAbnormal => "REFUND.ABNORMAL",
            EventKind::RefundClosed => "REFUND.CLOSED",
            EventKind::CouponSend => "COUPON.SEND",
            EventKind::CouponUse => "COUPON.USE",
            EventKind::Unknown(other) => other,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, EventKind::Unknown(_))
    }

    pub fn is_refund(&self) -> bool {
        matches!(
            self,
            EventKind::RefundSuccess | EventKind::RefundAbnormal | EventKind::RefundClosed
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        EventKind::parse(&s)
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The JSON body the gateway POSTs to the merchant's notify url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    /// Unique per notification; the key for caller-side deduplication.
    pub id: String,
    pub create_time: String,
    pub event_type: EventKind,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub summary: String,
    pub resource: NotificationResource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResource {
    #[serde(flatten)]
    pub encrypted: EncryptedResource,
    #[serde(default)]
    pub original_type: String,
}

/// An envelope together with its decrypted resource bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedNotification {
    pub envelope: NotificationEnvelope,
    pub plaintext: Vec<u8>,
}

impl DecryptedNotification {
    pub fn id(&self) -> &str {
        &self.envelope.id
    }

    pub fn event(&self) -> &EventKind {
        &self.envelope.event_type
    }
}

// ---------------------------------------------------------------------------
// Typed resource shapes
// ---------------------------------------------------------------------------

/// A decrypted resource of a known shape, alongside the envelope it came in.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedNotification<T> {
    pub envelope: NotificationEnvelope,
    pub resource: T,
}

/// `TRANSACTION.SUCCESS` resource for a combined order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionNotification {
    pub combine_appid: String,
    pub combine_mchid: String,
    pub combine_out_trade_no: String,
    #[serde(default)]
    pub sub_orders: Vec<SubOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine_payer_info: Option<PayerInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubOrder {
    pub mchid: String,
    #[serde(default)]
    pub sub_mchid: String,
    pub out_trade_no: String,
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub trade_type: String,
    #[serde(default)]
    pub trade_state: String,
    #[serde(default)]
    pub bank_type: String,
    #[serde(default)]
    pub attach: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_time: Option<DateTime<FixedOffset>>,
    pub amount: OrderAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAmount {
    pub total_amount: i64,
    pub currency: String,
    #[serde(default)]
    pub payer_amount: i64,
    #[serde(default)]
    pub payer_currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerInfo {
    pub openid: String,
}

/// `REFUND.*` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundNotification {
    #[serde(default)]
    pub sp_mchid: String,
    #[serde(default)]
    pub sub_mchid: String,
    pub out_trade_no: String,
    pub transaction_id: String,
    pub out_refund_no: String,
    pub refund_id: String,
    pub refund_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub user_received_account: String,
    pub amount: RefundAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundAmount {
    pub total: i64,
    pub refund: i64,
    pub payer_total: i64,
    pub payer_refund: i64,
}

/// `COUPON.USE` resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponUseNotification {
    pub stock_creator_mchid: String,
    pub stock_id: String,
    pub coupon_id: String,
    #[serde(default)]
    pub coupon_name: String,
    pub status: String,
    #[serde(default)]
    pub description: String,
    pub create_time: DateTime<FixedOffset>,
    #[serde(default)]
    pub coupon_type: String,
    #[serde(default)]
    pub no_cash: bool,
    pub available_begin_time: DateTime<FixedOffset>,
    pub available_end_time: DateTime<FixedOffset>,
    #[serde(default, rename = "singleitem")]
    pub single_item: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_coupon_information: Option<NormalCouponInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consume_information: Option<ConsumeInformation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalCouponInformation {
    pub coupon_amount: i64,
    pub transaction_minimum: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeInformation {
    pub consume_time: DateTime<FixedOffset>,
    pub consume_mchid: String,
    pub transaction_id: String,
    #[serde(default)]
    pub goods_detail: Vec<GoodsDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsDetail {
    pub goods_id: String,
    pub quantity: i64,
    pub price: i64,
    pub discount_amount: i64,
}

/// `COUPON.SEND` resource. Keeps the decrypted bytes for fields not modelled here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponSendNotification {
    pub event_type: String,
    pub coupon_code: String,
    pub stock_id: String,
    pub send_time: DateTime<FixedOffset>,
    pub openid: String,
    #[serde(default)]
    pub unionid: String,
    pub send_channel: String,
    #[serde(default)]
    pub send_merchant: String,
    #[serde(default)]
    pub attach_info: String,
    #[serde(skip)]
    pub(crate) raw: Vec<u8>,
}

impl CouponSendNotification {
    /// The decrypted plaintext this value was parsed from.
    pub fn bytes(&self) -> &[u8] {
        &self.raw
    }
}
