//! Paytrust Notifications
//!
//! Parses the JSON envelopes the gateway POSTs to a merchant's notify url and
//! decrypts their AEAD_AES_256_GCM resources.
//!
//! - [`parse_notification`] decrypts any envelope and reports its [`EventKind`].
//! - `parse_transaction`, `parse_refund`, `parse_coupon_use` and
//!   `parse_coupon_send` also check the kind (before decryption) and decode
//!   the plaintext into a typed shape.
//!
//! Replays are not detected here. The envelope `id` is unique per
//! notification and is the key callers should deduplicate on.

pub mod error;
pub mod types;
pub mod webhook;

pub use error::{NotifyError, NotifyResult};
pub use types::{
    ConsumeInformation, CouponSendNotification, CouponUseNotification, DecryptedNotification,
    EventKind, GoodsDetail, NormalCouponInformation, NotificationEnvelope, NotificationResource,
    OrderAmount, PayerInfo, RefundAmount, RefundNotification, SubOrder, TransactionNotification,
    TypedNotification,
};
pub use webhook::{
    decrypt_envelope, expect_kind, parse_coupon_send, parse_coupon_use, parse_envelope,
    parse_notification, parse_refund, parse_transaction,
};
