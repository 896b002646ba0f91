//! Inbound notification parsing.
//!
//! Notifications are not calls this client originated, so there is no
//! request signature to check here; trust comes from the AEAD tag on the
//! resource, which only a holder of the API v3 key can produce.
//!
//! The typed parsers check the event kind against what they expect before
//! touching the ciphertext.

use paytrust_auth::PayloadDecryptor;
use serde::de::DeserializeOwned;

use crate::error::{NotifyError, NotifyResult};
use crate::types::{
    CouponSendNotification, CouponUseNotification, DecryptedNotification, EventKind,
    NotificationEnvelope, RefundNotification, TransactionNotification, TypedNotification,
};

/// Parse the envelope without decrypting anything.
pub fn parse_envelope(raw: &[u8]) -> NotifyResult<NotificationEnvelope> {
    serde_json::from_slice(raw).map_err(|e| NotifyError::MalformedEnvelope(e.to_string()))
}

/// Parse an envelope and decrypt its resource, whatever the event kind.
pub fn parse_notification(
    raw: &[u8],
    decryptor: &PayloadDecryptor,
) -> NotifyResult<DecryptedNotification> {
    let envelope = parse_envelope(raw)?;
    decrypt_envelope(envelope, decryptor)
}

pub fn decrypt_envelope(
    envelope: NotificationEnvelope,
    decryptor: &PayloadDecryptor,
) -> NotifyResult<DecryptedNotification> {
    if !envelope.event_type.is_known() {
        tracing::debug!(
            id = %envelope.id,
            event_type = %envelope.event_type,
            "decrypting notification of unrecognised kind"
        );
    }

    let plaintext = decryptor
        .decrypt_resource(&envelope.resource.encrypted)
        .map_err(|e| {
            tracing::warn!(
                id = %envelope.id,
                event_type = %envelope.event_type,
                error = %e,
                "notification resource rejected"
            );
            NotifyError::from(e)
        })?;

    tracing::debug!(
        id = %envelope.id,
        event_type = %envelope.event_type,
        len = plaintext.len(),
        "notification decrypted"
    );
    Ok(DecryptedNotification {
        envelope,
        plaintext,
    })
}

/// `TRANSACTION.SUCCESS`
pub fn parse_transaction(
    raw: &[u8],
    decryptor: &PayloadDecryptor,
) -> NotifyResult<TypedNotification<TransactionNotification>> {
    parse_typed(raw, decryptor, &[EventKind::TransactionSuccess])
}

/// `REFUND.SUCCESS`, `REFUND.ABNORMAL` or `REFUND.CLOSED`
pub fn parse_refund(
    raw: &[u8],
    decryptor: &PayloadDecryptor,
) -> NotifyResult<TypedNotification<RefundNotification>> {
    parse_typed(
        raw,
        decryptor,
        &[
            EventKind::RefundSuccess,
            EventKind::RefundAbnormal,
            EventKind::RefundClosed,
        ],
    )
}

/// `COUPON.USE`
pub fn parse_coupon_use(
    raw: &[u8],
    decryptor: &PayloadDecryptor,
) -> NotifyResult<TypedNotification<CouponUseNotification>> {
    parse_typed(raw, decryptor, &[EventKind::CouponUse])
}

/// `COUPON.SEND`
pub fn parse_coupon_send(
    raw: &[u8],
    decryptor: &PayloadDecryptor,
) -> NotifyResult<TypedNotification<CouponSendNotification>> {
    let (envelope, plaintext) = open_expecting(raw, decryptor, &[EventKind::CouponSend])?;
    let mut resource: CouponSendNotification = decode_resource(&envelope, &plaintext)?;
    resource.raw = plaintext;
    Ok(TypedNotification { envelope, resource })
}

/// Fail unless `envelope` carries one of the `accepted` kinds.
pub fn expect_kind(envelope: &NotificationEnvelope, accepted: &[EventKind]) -> NotifyResult<()> {
    if accepted.contains(&envelope.event_type) {
        return Ok(());
    }
    tracing::warn!(
        id = %envelope.id,
        event_type = %envelope.event_type,
        "notification kind rejected before decryption"
    );
    Err(NotifyError::UnexpectedEvent {
        expected: accepted
            .iter()
            .map(EventKind::as_str)
            .collect::<Vec<_>>()
            .join("|"),
        actual: envelope.event_type.to_string(),
    })
}

fn parse_typed<T: DeserializeOwned>(
    raw: &[u8],
    decryptor: &PayloadDecryptor,
    accepted: &[EventKind],
) -> NotifyResult<TypedNotification<T>> {
    let (envelope, plaintext) = open_expecting(raw, decryptor, accepted)?;
    let resource = decode_resource(&envelope, &plaintext)?;
    Ok(TypedNotification { envelope, resource })
}

fn open_expecting(
    raw: &[u8],
    decryptor: &PayloadDecryptor,
    accepted: &[EventKind],
) -> NotifyResult<(NotificationEnvelope, Vec<u8>)> {
    let envelope = parse_envelope(raw)?;
    expect_kind(&envelope, accepted)?;
    let decrypted = decrypt_envelope(envelope, decryptor)?;
    Ok((decrypted.envelope, decrypted.plaintext))
}

fn decode_resource<T: DeserializeOwned>(
    envelope: &NotificationEnvelope,
    plaintext: &[u8],
) -> NotifyResult<T> {
    serde_json::from_slice(plaintext).map_err(|e| NotifyError::MalformedResource {
        event_type: envelope.event_type.to_string(),
        reason: e.to_string(),
    })
}
