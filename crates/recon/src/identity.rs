//! Identity resolution: the canonical email behind a payment event.

use crate::model::PaymentEvent;

/// Pick the canonical email for a payment event.
///
/// Candidates are checked in priority order: primary email, pre-identity
/// distinct id, raw distinct id. The first one containing `@` wins; the
/// value is returned trimmed. `None` means the event is unresolved and must
/// not reach any aggregate.
pub fn resolve_email(event: &PaymentEvent) -> Option<String> {
    [
        &event.primary_email,
        &event.pre_identity_id,
        &event.distinct_id,
    ]
    .into_iter()
    .flatten()
    .map(|candidate| candidate.trim())
    .find(|candidate| candidate.contains('@'))
    .map(str::to_string)
}
