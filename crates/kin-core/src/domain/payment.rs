//! Payment extraction from ledger records.

use kin_types::{Asset, Operation, PaymentInfo, TransactionRecord};

/// First payment of `asset` in a successful record, if any.
///
/// Other operation types and payments of other assets yield nothing.
pub fn decode_payment(record: &TransactionRecord, asset: &Asset) -> Option<PaymentInfo> {
    if !record.successful {
        return None;
    }

    record.operations().iter().find_map(|op| match op {
        Operation::Payment {
            destination,
            asset: paid,
            amount,
        } if paid == asset => Some(PaymentInfo {
            created_at: record.created_at,
            source: *record.source(),
            destination: *destination,
            amount: *amount,
            memo: record.memo_text().map(str::to_string),
            transaction_id: record.id.clone(),
        }),
        _ => None,
    })
}
