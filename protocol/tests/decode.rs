use protocol::codec::{CodecError, decode_list, decode_list_lenient, decode_record, expect_sequence};
use protocol::message::{AuthPayload, Balance, Notification, SupportTicket, Transaction};
use serde_json::json;

#[test]
fn login_payload_inside_envelope() {
    let body = json!({
        "success": true,
        "message": "Login successful",
        "data": {
            "token": "eyJhbGciOi.payload.sig",
            "id": "665f1c",
            "username": "ada",
            "email": "ada@example.com"
        }
    });

    let auth: AuthPayload = decode_record(body).expect("auth payload");
    assert_eq!(auth.token.as_deref(), Some("eyJhbGciOi.payload.sig"));
    assert_eq!(auth.id, "665f1c");
    assert_eq!(auth.username, "ada");
}

#[test]
fn verify_payload_without_token() {
    let auth: AuthPayload =
        decode_record(json!({ "data": { "_id": 9, "email": "x@y.z" } })).expect("auth payload");
    assert!(auth.token.is_none());
    assert_eq!(auth.id, "9");
}

#[test]
fn balance_from_raw_resource() {
    let balance: Balance = decode_record(json!({ "balance": "1200.75" })).expect("balance");
    assert_eq!(balance.balance, 1200.75);
}

#[test]
fn transactions_from_envelope() {
    let body = json!({
        "data": [
            { "_id": "a", "type": "deposit", "amount": 500, "status": "completed" },
            { "_id": "b", "type": "withdraw", "amount": 200, "status": "pending",
              "createdAt": "2025-01-01T10:00:00Z" }
        ]
    });

    let txs: Vec<Transaction> = decode_list(body).expect("transactions");
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[1].kind, "withdraw");
    assert_eq!(txs[1].created_at.as_deref(), Some("2025-01-01T10:00:00Z"));
}

#[test]
fn notifications_single_object_is_not_a_list() {
    let body = json!({ "data": { "_id": "n1", "message": "Welcome" } });
    let err = decode_list::<Notification>(body).unwrap_err();
    assert!(matches!(err, CodecError::NotASequence { found: "object" }));
}

#[test]
fn empty_list_is_valid() {
    let tickets: Vec<SupportTicket> = decode_list(json!({ "data": [] })).expect("tickets");
    assert!(tickets.is_empty());
}

#[test]
fn strict_and_lenient_disagree_on_bad_item() {
    let body = json!([
        { "_id": "t1", "subject": "Payout", "message": "Where is it?" },
        "garbage"
    ]);

    assert!(decode_list::<SupportTicket>(body.clone()).is_err());

    let lenient = decode_list_lenient::<SupportTicket>(body).expect("lenient");
    assert_eq!(lenient.items.len(), 1);
    assert_eq!(lenient.skipped, 1);
}

#[test]
fn sequence_ids_are_normalized() {
    let items = expect_sequence(json!([{ "_id": "x" }])).expect("sequence");
    assert_eq!(items[0], json!({ "id": "x" }));
}
