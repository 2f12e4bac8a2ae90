mod common;

use common::*;
use sanggar::{
    cache::IntentCache,
    domain::{PaymentGateway, PaymentMethod, PaymentStatus, RegistrationSource},
    error::AppError,
    repository::SettlementStore,
    service::{
        checkout_service::ProgramCheckoutInput, webhook_service::ReconciliationOutcome,
    },
};

fn program_input(program_id: uuid::Uuid, email: &str) -> ProgramCheckoutInput {
    ProgramCheckoutInput {
        program_id,
        email: email.to_string(),
        name: "Ayu Lestari".to_string(),
        phone: Some("+62811111111".to_string()),
        institution: Some("ITB".to_string()),
        segment: None,
        method: Some(PaymentMethod::Qris),
        user_id: None,
    }
}

#[tokio::test]
async fn test_settlement_is_idempotent_across_replays() -> anyhow::Result<()> {
    let h = harness().await?;
    let program = create_program(&h.program_repo, "Well Log Analysis", 30000, 60000).await?;

    let checkout = h
        .checkout
        .checkout_program(
            PaymentGateway::Midtrans,
            program_input(program.id, "ayu@example.com"),
        )
        .await?;
    assert_eq!(checkout.amount, 60000);
    assert_eq!(checkout.currency, "IDR");
    assert!(checkout.order_id.starts_with("PRG-"));

    // Checkout writes nothing durable
    assert_eq!(count_rows(&h.pool, "payments").await?, 0);
    assert_eq!(count_rows(&h.pool, "program_registrations").await?, 0);

    let payload = midtrans_notification(&checkout.order_id, "settlement", "60000.00");
    let outcome = h.webhook.handle_midtrans(payload.clone()).await?;
    let registration_id = match outcome {
        ReconciliationOutcome::Program(settlement) => {
            assert_eq!(settlement.payment.status, PaymentStatus::Completed);
            assert!(settlement.payment.paid_at.is_some());
            assert_eq!(settlement.registration.email, "ayu@example.com");
            settlement.registration.id
        }
        other => panic!("expected program settlement, got {:?}", other),
    };

    // Cache entry is gone once committed
    assert!(h.cache.get(&checkout.order_id).await?.is_none());

    // Replaying the exact same notification twice more changes nothing
    for _ in 0..2 {
        let outcome = h.webhook.handle_midtrans(payload.clone()).await?;
        match outcome {
            ReconciliationOutcome::Replayed(payment) => {
                assert_eq!(payment.status, PaymentStatus::Completed);
                assert_eq!(payment.registration_id, Some(registration_id));
            }
            other => panic!("expected replay, got {:?}", other),
        }
    }

    assert_eq!(count_rows(&h.pool, "payments").await?, 1);
    assert_eq!(count_rows(&h.pool, "program_registrations").await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_member_email_gets_member_price_and_links() -> anyhow::Result<()> {
    let h = harness().await?;
    let program = create_program(&h.program_repo, "Seismic Interpretation", 30000, 60000).await?;
    let member_id = insert_member(&h.pool, "ayu@example.com", "Ayu Lestari").await?;

    // Email arrives messy; identity is the normalized form
    let checkout = h
        .checkout
        .checkout_program(
            PaymentGateway::Midtrans,
            program_input(program.id, "  Ayu@Example.COM "),
        )
        .await?;
    assert_eq!(checkout.amount, 30000);

    let payload = midtrans_notification(&checkout.order_id, "settlement", "30000.00");
    match h.webhook.handle_midtrans(payload).await? {
        ReconciliationOutcome::Program(settlement) => {
            assert_eq!(settlement.registration.email, "ayu@example.com");
            assert_eq!(settlement.registration.source, RegistrationSource::Member);
            assert_eq!(settlement.registration.member_id, Some(member_id));
            assert_eq!(settlement.payment.member_id, Some(member_id));
        }
        other => panic!("expected program settlement, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_tampered_signature_never_touches_state() -> anyhow::Result<()> {
    let h = harness().await?;
    let program = create_program(&h.program_repo, "Gravity Surveying", 30000, 60000).await?;

    let checkout = h
        .checkout
        .checkout_program(
            PaymentGateway::Midtrans,
            program_input(program.id, "ayu@example.com"),
        )
        .await?;

    // Signature computed over a different amount than the body claims
    let mut payload = midtrans_notification(&checkout.order_id, "settlement", "1.00");
    payload["gross_amount"] = serde_json::json!("60000.00");

    let err = h.webhook.handle_midtrans(payload).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidSignature(_)));

    assert_eq!(count_rows(&h.pool, "payments").await?, 0);
    assert_eq!(count_rows(&h.pool, "program_registrations").await?, 0);
    // Intent stays cached; a genuine notification can still settle it
    assert!(h.cache.get(&checkout.order_id).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_duplicate_checkout_rejected_after_settlement() -> anyhow::Result<()> {
    let h = harness().await?;
    let program = create_program(&h.program_repo, "Mud Logging", 30000, 60000).await?;

    let checkout = h
        .checkout
        .checkout_program(
            PaymentGateway::Midtrans,
            program_input(program.id, "ayu@example.com"),
        )
        .await?;
    let payload = midtrans_notification(&checkout.order_id, "settlement", "60000.00");
    h.webhook.handle_midtrans(payload).await?;

    let err = h
        .checkout
        .checkout_program(
            PaymentGateway::Midtrans,
            program_input(program.id, "AYU@example.com"),
        )
        .await
        .unwrap_err();
    match err {
        AppError::DuplicateRegistration(msg) => assert!(msg.contains("Mud Logging")),
        other => panic!("expected duplicate registration, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_pending_then_settlement_links_registration() -> anyhow::Result<()> {
    let h = harness().await?;
    let program = create_program(&h.program_repo, "Core Description", 30000, 60000).await?;

    let checkout = h
        .checkout
        .checkout_program(
            PaymentGateway::Midtrans,
            program_input(program.id, "ayu@example.com"),
        )
        .await?;

    let pending = midtrans_notification(&checkout.order_id, "pending", "60000.00");
    match h.webhook.handle_midtrans(pending).await? {
        ReconciliationOutcome::Recorded(payment) => {
            assert_eq!(payment.status, PaymentStatus::Pending);
            assert_eq!(payment.email, "ayu@example.com");
            assert!(payment.registration_id.is_none());
        }
        other => panic!("expected recorded payment, got {:?}", other),
    }
    assert_eq!(count_rows(&h.pool, "program_registrations").await?, 0);
    // Intent must survive the pending notification
    assert!(h.cache.get(&checkout.order_id).await?.is_some());

    let settled = midtrans_notification(&checkout.order_id, "settlement", "60000.00");
    match h.webhook.handle_midtrans(settled).await? {
        ReconciliationOutcome::Program(settlement) => {
            assert_eq!(settlement.payment.status, PaymentStatus::Completed);
            assert!(settlement.payment.paid_at.is_some());
            assert_eq!(
                settlement.payment.registration_id,
                Some(settlement.registration.id)
            );
        }
        other => panic!("expected program settlement, got {:?}", other),
    }

    assert_eq!(count_rows(&h.pool, "payments").await?, 1);
    assert_eq!(count_rows(&h.pool, "program_registrations").await?, 1);
    assert!(h.cache.get(&checkout.order_id).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_orphan_webhook_creates_audit_stub() -> anyhow::Result<()> {
    let h = harness().await?;

    let payload = midtrans_notification("PRG-UNKNOWN-DEADBEEF", "settlement", "150000.00");
    match h.webhook.handle_midtrans(payload).await? {
        ReconciliationOutcome::Orphaned(payment) => {
            assert_eq!(payment.email, "");
            assert_eq!(payment.amount, 150000);
            assert_eq!(payment.status, PaymentStatus::Completed);
            assert!(payment.registration_id.is_none());
            assert!(payment.member_id.is_none());
        }
        other => panic!("expected orphaned payment, got {:?}", other),
    }

    assert_eq!(count_rows(&h.pool, "payments").await?, 1);
    assert_eq!(count_rows(&h.pool, "program_registrations").await?, 0);
    assert_eq!(count_rows(&h.pool, "members").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_expired_checkout_recorded_without_registration() -> anyhow::Result<()> {
    let h = harness().await?;
    let program = create_program(&h.program_repo, "Drill Stem Testing", 30000, 60000).await?;

    let checkout = h
        .checkout
        .checkout_program(
            PaymentGateway::Midtrans,
            program_input(program.id, "ayu@example.com"),
        )
        .await?;

    let expired = midtrans_notification(&checkout.order_id, "expire", "60000.00");
    match h.webhook.handle_midtrans(expired).await? {
        ReconciliationOutcome::Recorded(payment) => {
            assert_eq!(payment.status, PaymentStatus::Failed);
        }
        other => panic!("expected recorded payment, got {:?}", other),
    }
    assert_eq!(count_rows(&h.pool, "program_registrations").await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_refund_after_settlement_updates_in_place() -> anyhow::Result<()> {
    let h = harness().await?;
    let program = create_program(&h.program_repo, "Petrophysics Clinic", 30000, 60000).await?;

    let checkout = h
        .checkout
        .checkout_program(
            PaymentGateway::Midtrans,
            program_input(program.id, "ayu@example.com"),
        )
        .await?;
    let settled = midtrans_notification(&checkout.order_id, "settlement", "60000.00");
    h.webhook.handle_midtrans(settled).await?;

    let refunded = midtrans_notification(&checkout.order_id, "refund", "60000.00");
    match h.webhook.handle_midtrans(refunded).await? {
        ReconciliationOutcome::Updated(payment) => {
            assert_eq!(payment.status, PaymentStatus::Refunded);
            // Linkage from settlement is retained
            assert!(payment.registration_id.is_some());
        }
        other => panic!("expected updated payment, got {:?}", other),
    }

    assert_eq!(count_rows(&h.pool, "payments").await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_ipaymu_webhook_verifies_and_settles() -> anyhow::Result<()> {
    let h = harness().await?;
    let program = create_program(&h.program_repo, "Basin Modelling", 30000, 60000).await?;

    let checkout = h
        .checkout
        .checkout_program(
            PaymentGateway::Ipaymu,
            program_input(program.id, "ayu@example.com"),
        )
        .await?;
    assert_eq!(h.ipaymu_gateway.requests.lock().unwrap().len(), 1);

    // Missing signature header
    let (body, sig) = ipaymu_notification(&checkout.order_id, "berhasil", 60000);
    let err = h.webhook.handle_ipaymu(&body, None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidSignature(_)));

    // Body modified after signing
    let (tampered_body, _) = ipaymu_notification(&checkout.order_id, "berhasil", 1);
    let err = h
        .webhook
        .handle_ipaymu(&tampered_body, Some(&sig))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidSignature(_)));
    assert_eq!(count_rows(&h.pool, "payments").await?, 0);

    // Genuine notification settles
    match h.webhook.handle_ipaymu(&body, Some(&sig)).await? {
        ReconciliationOutcome::Program(settlement) => {
            assert_eq!(settlement.payment.status, PaymentStatus::Completed);
            assert_eq!(settlement.payment.gateway_transaction_id.as_deref(), Some("88231"));
        }
        other => panic!("expected program settlement, got {:?}", other),
    }

    assert_eq!(count_rows(&h.pool, "payments").await?, 1);
    assert_eq!(count_rows(&h.pool, "program_registrations").await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_payment_lookup_by_order_id() -> anyhow::Result<()> {
    let h = harness().await?;
    let program = create_program(&h.program_repo, "Remote Sensing Intro", 30000, 60000).await?;

    let checkout = h
        .checkout
        .checkout_program(
            PaymentGateway::Midtrans,
            program_input(program.id, "ayu@example.com"),
        )
        .await?;
    let payload = midtrans_notification(&checkout.order_id, "settlement", "60000.00");
    h.webhook.handle_midtrans(payload).await?;

    let payment = h
        .store
        .find_payment(&checkout.order_id)
        .await?
        .expect("payment should exist after settlement");
    assert_eq!(payment.order_id, checkout.order_id);
    assert_eq!(payment.gateway, Some(PaymentGateway::Midtrans));
    assert!(payment.raw_payload.is_some());

    assert!(h.store.find_payment("PRG-NOPE-00000000").await?.is_none());
    Ok(())
}
