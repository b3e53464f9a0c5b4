//! Channel registration, renewal and cancellation.

mod support;

use cadence_domain::{CadenceError, ProviderError, TenantId};
use chrono::{Duration, Utc};
use support::{active_event, channel, Harness, WEBHOOK_URL};

#[tokio::test]
async fn register_persists_channel_and_stores_initial_cursor() {
    let h = Harness::new();
    let tenant = TenantId::new();
    h.provider.push_events(vec![active_event("evt-1", "Kickoff")], Some("tok-1"));

    let registration = h.lifecycle.register(tenant).await.expect("register");

    assert_eq!(h.provider.registered(), vec![WEBHOOK_URL.to_string()]);
    assert_eq!(h.provider.list_calls(), vec![None], "initial sync is a full pull");
    assert_eq!(registration.outcome.summary.created, 1);
    assert_eq!(registration.channel.cursor(), Some("tok-1"));

    let stored = h.channels.all();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].tenant_id, tenant);
    assert_eq!(stored[0].sync_cursor.as_deref(), Some("tok-1"));
    assert_eq!(stored[0].remote_calendar_id, "primary");
}

#[tokio::test]
async fn register_requires_a_webhook_url() {
    let h = Harness::with_webhook_url(None);

    let err = h.lifecycle.register(TenantId::new()).await.unwrap_err();

    assert!(matches!(err, CadenceError::Config(_)));
    assert!(h.provider.registered().is_empty());
    assert!(h.channels.all().is_empty());
}

#[tokio::test]
async fn renewal_preserves_the_cursor() {
    let h = Harness::new();
    let tenant = TenantId::new();
    let mut expiring = channel(tenant, "old-channel", Duration::days(1));
    expiring.sync_cursor = Some("tok-7".into());
    h.channels.seed(expiring.clone());

    let report = h.lifecycle.renew_expiring(Utc::now()).await.expect("sweep");

    assert_eq!(report.renewed, 1);
    assert!(report.failed.is_empty());
    assert_eq!(
        h.provider.cancelled(),
        vec![("old-channel".to_string(), "old-channel-resource".to_string())]
    );

    let stored = h.channels.all();
    assert_eq!(stored.len(), 1);
    assert_ne!(stored[0].channel_id, "old-channel");
    assert_eq!(stored[0].sync_cursor.as_deref(), Some("tok-7"));
    assert!(stored[0].expires_at > Utc::now() + Duration::days(13));
}

#[tokio::test]
async fn channels_outside_the_lead_are_left_alone() {
    let h = Harness::new();
    h.channels.seed(channel(TenantId::new(), "fresh", Duration::days(10)));

    let report = h.lifecycle.renew_expiring(Utc::now()).await.expect("sweep");

    assert_eq!(report.renewed, 0);
    assert!(h.provider.registered().is_empty());
    assert_eq!(h.channels.all()[0].channel_id, "fresh");
}

#[tokio::test]
async fn renewal_continues_when_stop_fails() {
    let h = Harness::new();
    h.channels.seed(channel(TenantId::new(), "old-channel", Duration::hours(3)));
    h.provider.fail_cancel_with(ProviderError::NotFound("channel".into()));

    let report = h.lifecycle.renew_expiring(Utc::now()).await.expect("sweep");

    assert_eq!(report.renewed, 1);
    assert_eq!(h.channels.all().len(), 1);
    assert_ne!(h.channels.all()[0].channel_id, "old-channel");
}

#[tokio::test]
async fn failed_registration_keeps_the_old_channel() {
    let h = Harness::new();
    h.channels.seed(channel(TenantId::new(), "old-channel", Duration::hours(3)));
    h.provider.fail_register_with(ProviderError::Auth("invalid_grant".into()));

    let report = h.lifecycle.renew_expiring(Utc::now()).await.expect("sweep");

    assert_eq!(report.renewed, 0);
    assert_eq!(report.failed, vec!["old-channel".to_string()]);
    assert_eq!(h.channels.all()[0].channel_id, "old-channel");
}

#[tokio::test]
async fn every_failure_is_reported_without_aborting_the_sweep() {
    let h = Harness::new();
    h.channels.seed(channel(TenantId::new(), "first", Duration::hours(1)));
    h.channels.seed(channel(TenantId::new(), "second", Duration::hours(2)));
    h.provider.fail_register_with(ProviderError::Transient("503".into()));

    let report = h.lifecycle.renew_expiring(Utc::now()).await.expect("sweep");

    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.renewed, 0);
    assert_eq!(h.channels.all().len(), 2);
    // Three attempts per channel under the retry policy.
    assert_eq!(h.provider.cancelled().len(), 6);
}

#[tokio::test]
async fn unregister_deletes_record_even_when_provider_fails() {
    let h = Harness::new();
    let tenant = TenantId::new();
    let existing = channel(tenant, "doomed", Duration::days(5));
    h.channels.seed(existing.clone());
    h.provider.fail_cancel_with(ProviderError::Transient("timeout".into()));

    h.lifecycle.unregister(&existing).await.expect("unregister");

    assert!(h.channels.all().is_empty());
    assert_eq!(h.provider.cancelled().len(), 1);
}

#[tokio::test]
async fn unregister_tenant_removes_every_channel() {
    let h = Harness::new();
    let tenant = TenantId::new();
    let other = TenantId::new();
    h.channels.seed(channel(tenant, "a", Duration::days(5)));
    h.channels.seed(channel(tenant, "b", Duration::days(6)));
    h.channels.seed(channel(other, "c", Duration::days(6)));

    let removed = h.lifecycle.unregister_tenant(tenant).await.expect("unregister");

    assert_eq!(removed, 2);
    let remaining = h.channels.all();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].channel_id, "c");
}

#[tokio::test]
async fn unregister_tenants_continues_past_a_failing_tenant() {
    let h = Harness::new();
    let (broken, healthy) = (TenantId::new(), TenantId::new());
    h.channels.seed(channel(broken, "stuck", Duration::days(5)));
    h.channels.seed(channel(healthy, "a", Duration::days(5)));
    h.channels.seed(channel(healthy, "b", Duration::days(6)));
    h.channels.fail_listing_for(broken);

    let report = h.lifecycle.unregister_tenants(&[broken, healthy]).await;

    assert!(!report.is_clean());
    assert_eq!(report.removed, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].tenant_id, broken);
    let remaining = h.channels.all();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].channel_id, "stuck");
}
