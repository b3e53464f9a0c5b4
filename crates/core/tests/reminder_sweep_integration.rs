//! Reminder dispatch for upcoming appointments.

mod support;

use std::sync::Arc;

use cadence_core::ReminderSweep;
use cadence_domain::TenantId;
use chrono::{Duration, Utc};
use support::{local_appointment, MockAppointmentRepository, RecordingNotifier};

#[tokio::test]
async fn reminders_go_out_once_for_appointments_in_the_window() {
    let repo = MockAppointmentRepository::new();
    let notifier = RecordingNotifier::default();
    let sweep = ReminderSweep::new(Arc::new(repo.clone()), Arc::new(notifier.clone()));
    let tenant = TenantId::new();
    let now = Utc::now();

    let mut soon = local_appointment(tenant, "Soon");
    soon.notify = true;
    soon.starts_at = now + Duration::hours(3);
    let mut muted = soon.clone();
    muted.id = cadence_domain::AppointmentId::new();
    muted.notify = false;
    let mut later = soon.clone();
    later.id = cadence_domain::AppointmentId::new();
    later.starts_at = now + Duration::hours(30);
    let mut already = soon.clone();
    already.id = cadence_domain::AppointmentId::new();
    already.notified = true;
    for appt in [&soon, &muted, &later, &already] {
        repo.seed(appt.clone());
    }

    let sent = sweep.run(now).await.expect("sweep");
    let second = sweep.run(now).await.expect("sweep");

    assert_eq!(sent, 1);
    assert_eq!(second, 0);
    assert_eq!(notifier.reminders(), vec![soon.id]);
    assert!(repo.find(soon.id).unwrap().notified);
}

#[tokio::test]
async fn failed_dispatch_is_retried_next_sweep() {
    let repo = MockAppointmentRepository::new();
    let notifier = RecordingNotifier::default();
    let sweep = ReminderSweep::new(Arc::new(repo.clone()), Arc::new(notifier.clone()))
        .with_window(Duration::hours(2));
    let now = Utc::now();

    let mut appt = local_appointment(TenantId::new(), "Dentist");
    appt.notify = true;
    appt.starts_at = now + Duration::minutes(90);
    repo.seed(appt.clone());
    notifier.fail_for(appt.id);

    let sent = sweep.run(now).await.expect("sweep");

    assert_eq!(sent, 0);
    assert!(!repo.find(appt.id).unwrap().notified);
}
