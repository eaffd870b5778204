use super::*;
use std::sync::Mutex as StdMutex;

fn recorder() -> Arc<StdMutex<Vec<&'static str>>> {
    Arc::new(StdMutex::new(Vec::new()))
}

#[test]
fn notify_runs_callbacks_in_registration_order() {
    let subs = Subscribers::new();
    let log = recorder();
    for name in ["a", "b", "c"] {
        let log = log.clone();
        let _sub = subs.subscribe(move || log.lock().unwrap().push(name));
    }

    subs.notify();

    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn unsubscribe_removes_only_that_registration_and_is_idempotent() {
    let subs = Subscribers::new();
    let log = recorder();
    let log_a = log.clone();
    let a = subs.subscribe(move || log_a.lock().unwrap().push("a"));
    let log_b = log.clone();
    let _b = subs.subscribe(move || log_b.lock().unwrap().push("b"));

    a.unsubscribe();
    a.unsubscribe();
    subs.notify();

    assert_eq!(*log.lock().unwrap(), vec!["b"]);
    assert!(!a.is_active());
    assert_eq!(subs.len(), 1);
}

#[test]
fn same_closure_registered_twice_is_two_registrations() {
    let subs = Subscribers::new();
    let count = Arc::new(StdMutex::new(0));
    let c1 = count.clone();
    let first = subs.subscribe(move || *c1.lock().unwrap() += 1);
    let c2 = count.clone();
    let _second = subs.subscribe(move || *c2.lock().unwrap() += 1);

    first.unsubscribe();
    subs.notify();

    assert_eq!(*count.lock().unwrap(), 1);
}

#[test]
fn subscriber_can_unsubscribe_itself_during_notify() {
    let subs = Subscribers::new();
    let log = recorder();
    let slot: Arc<StdMutex<Option<Subscription>>> = Arc::new(StdMutex::new(None));

    let slot_in = slot.clone();
    let log_in = log.clone();
    let sub = subs.subscribe(move || {
        log_in.lock().unwrap().push("once");
        if let Some(me) = slot_in.lock().unwrap().as_ref() {
            me.unsubscribe();
        }
    });
    *slot.lock().unwrap() = Some(sub);
    let log_b = log.clone();
    let _b = subs.subscribe(move || log_b.lock().unwrap().push("b"));

    subs.notify();
    subs.notify();

    assert_eq!(*log.lock().unwrap(), vec!["once", "b", "b"]);
}

#[test]
fn subscriber_removed_by_an_earlier_one_is_skipped_this_round() {
    let subs = Subscribers::new();
    let log = recorder();
    let victim_slot: Arc<StdMutex<Option<Subscription>>> = Arc::new(StdMutex::new(None));

    let slot_in = victim_slot.clone();
    let log_a = log.clone();
    let _a = subs.subscribe(move || {
        log_a.lock().unwrap().push("a");
        if let Some(victim) = slot_in.lock().unwrap().as_ref() {
            victim.unsubscribe();
        }
    });
    let log_v = log.clone();
    let victim = subs.subscribe(move || log_v.lock().unwrap().push("victim"));
    *victim_slot.lock().unwrap() = Some(victim);

    subs.notify();

    assert_eq!(*log.lock().unwrap(), vec!["a"]);
}

#[test]
fn subscriber_added_during_notify_waits_for_next_round() {
    let subs = Subscribers::new();
    let log = recorder();
    let added = Arc::new(StdMutex::new(false));

    let subs_in = subs.clone();
    let log_in = log.clone();
    let added_in = added.clone();
    let _adder = subs.subscribe(move || {
        log_in.lock().unwrap().push("adder");
        let mut added = added_in.lock().unwrap();
        if !*added {
            *added = true;
            let log_new = log_in.clone();
            let _late = subs_in.subscribe(move || log_new.lock().unwrap().push("late"));
        }
    });

    subs.notify();
    assert_eq!(*log.lock().unwrap(), vec!["adder"]);

    subs.notify();
    assert_eq!(*log.lock().unwrap(), vec!["adder", "adder", "late"]);
}

#[test]
fn clear_drops_every_registration() {
    let subs = Subscribers::new();
    let sub = subs.subscribe(|| {});
    subs.clear();
    assert!(subs.is_empty());
    assert!(!sub.is_active());
}
