use std::sync::{Arc, Mutex};

use observable_list::{ObservableList, Subscription};

use super::Recorder;

#[test]
fn set_from_callback_is_delivered_after_the_current_pass() {
    let ob = ObservableList::new(Vec::<u32>::new());
    let rec_before = Recorder::new();
    let _before = ob.subscribe(rec_before.callback());
    let _writer = ob.subscribe({
        let ob = ob.clone();
        move |values| {
            if values == [1] {
                ob.set(vec![1, 2]);
                // The write takes effect right away.
                assert_eq!(ob.get(), [1, 2]);
            }
        }
    });
    let rec_after = Recorder::new();
    let _after = ob.subscribe(rec_after.callback());
    rec_before.take();
    rec_after.take();

    ob.set(vec![1]);

    assert_eq!(ob.get(), [1, 2]);
    assert_eq!(rec_before.take(), [vec![1], vec![1, 2]]);
    assert_eq!(rec_after.take(), [vec![1], vec![1, 2]]);
}

#[test]
fn update_from_callback_sees_latest_value() {
    let ob = ObservableList::new(Vec::<u32>::new());
    let seen_by_update = Arc::new(Mutex::new(Vec::new()));

    let _w1 = ob.subscribe({
        let ob = ob.clone();
        move |values| {
            if values == [1] {
                ob.set(vec![1, 2]);
            }
        }
    });
    let _w2 = ob.subscribe({
        let ob = ob.clone();
        let seen_by_update = seen_by_update.clone();
        move |values| {
            if values == [1] {
                ob.update(|current| {
                    seen_by_update.lock().unwrap().push(current.to_vec());
                    let mut next = current.to_vec();
                    next.push(3);
                    next
                });
            }
        }
    });
    let rec = Recorder::new();
    let _sub = ob.subscribe(rec.callback());
    rec.take();

    ob.set(vec![1]);

    assert_eq!(*seen_by_update.lock().unwrap(), [vec![1, 2]]);
    assert_eq!(ob.get(), [1, 2, 3]);
    assert_eq!(rec.take(), [vec![1], vec![1, 2], vec![1, 2, 3]]);
}

#[test]
fn writes_from_callbacks_do_not_recurse() {
    const TARGET: usize = 1_000;

    let ob = ObservableList::new(Vec::new());
    let rec = Recorder::new();
    let _sub = ob.subscribe(rec.callback());

    // Each write triggers the next one.
    let _counter = ob.subscribe({
        let ob = ob.clone();
        move |values: &[usize]| {
            if values.len() < TARGET {
                ob.update_in_place(|values| values.push(values.len()));
            }
        }
    });

    assert_eq!(ob.len(), TARGET);
    let seen = rec.take();
    assert_eq!(seen.len(), TARGET + 1);
    assert!(seen.iter().enumerate().all(|(i, values)| values.len() == i));
}

#[test]
fn unsubscribe_during_pass() {
    let ob = ObservableList::new(vec![0_u8]);
    let victim_slot: Arc<Mutex<Option<Subscription<u8>>>> = Arc::default();

    let rec_a = Recorder::new();
    let _a = ob.subscribe({
        let victim_slot = victim_slot.clone();
        let record = rec_a.callback();
        move |values| {
            record(values);
            if values == [1] {
                victim_slot.lock().unwrap().as_mut().unwrap().unsubscribe();
            }
        }
    });
    let rec_b = Recorder::new();
    *victim_slot.lock().unwrap() = Some(ob.subscribe(rec_b.callback()));
    let rec_c = Recorder::new();
    let _c = ob.subscribe(rec_c.callback());
    rec_a.take();
    rec_b.take();
    rec_c.take();

    ob.set(vec![1]);
    // B was scheduled before it was removed, so it still sees this pass.
    assert_eq!(rec_a.take(), [vec![1]]);
    assert_eq!(rec_b.take(), [vec![1]]);
    assert_eq!(rec_c.take(), [vec![1]]);
    assert_eq!(ob.subscriber_count(), 2);

    ob.set(vec![2]);
    assert_eq!(rec_a.take(), [vec![2]]);
    assert_eq!(rec_b.take(), Vec::<Vec<u8>>::new());
    assert_eq!(rec_c.take(), [vec![2]]);
}

#[test]
fn unsubscribe_self_during_pass() {
    let ob = ObservableList::new(vec![0_u8]);
    let own_slot: Arc<Mutex<Option<Subscription<u8>>>> = Arc::default();
    let rec = Recorder::new();

    let sub = ob.subscribe({
        let own_slot = own_slot.clone();
        let record = rec.callback();
        move |values| {
            record(values);
            if values == [1] {
                if let Some(mut sub) = own_slot.lock().unwrap().take() {
                    sub.unsubscribe();
                }
            }
        }
    });
    *own_slot.lock().unwrap() = Some(sub);

    ob.set(vec![1]);
    ob.set(vec![2]);
    assert_eq!(rec.take(), [vec![0], vec![1]]);
    assert_eq!(ob.subscriber_count(), 0);
}

#[test]
fn subscribe_during_pass() {
    let ob = ObservableList::new(vec![0_u8]);
    let late_slot: Arc<Mutex<Option<Subscription<u8>>>> = Arc::default();
    let rec_late = Recorder::new();

    let _a = ob.subscribe({
        let ob = ob.clone();
        let late_slot = late_slot.clone();
        let rec_late = rec_late.clone();
        move |values| {
            if values == [1] {
                let sub = ob.subscribe(rec_late.callback());
                *late_slot.lock().unwrap() = Some(sub);
            }
        }
    });
    let rec_b = Recorder::new();
    let _b = ob.subscribe(rec_b.callback());
    rec_b.take();

    ob.set(vec![1]);
    // Only the initial call, the late subscriber isn't part of this pass.
    assert_eq!(rec_late.take(), [vec![1]]);
    assert_eq!(rec_b.take(), [vec![1]]);

    ob.set(vec![2]);
    assert_eq!(rec_late.take(), [vec![2]]);
    assert_eq!(rec_b.take(), [vec![2]]);
}

#[test]
fn subscribe_during_pass_with_pending_write() {
    let ob = ObservableList::new(vec![0_u8]);
    let late_slot: Arc<Mutex<Option<Subscription<u8>>>> = Arc::default();
    let rec_late = Recorder::new();

    let _writer = ob.subscribe({
        let ob = ob.clone();
        move |values| {
            if values == [1] {
                ob.set(vec![2]);
            }
        }
    });
    let _subscriber = ob.subscribe({
        let ob = ob.clone();
        let late_slot = late_slot.clone();
        let rec_late = rec_late.clone();
        move |values| {
            if values == [1] {
                *late_slot.lock().unwrap() = Some(ob.subscribe(rec_late.callback()));
            }
        }
    });

    ob.set(vec![1]);
    // The late subscriber starts out with the pending value and doesn't get it
    // a second time.
    assert_eq!(rec_late.take(), [vec![2]]);

    ob.set(vec![3]);
    assert_eq!(rec_late.take(), [vec![3]]);
}

#[test]
fn unsubscribe_after_nested_write() {
    let ob = ObservableList::new(vec![0_u8]);
    let victim_slot: Arc<Mutex<Option<Subscription<u8>>>> = Arc::default();

    let _writer = ob.subscribe({
        let ob = ob.clone();
        let victim_slot = victim_slot.clone();
        move |values| {
            if values == [1] {
                ob.set(vec![2]);
                victim_slot.lock().unwrap().as_mut().unwrap().unsubscribe();
            }
        }
    });
    let rec = Recorder::new();
    *victim_slot.lock().unwrap() = Some(ob.subscribe(rec.callback()));
    rec.take();

    ob.set(vec![1]);
    // Still part of the pass for `[1]`, but gone before the pass for `[2]`
    // starts.
    assert_eq!(rec.take(), [vec![1]]);
    assert_eq!(ob.get(), [2]);
    assert_eq!(ob.subscriber_count(), 1);
}

#[test]
fn pending_passes_do_not_keep_dropped_subscribers_alive() {
    let ob = ObservableList::new(vec![0_u8]);
    let victim_slot: Arc<Mutex<Option<Subscription<u8>>>> = Arc::default();
    let rec = Recorder::new();
    let victim_refs = Arc::new(Mutex::new(Vec::new()));

    let _writer = ob.subscribe({
        let ob = ob.clone();
        let victim_slot = victim_slot.clone();
        move |values| {
            if values == [1] {
                ob.set(vec![2]);
                drop(victim_slot.lock().unwrap().take());
            }
        }
    });
    let _observer = ob.subscribe({
        let seen = Arc::downgrade(&rec.seen);
        let victim_refs = victim_refs.clone();
        move |values| {
            if values == [2] {
                victim_refs.lock().unwrap().push(seen.strong_count());
            }
        }
    });
    *victim_slot.lock().unwrap() = Some(ob.subscribe(rec.callback()));
    rec.take();

    ob.set(vec![1]);
    assert_eq!(rec.take(), [vec![1]]);
    // Only the recorder itself holds on to its buffer once the victim's
    // callback is gone.
    assert_eq!(*victim_refs.lock().unwrap(), [1]);
    assert_eq!(Arc::strong_count(&rec.seen), 1);
}
