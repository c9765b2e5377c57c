use super::StdScheduler;
use hookslot_core::{use_hooks, Mountable, RenderScheduler, StateSetter, Updatable};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

#[test]
fn state_change_requests_render_and_wakes_loop() {
    let scheduler = StdScheduler::new();
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = wakes.clone();
    scheduler.set_render_waker(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let setter: Rc<RefCell<Option<StateSetter<i32>>>> = Rc::new(RefCell::new(None));
    let sink = setter.clone();
    let component = use_hooks(move |cx, _: &()| {
        let (value, set_value) = cx.use_state(0);
        *sink.borrow_mut() = Some(set_value);
        value
    });
    let instance = component.instantiate(&scheduler.bindings()).unwrap();
    assert_eq!(instance.render(&()), Ok(0));
    instance.did_mount();
    assert!(!scheduler.take_render_request());

    let set_value = setter.borrow().clone().unwrap();
    set_value.set(1);
    set_value.set(2);

    assert!(
        scheduler.take_render_request(),
        "state change should request a render"
    );
    assert_eq!(wakes.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.take_pending(), vec![instance.id()]);
    assert!(!scheduler.has_pending());

    assert_eq!(instance.render(&()), Ok(2));
    instance.did_update();
}

#[test]
fn waker_can_signal_another_thread() {
    let scheduler = StdScheduler::new();
    let (tx, rx) = mpsc::channel();
    let tx = std::sync::Mutex::new(tx);
    scheduler.set_render_waker(move || {
        let _ = tx.lock().map(|tx| tx.send(()));
    });

    let remote = scheduler.clone();
    let loop_thread = std::thread::spawn(move || {
        rx.recv().map(|_| remote.take_pending().len())
    });

    let component = use_hooks(|_cx, _: &()| ());
    let instance = component.instantiate(&scheduler.bindings()).unwrap();
    scheduler.schedule_render(instance.id());

    assert_eq!(loop_thread.join().unwrap(), Ok(1));
}

#[test]
fn cleared_waker_is_not_called() {
    let scheduler = StdScheduler::default();
    let wakes = Arc::new(AtomicUsize::new(0));
    let counter = wakes.clone();
    scheduler.set_render_waker(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    scheduler.clear_render_waker();

    let component = use_hooks(|_cx, _: &()| ());
    let first = component.instantiate(&scheduler.bindings()).unwrap();
    let second = component.instantiate(&scheduler.bindings()).unwrap();
    scheduler.schedule_render(second.id());
    scheduler.schedule_render(first.id());
    scheduler.schedule_render(second.id());

    assert_eq!(wakes.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.take_pending(), vec![second.id(), first.id()]);
    assert!(!scheduler.take_render_request());
}
