use super::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

fn drain(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

/// Component with one effect keyed on its props, logging runs and unwinds.
fn keyed_effect(log: &Log) -> HookComponent<i32, ()> {
    let log = log.clone();
    use_hooks(move |cx, key: &i32| {
        let key = *key;
        let log = log.clone();
        cx.use_effect(
            move |scope| {
                log.borrow_mut().push(format!("effect:{key}"));
                scope.on_unwind(move || log.borrow_mut().push(format!("unwind:{key}")))
            },
            deps![key],
        );
    })
}

#[test]
fn effect_runs_on_mount_and_again_only_when_deps_change() {
    let log = new_log();
    let host = MemoryHost::new();
    let mounted = host.mount(&keyed_effect(&log), 1).unwrap();
    assert_eq!(drain(&log), vec!["effect:1"]);

    mounted.set_props(1).unwrap();
    assert!(drain(&log).is_empty());

    mounted.set_props(2).unwrap();
    assert_eq!(drain(&log), vec!["unwind:1", "effect:2"]);

    mounted.unmount();
    assert_eq!(drain(&log), vec!["unwind:2"]);
    assert_eq!(host.mounted_count(), 0);
}

#[test]
fn effects_do_not_run_during_render() {
    let log = new_log();
    let component = keyed_effect(&log);
    let instance = component.instantiate(&HostBindings::detached()).unwrap();

    instance.render(&3).unwrap();
    assert!(log.borrow().is_empty());

    instance.did_mount();
    assert_eq!(drain(&log), vec!["effect:3"]);
}

#[test]
fn absent_deps_rerun_every_commit_and_empty_deps_run_once() {
    let log = new_log();
    let sink = log.clone();
    let component = use_hooks(move |cx, _: &()| {
        let every = sink.clone();
        cx.use_effect(
            move |scope| {
                every.borrow_mut().push("every".to_string());
                scope.on_unwind(move || every.borrow_mut().push("every:unwind".to_string()))
            },
            None,
        );
        let once = sink.clone();
        cx.use_effect(
            move |scope| {
                once.borrow_mut().push("once".to_string());
                scope.on_unwind(move || once.borrow_mut().push("once:unwind".to_string()))
            },
            deps![],
        );
    });

    let host = MemoryHost::new();
    let mounted = host.mount(&component, ()).unwrap();
    assert_eq!(drain(&log), vec!["every", "once"]);

    mounted.rerender().unwrap();
    mounted.rerender().unwrap();
    assert_eq!(
        drain(&log),
        vec!["every:unwind", "every", "every:unwind", "every"]
    );

    mounted.unmount();
    assert_eq!(drain(&log), vec!["once:unwind", "every:unwind"]);
}

#[test]
fn update_pass_unwinds_in_reverse_then_runs_in_order() {
    let log = new_log();
    let sink = log.clone();
    let component = use_hooks(move |cx, key: &i32| {
        let key = *key;
        for name in ["a", "b", "c"] {
            let log = sink.clone();
            cx.use_effect(
                move |scope| {
                    log.borrow_mut().push(format!("{name}:{key}"));
                    scope.on_unwind(move || log.borrow_mut().push(format!("{name}:unwind")))
                },
                deps![key],
            );
        }
    });

    let host = MemoryHost::new();
    let mounted = host.mount(&component, 0).unwrap();
    assert_eq!(drain(&log), vec!["a:0", "b:0", "c:0"]);

    mounted.set_props(1).unwrap();
    assert_eq!(
        drain(&log),
        vec!["c:unwind", "b:unwind", "a:unwind", "a:1", "b:1", "c:1"]
    );

    mounted.unmount();
    assert_eq!(drain(&log), vec!["c:unwind", "b:unwind", "a:unwind"]);
}

#[test]
fn only_changed_effects_unwind_on_update() {
    let log = new_log();
    let sink = log.clone();
    let component = use_hooks(move |cx, (left, right): &(i32, i32)| {
        for (name, key) in [("left", *left), ("right", *right)] {
            let log = sink.clone();
            cx.use_effect(
                move |scope| {
                    log.borrow_mut().push(format!("{name}:{key}"));
                    scope.on_unwind(move || log.borrow_mut().push(format!("{name}:unwind")))
                },
                deps![key],
            );
        }
    });

    let host = MemoryHost::new();
    let mounted = host.mount(&component, (1, 1)).unwrap();
    drain(&log);

    mounted.set_props((1, 2)).unwrap();
    assert_eq!(drain(&log), vec!["right:unwind", "right:2"]);

    mounted.unmount();
    assert_eq!(drain(&log), vec!["right:unwind", "left:unwind"]);
}

#[test]
fn effect_without_unwind_leaves_nothing_to_run() {
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let component = use_hooks(move |cx, key: &u8| {
        let counter = counter.clone();
        cx.use_effect(
            move |scope| {
                counter.set(counter.get() + 1);
                scope.done()
            },
            deps![*key],
        );
    });

    let host = MemoryHost::new();
    let mounted = host.mount(&component, 1).unwrap();
    mounted.set_props(2).unwrap();
    mounted.unmount();
    assert_eq!(runs.get(), 2);
}

#[test]
fn panicking_unwind_does_not_stop_the_next_effect() {
    let log = new_log();
    let sink = log.clone();
    let component = use_hooks(move |cx, key: &i32| {
        let key = *key;
        let log = sink.clone();
        cx.use_effect(
            move |scope| {
                log.borrow_mut().push(format!("effect:{key}"));
                scope.on_unwind(move || {
                    if key == 1 {
                        panic!("unwind {key} failed");
                    }
                })
            },
            deps![key],
        );
        let log = sink.clone();
        cx.use_effect(
            move |scope| {
                log.borrow_mut().push(format!("second:{key}"));
                scope.done()
            },
            deps![key],
        );
    });

    let host = MemoryHost::new();
    let mounted = host.mount(&component, 1).unwrap();
    drain(&log);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| mounted.set_props(2)));
    assert!(result.is_err());
    assert_eq!(drain(&log), vec!["effect:2", "second:2"]);

    mounted.unmount();
}

#[test]
fn dropping_an_instance_without_unmount_runs_its_unwinds() {
    let log = new_log();
    let component = keyed_effect(&log);
    let instance = component.instantiate(&HostBindings::detached()).unwrap();
    instance.render(&5).unwrap();
    instance.did_mount();
    drain(&log);

    drop(instance);
    assert_eq!(drain(&log), vec!["unwind:5"]);
}

#[test]
fn unmount_is_idempotent() {
    let log = new_log();
    let component = keyed_effect(&log);
    let instance = component.instantiate(&HostBindings::detached()).unwrap();
    instance.render(&1).unwrap();
    instance.did_mount();
    instance.will_unmount();
    instance.will_unmount();
    assert_eq!(drain(&log), vec!["effect:1", "unwind:1"]);
}

#[test]
fn update_before_mount_runs_the_mount_pass() {
    let log = new_log();
    let component = keyed_effect(&log);
    let instance = component.instantiate(&HostBindings::detached()).unwrap();
    instance.render(&4).unwrap();
    instance.did_update();

    assert_eq!(instance.phase(), LifecyclePhase::Mounted);
    assert_eq!(drain(&log), vec!["effect:4"]);
}

#[test]
fn layout_and_mutation_effects_share_the_effect_schedule() {
    let log = new_log();
    let sink = log.clone();
    let component = use_hooks(move |cx, key: &i32| {
        let key = *key;
        let layout = sink.clone();
        cx.use_layout_effect(
            move |scope| {
                layout.borrow_mut().push(format!("layout:{key}"));
                scope.done()
            },
            deps![key],
        );
        let mutation = sink.clone();
        cx.use_mutation_effect(
            move |scope| {
                mutation.borrow_mut().push(format!("mutation:{key}"));
                scope.done()
            },
            deps![key],
        );
    });

    let host = MemoryHost::new();
    let mounted = host.mount(&component, 1).unwrap();
    mounted.set_props(1).unwrap();
    mounted.set_props(2).unwrap();
    assert_eq!(
        drain(&log),
        vec!["layout:1", "mutation:1", "layout:2", "mutation:2"]
    );
    assert_eq!(
        mounted.instance().debug_slot_kinds(),
        vec![(0, HookKind::Effect), (1, HookKind::Effect)]
    );
}

#[test]
fn effect_state_update_settles_after_one_extra_render() {
    let component = use_hooks(|cx, target: &u32| {
        let (value, set_value) = cx.use_state(0u32);
        let target = *target;
        cx.use_effect(
            move |scope| {
                set_value.set(target);
                scope.done()
            },
            deps![target],
        );
        value
    });

    let host = MemoryHost::new();
    let mounted = host.mount(&component, 9).unwrap();
    assert_eq!(mounted.output(), Some(0));
    assert_eq!(host.flush().unwrap(), 1);
    assert_eq!(mounted.output(), Some(9));
    assert!(!host.has_pending());
}

#[test]
fn previous_value_lags_one_commit_behind() {
    let component = use_hooks(|cx, value: &&'static str| cx.use_previous(*value, None));

    let host = MemoryHost::new();
    let mounted = host.mount(&component, "a").unwrap();
    assert_eq!(mounted.output(), Some(None));

    mounted.set_props("b").unwrap();
    assert_eq!(mounted.output(), Some(Some("a")));

    mounted.set_props("c").unwrap();
    assert_eq!(mounted.output(), Some(Some("b")));
}

#[test]
fn previous_value_only_records_when_deps_change() {
    let component = use_hooks(|cx, (value, key): &(u32, u32)| cx.use_previous(*value, deps![*key]));

    let host = MemoryHost::new();
    let mounted = host.mount(&component, (1, 0)).unwrap();
    mounted.set_props((2, 0)).unwrap();
    assert_eq!(mounted.output(), Some(Some(1)));

    mounted.set_props((3, 1)).unwrap();
    assert_eq!(mounted.output(), Some(Some(1)));

    mounted.set_props((4, 1)).unwrap();
    assert_eq!(mounted.output(), Some(Some(3)));
}

#[derive(Clone, Debug, PartialEq)]
struct Pinger {
    pings: u32,
}

impl Pinger {
    fn ping(&self) -> u32 {
        self.pings + 1
    }
}

fn pinger_component(builds: &Rc<Cell<u32>>) -> HookComponent<(RefTarget<Pinger>, u32), ()> {
    let builds = builds.clone();
    use_hooks(move |cx, (target, pings): &(RefTarget<Pinger>, u32)| {
        let pings = *pings;
        let builds = builds.clone();
        cx.use_imperative_methods(
            target,
            move || {
                builds.set(builds.get() + 1);
                Pinger { pings }
            },
            deps![pings],
        );
    })
}

#[test]
fn imperative_handle_published_to_object_ref_and_cleared_on_unmount() {
    let builds = Rc::new(Cell::new(0));
    let handle: HookRef<Option<Pinger>> = HookRef::new(None);
    let target = RefTarget::object(handle.clone());

    let host = MemoryHost::new();
    let mounted = host
        .mount(&pinger_component(&builds), (target.clone(), 0))
        .unwrap();
    assert_eq!(handle.with(|current| current.as_ref().map(Pinger::ping)), Some(1));

    mounted.set_props((target.clone(), 0)).unwrap();
    assert_eq!(builds.get(), 1);

    mounted.set_props((target, 4)).unwrap();
    assert_eq!(builds.get(), 2);
    assert_eq!(handle.with(|current| current.as_ref().map(Pinger::ping)), Some(5));

    mounted.unmount();
    assert_eq!(handle.current(), None);
}

#[test]
fn imperative_handle_republishes_when_target_changes() {
    let builds = Rc::new(Cell::new(0));
    let seen: Rc<RefCell<Vec<(&'static str, Option<u32>)>>> = Rc::new(RefCell::new(Vec::new()));
    let first_sink = seen.clone();
    let first = RefTarget::callback(move |handle: Option<Pinger>| {
        first_sink.borrow_mut().push(("first", handle.map(|h| h.pings)));
    });
    let second_sink = seen.clone();
    let second = RefTarget::callback(move |handle: Option<Pinger>| {
        second_sink.borrow_mut().push(("second", handle.map(|h| h.pings)));
    });

    let host = MemoryHost::new();
    let mounted = host
        .mount(&pinger_component(&builds), (first.clone(), 7))
        .unwrap();
    mounted.set_props((second, 7)).unwrap();
    mounted.unmount();

    assert_eq!(
        *seen.borrow(),
        vec![
            ("first", Some(7)),
            ("first", None),
            ("second", Some(7)),
            ("second", None),
        ]
    );
    assert_eq!(builds.get(), 2);
}

#[test]
fn forwarded_ref_reaches_the_render_function() {
    let component = use_hooks(|cx, label: &&'static str| {
        let label = *label;
        if let Some(target) = cx.forwarded_ref::<Pinger>() {
            cx.use_imperative_methods(&target, move || Pinger { pings: label.len() as u32 }, None);
        }
        label
    });

    let handle: HookRef<Option<Pinger>> = HookRef::new(None);
    let host = MemoryHost::new();
    let mounted = host
        .mount_with_ref(&component, "four", RefTarget::object(handle.clone()))
        .unwrap();
    assert_eq!(handle.current(), Some(Pinger { pings: 4 }));

    mounted.unmount();
    assert_eq!(handle.current(), None);
}

#[test]
fn uncommitted_render_keeps_the_effect_pending() {
    let log = new_log();
    let component = keyed_effect(&log);
    let instance = component.instantiate(&HostBindings::detached()).unwrap();

    instance.render(&1).unwrap();
    instance.render(&1).unwrap();
    instance.did_mount();

    assert_eq!(drain(&log), vec!["effect:1"]);
}

#[test]
fn update_requested_during_a_pass_runs_after_it() {
    let log = new_log();
    let holder: Rc<RefCell<Option<Rc<HookInstance<i32, ()>>>>> = Rc::new(RefCell::new(None));
    let (sink, inner_holder) = (log.clone(), holder.clone());
    let component = use_hooks(move |cx, key: &i32| {
        let key = *key;
        let log = sink.clone();
        let holder = inner_holder.clone();
        cx.use_effect(
            move |scope| {
                log.borrow_mut().push(format!("effect:{key}"));
                if key == 1 {
                    let instance = holder.borrow().clone();
                    if let Some(instance) = instance {
                        instance.render(&2).unwrap();
                        instance.did_update();
                    }
                }
                scope.on_unwind(move || log.borrow_mut().push(format!("unwind:{key}")))
            },
            deps![key],
        );
    });

    let instance = Rc::new(component.instantiate(&HostBindings::detached()).unwrap());
    *holder.borrow_mut() = Some(instance.clone());
    instance.render(&1).unwrap();
    instance.did_mount();
    assert_eq!(drain(&log), vec!["effect:1", "unwind:1", "effect:2"]);

    instance.will_unmount();
    holder.borrow_mut().take();
    assert_eq!(drain(&log), vec!["unwind:2"]);
}

#[test]
fn dropping_an_instance_unwinds_in_reverse_and_contains_panics() {
    let log = new_log();
    let sink = log.clone();
    let component = use_hooks(move |cx, _: &()| {
        for name in ["a", "b", "c"] {
            let log = sink.clone();
            cx.use_effect(
                move |scope| {
                    scope.on_unwind(move || {
                        if name == "b" {
                            panic!("unwind {name} failed");
                        }
                        log.borrow_mut().push(format!("unwind:{name}"));
                    })
                },
                deps![],
            );
        }
    });

    let instance = component.instantiate(&HostBindings::detached()).unwrap();
    instance.render(&()).unwrap();
    instance.did_mount();

    drop(instance);
    assert_eq!(drain(&log), vec!["unwind:c", "unwind:a"]);
}

#[test]
fn reinitialising_an_effect_slot_runs_its_unwind_once() {
    let log = new_log();
    let sink = log.clone();
    let component = use_hooks(move |cx, with_effect: &bool| {
        if *with_effect {
            let log = sink.clone();
            cx.use_effect(
                move |scope| {
                    log.borrow_mut().push("effect".to_string());
                    scope.on_unwind(move || log.borrow_mut().push("unwind".to_string()))
                },
                deps![],
            );
        } else {
            cx.use_ref(0u8);
        }
    });

    let host = MemoryHost::new();
    let mounted = host.mount(&component, true).unwrap();
    assert_eq!(drain(&log), vec!["effect"]);

    mounted.set_props(false).unwrap();
    assert_eq!(drain(&log), vec!["unwind"]);

    mounted.set_props(true).unwrap();
    assert_eq!(drain(&log), vec!["effect"]);

    mounted.unmount();
    assert_eq!(drain(&log), vec!["unwind"]);
}
