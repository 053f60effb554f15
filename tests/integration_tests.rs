//! Integration tests for Larder

use futures::channel::oneshot;
use futures::executor::block_on;
use larder::install::{install, ComponentOptions, Framework, Instance, StoreAccess};
use larder::tree::App;
use larder::{Effect, Store, StoreError};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone, Debug, PartialEq)]
struct Counter {
    count: i32,
    label: String,
}

fn counter_store() -> Store<Counter> {
    Store::builder(Counter {
        count: 0,
        label: "clicks".to_string(),
    })
    .mutation("inc", |s: &mut Counter, n: i32| s.count += n)
    .getter("double", |s: &Counter| s.count * 2)
    .build()
}

#[test]
fn counter_scenario() {
    let store = counter_store();

    store.commit("inc", 3).unwrap();
    assert_eq!(store.read(|s| s.count), 3);
    assert_eq!(store.getters().get::<i32>("double").unwrap(), 6);

    store.commit("inc", -1).unwrap();
    assert_eq!(store.read(|s| s.count), 2);
    assert_eq!(store.getters().get::<i32>("double").unwrap(), 4);

    // Nothing but the targeted field moved
    assert_eq!(store.state().label, "clicks");
}

#[test]
fn unknown_action_scenario() {
    let store = counter_store();
    let before = store.state();

    let err = store.dispatch("unknownAction", ()).unwrap_err();
    assert!(matches!(err, StoreError::UnknownAction(ref name) if name == "unknownAction"));
    assert_eq!(store.state(), before);
}

#[test]
fn unknown_mutation_never_mutates() {
    let store = counter_store();
    store.commit("inc", 1).unwrap();

    for name in ["dec", "", "INC"] {
        assert!(matches!(
            store.commit(name, 1),
            Err(StoreError::UnknownMutation(_))
        ));
    }
    assert_eq!(store.state().count, 1);
}

#[test]
fn unknown_action_invokes_no_handler() {
    let calls = Rc::new(Cell::new(0));
    let store = Store::builder(0)
        .action("known", {
            let calls = Rc::clone(&calls);
            move |_: Store<i32>, _: ()| {
                calls.set(calls.get() + 1);
                async { anyhow::Ok(()) }
            }
        })
        .build();

    assert!(store.dispatch("unknown", ()).is_err());
    assert_eq!(calls.get(), 0);

    store.dispatch("known", ()).unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
fn getter_reads_are_fresh_and_side_effect_free() {
    let store = counter_store();
    let commits = Rc::new(Cell::new(0));
    store.subscribe({
        let commits = Rc::clone(&commits);
        move |_, _| commits.set(commits.get() + 1)
    });

    for _ in 0..3 {
        assert_eq!(store.getters().get::<i32>("double").unwrap(), 0);
    }
    assert_eq!(commits.get(), 0);
    assert_eq!(store.state().count, 0);

    store.commit("inc", 5).unwrap();
    assert_eq!(store.getters().get::<i32>("double").unwrap(), 10);
}

#[test]
fn effects_follow_getters() {
    let store = counter_store();
    let rendered = Rc::new(RefCell::new(Vec::new()));

    let _view = Effect::new({
        let store = store.clone();
        let rendered = Rc::clone(&rendered);
        move || {
            let double = store.getters().get::<i32>("double").unwrap_or_default();
            rendered.borrow_mut().push(double);
        }
    });

    store.commit("inc", 1).unwrap();
    store.commit("inc", 2).unwrap();
    assert_eq!(*rendered.borrow(), vec![0, 2, 6]);
}

#[test]
fn every_descendant_resolves_the_root_store() {
    let store = counter_store();
    let app = App::new();
    assert!(install(&app));

    let root = app.mount(ComponentOptions::new().name("root").store(&store));
    let header = root.child(ComponentOptions::new().name("header"));
    let body = root.child(ComponentOptions::new().name("body"));
    let deep = body
        .child(ComponentOptions::new())
        .child(ComponentOptions::new())
        .child(ComponentOptions::new().name("deep"));

    for component in [&root, &header, &body, &deep] {
        let found = component.store::<Counter>().unwrap();
        assert!(Store::ptr_eq(&found, &store));
    }

    deep.store::<Counter>().unwrap().commit("inc", 4).unwrap();
    assert_eq!(header.store::<Counter>().unwrap().state().count, 4);
}

#[test]
fn components_outside_the_tree_find_no_store() {
    let store = counter_store();
    let app = App::new();
    install(&app);

    let _root = app.mount(ComponentOptions::new().store(&store));
    let stranger = app.mount(ComponentOptions::new().name("other root"));
    let stranger_child = stranger.child(ComponentOptions::new());

    assert!(matches!(
        stranger.store::<Counter>(),
        Err(StoreError::StoreNotFound { .. })
    ));
    assert!(matches!(
        stranger_child.store::<Counter>(),
        Err(StoreError::StoreNotFound { .. })
    ));
}

#[test]
fn independent_trees_keep_their_own_stores() {
    let first = counter_store();
    let second = counter_store();
    let app = App::new();
    install(&app);

    let a = app
        .mount(ComponentOptions::new().store(&first))
        .child(ComponentOptions::new());
    let b = app
        .mount(ComponentOptions::new().store(&second))
        .child(ComponentOptions::new());

    assert!(Store::ptr_eq(&a.store::<Counter>().unwrap(), &first));
    assert!(Store::ptr_eq(&b.store::<Counter>().unwrap(), &second));
}

#[test]
fn missing_install_fails_loudly() {
    let store = counter_store();
    let app = App::new();

    let root = app.mount(ComponentOptions::new().store(&store));
    let child = root.child(ComponentOptions::new());
    let err = child.store::<Counter>().unwrap_err();
    assert!(err.to_string().contains("Counter"));
}

#[test]
fn installing_twice_is_a_no_op() {
    let app = App::new();
    let hook_runs = Rc::new(Cell::new(0));
    app.mixin("count", {
        let hook_runs = Rc::clone(&hook_runs);
        Rc::new(move |_: &dyn Instance| hook_runs.set(hook_runs.get() + 1))
    });

    assert!(install(&app));
    assert!(!install(&app));

    let store = counter_store();
    let root = app.mount(ComponentOptions::new().store(&store));
    assert!(root.store::<Counter>().is_ok());
    assert_eq!(hook_runs.get(), 1);
}

#[test]
fn components_do_not_keep_the_store_alive() {
    let store = counter_store();
    let app = App::new();
    install(&app);
    let root = app.mount(ComponentOptions::new().store(&store));
    let child = root.child(ComponentOptions::new());

    drop(store);
    assert!(matches!(
        child.store::<Counter>(),
        Err(StoreError::StoreNotFound { .. })
    ));
}

#[test]
fn store_is_resolved_by_state_type() {
    let counter = counter_store();
    let session = Store::builder(String::from("guest")).build();
    let app = App::new();
    install(&app);

    let root = app.mount(ComponentOptions::new().store(&counter));
    let panel = root.child(ComponentOptions::new().store(&session));
    let leaf = panel.child(ComponentOptions::new());

    assert!(Store::ptr_eq(&leaf.store::<Counter>().unwrap(), &counter));
    assert!(Store::ptr_eq(&leaf.store::<String>().unwrap(), &session));
    assert!(root.store::<String>().is_err());
}

#[test]
fn async_action_commits_after_resuming() {
    let (reply, response) = oneshot::channel::<i32>();
    let response = RefCell::new(Some(response));
    let store = Store::builder(Counter {
        count: 0,
        label: String::new(),
    })
    .mutation("inc", |s: &mut Counter, n: i32| s.count += n)
    .action("fetch_and_inc", move |store: Store<Counter>, _: ()| {
        let response = response.borrow_mut().take();
        async move {
            let response = response.ok_or_else(|| anyhow::anyhow!("already fetched"))?;
            let n = response.await?;
            store.commit("inc", n)?;
            anyhow::Ok(())
        }
    })
    .build();

    let dispatched = store.dispatch("fetch_and_inc", ()).unwrap();
    assert_eq!(store.state().count, 0);

    reply.send(9).unwrap();
    store.run_pending();
    assert_eq!(store.state().count, 9);
    assert!(block_on(dispatched).is_ok());
}

#[test]
fn fire_and_forget_dispatch_does_not_report_failures() {
    let store = Store::builder(0)
        .action("explode", |_: Store<i32>, _: ()| async {
            Err::<(), _>(anyhow::anyhow!("boom"))
        })
        .build();

    // Dropping the handle keeps the baseline contract: the failure is not
    // surfaced to the dispatcher.
    drop(store.dispatch("explode", ()).unwrap());

    // Awaiting the handle observes it.
    let err = block_on(store.dispatch("explode", ()).unwrap()).unwrap_err();
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn actions_read_getters_and_state() {
    let store = Store::builder(Counter {
        count: 2,
        label: String::new(),
    })
    .mutation("inc", |s: &mut Counter, n: i32| s.count += n)
    .mutation("label", |s: &mut Counter, label: String| s.label = label)
    .getter("double", |s: &Counter| s.count * 2)
    .action("describe", |store: Store<Counter>, _: ()| async move {
        let double = store.getters().get::<i32>("double")?;
        let count = store.read(|s| s.count);
        store.commit("label", format!("{count} -> {double}"))?;
        anyhow::Ok(())
    })
    .build();

    store.dispatch("describe", ()).unwrap();
    assert_eq!(store.state().label, "2 -> 4");
}
