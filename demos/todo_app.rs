//! A todo list wired through a component tree.
//!
//! Run with `RUST_LOG=larder=debug cargo run --example todo_app` to see
//! commits, dispatches and store injection in the log.

use futures::channel::oneshot;
use larder::install::{install, ComponentOptions, StoreAccess};
use larder::tree::{App, Component};
use larder::{Effect, Store};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default)]
struct Todos {
    items: Vec<(String, bool)>,
    loading: bool,
}

fn todo_store() -> Store<Todos> {
    Store::builder(Todos::default())
        .mutation("add", |s: &mut Todos, title: String| s.items.push((title, false)))
        .mutation("toggle", |s: &mut Todos, index: usize| {
            if let Some(item) = s.items.get_mut(index) {
                item.1 = !item.1;
            }
        })
        .mutation("loading", |s: &mut Todos, loading: bool| s.loading = loading)
        .action(
            "load",
            |store: Store<Todos>, response: oneshot::Receiver<Vec<String>>| async move {
                store.commit("loading", true)?;
                for title in response.await? {
                    store.commit("add", title)?;
                }
                store.commit("loading", false)?;
                anyhow::Ok(())
            },
        )
        .getter("remaining", |s: &Todos| {
            s.items.iter().filter(|(_, done)| !done).count()
        })
        .build()
}

fn render_footer(footer: &Component) -> anyhow::Result<Effect> {
    let store = footer.store::<Todos>()?;
    Ok(Effect::new(move || {
        let remaining = store.getters().get::<usize>("remaining").unwrap_or(0);
        let loading = store.read(|s| s.loading);
        println!(
            "[footer] {remaining} item(s) left{}",
            if loading { " (loading...)" } else { "" }
        );
    }))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = todo_store();
    let app = App::new();
    install(&app);

    let root = app.mount(ComponentOptions::new().name("app").store(&store));
    let list = root.child(ComponentOptions::new().name("list"));
    let footer = root.child(ComponentOptions::new().name("footer"));
    let _footer_view = render_footer(&footer)?;

    let (reply, response) = oneshot::channel();
    let _pending = list.store::<Todos>()?.dispatch("load", response)?;

    reply
        .send(vec!["write docs".to_string(), "ship it".to_string()])
        .map_err(|_| anyhow::anyhow!("loader went away"))?;
    store.run_pending();

    list.store::<Todos>()?.commit("toggle", 0usize)?;
    println!("[app] {:?}", store.state().items);
    Ok(())
}
