use crate::install::{ComponentOptions, ContextNode, CreationHook, Framework, Instance};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::trace;

#[derive(Default)]
struct AppInner {
    mixins: RefCell<Vec<(&'static str, CreationHook)>>,
    next_id: Cell<usize>,
}

impl AppInner {
    fn next_id(&self) -> usize {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }
}

/// Headless component framework: a tree of components with named creation
/// hooks.
///
/// # Examples
///
/// ```
/// use larder::install::{install, ComponentOptions, StoreAccess};
/// use larder::tree::App;
/// use larder::Store;
///
/// let store = Store::builder(0u32).build();
/// let app = App::new();
/// install(&app);
///
/// let root = app.mount(ComponentOptions::new().store(&store));
/// let leaf = root.child(ComponentOptions::new()).child(ComponentOptions::new());
/// assert!(Store::ptr_eq(&leaf.store::<u32>().unwrap(), &store));
/// ```
#[derive(Clone, Default)]
pub struct App {
    inner: Rc<AppInner>,
}

impl App {
    /// Create an application with no hooks installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root component.
    ///
    /// The returned handle owns the whole tree: children only point back at
    /// their parent, so once the root handle is dropped its descendants no
    /// longer see the store it provided. Keep it alive for as long as the
    /// tree is in use.
    pub fn mount(&self, options: ComponentOptions) -> Component {
        Component {
            node: Node::create(&self.inner, None, options),
        }
    }
}

impl Framework for App {
    fn mixin(&self, name: &'static str, hook: CreationHook) {
        self.inner.mixins.borrow_mut().push((name, hook));
    }

    fn has_mixin(&self, name: &str) -> bool {
        self.inner
            .mixins
            .borrow()
            .iter()
            .any(|(existing, _)| *existing == name)
    }
}

struct Node {
    id: usize,
    options: ComponentOptions,
    context: ContextNode,
    parent: RefCell<Weak<Node>>,
    children: RefCell<Vec<Rc<Node>>>,
    app: Rc<AppInner>,
}

impl Node {
    fn create(app: &Rc<AppInner>, parent: Option<&Rc<Node>>, options: ComponentOptions) -> Rc<Node> {
        let node = Rc::new(Node {
            id: app.next_id(),
            options,
            context: ContextNode::new(),
            parent: RefCell::new(parent.map_or_else(Weak::new, Rc::downgrade)),
            children: RefCell::new(Vec::new()),
            app: Rc::clone(app),
        });

        let hooks: Vec<CreationHook> = app
            .mixins
            .borrow()
            .iter()
            .map(|(_, hook)| Rc::clone(hook))
            .collect();
        for hook in hooks {
            hook(&*node);
        }

        if let Some(parent) = parent {
            parent.children.borrow_mut().push(Rc::clone(&node));
        }
        trace!(id = node.id, name = ?node.options.component_name(), "component created");
        node
    }
}

impl Instance for Node {
    fn options(&self) -> &ComponentOptions {
        &self.options
    }

    fn context(&self) -> &ContextNode {
        &self.context
    }

    fn parent(&self) -> Option<Rc<dyn Instance>> {
        self.parent
            .borrow()
            .upgrade()
            .map(|parent| parent as Rc<dyn Instance>)
    }
}

/// Handle to a component in an [`App`]'s tree.
///
/// Parents own their children; a child only points back at its parent.
#[derive(Clone)]
pub struct Component {
    node: Rc<Node>,
}

impl Component {
    /// Create a component owned by this one.
    pub fn child(&self, options: ComponentOptions) -> Component {
        Component {
            node: Node::create(&self.node.app, Some(&self.node), options),
        }
    }

    /// Detach this component from its parent.
    ///
    /// The subtree stays alive as long as a handle to it exists, but no
    /// longer sees anything provided above it.
    pub fn unmount(&self) {
        let parent = self.node.parent.replace(Weak::new());
        if let Some(parent) = parent.upgrade() {
            parent
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(child, &self.node));
        }
    }

    /// Identifier unique within the owning [`App`].
    pub fn id(&self) -> usize {
        self.node.id
    }

    /// Name given through [`ComponentOptions::name`].
    pub fn name(&self) -> Option<&str> {
        self.node.options.component_name()
    }

    /// The parent, unless this is a root or has been unmounted.
    pub fn parent_component(&self) -> Option<Component> {
        self.node
            .parent
            .borrow()
            .upgrade()
            .map(|node| Component { node })
    }

    /// Handles to the components currently owned by this one.
    pub fn children(&self) -> Vec<Component> {
        self.node
            .children
            .borrow()
            .iter()
            .map(|node| Component {
                node: Rc::clone(node),
            })
            .collect()
    }
}

impl Instance for Component {
    fn options(&self) -> &ComponentOptions {
        self.node.options()
    }

    fn context(&self) -> &ContextNode {
        self.node.context()
    }

    fn parent(&self) -> Option<Rc<dyn Instance>> {
        self.node.parent()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.node.id)
            .field("name", &self.name())
            .field("children", &self.node.children.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::{install, StoreAccess};
    use crate::{Store, StoreError};

    #[test]
    fn hooks_run_once_per_creation_in_order() {
        let app = App::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for label in ["first", "second"] {
            let log = Rc::clone(&log);
            app.mixin(
                label,
                Rc::new(move |instance: &dyn Instance| {
                    log.borrow_mut()
                        .push((label, instance.options().component_name().map(String::from)));
                }),
            );
        }

        let root = app.mount(ComponentOptions::new().name("root"));
        root.child(ComponentOptions::new().name("child"));

        assert_eq!(
            *log.borrow(),
            vec![
                ("first", Some("root".to_string())),
                ("second", Some("root".to_string())),
                ("first", Some("child".to_string())),
                ("second", Some("child".to_string())),
            ]
        );
        assert!(app.has_mixin("first"));
        assert!(!app.has_mixin("third"));
    }

    #[test]
    fn tree_links_parents_and_children() {
        let app = App::new();
        let root = app.mount(ComponentOptions::new().name("root"));
        let a = root.child(ComponentOptions::new().name("a"));
        let b = root.child(ComponentOptions::new().name("b"));

        assert_eq!(root.children().len(), 2);
        assert_eq!(a.parent_component().unwrap().id(), root.id());
        assert_ne!(a.id(), b.id());

        a.unmount();
        let names: Vec<_> = root
            .children()
            .iter()
            .map(|c| c.name().map(String::from))
            .collect();
        assert_eq!(names, vec![Some("b".to_string())]);
    }

    #[test]
    fn store_found_from_dynamically_added_children() {
        let store = Store::builder(5i64).build();
        let app = App::new();
        install(&app);
        let root = app.mount(ComponentOptions::new().store(&store));

        let first = root.child(ComponentOptions::new());
        first.unmount();
        let late = root.child(ComponentOptions::new()).child(ComponentOptions::new());

        assert!(Store::ptr_eq(&late.store::<i64>().unwrap(), &store));
        // Detached subtrees lose their ancestor chain.
        assert!(matches!(
            first.store::<i64>(),
            Err(StoreError::StoreNotFound { .. })
        ));
    }

    #[test]
    fn dropping_the_root_detaches_its_descendants() {
        let store = Store::builder(1u16).build();
        let app = App::new();
        install(&app);

        let root = app.mount(ComponentOptions::new().store(&store));
        let leaf = root.child(ComponentOptions::new());
        assert!(leaf.store::<u16>().is_ok());
        assert!(leaf.parent_component().is_some());

        drop(root);
        assert!(leaf.parent_component().is_none());
        assert!(matches!(
            leaf.store::<u16>(),
            Err(StoreError::StoreNotFound { .. })
        ));
    }
}
