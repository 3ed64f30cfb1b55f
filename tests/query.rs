use yangtree::context::{Context, ContextFlags};
use yangtree::data::{Data, DataFormat, DataParserFlags, DataTree};
use yangtree::schema::SchemaNodeKind;
use yangtree::{ErrorKind, NodeNavigation};

static SEARCH_DIR: &str = "./assets/yang/";
static DATA_FILE: &str = "./assets/data/turing-machine.startup";
static DELTA: &str = "/turing-machine:turing-machine/transition-function/delta";

fn create_context() -> Context {
    let mut ctx = Context::new(ContextFlags::DISABLE_SEARCHDIR_CWD)
        .expect("Failed to create context");
    ctx.set_searchdir(SEARCH_DIR)
        .expect("Failed to set YANG search directory");
    ctx.load_module("turing-machine", None, &[])
        .expect("Failed to load module");
    ctx
}

fn load_data(ctx: &Context) -> DataTree<'_> {
    DataTree::parse_file(
        ctx,
        DATA_FILE,
        DataFormat::XML,
        DataParserFlags::CONFIG,
    )
    .expect("Failed to parse data tree")
}

#[test]
fn query_file_and_string() {
    let ctx = create_context();
    let dtree1 = load_data(&ctx);
    let data = std::fs::read_to_string(DATA_FILE).expect("Failed to read data");
    let dtree2 = DataTree::parse_string(
        &ctx,
        data,
        DataFormat::XML,
        DataParserFlags::CONFIG,
    )
    .expect("Failed to parse data tree");

    let summary = |dtree: &DataTree<'_>| {
        dtree
            .tree_dfs()
            .into_iter()
            .map(|dnode| {
                let snode = dnode.schema();
                (snode.name().to_owned(), snode.kind())
            })
            .collect::<Vec<_>>()
    };
    let nodes1 = summary(&dtree1);
    assert_eq!(nodes1, summary(&dtree2));
    assert_eq!(nodes1.len(), 51);
    assert_eq!(
        nodes1[..4],
        [
            ("turing-machine".to_owned(), SchemaNodeKind::Container),
            ("transition-function".to_owned(), SchemaNodeKind::Container),
            ("delta".to_owned(), SchemaNodeKind::List),
            ("label".to_owned(), SchemaNodeKind::Leaf),
        ]
    );
}

#[test]
fn query_list_entry_children() {
    let ctx = create_context();
    let dtree = load_data(&ctx);

    let prefix = format!("{}[label='left summand']", DELTA);
    let dnodes = dtree
        .find(&format!("{}/*", prefix))
        .expect("Failed to lookup data")
        .collect::<Vec<_>>();
    assert_eq!(
        dnodes
            .iter()
            .map(|dnode| dnode.schema().name().to_owned())
            .collect::<Vec<_>>(),
        vec!["label", "input"]
    );
    for dnode in &dnodes {
        assert!(dnode.path().starts_with(&prefix));
    }
    assert_eq!(
        dnodes
            .iter()
            .map(|dnode| dnode.path())
            .collect::<Vec<_>>(),
        vec![format!("{}/label", prefix), format!("{}/input", prefix)]
    );

    // Unknown list entry.
    assert_eq!(
        dtree
            .find(&format!("{}[label='no such label']/*", DELTA))
            .expect("Failed to lookup data")
            .count(),
        0
    );
}

#[test]
fn query_values() {
    let ctx = create_context();
    let dtree = load_data(&ctx);

    // Blank symbols.
    assert_eq!(
        dtree
            .find(&format!("{}/input/symbol[.='']", DELTA))
            .expect("Failed to lookup data")
            .map(|dnode| dnode.parent().unwrap().parent().unwrap().path())
            .collect::<Vec<_>>(),
        vec![
            format!("{}[label='right end']", DELTA),
            format!("{}[label='final step']", DELTA),
        ]
    );

    assert_eq!(
        dtree
            .find(&format!("{}/output/state[.='3']", DELTA))
            .expect("Failed to lookup data")
            .count(),
        1
    );
    assert_eq!(
        dtree
            .find(&format!("{}[2]/label", DELTA))
            .expect("Failed to lookup data")
            .map(|dnode| dnode.value_canonical().unwrap())
            .collect::<Vec<_>>(),
        vec!["separator"]
    );
}

#[test]
fn query_errors() {
    let ctx = create_context();
    let dtree = load_data(&ctx);

    for (path, kind) in [
        ("/no-such-module:turing-machine", ErrorKind::Schema),
        ("/turing-machine:turing-machine/no-such-node", ErrorKind::Schema),
        (
            "/turing-machine:turing-machine/transition-function/delta[no-such-key='x']",
            ErrorKind::Schema,
        ),
        ("turing-machine:turing-machine", ErrorKind::Syntax),
        ("/turing-machine:turing-machine/", ErrorKind::Syntax),
        ("/turing-machine:turing-machine[", ErrorKind::Syntax),
        // Predicate fields are single child names.
        (
            "/turing-machine:turing-machine/transition-function/delta[input/symbol='']",
            ErrorKind::Syntax,
        ),
    ] {
        assert_eq!(
            dtree.find(path).map(|set| set.count()).map_err(|e| e.kind()),
            Err(kind),
            "{}",
            path
        );
    }
}

#[test]
fn query_navigation() {
    let ctx = create_context();
    let dtree = load_data(&ctx);

    // turing-machine -> transition-function -> first delta.
    let dnodes = dtree
        .reference()
        .child()
        .child()
        .tree_dfs()
        .expect("Failed to navigate data tree");
    assert_eq!(
        dnodes
            .iter()
            .map(|dnode| dnode.schema().name().to_owned())
            .collect::<Vec<_>>(),
        vec!["delta", "label", "input", "state", "symbol"]
    );
    assert_eq!(dnodes[0].path(), format!("{}[label='left summand']", DELTA));

    // Schema counterpart.
    let snodes = dnodes[0].schema().tree_dfs();
    assert_eq!(snodes[0].name(), "delta");
    assert_eq!(
        snodes
            .iter()
            .filter(|snode| snode.kind() == SchemaNodeKind::Leaf)
            .count(),
        6
    );

    // A leaf has no child to navigate into.
    let label = dnodes[1].clone();
    assert_eq!(
        label.child().tree_dfs().map_err(|e| e.kind()).err(),
        Some(ErrorKind::NullTarget)
    );
    assert_eq!(
        label
            .child()
            .child()
            .child()
            .map(|dnode| dnode.is_some())
            .map_err(|e| e.kind()),
        Err(ErrorKind::NullTarget)
    );

    // Going up from the top.
    assert_eq!(
        dtree
            .reference()
            .parent()
            .parent()
            .map(|dnode| dnode.is_some())
            .map_err(|e| e.kind()),
        Err(ErrorKind::NullTarget)
    );
}
