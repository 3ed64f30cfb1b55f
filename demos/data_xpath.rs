use yangtree::context::{Context, ContextFlags};
use yangtree::data::{Data, DataFormat, DataParserFlags, DataTree};
use yangtree::schema::SchemaPathFormat;
use yangtree::NodeNavigation;

static SEARCH_DIR: &str = "./assets/yang/";

fn main() -> yangtree::Result<()> {
    // Initialize context.
    let mut ctx = Context::new(ContextFlags::DISABLE_SEARCHDIR_CWD)
        .expect("Failed to create context");
    ctx.set_searchdir(SEARCH_DIR)
        .expect("Failed to set YANG search directory");
    ctx.load_module("turing-machine", None, &[])
        .expect("Failed to load module");

    // Parse the startup configuration.
    let dtree = DataTree::parse_file(
        &ctx,
        "./assets/data/turing-machine.startup",
        DataFormat::XML,
        DataParserFlags::CONFIG,
    )?;

    // Children of a single transition.
    let path = "/turing-machine:turing-machine/transition-function\
                /delta[label='left summand']/*";
    println!("Nodes matching {}:", path);
    for dnode in dtree.find(path)? {
        println!(
            "  {} (schema: {})",
            dnode.path(),
            dnode.schema().path(SchemaPathFormat::DATA)
        );
    }

    // Subtree of the first transition, and its schema.
    let delta = dtree.reference().child().child().target()?;
    println!("First transition:");
    for dnode in delta.tree_dfs() {
        println!("  {}: {:?}", dnode.path(), dnode.value_canonical());
    }
    println!("Transition schema:");
    for snode in delta.schema().tree_dfs() {
        let path = snode.path(SchemaPathFormat::DATA);
        println!("  {} ({:?})", path, snode.kind());
    }

    Ok(())
}
