use yangtree::context::{Context, ContextFlags};
use yangtree::data::{Data, DataFormat, DataParserFlags, DataTree};

static SEARCH_DIR: &str = "./assets/yang/";

fn main() -> yangtree::Result<()> {
    // Initialize context.
    let mut ctx = Context::new(ContextFlags::DISABLE_SEARCHDIR_CWD)
        .expect("Failed to create context");
    ctx.set_searchdir(SEARCH_DIR)
        .expect("Failed to set YANG search directory");

    // Load YANG modules.
    for module_name in &["ietf-interfaces", "iana-if-type"] {
        ctx.load_module(module_name, None, &[])
            .expect("Failed to load module");
    }

    // Parse data tree in the JSON format.
    let dtree = DataTree::parse_file(
        &ctx,
        "./assets/data/interfaces.json",
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    )?;

    // Iterate over all nodes of the data tree.
    println!("Iterating over all data nodes...");
    for dnode in dtree.traverse() {
        println!("  {}: {:?}", dnode.path(), dnode.value());
    }

    // Iterate over all interfaces present in the data tree.
    println!("Iterating over interfaces only...");
    for dnode in dtree.find("/ietf-interfaces:interfaces/interface")? {
        let enabled = dnode
            .children()
            .find(|child| child.schema().name() == "enabled");
        println!(
            "  {} (enabled: {})",
            dnode.path(),
            enabled
                .and_then(|dnode| dnode.value_canonical())
                .unwrap_or_else(|| "default".to_owned())
        );
    }

    Ok(())
}
