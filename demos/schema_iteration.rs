use yangtree::context::{Context, ContextFlags};
use yangtree::schema::{
    SchemaOutputFormat, SchemaPathFormat, SchemaPrinterFlags,
};

static SEARCH_DIR: &str = "./assets/yang/";
static MODULE_NAME: &str = "turing-machine";

fn main() -> yangtree::Result<()> {
    // Initialize context.
    let mut ctx = Context::new(ContextFlags::DISABLE_SEARCHDIR_CWD)
        .expect("Failed to create context");
    ctx.set_searchdir(SEARCH_DIR)
        .expect("Failed to set YANG search directory");

    // Load test module.
    ctx.load_module(MODULE_NAME, None, &[])?;
    let module = ctx
        .get_module(MODULE_NAME, None)
        .expect("Failed to find module");

    // Iterate over all schema nodes that belong to the test module and print
    // their full paths.
    println!("Data (DFS iteration):");
    for snode in ctx
        .traverse()
        .filter(|snode| snode.module().name() == MODULE_NAME)
    {
        println!("  {}", snode.path(SchemaPathFormat::DATA));
    }

    println!("RPCs:");
    for snode in module.rpcs() {
        println!("  {}", snode.path(SchemaPathFormat::DATA));
    }

    println!("Notifications:");
    for snode in module.notifications() {
        println!("  {}", snode.path(SchemaPathFormat::DATA));
    }

    // Tree diagram of the module.
    let tree = module
        .print_string(SchemaOutputFormat::TREE, SchemaPrinterFlags::empty())?;
    print!("{}", tree);

    Ok(())
}
