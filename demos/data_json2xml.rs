use yangtree::context::{Context, ContextFlags};
use yangtree::data::{
    Data, DataFormat, DataParserFlags, DataPrinterFlags, DataTree,
};

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

    // Print data tree in the XML format.
    let output = dtree
        .print_string(DataFormat::XML, DataPrinterFlags::WITH_SIBLINGS)?;
    print!("{}", output);

    Ok(())
}
