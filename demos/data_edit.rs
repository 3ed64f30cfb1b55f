use yangtree::context::{Context, ContextFlags};
use yangtree::data::{
    Data, DataFormat, DataParserFlags, DataPrinterFlags, DataTree,
    DataValidationFlags,
};

static SEARCH_DIR: &str = "./assets/yang/";

enum Operation {
    MODIFY(&'static str, Option<&'static str>),
    DELETE(&'static str),
}

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

    // Parse data tree from JSON file.
    let mut dtree = DataTree::parse_file(
        &ctx,
        "./assets/data/interfaces.json",
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    )?;

    // Modify data tree.
    let changes = [
        Operation::DELETE(
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']",
        ),
        Operation::MODIFY(
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']/description",
            Some("HR"),
        ),
        Operation::MODIFY(
            "/ietf-interfaces:interfaces/interface[name='eth/0/2']/description",
            Some("MGMT"),
        ),
        Operation::MODIFY(
            "/ietf-interfaces:interfaces/interface[name='eth/0/2']/type",
            Some("iana-if-type:ethernetCsmacd"),
        ),
        Operation::MODIFY(
            "/ietf-interfaces:interfaces/interface[name='eth/0/2']/enabled",
            Some("true"),
        ),
    ];
    for change in &changes {
        match change {
            Operation::MODIFY(xpath, value) => {
                dtree.new_path(xpath, *value, false)?;
            }
            Operation::DELETE(xpath) => dtree.remove(xpath)?,
        };
    }

    // The edited tree must still be valid configuration.
    dtree.validate(DataValidationFlags::NO_STATE)?;

    // Print the modified data tree.
    let output = dtree
        .print_string(DataFormat::JSON, DataPrinterFlags::WITH_SIBLINGS)?;
    print!("{}", output);

    Ok(())
}
