use yangtree::context::{Context, ContextFlags};
use yangtree::schema::{
    DataValueType, SchemaInputFormat, SchemaNodeKind, SchemaOutputFormat,
    SchemaPathFormat, SchemaPrinterFlags,
};
use yangtree::ErrorKind;

static SEARCH_DIR: &str = "./assets/yang/";

fn create_context() -> Context {
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

    ctx
}

fn create_context_network(features: &[&str]) -> Context {
    let mut ctx = Context::new(ContextFlags::DISABLE_SEARCHDIR_CWD)
        .expect("Failed to create context");
    ctx.set_searchdir(SEARCH_DIR)
        .expect("Failed to set YANG search directory");
    ctx.load_module("example-network", None, features)
        .expect("Failed to load module");
    ctx
}

#[test]
fn schema_load_module() {
    let mut ctx = Context::new(ContextFlags::DISABLE_SEARCHDIR_CWD)
        .expect("Failed to create context");
    ctx.set_searchdir(SEARCH_DIR)
        .expect("Failed to set YANG search directory");

    // Check-then-load.
    assert!(ctx.get_module("turing-machine", None).is_none());
    let module = ctx
        .load_module("turing-machine", None, &[])
        .expect("Failed to load module");
    assert_eq!(module.name(), "turing-machine");
    assert_eq!(module.revision(), Some("2013-12-27"));
    assert_eq!(module.namespace(), "http://example.net/turing-machine");
    assert_eq!(module.prefix(), "tm");
    assert!(module.is_implemented());
    assert!(module.filepath().unwrap().ends_with("turing-machine.yang"));

    let module = ctx
        .get_module("turing-machine", Some("2013-12-27"))
        .expect("Failed to find module");
    assert_eq!(module.name(), "turing-machine");
    assert!(ctx.get_module("turing-machine", Some("2000-01-01")).is_none());
}

#[test]
fn schema_load_module_idempotent() {
    let mut ctx = create_context();
    let module_set_id = ctx.get_module_set_id();

    let module = ctx
        .load_module("ietf-interfaces", None, &[])
        .expect("Failed to load module");
    assert_eq!(module.name(), "ietf-interfaces");
    assert_eq!(module.revision(), Some("2018-02-20"));
    assert_eq!(ctx.get_module_set_id(), module_set_id);
    assert_eq!(ctx.modules().count(), 2);

    let module = ctx
        .load_module("ietf-interfaces", Some("2018-02-20"), &[])
        .expect("Failed to load module");
    assert_eq!(module.name(), "ietf-interfaces");
    assert_eq!(ctx.get_module_set_id(), module_set_id);
}

#[test]
fn schema_load_module_errors() {
    let mut ctx = create_context();

    let error = ctx
        .load_module("ietf-routing", None, &[])
        .expect_err("Loaded missing module");
    assert_eq!(error.kind(), ErrorKind::NotFound);

    // A different revision of a present module.
    let error = ctx
        .load_module("ietf-interfaces", Some("2014-05-08"), &[])
        .expect_err("Loaded conflicting revision");
    assert_eq!(error.kind(), ErrorKind::Schema);

    let error = ctx
        .parse_module_string(
            "module broken { namespace \"urn:broken\"; prefix b; container c {",
            SchemaInputFormat::YANG,
            &[],
        )
        .expect_err("Parsed malformed module");
    assert_eq!(error.kind(), ErrorKind::Schema);

    let error = ctx
        .parse_module_string(
            "module broken {
               namespace \"urn:broken\";
               prefix b;
               container c {
                 uses missing-grouping;
               }
             }",
            SchemaInputFormat::YANG,
            &[],
        )
        .expect_err("Parsed module with unknown grouping");
    assert_eq!(error.kind(), ErrorKind::Schema);

    // Failed loads leave the context untouched.
    assert!(ctx.get_module("broken", None).is_none());
    assert_eq!(ctx.modules().count(), 2);
}

#[test]
fn schema_imports() {
    let mut ctx = Context::new(ContextFlags::DISABLE_SEARCHDIR_CWD)
        .expect("Failed to create context");
    ctx.set_searchdir(SEARCH_DIR)
        .expect("Failed to set YANG search directory");
    ctx.load_module("iana-if-type", None, &[])
        .expect("Failed to load module");

    let module = ctx
        .get_module("ietf-interfaces", None)
        .expect("Failed to find imported module");
    assert!(!module.is_implemented());
    assert!(module.data().next().is_none());

    ctx.load_module("ietf-interfaces", None, &[])
        .expect("Failed to load module");
    let module = ctx
        .get_module_implemented("ietf-interfaces")
        .expect("Failed to find implemented module");
    assert_eq!(
        module.data().map(|snode| snode.name()).collect::<Vec<_>>(),
        vec!["interfaces"]
    );
}

#[test]
fn schema_features() {
    let ctx = create_context_network(&["routing"]);
    let module = ctx
        .get_module("example-network", None)
        .expect("Failed to find module");

    assert_eq!(module.feature_value("routing"), Ok(true));
    assert_eq!(module.feature_value("multicast"), Ok(false));
    assert_eq!(
        module.feature_value("mpls").map_err(|error| error.kind()),
        Err(ErrorKind::NotFound)
    );
    assert!(ctx.find_path("/example-network:system/routing").is_ok());
    assert_eq!(
        ctx.find_path("/example-network:system/multicast")
            .map_err(|error| error.kind()),
        Err(ErrorKind::Schema)
    );

    let ctx = create_context_network(&["*"]);
    assert!(ctx.find_path("/example-network:system/multicast").is_ok());
}

#[test]
fn schema_find() {
    let ctx = create_context();

    assert_eq!(
        ctx.find_xpath("/ietf-interfaces:interfaces/*")
            .expect("Failed to lookup schema data")
            .map(|snode| snode.path(SchemaPathFormat::DATA))
            .collect::<Vec<String>>(),
        vec!["/ietf-interfaces:interfaces/interface"]
    );

    assert_eq!(
        ctx.find_xpath("/ietf-interfaces:interfaces/interface/*")
            .expect("Failed to lookup schema data")
            .map(|snode| snode.path(SchemaPathFormat::DATA))
            .collect::<Vec<String>>(),
        vec![
            "/ietf-interfaces:interfaces/interface/name",
            "/ietf-interfaces:interfaces/interface/description",
            "/ietf-interfaces:interfaces/interface/type",
            "/ietf-interfaces:interfaces/interface/enabled",
            "/ietf-interfaces:interfaces/interface/oper-status",
            "/ietf-interfaces:interfaces/interface/phys-address",
            "/ietf-interfaces:interfaces/interface/higher-layer-if",
            "/ietf-interfaces:interfaces/interface/lower-layer-if",
            "/ietf-interfaces:interfaces/interface/speed",
            "/ietf-interfaces:interfaces/interface/statistics",
        ]
    );

    // Predicates are checked but don't filter schema nodes.
    assert_eq!(
        ctx.find_xpath(
            "/ietf-interfaces:interfaces/interface[name='eth0']/type"
        )
        .expect("Failed to lookup schema data")
        .count(),
        1
    );
    assert_eq!(
        ctx.find_xpath("/ietf-interfaces:interfaces/interface[mtu='1500']")
            .map(|set| set.count())
            .map_err(|error| error.kind()),
        Err(ErrorKind::Schema)
    );
}

#[test]
fn schema_find_single() {
    let ctx = create_context();

    assert!(ctx
        .find_path("/ietf-interfaces:interfaces/interface/*")
        .is_err());
    assert!(ctx.find_path("/ietf-interfaces:interfaces/interface").is_ok());
}

#[test]
fn schema_find_errors() {
    let ctx = create_context();

    assert_eq!(
        ctx.find_path("/ietf-routing:routing")
            .map_err(|error| error.kind()),
        Err(ErrorKind::Schema)
    );
    assert_eq!(
        ctx.find_path("/ietf-interfaces:interfaces/bogus")
            .map_err(|error| error.kind()),
        Err(ErrorKind::Schema)
    );
    assert_eq!(
        ctx.find_path("ietf-interfaces:interfaces")
            .map_err(|error| error.kind()),
        Err(ErrorKind::Syntax)
    );
    assert_eq!(
        ctx.find_path("/ietf-interfaces:interfaces/interface[name='eth0'")
            .map_err(|error| error.kind()),
        Err(ErrorKind::Syntax)
    );
}

#[test]
fn schema_iterator_traverse() {
    let ctx = create_context();
    let snode_top = ctx.traverse().next().unwrap();

    assert_eq!(
        snode_top
            .traverse()
            .map(|snode| snode.path(SchemaPathFormat::DATA))
            .collect::<Vec<String>>(),
        vec![
            "/ietf-interfaces:interfaces",
            "/ietf-interfaces:interfaces/interface",
            "/ietf-interfaces:interfaces/interface/name",
            "/ietf-interfaces:interfaces/interface/description",
            "/ietf-interfaces:interfaces/interface/type",
            "/ietf-interfaces:interfaces/interface/enabled",
            "/ietf-interfaces:interfaces/interface/oper-status",
            "/ietf-interfaces:interfaces/interface/phys-address",
            "/ietf-interfaces:interfaces/interface/higher-layer-if",
            "/ietf-interfaces:interfaces/interface/lower-layer-if",
            "/ietf-interfaces:interfaces/interface/speed",
            "/ietf-interfaces:interfaces/interface/statistics",
            "/ietf-interfaces:interfaces/interface/statistics/discontinuity-time",
            "/ietf-interfaces:interfaces/interface/statistics/in-octets",
            "/ietf-interfaces:interfaces/interface/statistics/out-octets",
        ]
    );
}

#[test]
fn schema_tree_dfs() {
    let mut ctx = create_context();
    ctx.load_module("turing-machine", None, &[])
        .expect("Failed to load module");
    let snode = ctx
        .find_path("/turing-machine:turing-machine")
        .expect("Failed to lookup schema node");

    let nodes = snode.tree_dfs();
    assert_eq!(nodes[0], snode);
    assert_eq!(
        nodes
            .iter()
            .map(|snode| (snode.name(), snode.kind()))
            .collect::<Vec<_>>(),
        vec![
            ("turing-machine", SchemaNodeKind::Container),
            ("state", SchemaNodeKind::Leaf),
            ("head-position", SchemaNodeKind::Leaf),
            ("tape", SchemaNodeKind::Container),
            ("cell", SchemaNodeKind::List),
            ("coord", SchemaNodeKind::Leaf),
            ("symbol", SchemaNodeKind::Leaf),
            ("transition-function", SchemaNodeKind::Container),
            ("delta", SchemaNodeKind::List),
            ("label", SchemaNodeKind::Leaf),
            ("input", SchemaNodeKind::Container),
            ("state", SchemaNodeKind::Leaf),
            ("symbol", SchemaNodeKind::Leaf),
            ("output", SchemaNodeKind::Container),
            ("state", SchemaNodeKind::Leaf),
            ("symbol", SchemaNodeKind::Leaf),
            ("head-move", SchemaNodeKind::Leaf),
        ]
    );

    // Every node is visited once and precedes its whole subtree.
    for (index, snode) in nodes.iter().enumerate() {
        for ancestor in snode.ancestors() {
            let position = nodes
                .iter()
                .position(|other| *other == ancestor)
                .expect("Ancestor not visited");
            assert!(position < index);
        }
    }

    // Terminal nodes have no children.
    let leaf = ctx
        .find_path("/turing-machine:turing-machine/state")
        .expect("Failed to lookup schema node");
    assert!(leaf.child().is_none());
    assert_eq!(leaf.tree_dfs(), vec![leaf.clone()]);
}

#[test]
fn schema_iterator_ancestors() {
    let ctx = create_context();

    assert_eq!(
        ctx.find_path(
            "/ietf-interfaces:interfaces/interface/statistics/discontinuity-time"
        )
        .expect("Failed to lookup schema data")
        .ancestors()
        .map(|snode| snode.path(SchemaPathFormat::DATA))
        .collect::<Vec<String>>(),
        vec![
            "/ietf-interfaces:interfaces/interface/statistics",
            "/ietf-interfaces:interfaces/interface",
            "/ietf-interfaces:interfaces",
        ]
    );
}

#[test]
fn schema_iterator_siblings() {
    let ctx = create_context();

    assert_eq!(
        ctx.find_path("/ietf-interfaces:interfaces/interface/name")
            .expect("Failed to lookup schema data")
            .siblings()
            .map(|snode| snode.path(SchemaPathFormat::DATA))
            .collect::<Vec<String>>(),
        vec![
            "/ietf-interfaces:interfaces/interface/description",
            "/ietf-interfaces:interfaces/interface/type",
            "/ietf-interfaces:interfaces/interface/enabled",
            "/ietf-interfaces:interfaces/interface/oper-status",
            "/ietf-interfaces:interfaces/interface/phys-address",
            "/ietf-interfaces:interfaces/interface/higher-layer-if",
            "/ietf-interfaces:interfaces/interface/lower-layer-if",
            "/ietf-interfaces:interfaces/interface/speed",
            "/ietf-interfaces:interfaces/interface/statistics",
        ]
    );
}

#[test]
fn schema_iterator_children() {
    let ctx = create_context();

    assert_eq!(
        ctx.find_path("/ietf-interfaces:interfaces/interface/statistics")
            .expect("Failed to lookup schema data")
            .children()
            .map(|snode| snode.path(SchemaPathFormat::DATA))
            .collect::<Vec<String>>(),
        vec![
            "/ietf-interfaces:interfaces/interface/statistics/discontinuity-time",
            "/ietf-interfaces:interfaces/interface/statistics/in-octets",
            "/ietf-interfaces:interfaces/interface/statistics/out-octets",
        ]
    );
}

#[test]
fn schema_node_attributes() {
    let ctx = create_context();

    let snode = ctx
        .find_path("/ietf-interfaces:interfaces/interface/enabled")
        .expect("Failed to lookup schema node");
    assert_eq!(snode.name(), "enabled");
    assert_eq!(snode.kind(), SchemaNodeKind::Leaf);
    assert!(snode.description().is_some());
    assert!(snode.reference().is_some());
    assert!(snode.is_config());
    assert!(!snode.is_mandatory());
    assert_eq!(snode.default_value_canonical(), Some("true"));
    let ltype = snode.leaf_type().expect("Missing leaf type");
    assert_eq!(ltype.base_type(), DataValueType::Bool);
    assert!(snode.units().is_none());
    assert!(snode.musts().next().is_none());
    assert!(snode.whens().next().is_none());

    let snode = ctx
        .find_path("/ietf-interfaces:interfaces/interface")
        .expect("Failed to lookup schema node");
    assert_eq!(snode.name(), "interface");
    assert_eq!(snode.kind(), SchemaNodeKind::List);
    assert!(snode.description().is_some());
    assert!(snode.reference().is_none());
    assert!(snode.is_config());
    assert!(!snode.is_mandatory());
    assert!(!snode.is_keyless_list());
    assert!(!snode.is_user_ordered());
    assert_eq!(snode.min_elements(), None);
    assert_eq!(snode.max_elements(), None);
    assert!(snode.actions().next().is_none());
    assert!(snode.notifications().next().is_none());
    assert_eq!(
        snode.list_keys().map(|key| key.name()).collect::<Vec<_>>(),
        vec!["name"]
    );

    let snode = ctx
        .find_path("/ietf-interfaces:interfaces/interface/oper-status")
        .expect("Failed to lookup schema node");
    assert!(snode.is_state());
    assert!(snode.is_mandatory());
    let ltype = snode.leaf_type().expect("Missing leaf type");
    assert_eq!(ltype.base_type(), DataValueType::Enum);
    assert_eq!(ltype.enums().next(), Some(("up", 1)));

    let snode = ctx
        .find_path("/ietf-interfaces:interfaces/interface/speed")
        .expect("Failed to lookup schema node");
    assert_eq!(snode.units(), Some("bits/second"));

    let snode = ctx
        .find_path("/ietf-interfaces:interfaces/interface/higher-layer-if")
        .expect("Failed to lookup schema node");
    let ltype = snode.leaf_type().expect("Missing leaf type");
    assert_eq!(ltype.base_type(), DataValueType::LeafRef);
    assert_eq!(ltype.typedef_name().as_deref(), Some("interface-ref"));
    assert_eq!(
        ltype.leafref_real_type().map(|real| real.base_type()),
        Some(DataValueType::String)
    );
}

#[test]
fn schema_choice_and_augment() {
    let ctx = create_context_network(&[]);

    let snode = ctx
        .find_path("/example-network:system/tcp-port")
        .expect("Failed to lookup schema node");
    assert_eq!(
        snode.path(SchemaPathFormat::LOG),
        "/example-network:system/transport/tcp/tcp-port"
    );
    assert_eq!(
        snode.path(SchemaPathFormat::DATA),
        "/example-network:system/tcp-port"
    );

    let choice = ctx
        .find_path("/example-network:system/unix-socket")
        .expect("Failed to lookup schema node")
        .ancestors()
        .find(|snode| snode.kind() == SchemaNodeKind::Choice)
        .expect("Missing choice");
    assert_eq!(choice.name(), "transport");
    assert!(choice.is_schema_only());
    assert_eq!(choice.default_case().map(|case| case.name()), Some("udp"));
    assert_eq!(
        choice.children().map(|case| case.name()).collect::<Vec<_>>(),
        vec!["tcp", "udp", "unix-socket"]
    );

    // Refined default from a grouping.
    let snode = ctx
        .find_path("/example-network:system/syslog/port")
        .expect("Failed to lookup schema node");
    assert_eq!(snode.default_value_canonical(), Some("514"));

    // Nodes augmented into an imported module.
    let snode = ctx
        .find_path("/ietf-interfaces:interfaces/interface/example-network:mtu")
        .expect("Failed to lookup schema node");
    assert_eq!(snode.module().name(), "example-network");
    assert!(ctx
        .get_module("ietf-interfaces", None)
        .expect("Failed to find module")
        .is_implemented());
    let snode = ctx
        .find_path("/ietf-interfaces:interfaces/interface/example-network:ipv4")
        .expect("Failed to lookup schema node");
    assert!(!snode.is_np_container());

    // Operations.
    let snode = ctx
        .find_path("/example-network:system/user/reset-password")
        .expect("Failed to lookup schema node");
    assert_eq!(snode.kind(), SchemaNodeKind::Action);
    let input = snode.input().expect("Missing input");
    assert_eq!(
        input.children().map(|snode| snode.name()).collect::<Vec<_>>(),
        vec!["password"]
    );
    let module = ctx
        .get_module("example-network", None)
        .expect("Failed to find module");
    assert_eq!(
        module.rpcs().map(|snode| snode.name()).collect::<Vec<_>>(),
        vec!["reboot"]
    );
    assert_eq!(
        module
            .notifications()
            .map(|snode| snode.name())
            .collect::<Vec<_>>(),
        vec!["config-changed"]
    );
}

#[test]
fn schema_print_tree() {
    let mut ctx = create_context();
    ctx.load_module("turing-machine", None, &[])
        .expect("Failed to load module");
    let module = ctx
        .get_module("turing-machine", None)
        .expect("Failed to find module");

    let output = module
        .print_string(SchemaOutputFormat::TREE, SchemaPrinterFlags::empty())
        .expect("Failed to print module");
    let expected = "\
module: turing-machine
  +--rw turing-machine
     +--ro state           state-index
     +--ro head-position   cell-index
     +--ro tape
     |  +--ro cell* [coord]
     |     +--ro coord     cell-index
     |     +--ro symbol?   tape-symbol
     +--rw transition-function
        +--rw delta* [label]
           +--rw label   string
           +--rw input
           |  +--rw state    state-index
           |  +--rw symbol   tape-symbol
           +--rw output
              +--rw state?       state-index
              +--rw symbol?      tape-symbol
              +--rw head-move?   head-dir

  rpcs:
    +---x initialize
    |  +---w input
    |     +---w tape-content?   string
    +---x run

  notifications:
    +---n halted
       +--ro state   state-index
";
    assert_eq!(output, expected);
}

#[test]
fn schema_print_yang() {
    let mut ctx = create_context();
    ctx.load_module("turing-machine", None, &[])
        .expect("Failed to load module");
    let module = ctx
        .get_module("turing-machine", None)
        .expect("Failed to find module");

    let output = module
        .print_string(SchemaOutputFormat::YANG, SchemaPrinterFlags::NO_SUBSTMT)
        .expect("Failed to print module");
    let expected = "\
module turing-machine {
  namespace \"http://example.net/turing-machine\";
  prefix tm;
  revision 2013-12-27;
  container turing-machine;
  rpc initialize;
  rpc run;
  notification halted;
}
";
    assert_eq!(output, expected);

    let output = module
        .print_string(SchemaOutputFormat::YANG, SchemaPrinterFlags::empty())
        .expect("Failed to print module");
    assert!(output.contains("    leaf state {\n      type state-index;\n"));
    assert!(output.contains("key \"label\";"));
    assert!(output.contains("config false;"));
}
