use yangtree::context::{Context, ContextFlags};
use yangtree::data::{
    Data, DataFormat, DataParserFlags, DataPrinterFlags, DataTree,
    DataValidationFlags,
};
use yangtree::schema::{DataValue, SchemaNodeKind};
use yangtree::{ErrorKind, NodeNavigation};

static SEARCH_DIR: &str = "./assets/yang/";
static JSON_TREE1: &str = r###"
    {
        "ietf-interfaces:interfaces":{
            "interface": [
                {
                    "name": "eth/0/0",
                    "description": "ENG",
                    "type": "iana-if-type:ethernetCsmacd",
                    "enabled": true
                },
                {
                    "name": "eth/0/1",
                    "description": "MKT",
                    "type": "iana-if-type:ethernetCsmacd",
                    "enabled": true
                }
            ]
        }
    }"###;
static JSON_TREE2: &str = r###"
    {
        "ietf-interfaces:interfaces":{
            "interface": [
                {
                    "name": "eth/0/0",
                    "description": "ENG",
                    "type": "iana-if-type:ethernetCsmacd",
                    "enabled": false
                },
                {
                    "name": "eth/0/2",
                    "description": "MGMT",
                    "type": "iana-if-type:ethernetCsmacd",
                    "enabled": true
                }
            ]
        }
    }"###;
static XML_TREE1: &str = r###"
    <interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces">
      <interface>
        <description>ENG</description>
        <name>eth/0/0</name>
        <type xmlns:ianaift="urn:ietf:params:xml:ns:yang:iana-if-type">ianaift:ethernetCsmacd</type>
        <enabled>true</enabled>
      </interface>
      <interface>
        <name>eth/0/1</name>
        <description>MKT</description>
        <type xmlns:ianaift="urn:ietf:params:xml:ns:yang:iana-if-type">ianaift:ethernetCsmacd</type>
        <enabled>true</enabled>
      </interface>
    </interfaces>"###;
static JSON_STATE: &str = r###"
    {
        "ietf-interfaces:interfaces":{
            "interface": [
                {
                    "name": "eth/0/0",
                    "type": "iana-if-type:ethernetCsmacd",
                    "oper-status": "up",
                    "speed": "1000000000",
                    "higher-layer-if": ["eth/0/0"],
                    "statistics": {
                        "discontinuity-time": "2024-01-10T00:00:00Z",
                        "in-octets": "1024"
                    }
                }
            ]
        }
    }"###;

macro_rules! assert_data_eq {
    ($dtree1:expr, $dtree2:expr) => {
        let json1 = $dtree1
            .print_string(DataFormat::JSON, DataPrinterFlags::WITH_SIBLINGS)
            .expect("Failed to print data");
        let json2 = $dtree2
            .print_string(DataFormat::JSON, DataPrinterFlags::WITH_SIBLINGS)
            .expect("Failed to print data");

        assert_eq!(json1, json2);
    };
}

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

fn create_context_network() -> Context {
    let mut ctx = Context::new(ContextFlags::DISABLE_SEARCHDIR_CWD)
        .expect("Failed to create context");
    ctx.set_searchdir(SEARCH_DIR)
        .expect("Failed to set YANG search directory");
    ctx.load_module("example-network", None, &["routing"])
        .expect("Failed to load module");
    ctx
}

fn parse_json_data<'a>(ctx: &'a Context, string: &str) -> DataTree<'a> {
    DataTree::parse_string(
        ctx,
        string,
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    )
    .expect("Failed to parse data tree")
}

fn parse_error(
    ctx: &Context,
    string: &str,
    format: DataFormat,
    options: DataParserFlags,
) -> yangtree::Error {
    DataTree::parse_string(ctx, string, format, options)
        .expect_err("Data parsing should have failed")
}

#[test]
fn data_parse_xml() {
    let ctx = create_context();
    let dtree_json = parse_json_data(&ctx, JSON_TREE1);
    let dtree_xml = DataTree::parse_string(
        &ctx,
        XML_TREE1,
        DataFormat::XML,
        DataParserFlags::CONFIG,
    )
    .expect("Failed to parse data tree");

    // List keys are moved in front of the other children.
    assert_data_eq!(&dtree_json, &dtree_xml);
    assert_eq!(
        dtree_xml
            .find_single(
                "/ietf-interfaces:interfaces/interface[name='eth/0/0']/type"
            )
            .expect("Failed to lookup data")
            .value_canonical()
            .as_deref(),
        Some("iana-if-type:ethernetCsmacd")
    );
}

#[test]
fn data_parse_state() {
    let ctx = create_context();

    // Complete operational data.
    let dtree = DataTree::parse_string(
        &ctx,
        JSON_STATE,
        DataFormat::JSON,
        DataParserFlags::DATA,
    )
    .expect("Failed to parse data tree");
    let dnode = dtree
        .find_single(
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/speed",
        )
        .expect("Failed to lookup data");
    assert_eq!(dnode.value(), Some(DataValue::Uint64(1000000000)));
    assert_eq!(dnode.schema().units(), Some("bits/second"));

    // Operational data can't be parsed as configuration.
    let error = parse_error(
        &ctx,
        JSON_STATE,
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    );
    assert_eq!(error.kind(), ErrorKind::Validation);

    // Get replies may be incomplete.
    let reply = r###"
        {
            "ietf-interfaces:interfaces":{
                "interface": [
                    {
                        "name": "eth/0/0",
                        "oper-status": "down"
                    }
                ]
            }
        }"###;
    assert!(DataTree::parse_string(
        &ctx,
        reply,
        DataFormat::JSON,
        DataParserFlags::GET
    )
    .is_ok());
    assert_eq!(
        parse_error(&ctx, reply, DataFormat::JSON, DataParserFlags::GET_CONFIG)
            .kind(),
        ErrorKind::Validation
    );
}

#[test]
fn data_parse_options() {
    let ctx = create_context();

    // Exactly one parsing mode is required.
    for options in [
        DataParserFlags::empty(),
        DataParserFlags::STRICT,
        DataParserFlags::DATA | DataParserFlags::CONFIG,
        DataParserFlags::from_bits_retain(0x4000_0000) | DataParserFlags::DATA,
    ] {
        let error = parse_error(&ctx, JSON_TREE1, DataFormat::JSON, options);
        assert_eq!(error.kind(), ErrorKind::Config);
    }

    // Missing file.
    let error = DataTree::parse_file(
        &ctx,
        "./assets/data/missing.json",
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    )
    .expect_err("Data parsing should have failed");
    assert_eq!(error.kind(), ErrorKind::Io);

    // Trusted data skips validation.
    let dtree = DataTree::parse_string(
        &ctx,
        JSON_STATE,
        DataFormat::JSON,
        DataParserFlags::CONFIG | DataParserFlags::TRUSTED,
    );
    assert_eq!(dtree.map_err(|e| e.kind()).err(), Some(ErrorKind::Validation));
    let dtree = DataTree::parse_string(
        &ctx,
        r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"eth/0/0"}]}}"#,
        DataFormat::JSON,
        DataParserFlags::CONFIG | DataParserFlags::TRUSTED,
    );
    assert!(dtree.is_ok());
}

#[test]
fn data_parse_format_errors() {
    let ctx = create_context();

    for (format, data) in [
        (DataFormat::JSON, r#"{"ietf-interfaces:interfaces": {"#),
        (DataFormat::JSON, r#"["ietf-interfaces:interfaces"]"#),
        (DataFormat::JSON, r#"{"interfaces": {}}"#),
        // Repeated members.
        (
            DataFormat::JSON,
            r#"{"ietf-interfaces:interfaces": {}, "ietf-interfaces:interfaces": {}}"#,
        ),
        (
            DataFormat::JSON,
            r#"{"ietf-interfaces:interfaces": {
                "interface": [{"name": "eth/0/0"}],
                "interface": [{"name": "eth/0/1"}]
            }}"#,
        ),
        (
            DataFormat::XML,
            r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces">"#,
        ),
        (
            DataFormat::XML,
            r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces"></interface>"#,
        ),
    ] {
        let error = parse_error(&ctx, data, format, DataParserFlags::CONFIG);
        assert_eq!(error.kind(), ErrorKind::Format, "{}", data);
    }
}

#[test]
fn data_parse_validation_errors() {
    let ctx = create_context();

    // Unknown nodes are skipped unless parsing is strict.
    let unknown = r###"
        {
            "ietf-interfaces:interfaces":{
                "interface": [
                    {
                        "name": "eth/0/0",
                        "type": "iana-if-type:ethernetCsmacd",
                        "mtu": 1500
                    }
                ]
            },
            "unknown-module:config": {}
        }"###;
    let dtree = parse_json_data(&ctx, unknown);
    assert_eq!(dtree.traverse().count(), 4);
    let error = parse_error(
        &ctx,
        unknown,
        DataFormat::JSON,
        DataParserFlags::CONFIG | DataParserFlags::STRICT,
    );
    assert_eq!(error.kind(), ErrorKind::Validation);

    // Missing list key.
    let error = parse_error(
        &ctx,
        r#"{"ietf-interfaces:interfaces":{"interface":[{"description":"ENG"}]}}"#,
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    );
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(
        error.path.as_deref(),
        Some("/ietf-interfaces:interfaces/interface[name='']")
    );

    // Invalid value.
    let error = parse_error(
        &ctx,
        r###"
        {
            "ietf-interfaces:interfaces":{
                "interface": [
                    {
                        "name": "eth/0/0",
                        "type": "iana-if-type:ethernetCsmacd",
                        "enabled": "yes"
                    }
                ]
            }
        }"###,
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    );
    assert_eq!(error.kind(), ErrorKind::Validation);

    // Duplicate list instance.
    let error = parse_error(
        &ctx,
        r###"
        {
            "ietf-interfaces:interfaces":{
                "interface": [
                    {
                        "name": "eth/0/0",
                        "type": "iana-if-type:ethernetCsmacd"
                    },
                    {
                        "name": "eth/0/0",
                        "type": "iana-if-type:softwareLoopback"
                    }
                ]
            }
        }"###,
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    );
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(
        error.path.as_deref(),
        Some("/ietf-interfaces:interfaces/interface[name='eth/0/0']")
    );

    // Mandatory leaf.
    let error = parse_error(
        &ctx,
        r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"eth/0/0"}]}}"#,
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    );
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(
        error.path.as_deref(),
        Some("/ietf-interfaces:interfaces/interface[name='eth/0/0']/type")
    );

    // Leafref without target instance.
    let error = parse_error(
        &ctx,
        &JSON_STATE.replace(r#"["eth/0/0"]"#, r#"["eth/0/9"]"#),
        DataFormat::JSON,
        DataParserFlags::DATA,
    );
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(error.apptag.as_deref(), Some("instance-required"));

    // Elements nested in a leaf are rejected even when parsing isn't strict.
    let error = parse_error(
        &ctx,
        r#"<interfaces xmlns="urn:ietf:params:xml:ns:yang:ietf-interfaces">
             <interface>
               <name>eth/0/0</name>
               <description>a<bogus/>b</description>
               <type xmlns:ianaift="urn:ietf:params:xml:ns:yang:iana-if-type">ianaift:ethernetCsmacd</type>
             </interface>
           </interfaces>"#,
        DataFormat::XML,
        DataParserFlags::CONFIG,
    );
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(
        error.path.as_deref(),
        Some(
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/description"
        )
    );
}

#[test]
fn data_parse_non_implemented() {
    let mut ctx = Context::new(ContextFlags::DISABLE_SEARCHDIR_CWD)
        .expect("Failed to create context");
    ctx.set_searchdir(SEARCH_DIR)
        .expect("Failed to set YANG search directory");
    ctx.load_module("iana-if-type", None, &[])
        .expect("Failed to load module");

    // ietf-interfaces is only imported.
    let error = parse_error(
        &ctx,
        XML_TREE1,
        DataFormat::XML,
        DataParserFlags::CONFIG,
    );
    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[test]
fn data_parse_network() {
    let ctx = create_context_network();

    let dtree = DataTree::parse_string(
        &ctx,
        r###"
        {
            "example-network:system": {
                "hostname": "rt1",
                "tcp-port": 601,
                "dns-server": ["192.0.2.1", "192.0.2.2"],
                "user": [
                    {"name": "admin", "uid": 1000, "groups": ["wheel"]},
                    {"name": "guest", "uid": 1001}
                ],
                "routing": {
                    "route": [
                        {
                            "prefix": "0.0.0.0/0",
                            "protocol": "static",
                            "metric": "10",
                            "weight": "1.5"
                        }
                    ]
                }
            }
        }"###,
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    )
    .expect("Failed to parse data tree");

    let route =
        "/example-network:system/routing/route[prefix='0.0.0.0/0']";
    let dnode = dtree
        .find_single(&format!("{}/weight", route))
        .expect("Failed to lookup data");
    assert_eq!(dnode.value_canonical().as_deref(), Some("1.5"));
    let dnode = dtree
        .find_single(&format!("{}/metric", route))
        .expect("Failed to lookup data");
    assert_eq!(dnode.value(), Some(DataValue::Int64(10)));
    let dnode = dtree
        .find_single(&format!("{}/protocol", route))
        .expect("Failed to lookup data");
    assert_eq!(
        dnode.value_canonical().as_deref(),
        Some("example-network:static")
    );
    assert_eq!(
        dtree
            .find("/example-network:system/dns-server")
            .expect("Failed to lookup data")
            .map(|dnode| dnode.path())
            .collect::<Vec<String>>(),
        vec![
            "/example-network:system/dns-server[.='192.0.2.1']",
            "/example-network:system/dns-server[.='192.0.2.2']",
        ]
    );
}

#[test]
fn data_parse_network_errors() {
    let ctx = create_context_network();

    let cases = [
        // Mandatory hostname.
        (r#"{"example-network:system": {"tcp-port": 601}}"#, None),
        // Both cases of a choice.
        (
            r#"{"example-network:system": {"hostname": "rt1", "tcp-port": 601, "udp-port": 514}}"#,
            None,
        ),
        // Too many DNS servers.
        (
            r#"{"example-network:system": {"hostname": "rt1", "dns-server": ["a", "b", "c", "d"]}}"#,
            Some("too-many-elements"),
        ),
        // Non-unique user ID.
        (
            r#"{"example-network:system": {"hostname": "rt1", "user": [{"name": "a", "uid": 1}, {"name": "b", "uid": 1}]}}"#,
            Some("data-not-unique"),
        ),
        // Hostname length.
        (r#"{"example-network:system": {"hostname": ""}}"#, None),
        // Missing leafref target.
        (
            r#"{"example-network:system": {"hostname": "rt1", "routing": {"route": [{"prefix": "::/0", "interface": "eth0"}]}}}"#,
            Some("instance-required"),
        ),
        // Identity of another base.
        (
            r#"{"example-network:system": {"hostname": "rt1", "routing": {"route": [{"prefix": "::/0", "protocol": "example-network:protocol"}]}}}"#,
            None,
        ),
    ];
    for (data, apptag) in cases {
        let error =
            parse_error(&ctx, data, DataFormat::JSON, DataParserFlags::CONFIG);
        assert_eq!(error.kind(), ErrorKind::Validation, "{}", data);
        assert_eq!(error.apptag.as_deref(), apptag, "{}", data);
    }

    // Disabled features remove their nodes.
    let error = parse_error(
        &ctx,
        r#"{"example-network:system": {"hostname": "rt1", "multicast": {"enabled": true}}}"#,
        DataFormat::JSON,
        DataParserFlags::CONFIG | DataParserFlags::STRICT,
    );
    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[test]
fn data_metadata() {
    let ctx = create_context_network();
    let dtree = DataTree::parse_string(
        &ctx,
        r###"
        {
            "example-network:system": {
                "@": {"example-network:origin": "intended"},
                "hostname": "rt1",
                "@hostname": {"example-network:source": "dhcp"}
            }
        }"###,
        DataFormat::JSON,
        DataParserFlags::CONFIG,
    )
    .expect("Failed to parse data tree");

    let dnode = dtree
        .find_single("/example-network:system")
        .expect("Failed to lookup data");
    assert_eq!(
        dnode
            .meta()
            .map(|meta| (meta.name().to_owned(), meta.value().to_owned()))
            .collect::<Vec<_>>(),
        vec![("example-network:origin".to_owned(), "intended".to_owned())]
    );
    let dnode = dtree
        .find_single("/example-network:system/hostname[@source='dhcp']")
        .expect("Failed to lookup data");
    assert_eq!(dnode.value_canonical().as_deref(), Some("rt1"));

    let xml = dtree
        .print_string(DataFormat::XML, DataPrinterFlags::SHRINK)
        .expect("Failed to print data");
    assert_eq!(
        xml,
        "<system xmlns=\"urn:example:network\" \
         xmlns:exnet=\"urn:example:network\" exnet:origin=\"intended\">\
         <hostname xmlns:exnet=\"urn:example:network\" exnet:source=\"dhcp\">rt1</hostname>\
         </system>"
    );
}

#[test]
fn data_find() {
    let ctx = create_context();
    let dtree1 = parse_json_data(&ctx, JSON_TREE1);

    assert_eq!(
        dtree1
            .find("/ietf-interfaces:interfaces/interface")
            .expect("Failed to lookup data")
            .map(|dnode| dnode.path())
            .collect::<Vec<String>>(),
        vec![
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']"
        ]
    );

    assert_eq!(
        dtree1
            .find("/ietf-interfaces:interfaces/interface[name='eth/0/0']/*")
            .expect("Failed to lookup data")
            .map(|dnode| dnode.path())
            .collect::<Vec<String>>(),
        vec![
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/name",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/description",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/type",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/enabled",
        ]
    );

    // Predicate values are compared in canonical form.
    assert_eq!(
        dtree1
            .find(
                "/ietf-interfaces:interfaces\
                 /interface[type='iana-if-type:ethernetCsmacd'][2]/name"
            )
            .expect("Failed to lookup data")
            .map(|dnode| dnode.value_canonical().unwrap())
            .collect::<Vec<String>>(),
        vec!["eth/0/1"]
    );

    // No match.
    assert_eq!(
        dtree1
            .find("/ietf-interfaces:interfaces/interface[name='eth/0/9']")
            .expect("Failed to lookup data")
            .count(),
        0
    );

    // Unknown module or node.
    for path in [
        "/unknown-module:interfaces",
        "/ietf-interfaces:interfaces/unknown-node",
    ] {
        assert_eq!(
            dtree1.find(path).map(|set| set.count()).map_err(|e| e.kind()),
            Err(ErrorKind::Schema)
        );
    }

    // Malformed path.
    assert_eq!(
        dtree1
            .find("/ietf-interfaces:interfaces/interface[name=")
            .map(|set| set.count())
            .map_err(|e| e.kind()),
        Err(ErrorKind::Syntax)
    );
}

#[test]
fn data_find_single() {
    let ctx = create_context();
    let dtree1 = parse_json_data(&ctx, JSON_TREE1);

    assert_eq!(
        dtree1
            .find_single("/ietf-interfaces:interfaces/interface")
            .map_err(|e| e.kind())
            .err(),
        Some(ErrorKind::NotFound)
    );
    assert_eq!(
        dtree1
            .find_single(
                "/ietf-interfaces:interfaces/interface[name='eth/0/9']"
            )
            .map_err(|e| e.kind())
            .err(),
        Some(ErrorKind::NotFound)
    );
    assert!(dtree1
        .find_single("/ietf-interfaces:interfaces/interface[name='eth/0/0']")
        .is_ok());
}

#[test]
fn data_edit() {
    let ctx = create_context();
    let mut dtree1 = parse_json_data(&ctx, JSON_TREE1);
    let dtree2 = parse_json_data(&ctx, JSON_TREE2);

    enum Operation {
        MODIFY(&'static str, Option<&'static str>),
        DELETE(&'static str),
    }

    let changes = [
        Operation::MODIFY(
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/enabled",
            Some("false"),
        ),
        Operation::DELETE(
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']",
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
                dtree1
                    .new_path(xpath, *value, false)
                    .expect("Failed to edit data tree");
            }
            Operation::DELETE(xpath) => {
                dtree1.remove(xpath).expect("Failed to edit data tree")
            }
        };
    }

    assert_data_eq!(&dtree1, &dtree2);
}

#[test]
fn data_new_path() {
    let ctx = create_context();
    let mut dtree = DataTree::new(&ctx);
    assert!(dtree.reference().is_none());

    // Intermediate nodes and list keys are created as needed.
    let path = "/ietf-interfaces:interfaces/interface[name='eth/0/0']/type";
    let dnode = dtree
        .new_path(path, Some("iana-if-type:softwareLoopback"), false)
        .expect("Failed to edit data tree")
        .expect("Node not created");
    assert_eq!(dnode.path(), path);
    assert_eq!(dtree.traverse().count(), 4);

    // Setting the same value again is a no-op.
    let dnode = dtree
        .new_path(path, Some("iana-if-type:softwareLoopback"), false)
        .expect("Failed to edit data tree");
    assert!(dnode.is_none());

    // Invalid values and paths.
    for (path, value, kind) in [
        (
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/enabled",
            Some("maybe"),
            ErrorKind::Validation,
        ),
        (
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/name",
            Some("eth/0/1"),
            ErrorKind::Validation,
        ),
        (
            "/ietf-interfaces:interfaces/interface/enabled",
            Some("true"),
            ErrorKind::Validation,
        ),
        (
            "/ietf-interfaces:interfaces/unknown",
            None,
            ErrorKind::Schema,
        ),
        ("/ietf-interfaces:interfaces/", None, ErrorKind::Syntax),
    ] {
        let error = dtree
            .new_path(path, value, false)
            .map(|dnode| dnode.map(|dnode| dnode.path()))
            .expect_err("Data edit should have failed");
        assert_eq!(error.kind(), kind, "{}", path);
    }

    // Removing a missing node.
    assert_eq!(
        dtree
            .remove("/ietf-interfaces:interfaces/interface[name='eth/0/1']")
            .map_err(|e| e.kind()),
        Err(ErrorKind::NotFound)
    );
    dtree
        .remove("/ietf-interfaces:interfaces")
        .expect("Failed to edit data tree");
    assert!(dtree.reference().is_none());
}

#[test]
fn data_new_path_failed_edit() {
    let ctx = create_context();
    let mut dtree = DataTree::new(&ctx);

    // Nothing is left behind when the value is rejected.
    let error = dtree
        .new_path(
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/enabled",
            Some("maybe"),
            false,
        )
        .map(|dnode| dnode.is_some())
        .expect_err("Data edit should have failed");
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert!(dtree.reference().is_none());

    dtree
        .new_path(
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/enabled",
            Some("true"),
            false,
        )
        .expect("Failed to edit data tree");
    assert_eq!(dtree.traverse().count(), 4);

    // A failed edit below existing nodes keeps them intact.
    let error = dtree
        .new_path(
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']/enabled",
            Some("maybe"),
            false,
        )
        .map(|dnode| dnode.is_some())
        .expect_err("Data edit should have failed");
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(
        dtree.traverse().map(|dnode| dnode.path()).collect::<Vec<_>>(),
        vec![
            "/ietf-interfaces:interfaces",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/name",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/enabled",
        ]
    );

    // The tree stays usable.
    dtree
        .new_path(
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']/enabled",
            Some("false"),
            false,
        )
        .expect("Failed to edit data tree");
    assert_eq!(
        dtree
            .find("/ietf-interfaces:interfaces/interface")
            .expect("Failed to lookup data")
            .map(|dnode| dnode.path())
            .collect::<Vec<_>>(),
        vec![
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']",
        ]
    );
}

#[test]
fn data_path_quoting() {
    let ctx = create_context();
    let mut dtree = DataTree::new(&ctx);

    dtree
        .new_path(
            r#"/ietf-interfaces:interfaces/interface[name="it's"]/enabled"#,
            Some("true"),
            false,
        )
        .expect("Failed to edit data tree");
    let dnode = dtree
        .find_single("/ietf-interfaces:interfaces/interface")
        .expect("Failed to lookup data");
    let path = dnode.path();
    assert_eq!(path, r#"/ietf-interfaces:interfaces/interface[name="it's"]"#);
    assert_eq!(
        dtree
            .find_single(&path)
            .expect("Failed to lookup data")
            .path(),
        path
    );
}

#[test]
fn data_new_path_rpc() {
    let ctx = create_context_network();
    let mut dtree = DataTree::new(&ctx);

    dtree
        .new_path("/example-network:reboot/delay", Some("30"), false)
        .expect("Failed to edit data tree");
    let dnode = dtree
        .find_single("/example-network:reboot/delay")
        .expect("Failed to lookup data");
    assert_eq!(dnode.value(), Some(DataValue::Uint32(30)));
    assert_eq!(dnode.schema().kind(), SchemaNodeKind::Leaf);
    assert!(dnode.schema().is_within_input());

    // The RPC has no output leaves.
    assert_eq!(
        DataTree::new(&ctx)
            .new_path("/example-network:reboot/delay", Some("30"), true)
            .map(|dnode| dnode.is_some())
            .map_err(|e| e.kind()),
        Err(ErrorKind::Schema)
    );
}

#[test]
fn data_validate() {
    let ctx = create_context();
    let mut dtree1 = parse_json_data(&ctx, JSON_TREE1);

    // Mandatory node "oper-status" instance does not exist.
    // (path: /ietf-interfaces:interfaces/interface[name='eth/0/0']/oper-status)
    let error = dtree1
        .validate(DataValidationFlags::PRESENT)
        .expect_err("Validation should have failed");
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(
        error.path.as_deref(),
        Some("/ietf-interfaces:interfaces/interface[name='eth/0/0']/oper-status")
    );

    // Configuration only.
    assert!(dtree1
        .validate(DataValidationFlags::PRESENT | DataValidationFlags::NO_STATE)
        .is_ok());

    // Editing can break the tree.
    dtree1
        .remove("/ietf-interfaces:interfaces/interface[name='eth/0/0']/type")
        .expect("Failed to edit data tree");
    assert!(dtree1.validate(DataValidationFlags::NO_STATE).is_err());
}

#[test]
fn data_duplicate() {
    let ctx = create_context();
    let dtree1 = parse_json_data(&ctx, JSON_TREE1);
    let dup = dtree1.duplicate().expect("Failed to duplicate data");

    assert_data_eq!(&dtree1, &dup);
}

#[test]
fn data_duplicate_subtree() {
    let ctx = create_context();
    let dtree1 = parse_json_data(&ctx, JSON_TREE1);
    let dnode = dtree1
        .find_single(
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']/description",
        )
        .expect("Failed to lookup data");

    let dup = dnode.duplicate(false).expect("Failed to duplicate data");
    assert_eq!(
        dup.traverse()
            .map(|dnode| dnode.schema().name().to_owned())
            .collect::<Vec<_>>(),
        vec!["description"]
    );

    let dup = dnode.duplicate(true).expect("Failed to duplicate data");
    assert_eq!(
        dup.traverse().map(|dnode| dnode.path()).collect::<Vec<_>>(),
        vec![
            "/ietf-interfaces:interfaces",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']/name",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']/description",
        ]
    );
}

#[test]
fn data_print() {
    let ctx = create_context();
    let dtree1 = parse_json_data(&ctx, JSON_TREE1);
    let dnode = dtree1
        .find_single("/ietf-interfaces:interfaces/interface[name='eth/0/0']")
        .expect("Failed to lookup data");

    assert_eq!(
        dnode
            .print_string(DataFormat::JSON, DataPrinterFlags::SHRINK)
            .expect("Failed to print data"),
        r#"{"ietf-interfaces:interface":[{"name":"eth/0/0","description":"ENG","type":"iana-if-type:ethernetCsmacd","enabled":true}]}"#
    );
    assert_eq!(
        dnode
            .print_string(DataFormat::XML, DataPrinterFlags::SHRINK)
            .expect("Failed to print data"),
        "<interface xmlns=\"urn:ietf:params:xml:ns:yang:ietf-interfaces\">\
         <name>eth/0/0</name><description>ENG</description>\
         <type xmlns:ianaift=\"urn:ietf:params:xml:ns:yang:iana-if-type\">ianaift:ethernetCsmacd</type>\
         <enabled>true</enabled></interface>"
    );
    assert_eq!(
        dnode
            .print_bytes(DataFormat::XML, DataPrinterFlags::SHRINK)
            .expect("Failed to print data")
            .len(),
        240
    );

    // Round trip through XML.
    let xml = dtree1
        .print_string(DataFormat::XML, DataPrinterFlags::WITH_SIBLINGS)
        .expect("Failed to print data");
    let dtree2 = DataTree::parse_string(
        &ctx,
        xml,
        DataFormat::XML,
        DataParserFlags::CONFIG,
    )
    .expect("Failed to parse data tree");
    assert_data_eq!(&dtree1, &dtree2);

    // Empty non-presence containers.
    let mut dtree3 = DataTree::new(&ctx);
    dtree3
        .new_path("/ietf-interfaces:interfaces", None, false)
        .expect("Failed to edit data tree");
    assert_eq!(
        dtree3
            .print_string(DataFormat::JSON, DataPrinterFlags::SHRINK)
            .expect("Failed to print data"),
        "{}"
    );
    assert_eq!(
        dtree3
            .print_string(
                DataFormat::XML,
                DataPrinterFlags::SHRINK | DataPrinterFlags::KEEP_EMPTY_CONT
            )
            .expect("Failed to print data"),
        "<interfaces xmlns=\"urn:ietf:params:xml:ns:yang:ietf-interfaces\"/>"
    );
}

#[test]
fn data_iterator_traverse() {
    let ctx = create_context();
    let dtree1 = parse_json_data(&ctx, JSON_TREE1);

    assert_eq!(
        dtree1
            .traverse()
            .map(|dnode| dnode.path())
            .collect::<Vec<String>>(),
        vec![
            "/ietf-interfaces:interfaces",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/name",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/description",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/type",
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']/enabled",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']/name",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']/description",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']/type",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']/enabled"
        ]
    );
    assert_eq!(dtree1.tree_dfs().len(), 11);
}

#[test]
fn data_iterator_ancestors() {
    let ctx = create_context();
    let dtree1 = parse_json_data(&ctx, JSON_TREE1);

    assert_eq!(
        dtree1
            .find_single(
                "/ietf-interfaces:interfaces/interface[name='eth/0/0']/type",
            )
            .expect("Failed to lookup data")
            .ancestors()
            .map(|dnode| dnode.path())
            .collect::<Vec<String>>(),
        vec![
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']",
            "/ietf-interfaces:interfaces",
        ]
    );
}

#[test]
fn data_iterator_siblings() {
    let ctx = create_context();
    let dtree1 = parse_json_data(&ctx, JSON_TREE1);

    assert_eq!(
        dtree1
            .find_single(
                "/ietf-interfaces:interfaces/interface[name='eth/0/0']"
            )
            .expect("Failed to lookup data")
            .siblings()
            .map(|dnode| dnode.path())
            .collect::<Vec<String>>(),
        vec!["/ietf-interfaces:interfaces/interface[name='eth/0/1']",]
    );
}

#[test]
fn data_iterator_children() {
    let ctx = create_context();
    let dtree1 = parse_json_data(&ctx, JSON_TREE1);

    assert_eq!(
        dtree1
            .find_single("/ietf-interfaces:interfaces")
            .expect("Failed to lookup data")
            .children()
            .map(|dnode| dnode.path())
            .collect::<Vec<String>>(),
        vec![
            "/ietf-interfaces:interfaces/interface[name='eth/0/0']",
            "/ietf-interfaces:interfaces/interface[name='eth/0/1']",
        ]
    );
}

#[test]
fn data_navigation() {
    let ctx = create_context();
    let dtree1 = parse_json_data(&ctx, JSON_TREE1);
    let dnode = dtree1.reference();

    // interfaces -> interface[eth/0/0] -> name.
    let name = dnode
        .child()
        .child()
        .target()
        .expect("Failed to navigate data tree");
    assert_eq!(name.value_canonical().as_deref(), Some("eth/0/0"));
    assert_eq!(
        name.clone()
            .parent()
            .expect("Failed to navigate data tree")
            .next_sibling()
            .parent()
            .target()
            .expect("Failed to navigate data tree")
            .path(),
        "/ietf-interfaces:interfaces"
    );
    assert_eq!(
        dtree1
            .reference()
            .child()
            .tree_dfs()
            .expect("Failed to navigate data tree")
            .len(),
        5
    );

    // Navigating past a leaf.
    assert_eq!(
        name.child()
            .child()
            .map(|dnode| dnode.is_some())
            .map_err(|e| e.kind()),
        Err(ErrorKind::NullTarget)
    );
    assert_eq!(
        DataTree::new(&ctx)
            .reference()
            .tree_dfs()
            .map(|dnodes| dnodes.len())
            .map_err(|e| e.kind()),
        Err(ErrorKind::NullTarget)
    );
}
