//! Loading YAML text into records and saving it back out again.

use shaped_yaml::{
    load_str, save_to_string, Config, ErrorKind, FieldSchema, NodeFlags, Schema, SchemaNode,
    Target, UNLIMITED,
};

fn server_schema() -> Schema {
    let listener = SchemaNode::mapping(
        16,
        vec![
            FieldSchema::new("host", 0, SchemaNode::inline_string(12, 1, 11)),
            FieldSchema::new("port", 12, SchemaNode::uint(2)),
            FieldSchema::new(
                "tls",
                14,
                SchemaNode::boolean(1).with_flags(NodeFlags::OPTIONAL),
            ),
        ],
    );
    Schema::new(
        SchemaNode::mapping(
            80,
            vec![
                FieldSchema::new("name", 0, SchemaNode::string(1, 32)),
                FieldSchema::new(
                    "level",
                    8,
                    SchemaNode::enumeration(4, [("debug", 0), ("info", 1), ("warn", 2)])
                        .with_flags(NodeFlags::STRICT),
                ),
                FieldSchema::new(
                    "perms",
                    12,
                    SchemaNode::flags(4, [("read", 1), ("write", 2), ("admin", 4)]),
                ),
                FieldSchema::new("listen", 16, listener),
                FieldSchema::new("ratio", 32, SchemaNode::float(8)),
                FieldSchema::sequence(
                    "peers",
                    40,
                    48,
                    4,
                    SchemaNode::string(1, 64),
                    0,
                    UNLIMITED,
                ),
                FieldSchema::new(
                    "mode",
                    52,
                    SchemaNode::bitfield(4, [("user", 0, 3), ("group", 3, 3), ("other", 6, 3)]),
                ),
                FieldSchema::new(
                    "comment",
                    56,
                    SchemaNode::string(0, 80).with_flags(NodeFlags::NULLABLE_STRING),
                ),
                FieldSchema::new(
                    "retries",
                    64,
                    SchemaNode::int(4).with_flags(NodeFlags::NULLABLE | NodeFlags::OPTIONAL),
                ),
                FieldSchema::new(
                    "legacy",
                    72,
                    SchemaNode::ignore().with_flags(NodeFlags::OPTIONAL),
                ),
            ],
        )
        .with_flags(NodeFlags::POINTER),
    )
    .unwrap()
}

const SERVER: &str = r#"
name: edge-1
level: info
perms: [read, admin]
listen:
  host: example.org
  port: 8443
  tls: yes
ratio: 0.75
peers:
  - alpha
  - "beta gamma"
  - '123'
mode: { user: 7, group: 5, other: 4 }
comment: ~
retries:
legacy: { anything: [goes, here] }
"#;

#[test]
fn load_server() {
    let target = load_str(&server_schema(), SERVER, &Config::default()).unwrap();
    let record = target.data().unwrap();
    assert_eq!(record.text(0), Some("edge-1"));
    assert_eq!(record.get_i32(8), Some(1));
    assert_eq!(record.get_u32(12), Some(5));
    assert_eq!(&record.as_bytes()[16..28], b"example.org\0");
    assert_eq!(record.get_u16(28), Some(8443));
    assert_eq!(record.get_u8(30), Some(1));
    assert_eq!(record.get_f64(32), Some(0.75));
    assert_eq!(record.get_u32(48), Some(3));
    let peers = record.block(40).unwrap();
    assert_eq!(peers.len(), 3 * shaped_yaml::POINTER_SIZE);
    assert_eq!(peers.text(shaped_yaml::POINTER_SIZE), Some("beta gamma"));
    assert_eq!(peers.text(2 * shaped_yaml::POINTER_SIZE), Some("123"));
    assert_eq!(record.get_u32(52), Some(7 | 5 << 3 | 4 << 6));
    assert!(record.is_null(56));
    assert!(record.is_null(64));
}

#[test]
fn save_is_idempotent() {
    let schema = server_schema();
    let config = Config::default();
    let first = load_str(&schema, SERVER, &config).unwrap();
    let text = save_to_string(&schema, &first, &config).unwrap();
    let second = load_str(&schema, &text, &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(save_to_string(&schema, &second, &config).unwrap(), text);
}

#[test]
fn document_delimiters() {
    let schema = Schema::new(SchemaNode::sequence(SchemaNode::int(8), 0, UNLIMITED)).unwrap();
    let config = Config {
        emit_document_delimiters: true,
        ..Config::default()
    };
    let target = load_str(&schema, "[1, -2]", &config).unwrap();
    assert_eq!(target.seq_count(), 2);
    let text = save_to_string(&schema, &target, &config).unwrap();
    assert_eq!(text, "---\n- 1\n- -2\n...\n");
    assert_eq!(
        save_to_string(&schema, &target, &Config::default()).unwrap(),
        "- 1\n- -2\n"
    );
}

fn person() -> Schema {
    Schema::new(
        SchemaNode::mapping(
            16,
            vec![
                FieldSchema::new("name", 0, SchemaNode::string(1, 10)),
                FieldSchema::new(
                    "age",
                    8,
                    SchemaNode::uint(4).with_flags(NodeFlags::OPTIONAL),
                ),
            ],
        )
        .with_flags(NodeFlags::POINTER),
    )
    .unwrap()
}

#[test]
fn person_outcomes() {
    let config = Config::default();
    let target = load_str(&person(), "name: Bob", &config).unwrap();
    assert_eq!(target.data().unwrap().text(0), Some("Bob"));

    let err = load_str(&person(), "name: \"\"", &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StringLengthMin);

    let err = load_str(&person(), "name: Bob\nextra: 1\n", &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidKey);
    assert_eq!(err.mark().map(|m| m.line()), Some(2));

    let ignoring = Config {
        ignore_unknown_keys: true,
        ..Config::default()
    };
    let target = load_str(&person(), "name: Bob\nextra: 1\n", &ignoring).unwrap();
    assert_eq!(target.data().unwrap().text(0), Some("Bob"));
}

#[test]
fn string_bounds() {
    let schema = Schema::new(SchemaNode::string(3, 5)).unwrap();
    let config = Config::default();
    for (text, expected) in [
        ("ab", Some(ErrorKind::StringLengthMin)),
        ("abc", None),
        ("abcde", None),
        ("abcdef", Some(ErrorKind::StringLengthMax)),
    ] {
        let result = load_str(&schema, text, &config);
        assert_eq!(result.err().map(|e| e.kind()), expected, "{}", text);
    }
}

#[test]
fn sequence_bounds() {
    let schema = Schema::new(SchemaNode::sequence(SchemaNode::uint(1), 1, 2)).unwrap();
    let config = Config::default();
    let kind = |text| load_str(&schema, text, &config).err().map(|e| e.kind());
    assert_eq!(kind("[]"), Some(ErrorKind::SequenceEntriesMin));
    assert_eq!(kind("[1]"), None);
    assert_eq!(kind("[1, 2]"), None);
    assert_eq!(kind("[1, 2, 3]"), Some(ErrorKind::SequenceEntriesMax));

    let fixed = Schema::new(
        SchemaNode::sequence_fixed(SchemaNode::uint(1), 2).with_flags(NodeFlags::POINTER),
    )
    .unwrap();
    let kind = |text| load_str(&fixed, text, &config).err().map(|e| e.kind());
    assert_eq!(kind("[1]"), Some(ErrorKind::SequenceFixedCount));
    assert_eq!(kind("[1, 2]"), None);
    assert_eq!(kind("[1, 2, 3]"), Some(ErrorKind::SequenceFixedCount));
}

#[test]
fn enum_strictness() {
    let config = Config::default();
    let lax = Schema::new(
        SchemaNode::enumeration(2, [("low", 0), ("high", 1)]).with_flags(NodeFlags::POINTER),
    )
    .unwrap();
    let target = load_str(&lax, "5", &config).unwrap();
    assert_eq!(target.data().unwrap().get_i16(0), Some(5));
    assert_eq!(save_to_string(&lax, &target, &config).unwrap(), "5\n");

    let strict = Schema::new(
        SchemaNode::enumeration(2, [("low", 0), ("high", 1)])
            .with_flags(NodeFlags::POINTER | NodeFlags::STRICT),
    )
    .unwrap();
    let err = load_str(&strict, "5", &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    let err = save_to_string(&strict, &target, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
}

#[test]
fn aliases_replay_their_anchor() {
    let schema = Schema::new(SchemaNode::sequence(
        person().root().clone(),
        0,
        UNLIMITED,
    ))
    .unwrap();
    let text = "- &bob { name: Bob, age: 30 }\n- *bob\n";
    let target = load_str(&schema, text, &Config::default()).unwrap();
    let people = target.data().unwrap();
    assert_eq!(target.seq_count(), 2);
    assert_eq!(people.block(0), people.block(shaped_yaml::POINTER_SIZE));

    let config = Config {
        no_alias: true,
        ..Config::default()
    };
    let err = load_str(&schema, text, &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Alias);
    assert_eq!(err.mark().map(|m| m.line()), Some(2));
}

#[test]
fn case_insensitive_keys() {
    let config = Config {
        case_insensitive: true,
        ..Config::default()
    };
    let target = load_str(&person(), "NAME: Bob\nAge: 3\n", &config).unwrap();
    assert_eq!(target.data().unwrap().get_u32(8), Some(3));
    let err = load_str(&person(), "NAME: Bob\n", &Config::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidKey);
}

#[test]
fn empty_documents() {
    let config = Config::default();
    let nullable = Schema::new(
        SchemaNode::mapping(0, vec![]).with_flags(NodeFlags::NULLABLE),
    )
    .unwrap();
    assert!(load_str(&nullable, "", &config).unwrap().is_null());
    assert!(load_str(&nullable, "# nothing\n", &config).unwrap().is_null());
    let err = load_str(&person(), "", &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEvent);
}

#[test]
fn syntax_errors() {
    let err = load_str(&person(), "name: [Bob\n", &Config::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParserError);
    assert!(err.mark().is_some());
}

#[test]
fn hand_built_targets_save() {
    let mut record = shaped_yaml::Record::new(16);
    record.set_link(0, shaped_yaml::Link::Text("Ann".into()));
    record.set_u32(8, 7).unwrap();
    let text = save_to_string(&person(), &Target::from_record(record), &Config::default())
        .unwrap();
    assert_eq!(text, "name: Ann\nage: 7\n");
}

#[test]
fn names_that_look_like_null_survive() {
    let schema = Schema::new(
        SchemaNode::mapping(
            8,
            vec![
                FieldSchema::new(
                    "state",
                    0,
                    SchemaNode::enumeration(4, [("null", 0), ("some", 1)])
                        .with_flags(NodeFlags::STRICT),
                ),
                FieldSchema::new(
                    "opts",
                    4,
                    SchemaNode::flags(2, [("~", 1), ("true", 2)]).with_flags(NodeFlags::STRICT),
                ),
                FieldSchema::new("bits", 6, SchemaNode::bitfield(2, [("null", 0, 4)])),
            ],
        )
        .with_flags(NodeFlags::POINTER),
    )
    .unwrap();
    let config = Config::default();
    let text = "state: null\nopts: ['~', 'true']\nbits: { 'null': 3 }\n";
    let first = load_str(&schema, text, &config).unwrap();
    assert_eq!(first.data().unwrap().get_u16(4), Some(3));
    let saved = save_to_string(&schema, &first, &config).unwrap();
    let second = load_str(&schema, &saved, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn negative_zero_keeps_its_sign() {
    let schema = Schema::new(SchemaNode::float(8).with_flags(NodeFlags::POINTER)).unwrap();
    let config = Config::default();
    let first = load_str(&schema, "-0.0", &config).unwrap();
    let text = save_to_string(&schema, &first, &config).unwrap();
    assert_eq!(text, "-0.0\n");
    let second = load_str(&schema, &text, &config).unwrap();
    let value = second.data().unwrap().get_f64(0).unwrap();
    assert!(value == 0.0 && value.is_sign_negative());
    assert_eq!(first, second);
}
