use crate::reflect_struct;
use crate::{
    Allocation, CastError, FnFactory, InstanceFactory, Reflect, Resolution, assemble_vec, cast,
    cast_with, from_str, from_str_with,
};
use smelt_tree::NodeKind;

#[derive(Debug, Default, PartialEq)]
struct Simple {
    flag: bool,
    count: u32,
    offset: i32,
    ratio: f64,
    label: String,
}

reflect_struct!(Simple {
    flag: bool,
    count: u32,
    offset: i32,
    ratio: f64,
    label: String,
});

#[derive(Debug, Default, PartialEq)]
struct Inner {
    x: i64,
}

#[derive(Debug, Default, PartialEq)]
struct Outer {
    inner: Inner,
    tag: String,
}

reflect_struct!(Inner { x: i64 });
reflect_struct!(Outer { inner: Inner, tag: String });

#[derive(Debug, Default, PartialEq)]
struct Numbers {
    values: Vec<u32>,
}

reflect_struct!(Numbers { values: Vec<u32> });

#[derive(Debug, Default, PartialEq)]
struct MaybePort {
    port: Option<u16>,
}

reflect_struct!(MaybePort { port: Option<u16> });

#[derive(Debug, Default, PartialEq)]
struct Element {
    id: u32,
}

#[derive(Debug, Default, PartialEq)]
struct Deferred {
    items: Vec<Element>,
}

reflect_struct!(Element { id: u32 });
reflect_struct!(Deferred { items: Vec<Element> [deferred] });

/// Logs every request, then declines.
#[derive(Default)]
struct Recording {
    requests: Vec<(String, String, Option<&'static str>, Option<usize>)>,
}

impl InstanceFactory for Recording {
    fn create_instance(&mut self, request: &Allocation<'_>) -> Option<Resolution> {
        self.requests.push((
            request.path.to_string(),
            request.field_name.to_string(),
            request.static_type.map(|t| t.name),
            request.len,
        ));
        None
    }
}

#[test]
fn simple_struct() {
    let simple: Simple = from_str(
        r#"{"flag": true, "count": 800, "offset": -18000, "ratio": 0.62, "label": "stations"}"#,
    )
    .unwrap();
    assert_eq!(
        simple,
        Simple {
            flag: true,
            count: 800,
            offset: -18000,
            ratio: 0.62,
            label: "stations".to_string(),
        }
    );
}

#[test]
fn nested_struct() {
    let outer: Outer = from_str(r#"{"inner": {"x": -7}, "tag": "t"}"#).unwrap();
    assert_eq!(outer.inner.x, -7);
    assert_eq!(outer.tag, "t");
}

#[test]
fn missing_field_keeps_default() {
    let simple: Simple = from_str(r#"{"count": 3}"#).unwrap();
    assert_eq!(simple.count, 3);
    assert_eq!(simple.label, "");
    assert!(!simple.flag);
}

#[test]
fn unknown_keys_are_ignored() {
    let simple: Simple = from_str(r#"{"count": 3, "unrelated": {"deep": [1, 2]}}"#).unwrap();
    assert_eq!(simple.count, 3);
}

#[test]
fn duplicate_key_last_wins() {
    let simple: Simple = from_str(r#"{"count": 1, "count": 2}"#).unwrap();
    assert_eq!(simple.count, 2);
}

#[test]
fn static_vec() {
    let numbers: Numbers = from_str(r#"{"values": [5, 6, 7]}"#).unwrap();
    assert_eq!(numbers.values, vec![5, 6, 7]);
}

#[test]
fn empty_vec() {
    let numbers: Numbers = from_str(r#"{"values": []}"#).unwrap();
    assert_eq!(numbers.values, Vec::<u32>::new());
}

#[test]
fn optional_field() {
    let got: MaybePort = from_str(r#"{"port": 8080}"#).unwrap();
    assert_eq!(got.port, Some(8080));

    let got: MaybePort = from_str(r#"{"port": null}"#).unwrap();
    assert_eq!(got.port, None);

    let got: MaybePort = from_str(r#"{}"#).unwrap();
    assert_eq!(got.port, None);
}

#[test]
fn optional_field_still_type_checks() {
    let err = from_str::<MaybePort>(r#"{"port": "eighty"}"#).unwrap_err();
    assert!(matches!(
        err,
        CastError::TypeMismatch { ref path, expected: "u16", actual: NodeKind::Str, .. }
            if path == "/port"
    ));
}

#[test]
fn whole_float_binds_to_integer() {
    let simple: Simple = from_str(r#"{"count": 3.0}"#).unwrap();
    assert_eq!(simple.count, 3);
}

#[test]
fn fractional_float_does_not_bind_to_integer() {
    let err = from_str::<Simple>(r#"{"count": 3.5}"#).unwrap_err();
    assert!(matches!(
        err,
        CastError::TypeMismatch { ref path, expected: "u32", actual: NodeKind::Number, .. }
            if path == "/count"
    ));
}

#[test]
fn integer_overflow_is_a_mismatch() {
    let err = from_str::<Simple>(r#"{"count": 4294967296}"#).unwrap_err();
    assert!(matches!(err, CastError::TypeMismatch { .. }));
}

#[test]
fn negative_into_unsigned_is_a_mismatch() {
    let err = from_str::<Simple>(r#"{"count": -1}"#).unwrap_err();
    assert!(matches!(err, CastError::TypeMismatch { .. }));
}

#[test]
fn integer_widens_to_float() {
    let simple: Simple = from_str(r#"{"ratio": 4}"#).unwrap();
    assert_eq!(simple.ratio, 4.0);
}

#[test]
fn string_into_integer_is_a_mismatch() {
    let err = from_str::<Simple>(r#"{"count": "many"}"#).unwrap_err();
    assert!(matches!(
        err,
        CastError::TypeMismatch { expected: "u32", actual: NodeKind::Str, .. }
    ));
}

#[test]
fn null_into_non_optional_is_a_mismatch() {
    let err = from_str::<Simple>(r#"{"label": null}"#).unwrap_err();
    assert!(matches!(
        err,
        CastError::TypeMismatch { expected: "String", actual: NodeKind::Null, .. }
    ));
}

#[test]
fn object_against_scalar_is_a_mismatch() {
    let err = from_str::<Simple>(r#"{"count": {"nested": 1}}"#).unwrap_err();
    assert!(matches!(
        err,
        CastError::TypeMismatch { ref path, actual: NodeKind::Object, .. } if path == "/count"
    ));
}

#[test]
fn scalar_against_object_is_a_mismatch() {
    let err = from_str::<Outer>(r#"{"inner": 5}"#).unwrap_err();
    assert!(matches!(
        err,
        CastError::TypeMismatch { ref path, expected: "Inner", actual: NodeKind::Number, .. }
            if path == "/inner"
    ));
}

#[test]
fn parse_errors_surface() {
    let err = from_str::<Simple>(r#"{"count": }"#).unwrap_err();
    match err {
        CastError::Parse(parse) => {
            assert!(!parse.is_lexical());
            assert_eq!(parse.span.start, 10);
        }
        other => panic!("expected parse error, got {other}"),
    }

    let err = from_str::<Simple>(r#"{"label": "oops"#).unwrap_err();
    match err {
        CastError::Parse(parse) => assert!(parse.is_lexical()),
        other => panic!("expected parse error, got {other}"),
    }
}

#[test]
fn no_partial_graph_on_failure() {
    // The error carries everything; the caller gets no half-built value.
    let result: Result<Outer, _> = from_str(r#"{"inner": {"x": 1}, "tag": 7}"#);
    assert!(result.is_err());
}

#[test]
fn deferred_array_without_factory_is_unresolved() {
    let err = from_str::<Deferred>(r#"{"items": [{"id": 1}]}"#).unwrap_err();
    assert!(matches!(
        err,
        CastError::UnresolvedAmbiguity { ref path, .. } if path == "//items"
    ));
}

#[test]
fn deferred_array_resolved_by_factory() {
    let mut factory = FnFactory(|request: &Allocation<'_>| {
        match (request.path, request.field_name) {
            ("/", "items") => Some(Resolution::Collection {
                assemble: assemble_vec::<Element>,
            }),
            ("//items", _) => Some(Resolution::Instance {
                value: Box::new(Element::default()),
                ty: Element::descriptor(),
            }),
            _ => None,
        }
    });
    let deferred: Deferred =
        from_str_with(r#"{"items": [{"id": 1}, {"id": 2}]}"#, &mut factory).unwrap();
    assert_eq!(
        deferred.items,
        vec![Element { id: 1 }, Element { id: 2 }]
    );
}

#[test]
fn factory_instance_is_populated_after_handover() {
    // Whatever state the factory preloads survives unless the document
    // overwrites it.
    let mut factory = FnFactory(|request: &Allocation<'_>| {
        if request.path == "/" && request.field_name.is_empty() {
            Some(Resolution::Instance {
                value: Box::new(Simple {
                    label: "preset".to_string(),
                    ..Simple::default()
                }),
                ty: Simple::descriptor(),
            })
        } else {
            None
        }
    });
    let simple: Simple = from_str_with(r#"{"count": 2}"#, &mut factory).unwrap();
    assert_eq!(simple.count, 2);
    assert_eq!(simple.label, "preset");
}

#[test]
fn declining_factory_matches_no_factory() {
    let source = r#"{"inner": {"x": 3}, "tag": "same"}"#;
    let mut declining = Recording::default();
    let with_factory: Outer = from_str_with(source, &mut declining).unwrap();
    let without_factory: Outer = from_str(source).unwrap();
    assert_eq!(with_factory, without_factory);
}

#[test]
fn factory_not_consulted_for_scalar_fields() {
    let mut recording = Recording::default();
    let _: Simple = from_str_with(
        r#"{"flag": true, "count": 1, "offset": -2, "ratio": 0.5, "label": "x"}"#,
        &mut recording,
    )
    .unwrap();
    // One request for the root object, none for its scalar fields.
    assert_eq!(
        recording.requests,
        vec![("/".to_string(), String::new(), Some("Simple"), None)]
    );
}

#[test]
fn array_hook_arity() {
    let mut recording = Recording::default();
    let _: Numbers = from_str_with(r#"{"values": [5, 6, 7]}"#, &mut recording).unwrap();
    assert_eq!(
        recording.requests,
        vec![
            // Root object allocation.
            ("/".to_string(), String::new(), Some("Numbers"), None),
            // One container request carrying the element count.
            ("/".to_string(), "values".to_string(), None, Some(3)),
            // One request per element, all at the same element path.
            ("//values".to_string(), String::new(), None, None),
            ("//values".to_string(), String::new(), None, None),
            ("//values".to_string(), String::new(), None, None),
        ]
    );
}

#[test]
fn cast_from_parsed_tree() {
    let tree = smelt_tree::parse(r#"{"inner": {"x": 9}, "tag": "tree"}"#).unwrap();
    let outer: Outer = cast(&tree).unwrap();
    assert_eq!(outer.inner.x, 9);

    let mut recording = Recording::default();
    let again: Outer = cast_with(&tree, &mut recording).unwrap();
    assert_eq!(outer, again);
}

#[test]
fn factory_root_access() {
    // The factory can inspect the document root to make its decision.
    let mut factory = FnFactory(|request: &Allocation<'_>| {
        match (request.path, request.field_name) {
            ("/", "items") => {
                let hinted = request
                    .root
                    .get("kind")
                    .and_then(|v| v.as_str())
                    .map(|s| s == "element");
                assert_eq!(hinted, Some(true));
                Some(Resolution::Collection {
                    assemble: assemble_vec::<Element>,
                })
            }
            ("//items", _) => Some(Resolution::Instance {
                value: Box::new(Element::default()),
                ty: Element::descriptor(),
            }),
            _ => None,
        }
    });

    #[derive(Debug, Default, PartialEq)]
    struct Hinted {
        kind: String,
        items: Vec<Element>,
    }
    reflect_struct!(Hinted { kind: String, items: Vec<Element> [deferred] });

    let hinted: Hinted = from_str_with(
        r#"{"kind": "element", "items": [{"id": 4}]}"#,
        &mut factory,
    )
    .unwrap();
    assert_eq!(hinted.items, vec![Element { id: 4 }]);
}

#[test]
fn error_display_carries_path() {
    let err = from_str::<Simple>(r#"{"count": 3.5}"#).unwrap_err();
    assert_eq!(
        err.to_string(),
        "type mismatch at /count: expected u32, found number"
    );
}

#[test]
fn rendered_mismatch_points_at_source() {
    let source = r#"{"count": 3.5}"#;
    let err = from_str::<Simple>(source).unwrap_err();
    let rendered = err.render("doc.json", source);
    let plain = String::from_utf8(strip_ansi_escapes::strip(rendered)).unwrap();
    assert!(plain.contains("type mismatch at /count"));
    assert!(plain.contains("expected u32, found number"));
}
