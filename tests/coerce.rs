#![allow(missing_docs)]

use indoc::indoc;
use serde_json::Value;
use tagfill::{TagErrorKind, TagProcessor, record};

#[test]
fn signed_overflow_names_the_field_path() {
    record! {
        #[derive(Default, Debug)]
        struct Narrow {
            #[tag(default = "200")]
            value: i8,
        }
    }

    let processor = TagProcessor::defaults();
    let mut narrow = Narrow::default();
    let err = processor.fill(&mut narrow, None).unwrap_err();
    assert!(matches!(
        err.kind(),
        TagErrorKind::IntegerOverflow { path } if path == "$.value"
    ));
}

#[test]
fn unsigned_overflow_and_negative_literals() {
    record! {
        #[derive(Default, Debug)]
        struct Overflowing {
            #[tag(default = "300")]
            value: u8,
        }
    }

    let processor = TagProcessor::defaults();
    let mut record = Overflowing::default();
    let err = processor.fill(&mut record, None).unwrap_err();
    assert!(matches!(
        err.kind(),
        TagErrorKind::UnsignedOverflow { path } if path == "$.value"
    ));

    record! {
        #[derive(Default, Debug)]
        struct Negative {
            #[tag(default = "-1")]
            value: u8,
        }
    }

    let mut record = Negative::default();
    let err = processor.fill(&mut record, None).unwrap_err();
    // A minus sign is not an overflow, it is a malformed unsigned literal.
    assert!(matches!(err.kind(), TagErrorKind::ParseFailure { .. }));
}

#[test]
fn float_overflow_detection() {
    record! {
        #[derive(Default, Debug)]
        struct Single {
            #[tag(default = "1e40")]
            value: f32,
        }
    }

    let processor = TagProcessor::defaults();
    let mut single = Single::default();
    let err = processor.fill(&mut single, None).unwrap_err();
    assert!(matches!(
        err.kind(),
        TagErrorKind::FloatOverflow { path } if path == "$.value"
    ));

    record! {
        #[derive(Default, Debug)]
        struct Double {
            #[tag(default = "1e400")]
            value: f64,
        }
    }

    let mut double = Double::default();
    let err = processor.fill(&mut double, None).unwrap_err();
    assert!(matches!(err.kind(), TagErrorKind::FloatOverflow { .. }));
}

#[test]
fn malformed_literals_surface_as_parse_failures() {
    record! {
        #[derive(Default, Debug)]
        struct Malformed {
            #[tag(default = "abc")]
            value: i32,
        }
    }

    let processor = TagProcessor::defaults();
    let mut record = Malformed::default();
    let err = processor.fill(&mut record, None).unwrap_err();
    assert!(matches!(
        err.kind(),
        TagErrorKind::ParseFailure { path, .. } if path == "$.value"
    ));

    record! {
        #[derive(Default, Debug)]
        struct NotABool {
            #[tag(default = "maybe")]
            value: bool,
        }
    }

    let mut record = NotABool::default();
    let err = processor.fill(&mut record, None).unwrap_err();
    assert!(matches!(err.kind(), TagErrorKind::ParseFailure { .. }));
}

#[test]
fn earlier_fields_keep_their_values_when_a_later_one_fails() {
    record! {
        #[derive(Default, Debug)]
        struct Partial {
            #[tag(default = "written")]
            first: String,
            #[tag(default = "oops")]
            second: i8,
        }
    }

    let processor = TagProcessor::defaults();
    let mut partial = Partial::default();
    assert!(processor.fill(&mut partial, None).is_err());
    assert_eq!(partial.first, "written");
    assert_eq!(partial.second, 0);
}

const TYPED_DOCUMENT: &str = indoc! {r#"
    {
        "big": 300,
        "neg": -5,
        "wide": 5566,
        "frac": 67.8,
        "flag": true,
        "mixed": ["one", 2],
        "digits": "123",
        "scrambled": "12three"
    }
"#};

fn typed_processor() -> TagProcessor {
    let document: Value = serde_json::from_str(TYPED_DOCUMENT).unwrap();
    TagProcessor::configuration(&document, "$").unwrap()
}

#[test]
fn typed_numbers_range_check_against_the_destination() {
    record! {
        #[derive(Default, Debug)]
        struct Big {
            #[tag(json = "big")]
            value: u8,
        }
    }

    let mut record = Big::default();
    let err = typed_processor().fill(&mut record, None).unwrap_err();
    assert!(matches!(
        err.kind(),
        TagErrorKind::UnsignedOverflow { path } if path == "$.value"
    ));

    record! {
        #[derive(Default, Debug)]
        struct Neg {
            #[tag(json = "neg")]
            value: u8,
        }
    }

    let mut record = Neg::default();
    let err = typed_processor().fill(&mut record, None).unwrap_err();
    assert!(matches!(err.kind(), TagErrorKind::UnsignedOverflow { .. }));

    record! {
        #[derive(Default, Debug)]
        struct TooWide {
            #[tag(json = "wide")]
            value: i8,
        }
    }

    let mut record = TooWide::default();
    let err = typed_processor().fill(&mut record, None).unwrap_err();
    assert!(matches!(err.kind(), TagErrorKind::IntegerOverflow { .. }));
}

#[test]
fn typed_floats_truncate_toward_zero_for_integer_destinations() {
    record! {
        #[derive(Default, Debug)]
        struct Truncated {
            #[tag(json = "frac")]
            value: i16,
        }
    }

    let mut record = Truncated::default();
    typed_processor().fill(&mut record, None).unwrap();
    assert_eq!(record.value, 67);
}

#[test]
fn document_strings_fill_numeric_fields_through_the_parse_path() {
    record! {
        #[derive(Default, Debug)]
        struct Digits {
            #[tag(json = "digits")]
            value: u32,
        }
    }

    let mut record = Digits::default();
    typed_processor().fill(&mut record, None).unwrap();
    assert_eq!(record.value, 123);

    record! {
        #[derive(Default, Debug)]
        struct Scrambled {
            #[tag(json = "scrambled")]
            value: i32,
        }
    }

    let mut record = Scrambled::default();
    let err = typed_processor().fill(&mut record, None).unwrap_err();
    assert!(matches!(
        err.kind(),
        TagErrorKind::ParseFailure { path, .. } if path == "$.value"
    ));
}

#[test]
fn typed_kind_mismatches_are_rejected() {
    record! {
        #[derive(Default, Debug)]
        struct FlagAsNumber {
            #[tag(json = "flag")]
            value: i32,
        }
    }

    let mut record = FlagAsNumber::default();
    let err = typed_processor().fill(&mut record, None).unwrap_err();
    assert!(matches!(err.kind(), TagErrorKind::UnsupportedFieldType { .. }));

    record! {
        #[derive(Default, Debug)]
        struct NumberAsFlag {
            #[tag(json = "big")]
            value: bool,
        }
    }

    let mut record = NumberAsFlag::default();
    let err = typed_processor().fill(&mut record, None).unwrap_err();
    assert!(matches!(err.kind(), TagErrorKind::UnsupportedFieldType { .. }));
}

#[test]
fn sequences_require_string_elements() {
    record! {
        #[derive(Default, Debug)]
        struct Mixed {
            #[tag(json = "mixed")]
            values: Vec<String>,
        }
    }

    let mut record = Mixed::default();
    let err = typed_processor().fill(&mut record, None).unwrap_err();
    assert!(matches!(
        err.kind(),
        TagErrorKind::IncompatibleSequenceElement { path } if path == "$.values"
    ));
}
