use super::*;
use num_bigint::BigInt;

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn unhex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

fn nested(depth: usize) -> PlutusData {
    (0..depth).fold(PlutusData::integer(0), |d, i| {
        if i % 3 == 0 {
            PlutusData::List(vec![d])
        } else {
            PlutusData::constr(0, vec![PlutusData::bytes(vec![1]), d])
        }
    })
}

#[test]
fn canonical_encodings() {
    let two_64: BigInt = BigInt::from(u64::MAX) + 1;
    let cases = [
        (PlutusData::integer(1), "01"),
        (PlutusData::integer(-1), "20"),
        (PlutusData::integer(24), "1818"),
        (PlutusData::integer(-500), "3901f3"),
        (PlutusData::Integer(two_64.clone()), "c249010000000000000000"),
        (PlutusData::Integer(-two_64 - 1), "c349010000000000000000"),
        (PlutusData::bytes(vec![0xab]), "41ab"),
        (PlutusData::List(vec![]), "80"),
        (PlutusData::constr(0, vec![]), "d87980"),
        (PlutusData::constr(0, vec![PlutusData::integer(1)]), "d8799f01ff"),
        (PlutusData::constr(7, vec![]), "d9050080"),
        (PlutusData::constr(200, vec![]), "d8668218c880"),
        (
            PlutusData::Map(vec![(PlutusData::integer(1), PlutusData::bytes(vec![]))]),
            "a10140",
        ),
    ];
    for (data, expected) in cases {
        assert_eq!(hex(&data.to_cbor()), expected, "{}", data);
        assert_eq!(PlutusData::from_cbor(&unhex(expected)), Ok(data));
    }
}

#[test]
fn long_byte_strings_are_chunked() {
    let data = PlutusData::bytes(vec![7u8; 65]);
    let cbor = data.to_cbor();
    assert_eq!(cbor[0], 0x5f);
    assert_eq!(&cbor[1..3], &[0x58, 0x40]);
    assert_eq!(cbor[67], 0x41);
    assert_eq!(cbor.last(), Some(&0xff));
    assert_eq!(PlutusData::from_cbor(&cbor), Ok(data));
}

#[test]
fn definite_and_indefinite_containers_decode_alike() {
    let expected = PlutusData::constr(0, vec![PlutusData::integer(1)]);
    assert_eq!(PlutusData::from_cbor(&unhex("d8798101")), Ok(expected));
    assert_eq!(
        PlutusData::from_cbor(&unhex("9f0102ff")),
        PlutusData::from_cbor(&unhex("820102"))
    );
    assert_eq!(
        PlutusData::from_cbor(&unhex("bf0102ff")),
        Ok(PlutusData::Map(vec![(
            PlutusData::integer(1),
            PlutusData::integer(2)
        )]))
    );
}

#[test]
fn malformed_cbor_is_rejected() {
    assert_eq!(
        PlutusData::from_cbor(&unhex("0101")),
        Err(CborError::TrailingBytes { remaining: 1 })
    );
    assert_eq!(
        PlutusData::from_cbor(&unhex("c401")),
        Err(CborError::UnknownTag { offset: 0, tag: 4 })
    );
    assert!(matches!(
        PlutusData::from_cbor(&unhex("d8799f01")),
        Err(CborError::UnexpectedEnd { .. })
    ));
    assert_eq!(
        PlutusData::from_cbor(&unhex("bf01ff")),
        Err(CborError::UnpairedKey { offset: 0 })
    );
    assert!(matches!(
        PlutusData::from_cbor(&unhex("f6")),
        Err(CborError::InvalidHeader { offset: 0, byte: 0xf6 })
    ));
    assert!(matches!(
        PlutusData::from_cbor(&unhex("5affffffff")),
        Err(CborError::UnexpectedEnd { .. })
    ));
}

#[test]
fn display_nested_data() {
    let data = PlutusData::constr(
        1,
        vec![
            PlutusData::Map(vec![(PlutusData::integer(1), PlutusData::bytes(vec![0xff]))]),
            PlutusData::List(vec![]),
        ],
    );
    insta::assert_snapshot!(data.to_string(), @"Constr 1 [Map [(I 1, B #ff)], List []]");
}

#[test]
fn equality_compares_structure() {
    let a = PlutusData::constr(0, vec![PlutusData::integer(1), PlutusData::List(vec![])]);
    assert_eq!(a, a.clone());
    assert_ne!(a, PlutusData::constr(1, vec![PlutusData::integer(1), PlutusData::List(vec![])]));
    assert_ne!(a, PlutusData::constr(0, vec![PlutusData::integer(1)]));
    assert_ne!(PlutusData::List(vec![]), PlutusData::Map(vec![]));
}

#[test]
fn deep_data_is_handled_without_recursion() {
    let data = nested(200_000);
    let copy = data.clone();
    assert_eq!(data, copy);
    assert_ne!(data, nested(199_999));

    let cbor = data.to_cbor();
    let decoded = PlutusData::from_cbor(&cbor).unwrap();
    assert_eq!(decoded, data);
    assert!(decoded.to_string().starts_with("Constr 0 [B #01, List [Constr 0"));

    drop(data);
    drop(copy);
    drop(decoded);
}
