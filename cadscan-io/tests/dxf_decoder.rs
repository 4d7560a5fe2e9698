
use std::io::Write;
use std::path::PathBuf;

use cadscan_core::drawing::{ColorIndex, Line};
use cadscan_core::geometry::Point2;
use cadscan_io::{
    DecodeError, DecodeOptions, DrawingLoader, DxfDecoder, EntityError, EntityKind, decode,
    decode_str,
};
use golden::assert_golden;

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

/// 由 (组码, 值) 序列拼出只含 ENTITIES 段的 DXF 文本。
fn entities_dxf(pairs: &[(i32, &str)]) -> String {
    let mut text = String::from("  0\nSECTION\n  2\nENTITIES\n");
    for (code, value) in pairs {
        text.push_str(&format!("{code:>3}\n{value}\n"));
    }
    text.push_str("  0\nENDSEC\n  0\nEOF\n");
    text
}

#[test]
fn load_basic_entities_matches_expected_result() {
    let decoder = DxfDecoder::new();
    let decoded = decoder
        .load(&fixture("basic_entities.dxf"))
        .expect("读取 DXF 失败");
    assert_golden("basic_entities", &decoded);
}

#[test]
fn block_and_paper_space_geometry_is_excluded() {
    let decoded = decode(fixture("basic_entities.dxf")).expect("读取 DXF 失败");
    // BLOCKS 段中的线段与图纸空间线段都不属于模型空间结果。
    assert_eq!(decoded.result.lines.len(), 1);
    assert!(
        decoded
            .result
            .lines
            .iter()
            .all(|line| line.start.x() < 100.0 && line.start.x() != 50.0)
    );

    let with_paper = DxfDecoder::with_options(DecodeOptions {
        include_paper_space: true,
        ..DecodeOptions::default()
    })
    .decode_file(&fixture("basic_entities.dxf"))
    .expect("读取 DXF 失败");
    assert_eq!(with_paper.result.lines.len(), 2);
    assert_eq!(with_paper.result.lines[1].start, Point2::new(50.0, 50.0));
}

#[test]
fn colored_line_decodes_exactly() {
    let text = entities_dxf(&[
        (0, "LINE"),
        (10, "0.0"),
        (20, "0.0"),
        (11, "10.0"),
        (21, "0.0"),
        (62, "1"),
    ]);
    let decoded = decode_str(&text).expect("decode");
    assert_eq!(
        decoded.result.lines,
        vec![Line {
            start: Point2::new(0.0, 0.0),
            end: Point2::new(10.0, 0.0),
            color: ColorIndex::new(1),
        }]
    );
    assert!(!decoded.has_diagnostics());
}

#[test]
fn circle_without_radius_is_isolated() {
    let decoded = decode(fixture("partial_failures.dxf")).expect("读取 DXF 失败");

    assert_eq!(decoded.result.lines.len(), 2);
    assert_eq!(decoded.result.circles.len(), 1);
    assert_eq!(decoded.result.circles[0].radius, 0.75);
    assert!(decoded.result.polylines.is_empty());

    assert_eq!(decoded.diagnostics.len(), 2);
    let first = &decoded.diagnostics[0];
    assert_eq!(first.index, 1);
    assert_eq!(first.line, 17);
    assert_eq!(first.entity, "CIRCLE");
    assert_eq!(
        first.error,
        EntityError::Incomplete {
            kind: EntityKind::Circle,
            code: 40
        }
    );
    let second = &decoded.diagnostics[1];
    assert_eq!(second.index, 3);
    assert_eq!(
        second.error,
        EntityError::InvalidValue {
            kind: EntityKind::LwPolyline,
            code: 10,
            value: "abc".to_string()
        }
    );
    assert_eq!(decoded.failed_entities(), 2);

    let last = &decoded.result.lines[1];
    assert_eq!(last.start, Point2::new(-1.5, 2.25));
    assert_eq!(last.end, Point2::new(3.125, -4.0));
    assert!(last.color.is_by_layer());
}

#[test]
fn empty_entities_section_yields_empty_result() {
    let decoded = decode(fixture("empty_entities.dxf")).expect("读取 DXF 失败");
    assert!(decoded.result.is_empty());
    assert!(decoded.result.lines.is_empty());
    assert!(decoded.result.circles.is_empty());
    assert!(decoded.result.arcs.is_empty());
    assert!(decoded.result.polylines.is_empty());
    assert!(decoded.result.texts.is_empty());
    assert!(decoded.diagnostics.is_empty());
    assert_eq!(decoded.header.acad_version.as_deref(), Some("AC1009"));
}

#[test]
fn missing_entities_section_fails_wholesale() {
    match decode(fixture("no_entities.dxf")) {
        Err(DecodeError::SectionNotFound { section }) => assert_eq!(section, "ENTITIES"),
        other => panic!("期望 SectionNotFound，实际为 {other:?}"),
    }
}

#[test]
fn truncated_file_is_malformed() {
    match decode(fixture("truncated.dxf")) {
        Err(DecodeError::MalformedTag { line, .. }) => assert_eq!(line, 9),
        other => panic!("期望 MalformedTag，实际为 {other:?}"),
    }
}

#[test]
fn non_numeric_group_code_is_malformed() {
    let text = "  0\nSECTION\n  2\nENTITIES\n  0\nLINE\nten\n0.0\n  0\nENDSEC\n";
    assert!(matches!(
        decode_str(text),
        Err(DecodeError::MalformedTag { line: 7, .. })
    ));
}

#[test]
fn classic_mac_line_endings_decode() {
    let text = entities_dxf(&[
        (0, "CIRCLE"),
        (10, "1.5"),
        (20, "-2"),
        (40, "3"),
        (62, "5"),
    ])
    .replace('\n', "\r");
    let decoded = decode_str(&text).expect("decode");
    assert!(!decoded.has_diagnostics());
    assert_eq!(decoded.result.circles.len(), 1);
    assert_eq!(decoded.result.circles[0].center, Point2::new(1.5, -2.0));
    assert_eq!(decoded.result.circles[0].color, ColorIndex::new(5));
}

#[test]
fn binary_dxf_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(b"AutoCAD Binary DXF\r\n\x1a\x00\x00\x00SECTION\x00")
        .expect("write");
    assert!(matches!(
        decode(file.path()),
        Err(DecodeError::UnsupportedFormat(_))
    ));
}

#[test]
fn gbk_text_is_decoded_through_code_page() {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(
        b"  0\nSECTION\n  2\nHEADER\n  9\n$ACADVER\n  1\nAC1018\n  9\n$DWGCODEPAGE\n  3\nANSI_936\n  0\nENDSEC\n\
  0\nSECTION\n  2\nENTITIES\n  0\nTEXT\n 10\n0.0\n 20\n0.0\n  1\n",
    )
    .expect("write header");
    // “图纸” 的 GBK 编码
    file.write_all(b"\xCD\xBC\xD6\xBD\n  0\nENDSEC\n  0\nEOF\n")
        .expect("write body");

    let decoded = decode(file.path()).expect("decode");
    assert_eq!(decoded.result.texts.len(), 1);
    assert_eq!(decoded.result.texts[0].content, "图纸");
}

#[test]
fn entity_order_is_preserved_per_collection() {
    let mut pairs: Vec<(i32, String)> = Vec::new();
    for i in 0..20 {
        let x = format!("{i}.0");
        if i % 3 == 0 {
            pairs.extend([
                (0, "CIRCLE".to_string()),
                (10, x.clone()),
                (20, "0".to_string()),
                (40, "1".to_string()),
            ]);
        }
        pairs.extend([
            (0, "LINE".to_string()),
            (10, x.clone()),
            (20, "0".to_string()),
            (11, x),
            (21, "1".to_string()),
        ]);
    }
    let borrowed: Vec<(i32, &str)> = pairs.iter().map(|(c, v)| (*c, v.as_str())).collect();
    let decoded = decode_str(&entities_dxf(&borrowed)).expect("decode");

    let xs: Vec<f64> = decoded.result.lines.iter().map(|l| l.start.x()).collect();
    let expected: Vec<f64> = (0..20).map(|i: i32| f64::from(i)).collect();
    assert_eq!(xs, expected);
    let circle_xs: Vec<f64> = decoded.result.circles.iter().map(|c| c.center.x()).collect();
    assert_eq!(circle_xs, vec![0.0, 3.0, 6.0, 9.0, 12.0, 15.0, 18.0]);
}

#[test]
fn lwpolyline_closure_matches_flag_bit() {
    let text = entities_dxf(&[
        (0, "LWPOLYLINE"),
        (70, "3"),
        (10, "0"),
        (20, "0"),
        (10, "1"),
        (20, "1"),
        (0, "LWPOLYLINE"),
        (70, "2"),
        (10, "0"),
        (20, "0"),
        (0, "LWPOLYLINE"),
        (10, "5"),
        (20, "5"),
    ]);
    let decoded = decode_str(&text).expect("decode");
    let closed: Vec<bool> = decoded
        .result
        .polylines
        .iter()
        .map(|p| p.is_closed)
        .collect();
    assert_eq!(closed, [true, false, false]);
    assert_eq!(decoded.result.polylines[0].points.len(), 2);
}

#[test]
fn mtext_control_sequences_are_stripped() {
    let text = entities_dxf(&[
        (0, "MTEXT"),
        (10, "0"),
        (20, "0"),
        (3, "\\A1;{\\H2.5;\\C1;Title}\\P"),
        (1, "\\fArial|b1;Body \\S1^2;"),
        (0, "TEXT"),
        (10, "0"),
        (20, "0"),
        (1, "\\A1;raw"),
    ]);
    let decoded = decode_str(&text).expect("decode");
    let texts = &decoded.result.texts;
    assert_eq!(texts[0].content, "Title\nBody 1/2");
    // 单行文字保持原样
    assert_eq!(texts[1].content, "\\A1;raw");
}

#[test]
fn mtext_with_embedded_object_decodes() {
    let text = entities_dxf(&[
        (0, "MTEXT"),
        (100, "AcDbEntity"),
        (8, "0"),
        (100, "AcDbMText"),
        (10, "1.0"),
        (20, "2.0"),
        (30, "0.0"),
        (40, "2.5"),
        (1, "\\A1;hello\\Pworld"),
        (101, "Embedded Object"),
        (70, "1"),
        (10, "1.0"),
        (20, "0.0"),
        (30, "0.0"),
        (11, "1.0"),
        (21, "2.0"),
        (31, "0.0"),
        (40, "30.0"),
        (41, "0.0"),
        (71, "0"),
        (72, "1"),
    ]);
    let decoded = decode_str(&text).expect("decode");
    assert!(!decoded.has_diagnostics(), "{:?}", decoded.diagnostics);
    assert_eq!(decoded.result.texts.len(), 1);
    assert_eq!(decoded.result.texts[0].content, "hello\nworld");
    assert_eq!(decoded.result.texts[0].insert, Point2::new(1.0, 2.0));
}

#[test]
fn unsupported_entities_are_reported_not_fatal() {
    let text = entities_dxf(&[
        (0, "3DSOLID"),
        (1, "blob"),
        (0, "INSERT"),
        (2, "MYBLOCK"),
        (0, "CIRCLE"),
        (10, "0"),
        (20, "0"),
        (40, "1"),
    ]);
    let decoded = decode_str(&text).expect("decode");
    assert_eq!(decoded.result.circles.len(), 1);
    let kinds: Vec<&str> = decoded
        .diagnostics
        .iter()
        .map(|d| d.entity.as_str())
        .collect();
    assert_eq!(kinds, ["3DSOLID", "INSERT"]);
    assert!(decoded.diagnostics.iter().all(|d| d.error.is_unsupported()));
}

#[test]
fn result_bounds_cover_decoded_geometry() {
    let decoded = decode(fixture("basic_entities.dxf")).expect("读取 DXF 失败");
    let bounds = decoded.result.bounds().expect("bounds");
    // ARC 从 30° 到 390° 实为整圆，最左 x = -4；最高点来自 CIRCLE（y = 7.5）。
    assert!((bounds.min().x() + 4.0).abs() < 1e-9);
    assert!((bounds.max().x() - 10.0).abs() < 1e-9);
    assert!((bounds.max().y() - 7.5).abs() < 1e-9);
}
