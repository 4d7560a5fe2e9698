//! `$DWGCODEPAGE` 到 `encoding_rs` 编码的映射。

use encoding_rs::Encoding;

/// AutoCAD 2007（AC1021）起 DXF 固定为 UTF-8，代码页声明不再生效。
pub fn version_uses_utf8(acad_version: &str) -> bool {
    let version = acad_version.trim();
    match version.strip_prefix("AC") {
        Some(number) => number.parse::<u32>().map(|n| n >= 1021).unwrap_or(false),
        None => false,
    }
}

/// 根据代码页名称（大小写不敏感）查找编码。
///
/// 返回 `None` 表示无需转码（UTF-8/ASCII）；未识别的名称回退为 windows-1252。
pub fn encoding_from_code_page(code_page: &str) -> Option<&'static Encoding> {
    match code_page.trim().to_ascii_lowercase().as_str() {
        "gb2312" | "ansi_936" => Some(encoding_rs::GBK),
        "big5" | "ansi_950" => Some(encoding_rs::BIG5),
        "korean" | "ansi_949" | "johab" => Some(encoding_rs::EUC_KR),
        "ansi_932" | "dos932" => Some(encoding_rs::SHIFT_JIS),
        "ansi_874" => Some(encoding_rs::WINDOWS_874),
        "ansi_1250" | "dos852" => Some(encoding_rs::WINDOWS_1250),
        "ansi_1251" => Some(encoding_rs::WINDOWS_1251),
        "ansi_1252" | "dos850" | "iso8859-1" | "iso_8859-1" => Some(encoding_rs::WINDOWS_1252),
        "ansi_1253" | "dos869" => Some(encoding_rs::WINDOWS_1253),
        "ansi_1254" | "dos857" => Some(encoding_rs::WINDOWS_1254),
        "ansi_1255" => Some(encoding_rs::WINDOWS_1255),
        "ansi_1256" => Some(encoding_rs::WINDOWS_1256),
        "ansi_1257" => Some(encoding_rs::WINDOWS_1257),
        "ansi_1258" => Some(encoding_rs::WINDOWS_1258),
        "dos855" | "dos866" => Some(encoding_rs::IBM866),
        "koi8-r" => Some(encoding_rs::KOI8_R),
        "koi8-u" => Some(encoding_rs::KOI8_U),
        "ascii" | "utf-8" | "utf8" | "unicode" => None,
        _ => Some(encoding_rs::WINDOWS_1252),
    }
}
