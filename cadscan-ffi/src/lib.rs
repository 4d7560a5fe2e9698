//! C 接口：`get_cad_data` 解码 DXF 文件并返回扁平的 `#[repr(C)]` 数组，
//! 调用方用完后必须交还给 `free_cad_data`。结构布局见 `include/cadscan.h`。

use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char, c_int};
use std::path::Path;
use std::ptr;

use cadscan_core::drawing::{ColorIndex, ExtractionResult};
use cadscan_core::geometry::Point2;
use cadscan_io::DxfDecoder;
use tracing::{debug, warn};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CadPoint {
    pub x: f64,
    pub y: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CadLine {
    pub start: CadPoint,
    pub end: CadPoint,
    pub color: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CadCircle {
    pub center: CadPoint,
    pub radius: f64,
    pub color: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CadArc {
    pub center: CadPoint,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub color: c_int,
}

#[repr(C)]
#[derive(Debug)]
pub struct CadPolyline {
    pub points: *mut CadPoint,
    pub point_count: c_int,
    pub is_closed: c_int,
    pub color: c_int,
}

#[repr(C)]
#[derive(Debug)]
pub struct CadText {
    pub content: *mut c_char,
    pub insert_point: CadPoint,
    pub color: c_int,
}

/// 各数组为空时对应指针为空、计数为 0。
#[repr(C)]
#[derive(Debug)]
pub struct CadDrawingData {
    pub lines: *mut CadLine,
    pub line_count: c_int,
    pub circles: *mut CadCircle,
    pub circle_count: c_int,
    pub arcs: *mut CadArc,
    pub arc_count: c_int,
    pub polylines: *mut CadPolyline,
    pub poly_count: c_int,
    pub texts: *mut CadText,
    pub text_count: c_int,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(message: impl Into<String>) {
    let message = message.into();
    warn!(error = %message, "get_cad_data 失败");
    let message = CString::new(message.replace('\0', "")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(message));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

impl From<Point2> for CadPoint {
    fn from(point: Point2) -> Self {
        Self {
            x: point.x(),
            y: point.y(),
        }
    }
}

fn color(color: ColorIndex) -> c_int {
    c_int::from(color.raw())
}

fn count(len: usize) -> Result<c_int, String> {
    c_int::try_from(len).map_err(|_| format!("实体数量 {len} 超出 C int 范围"))
}

/// 把 `Vec` 交给 C 侧持有，空集合返回空指针。
fn into_raw_array<T>(items: Vec<T>) -> Result<(*mut T, c_int), String> {
    let len = count(items.len())?;
    if items.is_empty() {
        return Ok((ptr::null_mut(), 0));
    }
    let boxed = items.into_boxed_slice();
    Ok((Box::into_raw(boxed).cast::<T>(), len))
}

/// # Safety
/// `data`/`len` 必须来自 [`into_raw_array`] 且尚未释放。
unsafe fn free_raw_array<T>(data: *mut T, len: c_int) -> Vec<T> {
    if data.is_null() {
        return Vec::new();
    }
    let len = usize::try_from(len).unwrap_or(0);
    let slice = ptr::slice_from_raw_parts_mut(data, len);
    unsafe { Box::from_raw(slice) }.into_vec()
}

fn to_c_string(content: &str) -> *mut c_char {
    // C 字符串不能包含内部 NUL
    CString::new(content.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

fn build_drawing_data(result: ExtractionResult) -> Result<CadDrawingData, String> {
    let lines: Vec<CadLine> = result
        .lines
        .into_iter()
        .map(|line| CadLine {
            start: line.start.into(),
            end: line.end.into(),
            color: color(line.color),
        })
        .collect();
    let circles: Vec<CadCircle> = result
        .circles
        .into_iter()
        .map(|circle| CadCircle {
            center: circle.center.into(),
            radius: circle.radius,
            color: color(circle.color),
        })
        .collect();
    let arcs: Vec<CadArc> = result
        .arcs
        .into_iter()
        .map(|arc| CadArc {
            center: arc.center.into(),
            radius: arc.radius,
            start_angle: arc.start_angle,
            end_angle: arc.end_angle,
            color: color(arc.color),
        })
        .collect();

    let mut polylines = Vec::with_capacity(result.polylines.len());
    for polyline in result.polylines {
        let points: Vec<CadPoint> = polyline.points.into_iter().map(CadPoint::from).collect();
        let (points, point_count) = into_raw_array(points)?;
        polylines.push(CadPolyline {
            points,
            point_count,
            is_closed: c_int::from(polyline.is_closed),
            color: color(polyline.color),
        });
    }
    let texts: Vec<CadText> = result
        .texts
        .into_iter()
        .map(|text| CadText {
            content: to_c_string(&text.content),
            insert_point: text.insert.into(),
            color: color(text.color),
        })
        .collect();

    let (lines, line_count) = into_raw_array(lines)?;
    let (circles, circle_count) = into_raw_array(circles)?;
    let (arcs, arc_count) = into_raw_array(arcs)?;
    let (polylines, poly_count) = into_raw_array(polylines)?;
    let (texts, text_count) = into_raw_array(texts)?;
    Ok(CadDrawingData {
        lines,
        line_count,
        circles,
        circle_count,
        arcs,
        arc_count,
        polylines,
        poly_count,
        texts,
        text_count,
    })
}

/// 解码 DXF 文件。结构性失败时返回空指针，原因可通过 [`cadscan_last_error`] 读取；
/// 单个实体的解码失败只会使该实体缺席。
///
/// # Safety
/// - `file_path` 必须为空指针或指向以 NUL 结尾的 UTF-8 路径
/// - 返回的非空指针必须且只能传给 [`free_cad_data`] 一次
#[unsafe(no_mangle)]
pub unsafe extern "C" fn get_cad_data(file_path: *const c_char) -> *mut CadDrawingData {
    clear_last_error();
    if file_path.is_null() {
        set_last_error("文件路径为空指针");
        return ptr::null_mut();
    }

    let path = match unsafe { CStr::from_ptr(file_path) }.to_str() {
        Ok(path) => path,
        Err(err) => {
            set_last_error(format!("文件路径不是有效的 UTF-8: {err}"));
            return ptr::null_mut();
        }
    };

    let decoded = match DxfDecoder::new().decode_file(Path::new(path)) {
        Ok(decoded) => decoded,
        Err(err) => {
            set_last_error(err.to_string());
            return ptr::null_mut();
        }
    };
    for diagnostic in &decoded.diagnostics {
        debug!(%diagnostic, "实体未导出");
    }

    match build_drawing_data(decoded.into_result()) {
        Ok(data) => Box::into_raw(Box::new(data)),
        Err(message) => {
            set_last_error(message);
            ptr::null_mut()
        }
    }
}

/// 释放 [`get_cad_data`] 返回的数据，包括所有嵌套数组与字符串。传入空指针时不做任何事。
///
/// # Safety
/// - `data` 必须为空指针或 [`get_cad_data`] 的返回值，且尚未释放
/// - 调用后该指针及其中所有嵌套指针均失效
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free_cad_data(data: *mut CadDrawingData) {
    if data.is_null() {
        return;
    }

    let data = unsafe { Box::from_raw(data) };
    unsafe {
        drop(free_raw_array(data.lines, data.line_count));
        drop(free_raw_array(data.circles, data.circle_count));
        drop(free_raw_array(data.arcs, data.arc_count));
        for polyline in free_raw_array(data.polylines, data.poly_count) {
            drop(free_raw_array(polyline.points, polyline.point_count));
        }
        for text in free_raw_array(data.texts, data.text_count) {
            if !text.content.is_null() {
                drop(CString::from_raw(text.content));
            }
        }
    }
}

/// 当前线程最近一次 [`get_cad_data`] 失败的原因；没有失败时返回空指针。
///
/// 返回的字符串归本库所有，在同一线程下一次调用 `get_cad_data` 前有效。
#[unsafe(no_mangle)]
pub extern "C" fn cadscan_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |message| message.as_ptr())
    })
}
