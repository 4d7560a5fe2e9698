use std::io::{self, Write};
use std::path::Path;

use cadscan_core::geometry::Point2;
use cadscan_io::Decoded;

fn point(p: Point2) -> String {
    format!("({:.2}, {:.2})", p.x(), p.y())
}

/// 以人类可读的形式输出解码结果。
pub fn write_summary(out: &mut impl Write, path: &Path, decoded: &Decoded) -> io::Result<()> {
    let header = &decoded.header;
    let result = &decoded.result;

    writeln!(out, "文件：{}", path.display())?;
    writeln!(
        out,
        "版本：{}，代码页：{}",
        header.acad_version.as_deref().unwrap_or("未知"),
        header.code_page.as_deref().unwrap_or("未知")
    )?;
    writeln!(
        out,
        "实体统计：线段 {}，圆 {}，圆弧 {}，多段线 {}，文字 {}",
        result.lines.len(),
        result.circles.len(),
        result.arcs.len(),
        result.polylines.len(),
        result.texts.len()
    )?;
    match result.bounds() {
        Some(bounds) => writeln!(
            out,
            "范围：{} - {}，中心 {}，宽 {:.2}，高 {:.2}",
            point(bounds.min()),
            point(bounds.max()),
            point(bounds.center()),
            bounds.width(),
            bounds.height()
        )?,
        None => writeln!(out, "范围：无")?,
    }

    if !result.is_empty() {
        writeln!(out, "实体：")?;
    }
    for line in &result.lines {
        writeln!(
            out,
            "  - 线段 起点={} 终点={} 颜色={}",
            point(line.start),
            point(line.end),
            line.color
        )?;
    }
    for circle in &result.circles {
        writeln!(
            out,
            "  - 圆 圆心={} 半径={:.2} 颜色={}",
            point(circle.center),
            circle.radius,
            circle.color
        )?;
    }
    for arc in &result.arcs {
        writeln!(
            out,
            "  - 圆弧 圆心={} 半径={:.2} 起始角={:.1}° 结束角={:.1}° 颜色={}",
            point(arc.center),
            arc.radius,
            arc.start_angle,
            arc.end_angle,
            arc.color
        )?;
    }
    for polyline in &result.polylines {
        let coords: Vec<String> = polyline.points.iter().map(|p| point(*p)).collect();
        writeln!(
            out,
            "  - 多段线 顶点数={} 闭合={} 颜色={}: {}",
            polyline.points.len(),
            polyline.is_closed,
            polyline.color,
            coords.join(" -> ")
        )?;
    }
    for text in &result.texts {
        writeln!(
            out,
            "  - 文字 插入点={} 颜色={} 内容={:?}",
            point(text.insert),
            text.color,
            text.content
        )?;
    }

    if decoded.has_diagnostics() {
        writeln!(out, "诊断（{} 条）：", decoded.diagnostics.len())?;
        for diagnostic in &decoded.diagnostics {
            writeln!(out, "  - {diagnostic}")?;
        }
    }
    Ok(())
}

pub fn write_json(out: &mut impl Write, decoded: &Decoded, pretty: bool) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, decoded)?;
    } else {
        serde_json::to_writer(&mut *out, decoded)?;
    }
    writeln!(out)
}
