//! MTEXT 行内格式控制符的去除规则。
//!
//! - `\P`、`\N` 转为换行，`\~` 转为空格；
//! - `\\`、`\{`、`\}` 还原为字面字符，未转义的 `{`、`}` 分组符直接去除；
//!   因此 `\\A1;` 输出字面文本 `\A1;`，这是输出中唯一可能出现 `\X...;` 形态的情况；
//! - `\L \l \O \o \K \k` 下划线/上划线/删除线开关直接去除；
//! - `\S上^下;` 堆叠文字保留为 `上/下`；
//! - `\U+XXXX` 转为对应的 Unicode 字符；
//! - 其余 `\字母...;` 形式（字体、字高、对齐、颜色、宽度、倾斜、间距、段落属性等）
//!   整段去除；若其后没有 `;`，只去除转义本身。

pub fn strip_mtext_formatting(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut result = String::with_capacity(raw.len());
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        i += 1;
        match ch {
            '{' | '}' => {}
            '\\' => {
                let Some(&escape) = chars.get(i) else {
                    break;
                };
                i += 1;
                match escape {
                    'P' | 'N' => result.push('\n'),
                    '~' => result.push(' '),
                    '\\' | '{' | '}' => result.push(escape),
                    'L' | 'l' | 'O' | 'o' | 'K' | 'k' => {}
                    'S' => {
                        let end = find_terminator(&chars, i).unwrap_or(chars.len());
                        for &stacked in &chars[i..end] {
                            match stacked {
                                '^' | '#' => result.push('/'),
                                other => result.push(other),
                            }
                        }
                        i = (end + 1).min(chars.len());
                    }
                    'U' => {
                        if let Some((decoded, consumed)) = unicode_escape(&chars[i..]) {
                            result.push(decoded);
                            i += consumed;
                        }
                    }
                    letter if letter.is_ascii_alphabetic() => {
                        if let Some(end) = find_terminator(&chars, i) {
                            i = end + 1;
                        }
                    }
                    other => result.push(other),
                }
            }
            other => result.push(other),
        }
    }
    result
}

fn find_terminator(chars: &[char], from: usize) -> Option<usize> {
    chars[from..]
        .iter()
        .position(|&c| c == ';')
        .map(|offset| from + offset)
}

/// 解析 `+XXXX`，返回字符与消耗的字符数。
fn unicode_escape(rest: &[char]) -> Option<(char, usize)> {
    if rest.first() != Some(&'+') || rest.len() < 5 {
        return None;
    }
    let hex: String = rest[1..5].iter().collect();
    let code = u32::from_str_radix(&hex, 16).ok()?;
    char::from_u32(code).map(|c| (c, 5))
}
