use serde::{Deserialize, Serialize};

/// 公式文本片段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Plain,
    Subscript,
    Superscript,
}

/// 公式渲染片段
///
/// 渲染层按 `kind` 把每段映射为普通文本、下标或上标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Plain,
            text: text.into(),
        }
    }

    pub fn subscript(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Subscript,
            text: text.into(),
        }
    }

    pub fn superscript(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Superscript,
            text: text.into(),
        }
    }
}

/// 把带 `_`/`^` 标记的公式文本切分为片段
///
/// 单次从左到右扫描：
/// - `_X` / `^X`：单个字符 X 作为下标/上标
/// - `_{...}` / `^{...}`：到下一个 `}` 为止的内容作为下标/上标（不支持嵌套）
/// - 其余字符累积为普通文本，遇到上下标前和结尾时输出
///
/// 畸形输入按字面文本处理：结尾的孤立 `_`/`^`、找不到 `}` 的 `_{` 都原样保留。
///
/// # 参数
/// - `input`: 公式文本
///
/// # 返回
/// 按出现顺序排列的片段列表
pub fn render(input: &str) -> Vec<Segment> {
    let chars: Vec<char> = input.chars().collect();
    let mut segments = Vec::new();
    let mut pending = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let kind = match c {
            '_' => Some(SegmentKind::Subscript),
            '^' => Some(SegmentKind::Superscript),
            _ => None,
        };

        let Some(kind) = kind else {
            pending.push(c);
            i += 1;
            continue;
        };

        match scan_script(&chars, i + 1) {
            Some((text, next)) => {
                flush(&mut segments, &mut pending);
                segments.push(Segment { kind, text });
                i = next;
            }
            None => {
                // 无法构成上下标，标记符按普通字符处理
                pending.push(c);
                i += 1;
            }
        }
    }

    flush(&mut segments, &mut pending);
    segments
}

/// 读取标记符之后的上下标内容
///
/// # 返回
/// (内容, 下一个扫描位置)；结尾孤立标记符或未闭合的 `{` 返回 None
fn scan_script(chars: &[char], start: usize) -> Option<(String, usize)> {
    let first = *chars.get(start)?;
    if first != '{' {
        return Some((first.to_string(), start + 1));
    }

    let close = chars[start + 1..].iter().position(|&c| c == '}')?;
    let body: String = chars[start + 1..start + 1 + close].iter().collect();
    Some((body, start + close + 2))
}

fn flush(segments: &mut Vec<Segment>, pending: &mut String) {
    if !pending.is_empty() {
        segments.push(Segment::plain(std::mem::take(pending)));
    }
}

/// 把片段渲染为 HTML 片段（`<sub>`/`<sup>`），文本做转义
pub fn to_html(segments: &[Segment]) -> String {
    let mut html = String::new();
    for segment in segments {
        let text = html_escape::encode_text(&segment.text);
        match segment.kind {
            SegmentKind::Plain => html.push_str(&text),
            SegmentKind::Subscript => {
                html.push_str("<sub>");
                html.push_str(&text);
                html.push_str("</sub>");
            }
            SegmentKind::Superscript => {
                html.push_str("<sup>");
                html.push_str(&text);
                html.push_str("</sup>");
            }
        }
    }
    html
}

/// 去掉上下标结构，只保留文本
pub fn to_plain_text(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_single_segment() {
        assert_eq!(render("F = ma"), vec![Segment::plain("F = ma")]);
    }

    #[test]
    fn test_empty_input() {
        assert!(render("").is_empty());
    }

    #[test]
    fn test_braced_subscript() {
        assert_eq!(
            render("v_{rms}"),
            vec![Segment::plain("v"), Segment::subscript("rms")]
        );
    }

    #[test]
    fn test_single_char_superscript() {
        assert_eq!(
            render("x^2"),
            vec![Segment::plain("x"), Segment::superscript("2")]
        );
    }

    #[test]
    fn test_multiple_subscripts() {
        assert_eq!(
            render("T_{c}/T_{h}"),
            vec![
                Segment::plain("T"),
                Segment::subscript("c"),
                Segment::plain("/T"),
                Segment::subscript("h"),
            ]
        );
    }

    #[test]
    fn test_empty_braces() {
        assert_eq!(
            render("a_{}"),
            vec![Segment::plain("a"), Segment::subscript("")]
        );
    }

    #[test]
    fn test_single_char_takes_only_one() {
        assert_eq!(
            render("x_0 + v_0t"),
            vec![
                Segment::plain("x"),
                Segment::subscript("0"),
                Segment::plain(" + v"),
                Segment::subscript("0"),
                Segment::plain("t"),
            ]
        );
    }

    #[test]
    fn test_leading_script_has_no_empty_plain() {
        assert_eq!(render("^2"), vec![Segment::superscript("2")]);
    }

    #[test]
    fn test_adjacent_scripts() {
        assert_eq!(
            render("x_1^2"),
            vec![
                Segment::plain("x"),
                Segment::subscript("1"),
                Segment::superscript("2"),
            ]
        );
    }

    #[test]
    fn test_trailing_sigil_is_literal() {
        assert_eq!(render("x_"), vec![Segment::plain("x_")]);
        assert_eq!(render("^"), vec![Segment::plain("^")]);
    }

    #[test]
    fn test_unterminated_brace_is_literal() {
        let segments = render("unterminated_{brace");
        assert_eq!(segments, vec![Segment::plain("unterminated_{brace")]);
    }

    #[test]
    fn test_unterminated_brace_after_valid_script() {
        assert_eq!(
            render("a^2 + b_{x"),
            vec![
                Segment::plain("a"),
                Segment::superscript("2"),
                Segment::plain(" + b_{x"),
            ]
        );
    }

    #[test]
    fn test_no_nested_braces() {
        // 第一个 `}` 结束下标，剩余的 `}` 作为普通文本
        assert_eq!(
            render("a_{b{c}}"),
            vec![
                Segment::plain("a"),
                Segment::subscript("b{c"),
                Segment::plain("}"),
            ]
        );
    }

    #[test]
    fn test_multibyte_characters() {
        assert_eq!(
            render("ΔE_{int} = Q − W"),
            vec![
                Segment::plain("ΔE"),
                Segment::subscript("int"),
                Segment::plain(" = Q − W"),
            ]
        );
        assert_eq!(
            render("θ_é"),
            vec![Segment::plain("θ"), Segment::subscript("é")]
        );
    }

    #[test]
    fn test_sigil_as_script_content() {
        assert_eq!(
            render("a__"),
            vec![Segment::plain("a"), Segment::subscript("_")]
        );
    }

    #[test]
    fn test_to_html() {
        let html = to_html(&render("v_{rms} < c^2"));
        assert_eq!(html, "v<sub>rms</sub> &lt; c<sup>2</sup>");
    }

    #[test]
    fn test_to_plain_text() {
        assert_eq!(to_plain_text(&render("T_{c}/T_{h}")), "Tc/Th");
    }

    #[test]
    fn test_segment_serialization() {
        let json = serde_json::to_string(&Segment::subscript("rms")).unwrap();
        assert_eq!(json, r#"{"kind":"subscript","text":"rms"}"#);
    }
}
