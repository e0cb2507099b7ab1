// 展示层辅助函数：进度文本、进度条、HTML 片段

use crate::types::{BookRecord, Recap, Selection};

const BAR_WIDTH: usize = 20;

/// 转义 HTML 并保留换行
pub fn escape_preserving_breaks(text: &str) -> String {
    html_escape::encode_text(text)
        .replace("\r\n", "\n")
        .replace('\n', "<br>")
}

/// 去掉控制字符，保留换行和制表符
pub fn sanitize_for_terminal(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// 文本进度条，如 `[#####---------------]`
pub fn progress_bar(percent: f64) -> String {
    let clamped = percent.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// "40% complete (2/5 segments)"
pub fn progress_line(record: &BookRecord) -> String {
    format!(
        "{:.0}% complete ({}/{} segments)",
        record.progress(),
        record.current_index,
        record.total_segments
    )
}

/// "Segment 3 of 10"
pub fn segment_heading(selection: &Selection) -> String {
    format!(
        "Segment {} of {}",
        selection.segment_index + 1,
        selection.total_segments
    )
}

/// 把选中的片段渲染为 HTML 片段，所有文本均已转义
pub fn selection_html(selection: &Selection, recap: Option<&Recap>) -> String {
    let mut html = String::new();

    html.push_str(&format!(
        "<div class='book-title'>📖 {}</div>\n",
        html_escape::encode_text(&selection.title)
    ));
    html.push_str(&format!("<p><em>{}</em></p>\n", segment_heading(selection)));

    if let Some(recap) = recap {
        html.push_str(&format!(
            "<div class='summary-box'>{}</div>\n",
            escape_preserving_breaks(&recap.text)
        ));
    }

    html.push_str(&format!(
        "<div class='reading-area'>{}</div>\n",
        escape_preserving_breaks(&selection.segment_text)
    ));
    html
}
