pub mod delivery;

use crate::domain::fragment::{BatchResult, Fragment};
use crate::llm::Provider;
use chrono::NaiveDate;
use std::fmt::Write as _;

/// Names listed verbatim in the subject before collapsing to "X等N只".
const SUBJECT_MAX_NAMES: usize = 3;

const STYLE: &str = "body{font-family:-apple-system,'PingFang SC','Microsoft YaHei',sans-serif;max-width:960px;margin:0 auto;padding:16px;color:#222}\
table{border-collapse:collapse;margin:8px 0}th,td{border:1px solid #ccc;padding:4px 8px;text-align:right}\
section.unit{border-top:2px solid #1f4e79;margin-top:24px;padding-top:8px}\
section.unit-error{border-top-color:#c0392b;background:#fdf2f0;padding:8px}\
.summary,footer{color:#666;font-size:13px}";

#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub report_date: NaiveDate,
    pub provider: Provider,
    pub model: String,
}

/// Final deliverable document.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub subject: String,
    pub file_name: String,
    pub html: String,
}

pub fn assemble(batch: &BatchResult, meta: &ReportMeta) -> Report {
    let subject = subject_line(batch, meta);
    let mut html = String::new();

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"zh-CN\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n",
        escape_html(&subject)
    );
    let _ = writeln!(
        html,
        "<p class=\"summary\">报告日期：{} ｜ 模型：{}/{} ｜ 成功 {} / {} ｜ 批次 {}</p>",
        meta.report_date.format("%Y-%m-%d"),
        meta.provider,
        escape_html(&meta.model),
        batch.success_count,
        batch.fragments.len(),
        batch.run_id
    );

    for fragment in &batch.fragments {
        render_fragment(&mut html, fragment);
    }

    let _ = write!(
        html,
        "<footer>本报告由模型自动生成，不构成投资建议。</footer>\n</body>\n</html>\n"
    );

    Report {
        subject,
        file_name: format!("report_{}.html", meta.report_date.format("%Y-%m-%d")),
        html,
    }
}

fn render_fragment(out: &mut String, fragment: &Fragment) {
    match fragment {
        Fragment::Success { identity, html } => {
            let _ = write!(
                out,
                "<section class=\"unit\" data-code=\"{}\">\n{}\n</section>\n",
                escape_html(&identity.code),
                html
            );
        }
        Fragment::Failure {
            identity,
            kind,
            message,
        } => {
            let _ = write!(
                out,
                "<section class=\"unit unit-error\" data-code=\"{code}\">\n<h2>{name}({code}) 报告生成失败</h2>\n<p><strong>{kind}</strong>：{message}</p>\n</section>\n",
                code = escape_html(&identity.code),
                name = escape_html(&identity.name),
                kind = kind,
                message = escape_html(message),
            );
        }
    }
}

fn subject_line(batch: &BatchResult, meta: &ReportMeta) -> String {
    let names: Vec<&str> = batch
        .fragments
        .iter()
        .map(|f| f.identity().name.as_str())
        .collect();
    let who = if names.len() <= SUBJECT_MAX_NAMES {
        names.join("、")
    } else {
        format!("{}等{}只", names[0], names.len())
    };
    format!(
        "【{} 研报】{} - {}",
        meta.provider.as_str().to_ascii_uppercase(),
        who,
        meta.report_date.format("%Y-%m-%d")
    )
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
