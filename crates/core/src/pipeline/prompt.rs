use crate::domain::quote::QuoteSnapshot;
use crate::domain::security::SecurityIdentity;
use crate::signal::{SignalBlock, SignalBundle};
use chrono::NaiveDate;

/// Turnover amounts are reported in yuan; the prompt uses 亿元.
const HUNDRED_MILLION: f64 = 1e8;

const NO_ANNOUNCEMENTS: &str = "暂无可用的近期公告数据。";
const NO_SOCIAL: &str = "暂无可用的社交媒体讨论数据。";

/// Fixed daily-monitor template; only the report date varies per run.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub report_date: NaiveDate,
}

/// Everything the backend sees for one security. Rendered once.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub identity: &'a SecurityIdentity,
    pub snapshot: QuoteSnapshot,
    pub signals: SignalBundle,
    pub template: &'a PromptTemplate,
}

impl GenerationRequest<'_> {
    pub fn render(self) -> String {
        let id = self.identity;
        let q = &self.snapshot;
        let announcements = block_or(&self.signals.announcements, NO_ANNOUNCEMENTS);
        let social = social_section(&self.signals);

        format!(
            r#"你是一名长期跟踪{name}({code})的专业卖方分析师，负责撰写{report_date}的“单票监控日报”。

标的公司简介：{profile}

请根据下述数据输出一份结构化的 HTML 日报片段，内容专业、简洁、有观点，避免空泛套话。

【当日行情与技术数据】
- 日期：{date}
- 收盘价：{close:.2} 元，涨跌幅：{change_pct:.2}%，涨跌额：{change_amount:.2} 元
- 今开价：{open:.2} 元，昨收价：{previous_close:.2} 元，最高价：{high:.2} 元，最低价：{low:.2} 元
- 成交额：{amount_yi:.2} 亿元，成交量：{volume:.0} 手，换手率：{turnover_rate:.2}%，振幅：{amplitude:.2}%
- 均线：MA5={ma5:.2}，MA10={ma10:.2}，MA20={ma20:.2}

【近期公告】
{announcements}

【社交媒体舆情】
{social}

【写作任务】
以 <h1>{name}({code}) 单票监控日报</h1> 开头，依次输出以下模块：
一、<h2>当日核心结论</h2>：2~4 句话概括量价变化、驱动因素（情绪、基本面或事件）以及短期(1~2 周)与中期(3~6 个月)的定性观点。
二、<h2>当日交易与技术面</h2>：先给出一张 HTML 表格，列为 收盘价、今开价、昨收价、最高价、最低价、涨跌幅、成交额(亿元)、成交量(万手)、换手率、振幅、MA5、MA10、MA20，数值保留两位小数；再分析收盘价相对均线的位置、量价配合是否健康、是否接近重要支撑或压力位。
三、<h2>公告与舆情解读</h2>：结合上方公告与舆情材料说明可能的影响方向；若材料为空，请明确说明“暂无增量信息”，不要编造。
四、<h2>基本面与估值跟踪</h2>：在不编造具体财务数字的前提下，定性评估行业定位、成长逻辑、盈利与现金流质量、政策与竞争格局，以及估值所处的大致区间。
五、<h2>事件与风险跟踪</h2>：用无序列表列出未来 1~3 个月需要跟踪的公司、行业政策、市场资金层面的事件与风险，并说明不利结果的影响方向。
六、<h2>后续观察要点与策略思路</h2>：给出 2~3 个关键价格或技术信号、对中长期投资者的总体策略倾向，以及更适合关注的投资者类型。

【格式要求】
1) 只输出 HTML 片段，使用 <h1>、<h2>、<p>、<ul>、<li>、<table>、<thead>、<tbody>、<tr>、<th>、<td> 等标签；
2) 不要输出 Markdown 语法或代码块标记；
3) 不要虚构精确财务数字和监管结论；
4) 风格参考专业券商研报，理性、克制。
"#,
            name = id.name,
            code = id.code,
            report_date = self.template.report_date.format("%Y-%m-%d"),
            profile = id.profile_text(),
            date = q.date,
            close = q.close,
            change_pct = q.change_pct,
            change_amount = q.change_amount,
            open = q.open,
            previous_close = q.previous_close,
            high = q.high,
            low = q.low,
            amount_yi = q.turnover_amount / HUNDRED_MILLION,
            volume = q.volume,
            turnover_rate = q.turnover_rate_pct,
            amplitude = q.amplitude_pct,
            ma5 = q.ma5,
            ma10 = q.ma10,
            ma20 = q.ma20,
        )
    }
}

fn block_or<'a>(block: &'a SignalBlock, fallback: &'a str) -> &'a str {
    let text = block.text.trim();
    if text.is_empty() {
        fallback
    } else {
        text
    }
}

fn social_section(signals: &SignalBundle) -> String {
    let mut parts = Vec::new();
    let weibo = signals.social_weibo.text.trim();
    if !weibo.is_empty() {
        parts.push(format!("微博讨论摘录：\n{weibo}"));
    }
    let twitter = signals.social_twitter.text.trim();
    if !twitter.is_empty() {
        parts.push(format!("X(Twitter) 讨论摘录：\n{twitter}"));
    }
    if parts.is_empty() {
        NO_SOCIAL.to_string()
    } else {
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalStatus;

    fn snapshot() -> QuoteSnapshot {
        QuoteSnapshot {
            date: "2026-01-20".to_string(),
            open: 50.1,
            close: 51.234,
            previous_close: 49.9,
            high: 52.0,
            low: 49.5,
            volume: 123_456.0,
            turnover_amount: 630_000_000.0,
            amplitude_pct: 5.01,
            change_pct: 2.67,
            change_amount: 1.33,
            turnover_rate_pct: 1.25,
            ma5: 50.0,
            ma10: 49.0,
            ma20: 48.0,
        }
    }

    fn template() -> PromptTemplate {
        PromptTemplate {
            report_date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
        }
    }

    #[test]
    fn converts_amount_to_hundred_million_and_keeps_raw_volume() {
        let identity = SecurityIdentity::new("603087", "甘李药业");
        let template = template();
        let prompt = GenerationRequest {
            identity: &identity,
            snapshot: snapshot(),
            signals: SignalBundle::empty(),
            template: &template,
        }
        .render();

        assert!(prompt.contains("成交额：6.30 亿元"));
        assert!(prompt.contains("成交量：123456 手"));
        assert!(prompt.contains("收盘价：51.23 元"));
        assert!(prompt.contains("昨收价：49.90 元"));
        assert!(prompt.contains("MA5=50.00，MA10=49.00，MA20=48.00"));
        assert!(prompt.contains("甘李药业(603087)"));
        assert!(prompt.contains("2026-01-20"));
        assert!(prompt.contains(NO_ANNOUNCEMENTS));
        assert!(prompt.contains(NO_SOCIAL));
    }

    #[test]
    fn includes_available_signal_text() {
        let identity =
            SecurityIdentity::new("000001", "平安银行").with_profile("股份制商业银行龙头");
        let template = template();
        let mut signals = SignalBundle::empty();
        signals.announcements = SignalBlock {
            text: "- 2026-01-19 董事会决议公告".to_string(),
            status: SignalStatus::Ok,
        };
        signals.social_twitter = SignalBlock {
            text: "- [2026-01-19T08:00:00Z] 净息差承压".to_string(),
            status: SignalStatus::Ok,
        };

        let prompt = GenerationRequest {
            identity: &identity,
            snapshot: snapshot(),
            signals,
            template: &template,
        }
        .render();

        assert!(prompt.contains("股份制商业银行龙头"));
        assert!(prompt.contains("- 2026-01-19 董事会决议公告"));
        assert!(prompt.contains("X(Twitter) 讨论摘录"));
        assert!(!prompt.contains("微博讨论摘录"));
        assert!(!prompt.contains(NO_ANNOUNCEMENTS));
    }
}
