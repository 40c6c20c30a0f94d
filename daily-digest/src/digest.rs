use crate::config::Language;
use crate::ranker::{group_by_category, top_n, CATEGORY_DISPLAY_LIMIT};
use crate::types::{Category, ScoredArticle};
use chrono::NaiveDateTime;

/// Detailed cards shown ahead of the category overview.
pub const CARD_COUNT: usize = 3;

/// Everything the Markdown document is built from.
///
/// `ranked` must already be in final order; rendering never re-sorts or
/// filters it.
#[derive(Debug, Clone)]
pub struct DigestInput<'a> {
    pub ranked: &'a [ScoredArticle],
    pub top_n: usize,
    pub trends: &'a str,
    pub window_hours: i64,
    pub source_count: usize,
    pub language: Language,
    pub generated_at: NaiveDateTime,
}

struct Labels {
    heading: &'static str,
    date_format: &'static str,
    highlights: &'static str,
    must_read: &'static str,
    score: &'static str,
    source: &'static str,
    original: &'static str,
    summary: &'static str,
    reason: &'static str,
    tags: &'static str,
    overview: &'static str,
}

const ZH: Labels = Labels {
    heading: "技术日报",
    date_format: "%Y年%m月%d日",
    highlights: "今日看点",
    must_read: "今日必读",
    score: "评分",
    source: "来源",
    original: "原文",
    summary: "摘要",
    reason: "推荐",
    tags: "标签",
    overview: "分类速览",
};

const EN: Labels = Labels {
    heading: "AI Daily Digest",
    date_format: "%Y-%m-%d",
    highlights: "Today's Highlights",
    must_read: "Must Read",
    score: "Score",
    source: "Source",
    original: "Original",
    summary: "Summary",
    reason: "Why read",
    tags: "Tags",
    overview: "By Category",
};

fn labels(language: Language) -> &'static Labels {
    match language {
        Language::Zh => &ZH,
        Language::En => &EN,
    }
}

pub fn category_label(category: Category, language: Language) -> &'static str {
    match (category, language) {
        (Category::AiMl, _) => "AI / ML",
        (Category::Security, Language::Zh) => "安全",
        (Category::Security, Language::En) => "Security",
        (Category::Engineering, Language::Zh) => "工程",
        (Category::Engineering, Language::En) => "Engineering",
        (Category::Tools, Language::Zh) => "工具 / 开源",
        (Category::Tools, Language::En) => "Tools / Open Source",
        (Category::Opinion, Language::Zh) => "观点 / 杂谈",
        (Category::Opinion, Language::En) => "Opinion",
        (Category::Other, Language::Zh) => "其他",
        (Category::Other, Language::En) => "Other",
    }
}

/// Document title, also handed to delivery sinks.
pub fn digest_title(language: Language, generated_at: &NaiveDateTime) -> String {
    let labels = labels(language);
    format!("{} | {}", labels.heading, generated_at.format(labels.date_format))
}

fn meta_line(input: &DigestInput<'_>) -> String {
    match input.language {
        Language::Zh => format!(
            "*从 {} 个顶级技术博客精选 | 近 {} 小时 | Top {} 必读*",
            input.source_count, input.window_hours, input.top_n
        ),
        Language::En => format!(
            "*Curated from {} top tech blogs | last {} hours | Top {} must-reads*",
            input.source_count, input.window_hours, input.top_n
        ),
    }
}

fn push_card(lines: &mut Vec<String>, position: usize, article: &ScoredArticle, input: &DigestInput<'_>) {
    let labels = labels(input.language);
    lines.push(format!("### {}. {}", position, article.display_title()));
    lines.push(String::new());
    lines.push(format!(
        "**{} {}** | {}: {}/10",
        article.category.emoji(),
        category_label(article.category, input.language),
        labels.score,
        article.score
    ));
    lines.push(String::new());
    lines.push(format!(
        "📰 **{}**: [{}]({})",
        labels.source, article.article.source_name, article.article.source_url
    ));
    lines.push(String::new());
    lines.push(format!(
        "🔗 **{}**: [{}]({})",
        labels.original, article.article.title, article.article.link
    ));
    lines.push(String::new());
    if let Some(summary) = &article.summary {
        lines.push(format!("📝 **{}**: {}", labels.summary, summary));
        lines.push(String::new());
    }
    if let Some(reason) = &article.reason {
        lines.push(format!("💡 **{}**: {}", labels.reason, reason));
        lines.push(String::new());
    }
    if !article.keywords.is_empty() {
        lines.push(format!("🏷️ **{}**: {}", labels.tags, article.keywords.join(", ")));
        lines.push(String::new());
    }
    lines.push("---".to_string());
    lines.push(String::new());
}

/// Assemble the digest. Output depends only on `input`.
pub fn render(input: &DigestInput<'_>) -> String {
    let labels = labels(input.language);
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("# 🚀 {}", digest_title(input.language, &input.generated_at)));
    lines.push(String::new());
    lines.push(meta_line(input));
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());

    lines.push(format!("## 📝 {}", labels.highlights));
    lines.push(String::new());
    lines.push(input.trends.to_string());
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());

    lines.push(format!("## 🏆 {}", labels.must_read));
    lines.push(String::new());
    let cards = top_n(input.ranked, input.top_n.min(CARD_COUNT));
    for (i, article) in cards.iter().enumerate() {
        push_card(&mut lines, i + 1, article, input);
    }

    lines.push(format!("## 📊 {}", labels.overview));
    lines.push(String::new());
    for (category, members) in group_by_category(input.ranked, CATEGORY_DISPLAY_LIMIT) {
        lines.push(format!(
            "### {} {}",
            category.emoji(),
            category_label(category, input.language)
        ));
        lines.push(String::new());
        for article in members {
            lines.push(format!(
                "- [{}]({}) - {} ({}: {})",
                article.display_title(),
                article.article.link,
                article.article.source_name,
                labels.score,
                article.score
            ));
        }
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.push(format!(
        "*Generated at {} by AI Daily Digest*",
        input.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push(String::new());
    lines.push(format!("*Sources: {} top tech blogs*", input.source_count));

    lines.join("\n")
}
