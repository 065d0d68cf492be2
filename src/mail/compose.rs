use chrono::{DateTime, Local};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::config::Language;
use crate::pipeline::ClassifiedArticle;

/// Subject line and HTML body of one digest email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub subject: String,
    pub html: String,
}

struct Strings {
    subject: &'static str,
    headline: &'static str,
    count: &'static str,
    addition: &'static str,
    removal: &'static str,
    unknown_date: &'static str,
    read_more: &'static str,
    footer: &'static str,
    date_format: &'static str,
}

const KO: Strings = Strings {
    subject: "🎮 Game Pass 업데이트 알림 - {n}개 소식",
    headline: "새로운 업데이트가 있습니다!",
    count: "📊 총 {n}개의 새로운 소식",
    addition: "✅ 게임 추가",
    removal: "⏰ 게임 제거",
    unknown_date: "날짜 불명",
    read_more: "전체 기사 보기 →",
    footer: "Game Pass 게임 목록 변화만 선별하여 알려드립니다.",
    date_format: "%Y년 %m월 %d일",
};

const EN: Strings = Strings {
    subject: "🎮 Game Pass update - {n} new",
    headline: "There are new updates!",
    count: "📊 {n} new stories",
    addition: "✅ Added",
    removal: "⏰ Leaving",
    unknown_date: "Date unknown",
    read_more: "Read the full article →",
    footer: "Only Game Pass catalogue changes are selected for this digest.",
    date_format: "%B %d, %Y",
};

const STYLE: &str = "body{font-family:-apple-system,'Segoe UI',Arial,sans-serif;line-height:1.6;color:#333;margin:0}\
.container{max-width:600px;margin:0 auto}\
.header{background:#107C10;color:#fff;padding:30px 20px;text-align:center}\
.stats{background:#f0f8f0;padding:15px;border-radius:8px;margin:20px 0;text-align:center}\
.article{margin:20px 0;padding:20px;border-radius:12px;border-left:4px solid #107C10;box-shadow:0 2px 10px rgba(0,0,0,.1)}\
.article-title{font-size:20px;font-weight:600;color:#107C10}\
.article-meta{font-size:13px;color:#666}\
.tag{display:inline-block;padding:4px 12px;border-radius:20px;font-size:12px;margin-right:8px}\
.tag-addition{background:#d1f2d1;color:#0f5132}\
.tag-removal{background:#f8d7da;color:#842029}\
.footer{text-align:center;margin:40px 0;font-size:13px;color:#666}";

fn strings(language: Language) -> &'static Strings {
    match language {
        Language::Ko => &KO,
        Language::En => &EN,
    }
}

/// Builds the digest email for the given articles.
///
/// All feed-provided text is HTML-escaped; links are escaped as attribute values.
pub fn compose_digest(
    articles: &[ClassifiedArticle],
    language: Language,
    now: DateTime<Local>,
) -> Digest {
    let s = strings(language);
    let n = articles.len().to_string();

    let mut html = String::with_capacity(2048 + articles.len() * 512);
    html.push_str("<!DOCTYPE html><html><head><meta charset=\"UTF-8\"><style>");
    html.push_str(STYLE);
    html.push_str("</style></head><body><div class=\"container\">");
    html.push_str(&format!(
        "<div class=\"header\"><h1>🎮 Xbox Game Pass</h1><p>{}</p></div>",
        s.headline
    ));
    html.push_str(&format!(
        "<div class=\"stats\"><strong>{}</strong><br><small>{}</small></div>",
        s.count.replace("{n}", &n),
        now.format(s.date_format)
    ));

    for article in articles {
        let mut tags = String::new();
        if article.is_addition {
            tags.push_str(&format!(
                "<span class=\"tag tag-addition\">{}</span>",
                s.addition
            ));
        }
        if article.is_removal {
            tags.push_str(&format!(
                "<span class=\"tag tag-removal\">{}</span>",
                s.removal
            ));
        }

        html.push_str(&format!(
            "<div class=\"article\">\
             <div class=\"article-title\">{title}</div>\
             <div class=\"article-meta\">📅 {published}</div>\
             <div class=\"tags\">{tags}</div>\
             <div class=\"article-summary\">{summary}</div>\
             <a href=\"{link}\">{read_more}</a>\
             </div>",
            title = encode_text(&article.title),
            published = encode_text(article.published.as_deref().unwrap_or(s.unknown_date)),
            tags = tags,
            summary = encode_text(&article.summary),
            link = encode_double_quoted_attribute(&article.link),
            read_more = s.read_more,
        ));
    }

    html.push_str(&format!(
        "<div class=\"footer\"><p>{}</p></div></div></body></html>",
        s.footer
    ));

    Digest {
        subject: s.subject.replace("{n}", &n),
        html,
    }
}
