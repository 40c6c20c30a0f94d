use chrono::{TimeZone, Utc};
use daily_digest::ranker::{group_by_category, rank, top_n, CATEGORY_DISPLAY_LIMIT};
use daily_digest::{Article, Category, ScoreBreakdown, ScoredArticle};

fn scored(name: &str, score: u8, category: Category) -> ScoredArticle {
    let article = Article {
        title: name.to_string(),
        link: format!("https://example.com/{}", name),
        published_at: Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap(),
        description: String::new(),
        source_name: "example.com".to_string(),
        source_url: "https://example.com".to_string(),
    };
    ScoredArticle::new(article, ScoreBreakdown::new(score, score, score), category, Vec::new())
}

fn titles(articles: &[ScoredArticle]) -> Vec<&str> {
    articles.iter().map(|s| s.article.title.as_str()).collect()
}

#[test]
fn test_ties_keep_encounter_order() {
    let ranked = rank(vec![
        scored("a", 3, Category::Other),
        scored("b", 9, Category::Other),
        scored("c", 5, Category::Other),
        scored("d", 9, Category::Other),
    ]);

    assert_eq!(titles(&ranked), vec!["b", "d", "c", "a"]);
    assert_eq!(titles(top_n(&ranked, 2)), vec!["b", "d"]);
    assert_eq!(top_n(&ranked, 10).len(), 4);
}

#[test]
fn test_groups_follow_category_order_and_limit() {
    let mut input = vec![
        scored("tool", 8, Category::Tools),
        scored("sec", 4, Category::Security),
    ];
    for i in 0..7 {
        input.push(scored(&format!("ai{}", i), 7, Category::AiMl));
    }
    let ranked = rank(input);
    let groups = group_by_category(&ranked, CATEGORY_DISPLAY_LIMIT);

    let order: Vec<Category> = groups.iter().map(|(c, _)| *c).collect();
    assert_eq!(order, vec![Category::AiMl, Category::Security, Category::Tools]);

    let ai: Vec<&str> = groups[0].1.iter().map(|s| s.article.title.as_str()).collect();
    assert_eq!(ai, vec!["ai0", "ai1", "ai2", "ai3", "ai4"]);
}

#[test]
fn test_grouping_ignores_top_n_selection() {
    let ranked = rank(vec![
        scored("high", 9, Category::Opinion),
        scored("low", 2, Category::Engineering),
    ]);
    let _top = top_n(&ranked, 1);
    let groups = group_by_category(&ranked, CATEGORY_DISPLAY_LIMIT);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].0, Category::Engineering);
    assert_eq!(groups[0].1[0].article.title, "low");
}
