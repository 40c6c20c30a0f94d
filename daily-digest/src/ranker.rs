use crate::types::{Category, ScoredArticle};

/// Entries listed per category in the overview section.
pub const CATEGORY_DISPLAY_LIMIT: usize = 5;

/// Highest aggregate score first; ties keep their encounter order.
pub fn rank(mut scored: Vec<ScoredArticle>) -> Vec<ScoredArticle> {
    // `sort_by` is stable.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

pub fn top_n(ranked: &[ScoredArticle], n: usize) -> &[ScoredArticle] {
    &ranked[..n.min(ranked.len())]
}

/// Populated categories in declaration order, each holding at most `limit`
/// articles in ranked order. Independent of any top-N selection.
pub fn group_by_category(ranked: &[ScoredArticle], limit: usize) -> Vec<(Category, Vec<&ScoredArticle>)> {
    Category::ALL
        .into_iter()
        .filter_map(|category| {
            let members: Vec<&ScoredArticle> = ranked
                .iter()
                .filter(|s| s.category == category)
                .take(limit)
                .collect();
            (!members.is_empty()).then_some((category, members))
        })
        .collect()
}
