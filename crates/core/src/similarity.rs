use crate::domain::knowledge::{KnowledgeEntry, KnowledgeMatch};

/// Cosine similarity of two vectors. Mismatched dimensions or zero-length
/// vectors score 0.0.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let (mut dot, mut left_norm, mut right_norm) = (0.0f32, 0.0f32, 0.0f32);
    for (a, b) in left.iter().zip(right) {
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm.sqrt() * right_norm.sqrt())
}

/// In-process rendition of the `match_erasmus_knowledge` lookup: every entry
/// at or above `threshold`, best first, at most `limit` of them.
pub fn match_knowledge(
    entries: &[KnowledgeEntry],
    embedding: &[f32],
    threshold: f32,
    limit: usize,
) -> Vec<KnowledgeMatch> {
    let mut matches: Vec<KnowledgeMatch> = entries
        .iter()
        .map(|entry| (entry, cosine_similarity(&entry.embedding, embedding)))
        .filter(|(_, similarity)| *similarity >= threshold)
        .map(|(entry, similarity)| KnowledgeMatch {
            id: entry.id.clone(),
            source_type: entry.source_type.clone(),
            title: entry.title.clone(),
            content: entry.content.clone(),
            url: entry.url.clone(),
            similarity,
        })
        .collect();

    matches.sort_by(|left, right| {
        right.similarity.total_cmp(&left.similarity).then_with(|| left.id.cmp(&right.id))
    });
    matches.truncate(limit);
    matches
}
