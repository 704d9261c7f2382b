use sqlx::Row;

use horizon_core::domain::knowledge::KnowledgeEntry;

use super::{
    decode_err, decode_json, encode_json, format_timestamp, parse_timestamp, KnowledgeRepository,
    RepositoryError,
};
use crate::DbPool;

/// Embeddings are stored as JSON arrays and scored in process; SQLite has no
/// vector index to delegate the similarity search to.
pub struct SqlKnowledgeRepository {
    pool: DbPool,
}

impl SqlKnowledgeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<KnowledgeEntry, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let source_type: String = row.try_get("source_type").map_err(decode_err)?;
    let title: String = row.try_get("title").map_err(decode_err)?;
    let content: String = row.try_get("content").map_err(decode_err)?;
    let url: Option<String> = row.try_get("url").map_err(decode_err)?;
    let embedding: String = row.try_get("embedding").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(KnowledgeEntry {
        id,
        source_type,
        title,
        content,
        url,
        embedding: decode_json("embedding", &embedding)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl KnowledgeRepository for SqlKnowledgeRepository {
    async fn list_all(&self) -> Result<Vec<KnowledgeEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, source_type, title, content, url, embedding, created_at
             FROM knowledge_entries ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn save(&self, entry: KnowledgeEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO knowledge_entries (id, source_type, title, content, url, embedding,
                                            created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 source_type = excluded.source_type,
                 title = excluded.title,
                 content = excluded.content,
                 url = excluded.url,
                 embedding = excluded.embedding",
        )
        .bind(&entry.id)
        .bind(&entry.source_type)
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(&entry.url)
        .bind(encode_json("embedding", &entry.embedding)?)
        .bind(format_timestamp(entry.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use horizon_core::domain::knowledge::KnowledgeEntry;

    use super::SqlKnowledgeRepository;
    use crate::repositories::KnowledgeRepository;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn search_scores_stored_embeddings() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlKnowledgeRepository::new(pool);

        for (id, embedding) in [("kb-a", vec![1.0, 0.0, 0.0]), ("kb-b", vec![0.0, 1.0, 0.0])] {
            repo.save(KnowledgeEntry {
                id: id.to_string(),
                source_type: "best_practices".to_string(),
                title: id.to_uppercase(),
                content: "Blended mobility with virtual preparation".to_string(),
                url: None,
                embedding,
                created_at: Utc::now(),
            })
            .await
            .expect("save entry");
        }

        let matches = repo.search(&[0.9, 0.1, 0.0], 0.5, 5).await.expect("search");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "kb-a");
    }

    #[tokio::test]
    async fn unknown_source_type_violates_schema() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlKnowledgeRepository::new(pool);

        let result = repo
            .save(KnowledgeEntry {
                id: "kb-x".to_string(),
                source_type: "rumours".to_string(),
                title: "x".to_string(),
                content: "x".to_string(),
                url: None,
                embedding: vec![],
                created_at: Utc::now(),
            })
            .await;
        assert!(result.is_err());
    }
}
