use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{KeywordRepo, RepoError},
    domain::content::{ContentEntry, ContentKind, MediaColumn, NewContent},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ContentRow {
    id: Uuid,
    keyword: String,
    value: String,
    image: Option<String>,
    create_time: OffsetDateTime,
    update_time: OffsetDateTime,
}

impl ContentRow {
    fn into_entry<K: ContentKind>(self) -> ContentEntry<K> {
        ContentEntry {
            id: self.id,
            keyword: self.keyword,
            value: self.value,
            media: K::Media::decode(self.image),
            created_at: self.create_time,
            updated_at: self.update_time,
        }
    }
}

fn push_returning_columns<K: ContentKind>(qb: &mut QueryBuilder<'_, Postgres>) {
    qb.push("id, keyword, value, ");
    match <K::Media as MediaColumn>::COLUMN {
        Some(column) => qb.push(column).push(" AS image"),
        None => qb.push("NULL::text AS image"),
    };
    qb.push(", create_time, update_time");
}

#[async_trait]
impl<K: ContentKind> KeywordRepo<K> for PostgresRepositories {
    async fn insert(&self, content: NewContent<K>) -> Result<ContentEntry<K>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO ");
        qb.push(K::TABLE).push(" (keyword, value");
        if let Some(column) = <K::Media as MediaColumn>::COLUMN {
            qb.push(", ").push(column);
        }
        qb.push(") VALUES (");
        qb.push_bind(content.keyword).push(", ").push_bind(content.value);
        if <K::Media as MediaColumn>::COLUMN.is_some() {
            qb.push(", ")
                .push_bind(content.media.encode().unwrap_or_default());
        }
        qb.push(") RETURNING ");
        push_returning_columns::<K>(&mut qb);

        let row = qb
            .build_query_as::<ContentRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into_entry())
    }

    async fn update(&self, keyword: &str, content: NewContent<K>) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE ");
        qb.push(K::TABLE).push(" SET value = ").push_bind(content.value);
        if let Some(column) = <K::Media as MediaColumn>::COLUMN {
            qb.push(", ")
                .push(column)
                .push(" = ")
                .push_bind(content.media.encode().unwrap_or_default());
        }
        qb.push(", update_time = now() WHERE keyword = ")
            .push_bind(keyword);

        let result = qb
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, keyword: &str) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM ");
        qb.push(K::TABLE).push(" WHERE keyword = ").push_bind(keyword);

        let result = qb
            .build()
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn find(&self, keyword: &str) -> Result<Option<ContentEntry<K>>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        push_returning_columns::<K>(&mut qb);
        qb.push(" FROM ")
            .push(K::TABLE)
            .push(" WHERE keyword = ")
            .push_bind(keyword);

        let row = qb
            .build_query_as::<ContentRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(ContentRow::into_entry))
    }

    async fn list_keywords(&self) -> Result<Vec<String>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT keyword FROM ");
        qb.push(K::TABLE).push(" ORDER BY keyword");

        qb.build_query_scalar::<String>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)
    }
}
