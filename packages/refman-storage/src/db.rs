use sqlx::{PgPool, Postgres, Transaction, postgres::PgPoolOptions};

use refman_domain::HeadValues;

use crate::{
	Result, schema,
	models::EntryRow,
	store::{BoxFuture, SearchField, Store, UnitOfWork},
};

const SELECT_ENTRY_ROWS: &str = "\
SELECT
	e.entry_id,
	e.title,
	e.author,
	e.publisher,
	e.url,
	e.details,
	COALESCE(
		array_agg(k.keyword ORDER BY k.keyword) FILTER (WHERE k.keyword IS NOT NULL),
		ARRAY[]::text[]
	) AS keywords
FROM entries e
LEFT JOIN entry_keywords k ON k.entry_id = e.entry_id";

pub struct Db {
	pub pool: PgPool,
}
impl Db {
	pub async fn connect(cfg: &refman_config::Postgres) -> Result<Self> {
		let pool =
			PgPoolOptions::new().max_connections(cfg.pool_max_conns).connect(&cfg.dsn).await?;

		Ok(Self { pool })
	}

	pub async fn ensure_schema(&self) -> Result<()> {
		let sql = schema::render_schema();
		let lock_id: i64 = 7_340_211;
		// Advisory locks are held per connection. Use a single transaction so the lock is scoped to
		// one connection and automatically released when the transaction ends.
		let mut tx = self.pool.begin().await?;

		sqlx::query("SELECT pg_advisory_xact_lock($1)").bind(lock_id).execute(&mut *tx).await?;

		for statement in sql.split(';') {
			let trimmed = statement.trim();

			if trimmed.is_empty() {
				continue;
			}

			sqlx::query(trimmed).execute(&mut *tx).await?;
		}

		tx.commit().await?;

		Ok(())
	}
}
impl Store for Db {
	fn begin(&self) -> BoxFuture<'_, Result<Box<dyn UnitOfWork>>> {
		Box::pin(async move {
			let tx = self.pool.begin().await?;

			Ok(Box::new(PgUnitOfWork { tx }) as Box<dyn UnitOfWork>)
		})
	}
}

pub struct PgUnitOfWork {
	tx: Transaction<'static, Postgres>,
}
impl UnitOfWork for PgUnitOfWork {
	fn insert_entry<'a>(
		&'a mut self,
		head: &'a HeadValues,
		details: &'a str,
	) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move {
			let entry_id = sqlx::query_scalar::<_, i64>(
				"\
INSERT INTO entries (title, author, publisher, url, details)
VALUES ($1, $2, $3, $4, $5)
RETURNING entry_id",
			)
			.bind(head.title.clone())
			.bind(head.author.clone())
			.bind(head.publisher.clone())
			.bind(head.url.clone())
			.bind(details)
			.fetch_one(&mut *self.tx)
			.await?;

			Ok(entry_id)
		})
	}

	fn lock_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move {
			let row = sqlx::query_scalar::<_, i64>(
				"SELECT entry_id FROM entries WHERE entry_id = $1 FOR UPDATE",
			)
			.bind(entry_id)
			.fetch_optional(&mut *self.tx)
			.await?;

			Ok(row.is_some())
		})
	}

	fn update_entry<'a>(
		&'a mut self,
		entry_id: i64,
		head: &'a HeadValues,
		details: &'a str,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let result = sqlx::query(
				"\
UPDATE entries
SET
	title = $1,
	author = $2,
	publisher = $3,
	url = $4,
	details = $5
WHERE entry_id = $6",
			)
			.bind(head.title.clone())
			.bind(head.author.clone())
			.bind(head.publisher.clone())
			.bind(head.url.clone())
			.bind(details)
			.bind(entry_id)
			.execute(&mut *self.tx)
			.await?;

			Ok(result.rows_affected() > 0)
		})
	}

	fn delete_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<bool>> {
		Box::pin(async move {
			let result = sqlx::query("DELETE FROM entries WHERE entry_id = $1")
				.bind(entry_id)
				.execute(&mut *self.tx)
				.await?;

			Ok(result.rows_affected() > 0)
		})
	}

	fn get_entries<'a>(&'a mut self, entry_ids: &'a [i64]) -> BoxFuture<'a, Result<Vec<EntryRow>>> {
		Box::pin(async move {
			let sql = format!(
				"{SELECT_ENTRY_ROWS}\nWHERE e.entry_id = ANY($1)\n\
				GROUP BY e.entry_id\nORDER BY e.entry_id"
			);
			let rows = sqlx::query_as::<_, EntryRow>(&sql)
				.bind(entry_ids.to_vec())
				.fetch_all(&mut *self.tx)
				.await?;

			Ok(rows)
		})
	}

	fn get_all_entries(&mut self) -> BoxFuture<'_, Result<Vec<EntryRow>>> {
		Box::pin(async move {
			let sql = format!("{SELECT_ENTRY_ROWS}\nGROUP BY e.entry_id\nORDER BY e.entry_id");
			let rows = sqlx::query_as::<_, EntryRow>(&sql).fetch_all(&mut *self.tx).await?;

			Ok(rows)
		})
	}

	fn list_entry_ids(&mut self) -> BoxFuture<'_, Result<Vec<i64>>> {
		Box::pin(async move {
			let ids = sqlx::query_scalar::<_, i64>("SELECT entry_id FROM entries ORDER BY entry_id")
				.fetch_all(&mut *self.tx)
				.await?;

			Ok(ids)
		})
	}

	fn search_by_substring<'a>(
		&'a mut self,
		field: SearchField,
		needle: &'a str,
	) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move {
			let predicate = match field {
				SearchField::Author => "EXISTS (SELECT 1 FROM unnest(author) AS a(name) \
					WHERE a.name ILIKE $1 ESCAPE '\\')",
				SearchField::Title => "title ILIKE $1 ESCAPE '\\'",
				SearchField::Publisher => "publisher ILIKE $1 ESCAPE '\\'",
			};
			let sql = format!("SELECT entry_id FROM entries WHERE {predicate} ORDER BY entry_id");
			let ids = sqlx::query_scalar::<_, i64>(&sql)
				.bind(like_pattern(needle))
				.fetch_all(&mut *self.tx)
				.await?;

			Ok(ids)
		})
	}

	fn list_keywords_by_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<Vec<String>>> {
		Box::pin(async move {
			let keywords = sqlx::query_scalar::<_, String>(
				"SELECT keyword FROM entry_keywords WHERE entry_id = $1 ORDER BY keyword",
			)
			.bind(entry_id)
			.fetch_all(&mut *self.tx)
			.await?;

			Ok(keywords)
		})
	}

	fn list_distinct_keywords(&mut self) -> BoxFuture<'_, Result<Vec<String>>> {
		Box::pin(async move {
			let keywords = sqlx::query_scalar::<_, String>(
				"SELECT DISTINCT keyword FROM entry_keywords ORDER BY keyword",
			)
			.fetch_all(&mut *self.tx)
			.await?;

			Ok(keywords)
		})
	}

	fn list_entry_ids_by_keyword<'a>(
		&'a mut self,
		keyword: &'a str,
	) -> BoxFuture<'a, Result<Vec<i64>>> {
		Box::pin(async move {
			let ids = sqlx::query_scalar::<_, i64>(
				"SELECT entry_id FROM entry_keywords WHERE keyword = $1 ORDER BY entry_id",
			)
			.bind(keyword)
			.fetch_all(&mut *self.tx)
			.await?;

			Ok(ids)
		})
	}

	fn list_keyword_entry_ids(&mut self) -> BoxFuture<'_, Result<Vec<i64>>> {
		Box::pin(async move {
			let ids = sqlx::query_scalar::<_, i64>(
				"SELECT DISTINCT entry_id FROM entry_keywords ORDER BY entry_id",
			)
			.fetch_all(&mut *self.tx)
			.await?;

			Ok(ids)
		})
	}

	fn insert_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		keyword: &'a str,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let result = sqlx::query(
				"\
INSERT INTO entry_keywords (entry_id, keyword)
VALUES ($1, $2)
ON CONFLICT (entry_id, keyword) DO NOTHING",
			)
			.bind(entry_id)
			.bind(keyword)
			.execute(&mut *self.tx)
			.await?;

			Ok(result.rows_affected() > 0)
		})
	}

	fn update_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		from: &'a str,
		to: &'a str,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let result = sqlx::query(
				"UPDATE entry_keywords SET keyword = $3 WHERE entry_id = $1 AND keyword = $2",
			)
			.bind(entry_id)
			.bind(from)
			.bind(to)
			.execute(&mut *self.tx)
			.await?;

			Ok(result.rows_affected())
		})
	}

	fn delete_keyword<'a>(
		&'a mut self,
		entry_id: i64,
		keyword: &'a str,
	) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let result =
				sqlx::query("DELETE FROM entry_keywords WHERE entry_id = $1 AND keyword = $2")
					.bind(entry_id)
					.bind(keyword)
					.execute(&mut *self.tx)
					.await?;

			Ok(result.rows_affected())
		})
	}

	fn delete_keywords_by_entry(&mut self, entry_id: i64) -> BoxFuture<'_, Result<u64>> {
		Box::pin(async move {
			let result = sqlx::query("DELETE FROM entry_keywords WHERE entry_id = $1")
				.bind(entry_id)
				.execute(&mut *self.tx)
				.await?;

			Ok(result.rows_affected())
		})
	}

	fn clear(&mut self) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			sqlx::query("DELETE FROM entry_keywords").execute(&mut *self.tx).await?;
			sqlx::query("DELETE FROM entries").execute(&mut *self.tx).await?;

			Ok(())
		})
	}

	fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
		let Self { tx } = *self;

		Box::pin(async move {
			tx.commit().await?;

			Ok(())
		})
	}
}

fn like_pattern(needle: &str) -> String {
	let mut pattern = String::with_capacity(needle.len() + 2);

	pattern.push('%');

	for ch in needle.chars() {
		if matches!(ch, '\\' | '%' | '_') {
			pattern.push('\\');
		}

		pattern.push(ch);
	}

	pattern.push('%');

	pattern
}
