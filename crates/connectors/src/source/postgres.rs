use crate::error::ConnectorError;
use async_trait::async_trait;
use engine_core::{
    connectors::source::{BoxExtractor, Extractor, SourceStore},
    error::ExtractionError,
};
use model::records::source::{Author, Book, BookRow, Comment, Genre, SourceRow};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::{collections::VecDeque, sync::Arc};
use tokio_postgres::{Client, Config, NoTls, Row, config::SslMode};
use tracing::{debug, error, warn};

const QUERY_AUTHORS_SQL: &str = include_str!("sql/authors_page.sql");
const QUERY_GENRES_SQL: &str = include_str!("sql/genres_page.sql");
const QUERY_BOOKS_SQL: &str = include_str!("sql/books_page.sql");
const QUERY_COMMENTS_SQL: &str = include_str!("sql/comments_page.sql");

type RowMapper<S> = fn(&Row) -> Result<S, ExtractionError>;

/// PostgreSQL source read with keyset pagination.
#[derive(Clone)]
pub struct PgSource {
    client: Arc<Client>,
    page_size: i64,
    url: String,
}

impl PgSource {
    pub async fn connect(url: &str, page_size: usize) -> Result<Self, ConnectorError> {
        let client = connect_client(url).await?;
        Ok(PgSource {
            client: Arc::new(client),
            page_size: page_limit(page_size),
            url: redact(url),
        })
    }

    /// Round trip to the server.
    pub async fn ping(&self) -> Result<(), ConnectorError> {
        self.client.simple_query("SELECT 1").await?;
        Ok(())
    }

    fn extractor<S: SourceRow>(&self, sql: &'static str, map: RowMapper<S>) -> BoxExtractor<S> {
        Box::new(PgExtractor {
            client: self.client.clone(),
            sql,
            map,
            page_size: self.page_size,
            last_key: i64::MIN,
            buffer: VecDeque::new(),
            exhausted: false,
        })
    }
}

#[async_trait]
impl SourceStore for PgSource {
    async fn authors(&self) -> Result<BoxExtractor<Author>, ExtractionError> {
        Ok(self.extractor(QUERY_AUTHORS_SQL, |row| {
            Ok(Author {
                id: get(row, "author", "id")?,
                full_name: get(row, "author", "full_name")?,
            })
        }))
    }

    async fn genres(&self) -> Result<BoxExtractor<Genre>, ExtractionError> {
        Ok(self.extractor(QUERY_GENRES_SQL, |row| {
            Ok(Genre {
                id: get(row, "genre", "id")?,
                name: get(row, "genre", "name")?,
            })
        }))
    }

    async fn books(&self) -> Result<BoxExtractor<BookRow>, ExtractionError> {
        Ok(self.extractor(QUERY_BOOKS_SQL, map_book_row))
    }

    async fn comments(&self) -> Result<BoxExtractor<Comment>, ExtractionError> {
        Ok(self.extractor(QUERY_COMMENTS_SQL, |row| {
            Ok(Comment {
                id: get(row, "comment", "id")?,
                text: get(row, "comment", "text")?,
                book_id: get(row, "comment", "book_id")?,
            })
        }))
    }

    fn describe(&self) -> String {
        format!("postgres {}", self.url)
    }
}

fn map_book_row(row: &Row) -> Result<BookRow, ExtractionError> {
    let id: i64 = get(row, "book", "id")?;
    let author_id: i64 = get(row, "book", "author_id")?;
    let full_name: Option<String> = get(row, "book", "author_full_name")?;
    let genre_ids: Vec<i64> = get(row, "book", "genre_ids")?;

    let full_name = full_name.ok_or_else(|| ExtractionError::Malformed {
        entity: "book".to_string(),
        key: id.to_string(),
        reason: format!("author {author_id} does not exist"),
    })?;

    Ok(BookRow {
        book: Book {
            id,
            title: get(row, "book", "title")?,
            author_id,
            genre_ids: genre_ids.into_iter().collect(),
        },
        author: Author { id: author_id, full_name },
    })
}

fn get<'a, T>(row: &'a Row, entity: &str, column: &str) -> Result<T, ExtractionError>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(column).map_err(|e| ExtractionError::Malformed {
        entity: entity.to_string(),
        key: row
            .try_get::<_, i64>("id")
            .map(|k| k.to_string())
            .unwrap_or_else(|_| "?".to_string()),
        reason: format!("column {column}: {e}"),
    })
}

/// Fetches one page at a time, resuming after the last key seen.
struct PgExtractor<S> {
    client: Arc<Client>,
    sql: &'static str,
    map: RowMapper<S>,
    page_size: i64,
    last_key: i64,
    buffer: VecDeque<S>,
    exhausted: bool,
}

impl<S: SourceRow> PgExtractor<S> {
    async fn fetch_page(&mut self) -> Result<(), ExtractionError> {
        let rows = self
            .client
            .query(self.sql, &[&self.last_key, &self.page_size])
            .await
            .map_err(ConnectorError::from)?;

        debug!(after = self.last_key, fetched = rows.len(), "Fetched source page");

        if (rows.len() as i64) < self.page_size {
            self.exhausted = true;
        }
        for row in &rows {
            let item = (self.map)(row)?;
            self.last_key = item.key();
            self.buffer.push_back(item);
        }
        Ok(())
    }
}

#[async_trait]
impl<S: SourceRow> Extractor<S> for PgExtractor<S> {
    async fn next(&mut self) -> Result<Option<S>, ExtractionError> {
        if self.buffer.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }
        Ok(self.buffer.pop_front())
    }
}

async fn connect_client(url: &str) -> Result<Client, ConnectorError> {
    let config = url
        .parse::<Config>()
        .map_err(|e| ConnectorError::InvalidUrl(e.to_string()))?;

    match config.get_ssl_mode() {
        SslMode::Disable => connect_without_tls(config).await,
        SslMode::Prefer => match connect_with_tls(config.clone()).await {
            Ok(client) => Ok(client),
            Err(error) => {
                warn!(%error, "Postgres TLS handshake failed, retrying without TLS");
                connect_without_tls(config).await
            }
        },
        _ => connect_with_tls(config).await,
    }
}

async fn connect_with_tls(config: Config) -> Result<Client, ConnectorError> {
    let connector = TlsConnector::builder().build()?;
    let (client, connection) = config.connect(MakeTlsConnector::new(connector)).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(client)
}

async fn connect_without_tls(config: Config) -> Result<Client, ConnectorError> {
    let (client, connection) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(client)
}

/// `LIMIT` for one page. Sizes beyond `i64::MAX` saturate.
fn page_limit(page_size: usize) -> i64 {
    i64::try_from(page_size.max(1)).unwrap_or(i64::MAX)
}

/// Drops the password from a connection URL for logging.
pub fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            let creds = &url[scheme + 3..at];
            match creds.find(':') {
                Some(colon) => format!("{}{}:***{}", &url[..scheme + 3], &creds[..colon], &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
