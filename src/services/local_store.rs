//! src/services/local_store.rs
//!
//! LocalObjectStore: the production [`ObjectStore`] backend. Object metadata
//! lives in SQLite; payloads live on local disk sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{object-id}`.

use crate::{
    models::{bucket::Bucket, metadata::ObjectMetadata, object::StoredObject},
    protocol::metadata::MetadataMap,
    services::object_store::{
        ByteStream, DEFAULT_CHUNK_SIZE, ObjectListing, ObjectStat, ObjectStore, ObjectSummary,
        StoreError, StoreResult,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, TryStreamExt, stream};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

/// Schema applied by [`LocalObjectStore::run_migrations`].
const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;
const LIST_PAGE_SIZE: usize = 1000;
/// Per-bucket directory holding in-flight uploads.
const STAGING_DIR: &str = ".staging";

#[derive(Clone)]
pub struct LocalObjectStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl LocalObjectStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Open (creating if needed) the SQLite database at `database_url` and the
    /// payload directory at `base_path`.
    pub async fn connect(database_url: &str, base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
                debug!("created database directory {}", parent.display());
            }
        }

        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self::new(Arc::new(pool), base_path))
    }

    /// Apply the embedded schema. Every statement is idempotent, so this runs
    /// on each startup as well as under `--migrate`.
    pub async fn run_migrations(&self) -> StoreResult<usize> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        for stmt in &statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }

        Ok(statements.len())
    }

    /// Storage keys are flat: one path component, no separators, no control
    /// bytes. Anything else cannot have been produced by the gateway.
    fn ensure_key_safe(&self, key: &str) -> StoreResult<()> {
        let invalid = key.is_empty()
            || key.len() > MAX_OBJECT_KEY_LEN
            || key == "."
            || key == ".."
            || key.chars().any(|c| c == '/' || c == '\\' || c.is_control());
        if invalid {
            return Err(StoreError::InvalidObjectKey(key.to_string()));
        }
        Ok(())
    }

    /// Validate bucket name format.
    ///
    /// Enforces S3-like naming rules:
    /// - 3–63 characters
    /// - lowercase letters, digits, dots, hyphens only
    /// - cannot start/end with dot or hyphen
    /// - cannot contain consecutive dots or dot-hyphen patterns
    /// - cannot look like an IPv4 address
    fn ensure_bucket_name_safe(&self, name: &str) -> StoreResult<()> {
        let reject = |reason: &str| -> StoreResult<()> {
            Err(StoreError::InvalidBucketName {
                name: name.to_string(),
                reason: reason.into(),
            })
        };

        let len = name.len();
        if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
            return reject("must be between 3 and 63 characters");
        }
        if !name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
        {
            return reject("allowed characters are lowercase letters, digits, dots, and hyphens");
        }
        if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
            return reject("must start and end with a lowercase letter or digit");
        }
        if name.contains("..") || name.contains("-.") || name.contains(".-") {
            return reject("cannot contain consecutive dots or dot-hyphen combinations");
        }
        if is_ipv4_like(name) {
            return reject("must not be formatted like an IP address");
        }
        Ok(())
    }

    fn bucket_root(&self, bucket_name: &str) -> PathBuf {
        self.base_path.join(bucket_name)
    }

    /// Two-level shard directories from MD5(bucket/key), 00–ff each.
    fn object_shards(bucket_name: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket_name, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Payload files are named after the object row id so that arbitrary
    /// Unicode keys never become filesystem names.
    fn object_path(&self, bucket_name: &str, key: &str, object_id: Uuid) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket_name, key);
        let mut path = self.bucket_root(bucket_name);
        path.push(shard_a);
        path.push(shard_b);
        path.push(object_id.simple().to_string());
        path
    }

    async fn fetch_bucket(&self, bucket: &str) -> StoreResult<Bucket> {
        self.ensure_bucket_name_safe(bucket)?;
        sqlx::query_as::<_, Bucket>("SELECT id, name, created_at FROM buckets WHERE name = ?")
            .bind(bucket)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => StoreError::BucketNotFound(bucket.to_string()),
                other => StoreError::Sqlx(other),
            })
    }

    async fn fetch_object(&self, bucket: &Bucket, key: &str) -> StoreResult<StoredObject> {
        sqlx::query_as::<_, StoredObject>(
            "SELECT id, bucket_id, key, content_type, size_bytes, etag, last_modified
             FROM objects
             WHERE key = ? AND bucket_id = ?",
        )
        .bind(key)
        .bind(bucket.id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::ObjectNotFound {
                bucket: bucket.name.clone(),
                key: key.to_string(),
            },
            other => StoreError::Sqlx(other),
        })
    }

    async fn fetch_metadata(&self, object_id: Uuid) -> StoreResult<MetadataMap> {
        let rows = sqlx::query_as::<_, ObjectMetadata>(
            "SELECT object_id, name, value FROM object_metadata WHERE object_id = ?",
        )
        .bind(object_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(rows.into_iter().map(|row| (row.name, row.value)).collect())
    }

    /// Upsert the object row and its metadata, then move the staged payload
    /// into place. The transaction only commits once the payload is in place.
    #[allow(clippy::too_many_arguments)]
    async fn commit_object(
        &self,
        bucket: &Bucket,
        key: &str,
        staged: &Path,
        size_bytes: u64,
        etag: &str,
        content_type: &str,
        metadata: &MetadataMap,
    ) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;

        let object_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO objects (
                id, bucket_id, key, content_type, size_bytes, etag, last_modified
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(bucket_id, key) DO UPDATE SET
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                last_modified = excluded.last_modified
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bucket.id)
        .bind(key)
        .bind(content_type)
        .bind(i64::try_from(size_bytes).unwrap_or(i64::MAX))
        .bind(etag)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM object_metadata WHERE object_id = ?")
            .bind(object_id)
            .execute(&mut *tx)
            .await?;
        for (name, value) in metadata.iter() {
            sqlx::query("INSERT INTO object_metadata (object_id, name, value) VALUES (?, ?, ?)")
                .bind(object_id)
                .bind(name)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        let file_path = self.object_path(&bucket.name, key, object_id);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(staged, &file_path).await?;

        if let Err(err) = tx.commit().await {
            discard(&file_path).await;
            return Err(StoreError::Sqlx(err));
        }

        debug!(bucket = %bucket.name, key, path = %file_path.display(), "stored object");
        Ok(())
    }

    /// Recursively remove empty directories up to bucket root.
    ///
    /// Stops when:
    /// - directory not empty
    /// - directory not found
    /// - reached root
    /// - encountered unexpected I/O errors
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    /// Stream the body into a staging file while computing size and MD5, then
    /// commit. The staging file is removed on every failure path.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: ByteStream,
        size_bytes: u64,
        content_type: &str,
        metadata: &MetadataMap,
    ) -> StoreResult<()> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;

        let staging = self.bucket_root(&bucket_rec.name).join(STAGING_DIR);
        fs::create_dir_all(&staging).await?;
        let tmp_path = staging.join(format!(".tmp-{}", Uuid::new_v4()));

        let (written, etag) = match write_payload(&tmp_path, body).await {
            Ok(done) => done,
            Err(err) => {
                discard(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        };

        if written != size_bytes {
            discard(&tmp_path).await;
            return Err(StoreError::SizeMismatch {
                key: key.to_string(),
                expected: size_bytes,
                actual: written,
            });
        }

        let committed = self
            .commit_object(
                &bucket_rec,
                key,
                &tmp_path,
                written,
                &etag,
                content_type,
                metadata,
            )
            .await;
        if committed.is_err() {
            discard(&tmp_path).await;
        }
        committed
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ByteStream> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self.fetch_object(&bucket_rec, key).await?;

        let file_path = self.object_path(&bucket_rec.name, key, object.id);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::ObjectNotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }
            } else {
                StoreError::Io(err)
            }
        })?;

        Ok(ReaderStream::with_capacity(file, DEFAULT_CHUNK_SIZE).boxed())
    }

    async fn stat_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectStat> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self.fetch_object(&bucket_rec, key).await?;
        let metadata = self.fetch_metadata(object.id).await?;

        Ok(ObjectStat {
            size_bytes: object.size(),
            last_modified: object.last_modified,
            content_type: object.content_type,
            metadata,
        })
    }

    /// Keyset pagination over `objects`, one page of [`LIST_PAGE_SIZE`] rows
    /// fetched at a time as the listing is consumed.
    async fn list_objects(&self, bucket: &str) -> StoreResult<ObjectListing> {
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let db = self.db.clone();
        let bucket_id = bucket_rec.id;

        let pages = stream::try_unfold(Some(String::new()), move |cursor| {
            let db = db.clone();
            async move {
                let Some(after) = cursor else {
                    return Ok(None);
                };
                let rows = fetch_page(&db, bucket_id, &after).await?;
                if rows.is_empty() {
                    return Ok(None);
                }
                let next = if rows.len() == LIST_PAGE_SIZE {
                    rows.last().map(|row| row.key.clone())
                } else {
                    None
                };
                let page = rows.into_iter().map(|row| {
                    Ok::<_, StoreError>(ObjectSummary {
                        size_bytes: row.size(),
                        key: row.key,
                        last_modified: row.last_modified,
                    })
                });
                Ok::<_, StoreError>(Some((stream::iter(page), next)))
            }
        });

        Ok(pages.try_flatten().boxed())
    }

    async fn remove_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.ensure_key_safe(key)?;
        let bucket_rec = self.fetch_bucket(bucket).await?;
        let object = self.fetch_object(&bucket_rec, key).await?;

        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM object_metadata WHERE object_id = ?")
            .bind(object.id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM objects WHERE id = ?")
            .bind(object.id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
        tx.commit().await?;

        let file_path = self.object_path(&bucket_rec.name, key, object.id);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            let bucket_root = self.bucket_root(&bucket_rec.name);
            self.prune_empty_dirs(parent, &bucket_root).await;
        }

        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool> {
        match self.fetch_bucket(bucket).await {
            Ok(_) => Ok(true),
            Err(StoreError::BucketNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn make_bucket(&self, bucket: &str) -> StoreResult<()> {
        self.ensure_bucket_name_safe(bucket)?;
        fs::create_dir_all(self.bucket_root(bucket)).await?;

        let record = Bucket {
            id: Uuid::new_v4(),
            name: bucket.to_string(),
            created_at: Utc::now(),
        };

        match sqlx::query("INSERT INTO buckets (id, name, created_at) VALUES (?, ?, ?)")
            .bind(record.id)
            .bind(&record.name)
            .bind(record.created_at)
            .execute(&*self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::BucketAlreadyExists(bucket.to_string()))
            }
            Err(err) => Err(StoreError::Sqlx(err)),
        }
    }
}

async fn fetch_page(
    db: &SqlitePool,
    bucket_id: Uuid,
    after: &str,
) -> StoreResult<Vec<StoredObject>> {
    let rows = sqlx::query_as::<_, StoredObject>(
        "SELECT id, bucket_id, key, content_type, size_bytes, etag, last_modified
         FROM objects
         WHERE bucket_id = ? AND key > ?
         ORDER BY key ASC
         LIMIT ?",
    )
    .bind(bucket_id)
    .bind(after)
    .bind(LIST_PAGE_SIZE as i64)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

async fn write_payload(path: &Path, mut body: ByteStream) -> io::Result<(u64, String)> {
    let mut file = File::create(path).await?;
    let mut written: u64 = 0;
    let mut digest = md5::Context::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        written += chunk.len() as u64;
        digest.consume(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;

    Ok((written, format!("{:x}", digest.compute())))
}

/// Best-effort removal of a file we own.
async fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        if err.kind() != ErrorKind::NotFound {
            debug!("failed to remove {}: {}", path.display(), err);
        }
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

/// Check if a string matches IPv4-like dotted decimal form.
/// Rejects names formatted like `1.2.3.4`.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    parts.iter().all(|segment| {
        !segment.is_empty()
            && segment.len() <= 3
            && segment.chars().all(|c| c.is_ascii_digit())
            && segment.parse::<u8>().is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::TempDir;

    const BUCKET: &str = "pdf-documents";

    async fn store() -> (LocalObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let db_url = format!("sqlite://{}", dir.path().join("meta/store.db").display());
        let store = LocalObjectStore::connect(&db_url, dir.path().join("objects"))
            .await
            .unwrap();
        store.run_migrations().await.unwrap();
        store.make_bucket(BUCKET).await.unwrap();
        (store, dir)
    }

    fn body(chunks: &[&'static [u8]]) -> ByteStream {
        let chunks: Vec<io::Result<Bytes>> =
            chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
        stream::iter(chunks).boxed()
    }

    async fn read_all(stream: ByteStream) -> Vec<u8> {
        stream
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    fn sample_metadata() -> MetadataMap {
        [
            ("X-Original-Name-Encoded", "r%C3%A9sum%C3%A9.pdf"),
            ("X-Upload-Date", "2025-01-01T00:00:00.000Z"),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn put_get_stat_roundtrip() {
        let (store, _dir) = store().await;
        let key = "0b7c-résumé.pdf";

        store
            .put_object(
                BUCKET,
                key,
                body(&[b"%PDF-1.4 ", b"hello"]),
                14,
                "application/pdf",
                &sample_metadata(),
            )
            .await
            .unwrap();

        let stat = store.stat_object(BUCKET, key).await.unwrap();
        assert_eq!(stat.size_bytes, 14);
        assert_eq!(stat.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(
            stat.metadata.get("x-original-name-encoded"),
            Some("r%C3%A9sum%C3%A9.pdf")
        );
        assert!(stat.metadata.iter().all(|(name, _)| name == name.to_ascii_lowercase()));

        let data = read_all(store.get_object(BUCKET, key).await.unwrap()).await;
        assert_eq!(data, b"%PDF-1.4 hello");
    }

    #[tokio::test]
    async fn size_mismatch_is_rejected_and_staging_cleaned() {
        let (store, dir) = store().await;

        let err = store
            .put_object(BUCKET, "k-short.pdf", body(&[b"abc"]), 10, "application/pdf", &MetadataMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SizeMismatch { expected: 10, actual: 3, .. }));

        let staging = dir.path().join("objects").join(BUCKET).join(STAGING_DIR);
        let mut entries = fs::read_dir(&staging).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());

        let err = store.stat_object(BUCKET, "k-short.pdf").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn failing_body_leaves_nothing_behind() {
        let (store, _dir) = store().await;
        let failing: ByteStream = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(ErrorKind::ConnectionReset, "client went away")),
        ])
        .boxed();

        let err = store
            .put_object(BUCKET, "k-broken.pdf", failing, 100, "application/pdf", &MetadataMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(store.get_object(BUCKET, "k-broken.pdf").await.is_err());
    }

    #[tokio::test]
    async fn zero_byte_objects_are_supported() {
        let (store, _dir) = store().await;
        store
            .put_object(BUCKET, "k-empty.pdf", body(&[]), 0, "application/pdf", &MetadataMap::new())
            .await
            .unwrap();

        assert_eq!(store.stat_object(BUCKET, "k-empty.pdf").await.unwrap().size_bytes, 0);
        assert!(read_all(store.get_object(BUCKET, "k-empty.pdf").await.unwrap()).await.is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_row_payload_and_empty_shards() {
        let (store, dir) = store().await;
        let key = "k-gone.pdf";
        store
            .put_object(BUCKET, key, body(&[b"x"]), 1, "application/pdf", &sample_metadata())
            .await
            .unwrap();

        store.remove_object(BUCKET, key).await.unwrap();

        assert!(store.stat_object(BUCKET, key).await.unwrap_err().is_not_found());
        let (shard_a, _) = LocalObjectStore::object_shards(BUCKET, key);
        assert!(!dir.path().join("objects").join(BUCKET).join(shard_a).exists());

        let err = store.remove_object(BUCKET, key).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn listing_is_key_ordered() {
        let (store, _dir) = store().await;
        for key in ["c-3.pdf", "a-1.pdf", "b-2.pdf"] {
            store
                .put_object(BUCKET, key, body(&[b"12"]), 2, "application/pdf", &MetadataMap::new())
                .await
                .unwrap();
        }

        let listed: Vec<ObjectSummary> = store
            .list_objects(BUCKET)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let keys: Vec<&str> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["a-1.pdf", "b-2.pdf", "c-3.pdf"]);
        assert!(listed.iter().all(|o| o.size_bytes == 2));
    }

    #[tokio::test]
    async fn unsafe_keys_read_as_not_found() {
        let (store, _dir) = store().await;
        for key in ["", "..", "../etc/passwd", "a\\b", "a\nb"] {
            assert!(store.stat_object(BUCKET, key).await.unwrap_err().is_not_found());
        }
        let dotted = "uuid-my..file.pdf";
        store
            .put_object(BUCKET, dotted, body(&[b"ok"]), 2, "application/pdf", &MetadataMap::new())
            .await
            .unwrap();
        assert!(store.stat_object(BUCKET, dotted).await.is_ok());
    }

    #[tokio::test]
    async fn bucket_provisioning() {
        let (store, _dir) = store().await;
        assert!(store.bucket_exists(BUCKET).await.unwrap());
        assert!(!store.bucket_exists("other-bucket").await.unwrap());
        assert!(matches!(
            store.make_bucket(BUCKET).await,
            Err(StoreError::BucketAlreadyExists(_))
        ));
        assert!(matches!(
            store.make_bucket("Bad_Name").await,
            Err(StoreError::InvalidBucketName { .. })
        ));
        assert!(matches!(
            store.make_bucket("192.168.1.1").await,
            Err(StoreError::InvalidBucketName { .. })
        ));
        assert!(matches!(
            store.list_objects("missing-bucket").await,
            Err(StoreError::BucketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let (store, _dir) = store().await;
        assert_eq!(store.run_migrations().await.unwrap(), 3);
        assert!(store.bucket_exists(BUCKET).await.unwrap());
    }
}
