//! SQLite-backed local mirror of the remote feed.
//!
//! The store is the single source of truth for display. It keeps posts and
//! the remote paging bookmarks, and republishes the visible post list on a
//! [`watch`] channel after every mutation, which is the only path by which
//! changes reach the presentation layer.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, Row, params};
use tokio::sync::watch;

use crate::error::Result;
use crate::model::{Attachment, KeyKind, Post, RemoteKey};

const POST_COLUMNS: &str = "id, author, author_id, content, published, liked_by_me, likes, \
     author_avatar, attachment_url, attachment_type, owned_by_me, hidden";

/// How a batch insert treats an id that is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conflict {
    /// Last writer wins
    Replace,
    /// Existing row is kept untouched
    Ignore,
}

/// SQLite-backed post store.
///
/// # Thread Safety
///
/// The connection is wrapped in a `Mutex`; every public method holds the lock
/// for its whole duration, so each one is atomic with respect to the others.
/// Multi-statement units go through [`SqliteStore::transaction`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
    visible: watch::Sender<Vec<Post>>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    ///
    /// This will create the necessary tables if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        log::debug!("[PostStore] Opening {}", path.as_ref().display());
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory SQLite database for testing.
    ///
    /// Data is lost when the store is dropped.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        let visible = query_visible(&conn)?;
        let (tx, _rx) = watch::channel(visible);
        Ok(Self {
            conn: Mutex::new(conn),
            visible: tx,
        })
    }

    /// Live view of the visible posts, newest first.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Post>> {
        self.visible.subscribe()
    }

    /// Visible posts, newest first.
    pub fn visible_posts(&self) -> Result<Vec<Post>> {
        let conn = self.conn.lock().unwrap();
        query_visible(&conn)
    }

    /// Look up a single post, hidden or not.
    pub fn get(&self, id: i64) -> Result<Option<Post>> {
        let conn = self.conn.lock().unwrap();
        let post = conn
            .query_row(
                &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
                params![id],
                row_to_post,
            )
            .optional()?;
        Ok(post)
    }

    /// Whether no post (hidden or not) is stored.
    pub fn is_empty(&self) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        is_empty(&conn)
    }

    /// Newest id known locally, hidden posts included.
    pub fn latest_id(&self) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let id = conn.query_row("SELECT MAX(id) FROM posts", [], |row| row.get(0))?;
        Ok(id)
    }

    /// Number of posts waiting to be promoted.
    pub fn hidden_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM posts WHERE hidden = 1", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    /// Insert or replace posts by id.
    pub fn upsert(&self, posts: &[Post]) -> Result<()> {
        if posts.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        insert_posts(&tx, posts, Conflict::Replace)?;
        tx.commit()?;
        self.publish(&conn)
    }

    /// Insert posts whose id is not stored yet; existing rows are left alone.
    ///
    /// Returns the number of rows actually inserted.
    pub fn upsert_shadow(&self, posts: &[Post]) -> Result<usize> {
        if posts.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let inserted = insert_posts(&tx, posts, Conflict::Ignore)?;
        tx.commit()?;
        if inserted < posts.len() {
            log::debug!(
                "[PostStore] Shadow insert kept {} existing rows",
                posts.len() - inserted
            );
        }
        self.publish(&conn)?;
        Ok(inserted)
    }

    /// Make every hidden post visible.
    ///
    /// Returns the number of promoted posts.
    pub fn promote_hidden(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let promoted = conn.execute("UPDATE posts SET hidden = 0 WHERE hidden = 1", [])?;
        self.publish(&conn)?;
        Ok(promoted)
    }

    /// Flip `liked_by_me` and move `likes` by one in a single statement.
    ///
    /// Returns false if no post has this id.
    pub fn toggle_like(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE posts SET
                 likes = likes + CASE WHEN liked_by_me THEN -1 ELSE 1 END,
                 liked_by_me = CASE WHEN liked_by_me THEN 0 ELSE 1 END
             WHERE id = ?1",
            params![id],
        )?;
        self.publish(&conn)?;
        Ok(changed > 0)
    }

    /// Returns false if no post has this id.
    pub fn remove(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        self.publish(&conn)?;
        Ok(changed > 0)
    }

    /// Replace a post's text. Returns false if no post has this id.
    pub fn update_content(&self, id: i64, content: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE posts SET content = ?1 WHERE id = ?2",
            params![content, id],
        )?;
        self.publish(&conn)?;
        Ok(changed > 0)
    }

    /// Delete every post. Remote keys are kept; see [`SqliteStore::clear_remote_keys`].
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute("DELETE FROM posts", [])?;
        log::info!("[PostStore] Cleared {} posts", removed);
        self.publish(&conn)
    }

    /// Current bookmark for one paging direction.
    pub fn remote_key(&self, kind: KeyKind) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        remote_key(&conn, kind)
    }

    /// Forget both paging bookmarks.
    pub fn clear_remote_keys(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM remote_keys", [])?;
        Ok(())
    }

    /// Run `f` inside one SQLite transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; subscribers are
    /// notified once, after the commit.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&StoreTransaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let value = f(&StoreTransaction { conn: &tx })?;
        tx.commit()?;
        self.publish(&conn)?;
        Ok(value)
    }

    /// Re-run the visible query and notify subscribers if the result changed.
    fn publish(&self, conn: &Connection) -> Result<()> {
        let posts = query_visible(conn)?;
        self.visible.send_if_modified(|current| {
            if *current == posts {
                false
            } else {
                *current = posts;
                true
            }
        });
        Ok(())
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

/// Operations available while a [`SqliteStore::transaction`] is open.
pub struct StoreTransaction<'a> {
    conn: &'a Connection,
}

impl StoreTransaction<'_> {
    /// Whether the store held no posts when checked.
    pub fn is_empty(&self) -> Result<bool> {
        is_empty(self.conn)
    }

    /// Insert or replace posts by id.
    pub fn upsert(&self, posts: &[Post]) -> Result<()> {
        insert_posts(self.conn, posts, Conflict::Replace)?;
        Ok(())
    }

    /// Bookmark for one paging direction as seen inside the transaction.
    pub fn remote_key(&self, kind: KeyKind) -> Result<Option<i64>> {
        remote_key(self.conn, kind)
    }

    /// Overwrite the bookmarks for the given directions.
    pub fn set_remote_keys(&self, keys: &[RemoteKey]) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("INSERT OR REPLACE INTO remote_keys (kind, id) VALUES (?1, ?2)")?;
        for key in keys {
            stmt.execute(params![key.kind.as_str(), key.id])?;
        }
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Local mirror of remote posts
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY,
            author TEXT NOT NULL,
            author_id INTEGER NOT NULL,
            content TEXT NOT NULL,
            published INTEGER NOT NULL,
            liked_by_me INTEGER NOT NULL DEFAULT 0,
            likes INTEGER NOT NULL DEFAULT 0,
            author_avatar TEXT NOT NULL DEFAULT '',
            attachment_url TEXT,
            attachment_type TEXT,
            owned_by_me INTEGER NOT NULL DEFAULT 0,
            hidden INTEGER NOT NULL DEFAULT 0
        );

        -- Index for the visible feed query
        CREATE INDEX IF NOT EXISTS idx_posts_hidden_id ON posts(hidden, id);

        -- One bookmark per paging direction
        CREATE TABLE IF NOT EXISTS remote_keys (
            kind TEXT PRIMARY KEY,
            id INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn row_to_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    let attachment_url: Option<String> = row.get(8)?;
    let attachment_type: Option<String> = row.get(9)?;
    let attachment = match (attachment_url, attachment_type) {
        (Some(url), Some(kind)) => kind.parse().ok().map(|kind| Attachment { url, kind }),
        _ => None,
    };

    Ok(Post {
        id: row.get(0)?,
        author: row.get(1)?,
        author_id: row.get(2)?,
        content: row.get(3)?,
        published: row.get(4)?,
        liked_by_me: row.get(5)?,
        likes: row.get(6)?,
        author_avatar: row.get(7)?,
        attachment,
        owned_by_me: row.get(10)?,
        hidden: row.get(11)?,
    })
}

fn query_visible(conn: &Connection) -> Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM posts WHERE hidden = 0 ORDER BY id DESC",
        POST_COLUMNS
    ))?;
    let posts = stmt
        .query_map([], row_to_post)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(posts)
}

fn is_empty(conn: &Connection) -> Result<bool> {
    let empty = conn.query_row("SELECT NOT EXISTS (SELECT 1 FROM posts)", [], |row| {
        row.get(0)
    })?;
    Ok(empty)
}

fn remote_key(conn: &Connection, kind: KeyKind) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM remote_keys WHERE kind = ?1",
            params![kind.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn insert_posts(conn: &Connection, posts: &[Post], conflict: Conflict) -> Result<usize> {
    let verb = match conflict {
        Conflict::Replace => "INSERT OR REPLACE",
        Conflict::Ignore => "INSERT OR IGNORE",
    };
    let mut stmt = conn.prepare(&format!(
        "{} INTO posts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        verb, POST_COLUMNS
    ))?;

    let mut inserted = 0;
    for post in posts {
        let (attachment_url, attachment_type) = match &post.attachment {
            Some(a) => (Some(a.url.as_str()), Some(a.kind.to_string())),
            None => (None, None),
        };
        inserted += stmt.execute(params![
            post.id,
            post.author,
            post.author_id,
            post.content,
            post.published,
            post.liked_by_me,
            post.likes,
            post.author_avatar,
            attachment_url,
            attachment_type,
            post.owned_by_me,
            post.hidden,
        ])?;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttachmentType;
    use crate::test_utils::post;

    #[test]
    fn test_visible_posts_are_newest_first_and_skip_hidden() {
        let store = SqliteStore::in_memory().unwrap();
        let mut hidden = post(3);
        hidden.hidden = true;
        store.upsert(&[post(1), hidden, post(2)]).unwrap();

        let ids: Vec<i64> = store.visible_posts().unwrap().iter().map(|p| p.id).collect();

        assert_eq!(ids, vec![2, 1]);
        assert_eq!(store.hidden_count().unwrap(), 1);
        assert_eq!(store.latest_id().unwrap(), Some(3));
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_empty().unwrap());
        assert_eq!(store.latest_id().unwrap(), None);
        assert_eq!(store.remote_key(KeyKind::After).unwrap(), None);
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&[post(1)]).unwrap();

        let mut edited = post(1);
        edited.content = "edited".into();
        store.upsert(&[edited]).unwrap();

        assert_eq!(store.get(1).unwrap().unwrap().content, "edited");
    }

    #[test]
    fn test_upsert_shadow_never_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&[post(1)]).unwrap();
        store.toggle_like(1).unwrap();
        store.update_content(1, "local edit").unwrap();

        let mut remote_copy = post(1);
        remote_copy.hidden = true;
        let mut fresh = post(2);
        fresh.hidden = true;
        let inserted = store.upsert_shadow(&[remote_copy, fresh]).unwrap();

        assert_eq!(inserted, 1);
        let kept = store.get(1).unwrap().unwrap();
        assert!(kept.liked_by_me);
        assert_eq!(kept.content, "local edit");
        assert!(!kept.hidden);
        assert!(store.get(2).unwrap().unwrap().hidden);
    }

    #[test]
    fn test_toggle_like_twice_restores_state() {
        let store = SqliteStore::in_memory().unwrap();
        let mut original = post(7);
        original.likes = 3;
        store.upsert(&[original.clone()]).unwrap();

        store.toggle_like(7).unwrap();
        let liked = store.get(7).unwrap().unwrap();
        assert!(liked.liked_by_me);
        assert_eq!(liked.likes, 4);

        store.toggle_like(7).unwrap();
        assert_eq!(store.get(7).unwrap().unwrap(), original);
    }

    #[test]
    fn test_toggle_like_missing_post() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(!store.toggle_like(99).unwrap());
    }

    #[test]
    fn test_promote_hidden() {
        let store = SqliteStore::in_memory().unwrap();
        let mut a = post(10);
        a.hidden = true;
        let mut b = post(11);
        b.hidden = true;
        store.upsert_shadow(&[a, b]).unwrap();
        assert!(store.visible_posts().unwrap().is_empty());

        assert_eq!(store.promote_hidden().unwrap(), 2);
        assert_eq!(store.visible_posts().unwrap().len(), 2);
        assert_eq!(store.hidden_count().unwrap(), 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&[post(1), post(2)]).unwrap();

        assert!(store.remove(1).unwrap());
        assert!(!store.remove(1).unwrap());
        assert!(store.get(1).unwrap().is_none());

        store.clear().unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_attachment_is_stored() {
        let store = SqliteStore::in_memory().unwrap();
        let mut with_media = post(1);
        with_media.attachment = Some(Attachment {
            url: "clip.mp4".into(),
            kind: AttachmentType::Video,
        });
        store.upsert(&[with_media.clone()]).unwrap();

        assert_eq!(store.get(1).unwrap().unwrap().attachment, with_media.attachment);
    }

    #[test]
    fn test_remote_keys_are_overwritten_not_appended() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .transaction(|tx| tx.set_remote_keys(&[RemoteKey::after(5), RemoteKey::before(1)]))
            .unwrap();
        store
            .transaction(|tx| tx.set_remote_keys(&[RemoteKey::after(9)]))
            .unwrap();

        assert_eq!(store.remote_key(KeyKind::After).unwrap(), Some(9));
        assert_eq!(store.remote_key(KeyKind::Before).unwrap(), Some(1));

        store.clear_remote_keys().unwrap();
        assert_eq!(store.remote_key(KeyKind::Before).unwrap(), None);
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store = SqliteStore::in_memory().unwrap();

        let result: Result<()> = store.transaction(|tx| {
            tx.upsert(&[post(1)])?;
            tx.set_remote_keys(&[RemoteKey::after(1)])?;
            Err(crate::error::FeedError::Unknown("abort".into()))
        });

        assert!(result.is_err());
        assert!(store.is_empty().unwrap());
        assert_eq!(store.remote_key(KeyKind::After).unwrap(), None);
    }

    #[test]
    fn test_subscribers_are_notified_on_change() {
        let store = SqliteStore::in_memory().unwrap();
        let mut rx = store.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        store.upsert(&[post(1)]).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        // Hidden rows do not change the visible list
        let mut hidden = post(2);
        hidden.hidden = true;
        store.upsert_shadow(&[hidden]).unwrap();
        assert!(!rx.has_changed().unwrap());

        store.promote_hidden().unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("posts.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert(&[post(4)]).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.latest_id().unwrap(), Some(4));
        assert_eq!(store.subscribe().borrow().len(), 1);
    }
}
