//! Demo data for a fresh store: three users and one book carrying a short
//! reply thread, a like and a favorite.

use anyhow::Context as _;
use folio_core::{catalog::Role, service::Discussions};
use folio_store_sqlite::SqliteStore;
use uuid::Uuid;

/// Ids of the records created by [`seed`].
#[derive(Debug, Clone)]
pub struct Demo {
  pub book_id:  Uuid,
  pub alice:    Uuid,
  pub bob:      Uuid,
  pub admin:    Uuid,
  pub comments: Vec<Uuid>,
}

/// Populate the demo dataset. Returns `None` without writing anything if the
/// store already holds it.
pub async fn seed(
  discussions: &Discussions<SqliteStore>,
) -> anyhow::Result<Option<Demo>> {
  let store = discussions.store();
  if store.find_user_by_name("alice").await?.is_some() {
    tracing::info!("demo data already present, skipping seed");
    return Ok(None);
  }

  let alice = store.add_user("alice", Role::Reader).await?;
  let bob   = store.add_user("bob", Role::Reader).await?;
  let admin = store.add_user("admin", Role::Admin).await?;
  let book  = store.add_book("A Wizard of Earthsea").await?;

  let c1 = discussions
    .create(book.book_id, "Great book", alice.user_id, None)
    .await
    .context("seeding root comment")?;
  let c2 = discussions
    .create(book.book_id, "Agreed", bob.user_id, Some(c1.comment_id))
    .await
    .context("seeding reply")?;
  let c3 = discussions
    .create(book.book_id, "Why?", alice.user_id, Some(c2.comment_id))
    .await
    .context("seeding nested reply")?;

  discussions.toggle_like(c2.comment_id, alice.user_id).await?;
  discussions.toggle_favorite(book.book_id, bob.user_id).await?;

  tracing::info!(book_id = %book.book_id, "seeded demo data");
  Ok(Some(Demo {
    book_id:  book.book_id,
    alice:    alice.user_id,
    bob:      bob.user_id,
    admin:    admin.user_id,
    comments: vec![c1.comment_id, c2.comment_id, c3.comment_id],
  }))
}
