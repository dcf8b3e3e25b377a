//! Like and favorite toggling.
//!
//! Both relations have the same shape (a set of user ids attached to a
//! subject), so one read-modify-write routine serves both.
//!
//! The read and the write are two separate store calls with no lock or
//! version check between them. Two concurrent toggles by the same user on
//! the same subject can therefore both read the same state, and the last
//! write wins. The store writes the whole member set atomically, so the
//! worst outcome is a stale final state, never a torn one.

use uuid::Uuid;

use crate::{
  Entity, Error, Result,
  error::store_failure,
  store::{DiscussionStore, Relation},
};

/// Flip `actor`'s membership of `relation` on `subject` and persist the
/// result. Returns `true` if the actor is now a member.
///
/// Fails with [`Error::NotFound`] if the subject or the actor does not exist;
/// nothing is written in that case.
pub async fn toggle<S>(
  store: &S,
  relation: Relation,
  subject: Uuid,
  actor: Uuid,
) -> Result<bool>
where
  S: DiscussionStore,
{
  let mut members = store
    .members(relation, subject)
    .await
    .map_err(store_failure("members"))?
    .ok_or_else(|| Error::not_found(relation.subject(), subject))?;

  if !store
    .user_exists(actor)
    .await
    .map_err(store_failure("user_exists"))?
  {
    return Err(Error::not_found(Entity::User, actor));
  }

  let active = match members.iter().position(|m| *m == actor) {
    Some(idx) => {
      members.remove(idx);
      false
    }
    None => {
      members.push(actor);
      true
    }
  };

  store
    .replace_members(relation, subject, members)
    .await
    .map_err(store_failure("replace_members"))?;

  tracing::debug!(?relation, %subject, %actor, active, "toggled membership");
  Ok(active)
}

/// Whether `actor` is currently a member of `relation` on `subject`.
pub async fn is_member<S>(
  store: &S,
  relation: Relation,
  subject: Uuid,
  actor: Uuid,
) -> Result<bool>
where
  S: DiscussionStore,
{
  let members = store
    .members(relation, subject)
    .await
    .map_err(store_failure("members"))?
    .ok_or_else(|| Error::not_found(relation.subject(), subject))?;
  Ok(members.contains(&actor))
}
