//! Exercises the Postgres-backed store against a real database. Requires
//! `DATABASE_URL` to point at a Postgres instance sqlx can create test
//! databases against; skipped entirely otherwise by the sqlx test harness.

use postconfirm_core::{Action, Address, MessageStash, RefSet, SenderStore};
use postconfirm_store::schema::ensure_schema;
use postconfirm_store::{PgMessageStash, PgSenderStore};
use sqlx::PgPool;

#[sqlx::test]
async fn unknown_sender_has_no_record(pool: PgPool) -> sqlx::Result<()> {
    ensure_schema(&pool).await.unwrap();
    let store = PgSenderStore::new(pool, None);

    let (action, refs) = store
        .get_action(&Address::from("nobody@example.org"))
        .await
        .unwrap();

    assert_eq!(action, Action::Unknown);
    assert!(refs.is_empty());
    Ok(())
}

#[sqlx::test]
async fn set_then_get_round_trips(pool: PgPool) -> sqlx::Result<()> {
    ensure_schema(&pool).await.unwrap();
    let store = PgSenderStore::new(pool, None);
    let sender = Address::from("alice@example.org");

    store
        .set_action(&sender, Action::Accept, RefSet::new())
        .await
        .unwrap();

    let (action, _) = store.get_action(&sender).await.unwrap();
    assert_eq!(action, Action::Accept);
    Ok(())
}

#[sqlx::test]
async fn pattern_fallback_applies_when_no_exact_row(pool: PgPool) -> sqlx::Result<()> {
    ensure_schema(&pool).await.unwrap();
    sqlx::query(
        "INSERT INTO senders_static (sender, type, action, ref, source)
         VALUES ('.*@spammy\\.example$', 'P', 'reject', NULL, 'operator')",
    )
    .execute(&pool)
    .await?;

    let store = PgSenderStore::new(pool, None);
    let (action, _) = store
        .get_action(&Address::from("anything@spammy.example"))
        .await
        .unwrap();

    assert_eq!(action, Action::Reject);
    Ok(())
}

#[sqlx::test]
async fn stash_then_peek_then_ack_drains_fifo(pool: PgPool) -> sqlx::Result<()> {
    ensure_schema(&pool).await.unwrap();
    let stash = PgMessageStash::new(pool);
    let sender = Address::from("bob@example.org");
    let recipients = vec![Address::from("list@example.org")];

    stash.stash(&sender, &recipients, b"first").await.unwrap();
    stash.stash(&sender, &recipients, b"second").await.unwrap();

    let (first, layer) = stash.peek_next(&sender).await.unwrap().unwrap();
    assert_eq!(first.message, b"first".to_vec());
    stash.ack(first.id, layer).await.unwrap();

    let (second, layer) = stash.peek_next(&sender).await.unwrap().unwrap();
    assert_eq!(second.message, b"second".to_vec());
    stash.ack(second.id, layer).await.unwrap();

    assert!(stash.peek_next(&sender).await.unwrap().is_none());
    Ok(())
}
