mod common;

use adoptly_core::CoreError;
use adoptly_types::models::Role;
use uuid::Uuid;

use common::{add_user, world};

#[tokio::test]
async fn conversation_is_shared_by_both_orientations() {
    let w = world();
    let a = add_user(&w.db, "ada", Role::Adopter);
    let b = add_user(&w.db, "sam", Role::Staff);

    let first = w.services.conversations.create_or_get(a, b).await.unwrap();
    let second = w.services.conversations.create_or_get(b, a).await.unwrap();

    assert!(first.is_new);
    assert!(!second.is_new);
    assert_eq!(first.conversation.id, second.conversation.id);
}

#[tokio::test]
async fn messages_come_back_in_send_order() {
    let w = world();
    let a = add_user(&w.db, "ada", Role::Adopter);
    let b = add_user(&w.db, "sam", Role::Staff);
    let conv = w.services.conversations.create_or_get(a, b).await.unwrap().conversation;

    let n = 12;
    for i in 0..n {
        let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
        w.services.messages.send(conv.id, from, to, &format!("message {i}")).await.unwrap();
    }

    let listed = w.services.messages.list(conv.id, a).await.unwrap();
    assert_eq!(listed.len(), n);
    for (i, msg) in listed.iter().enumerate() {
        assert_eq!(msg.body, format!("message {i}"));
    }
    assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    assert!(listed.windows(2).all(|w| w[0].seq < w[1].seq));
}

#[tokio::test]
async fn blank_message_is_rejected_and_not_stored() {
    let w = world();
    let a = add_user(&w.db, "ada", Role::Adopter);
    let b = add_user(&w.db, "sam", Role::Staff);
    let conv = w.services.conversations.create_or_get(a, b).await.unwrap().conversation;

    for body in ["", "   ", "\n\t "] {
        let err = w.services.messages.send(conv.id, a, b, body).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "body", .. }));
    }

    assert!(w.services.messages.list(conv.id, a).await.unwrap().is_empty());
    assert_eq!(w.services.unread.unread_message_count(b).await.unwrap(), 0);
}

#[tokio::test]
async fn mark_read_twice_is_harmless() {
    let w = world();
    let a = add_user(&w.db, "ada", Role::Adopter);
    let b = add_user(&w.db, "sam", Role::Staff);
    let conv = w.services.conversations.create_or_get(a, b).await.unwrap().conversation;
    let msg = w.services.messages.send(conv.id, a, b, "hi").await.unwrap();

    let once = w.services.messages.mark_read(msg.id, b).await.unwrap();
    let twice = w.services.messages.mark_read(msg.id, b).await.unwrap();

    assert!(once.read);
    assert!(twice.read);
    assert_eq!(once.read_at, twice.read_at);
}

#[tokio::test]
async fn unread_count_tracks_receiver_and_conversation_reads() {
    let w = world();
    let adopter = add_user(&w.db, "ada", Role::Adopter);
    let staff = add_user(&w.db, "sam", Role::Staff);
    let admin = add_user(&w.db, "alex", Role::Admin);

    let c1 = w.services.conversations.create_or_get(adopter, staff).await.unwrap().conversation;
    let c2 = w.services.conversations.create_or_get(admin, staff).await.unwrap().conversation;

    w.services.messages.send(c1.id, adopter, staff, "one").await.unwrap();
    w.services.messages.send(c1.id, adopter, staff, "two").await.unwrap();
    w.services.messages.send(c2.id, admin, staff, "three").await.unwrap();
    w.services.messages.send(c2.id, staff, admin, "reply").await.unwrap();

    assert_eq!(w.services.unread.unread_message_count(staff).await.unwrap(), 3);

    let changed = w.services.messages.mark_all_read(c1.id, staff).await.unwrap();
    assert_eq!(changed, 2);
    assert_eq!(w.services.unread.unread_message_count(staff).await.unwrap(), 1);
    assert_eq!(w.services.unread.unread_message_count(admin).await.unwrap(), 1);

    // Marking again changes nothing
    assert_eq!(w.services.messages.mark_all_read(c1.id, staff).await.unwrap(), 0);
}

#[tokio::test]
async fn first_contact_scenario() {
    let w = world();
    let u1 = add_user(&w.db, "u1", Role::Adopter);
    let u2 = add_user(&w.db, "u2", Role::Admin);

    let opened = w.services.conversations.create_or_get(u1, u2).await.unwrap();
    assert!(opened.is_new);
    let conv = opened.conversation.id;

    w.services.messages.send(conv, u1, u2, "Hello").await.unwrap();

    let listed = w.services.messages.list(conv, u2).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].sender_id, u1);
    assert!(!listed[0].read);

    assert_eq!(w.services.unread.unread_message_count(u2).await.unwrap(), 1);
    w.services.messages.mark_all_read(conv, u2).await.unwrap();
    assert_eq!(w.services.unread.unread_message_count(u2).await.unwrap(), 0);
}

#[tokio::test]
async fn outsiders_cannot_read_or_mark() {
    let w = world();
    let a = add_user(&w.db, "ada", Role::Adopter);
    let b = add_user(&w.db, "sam", Role::Staff);
    let outsider = add_user(&w.db, "eve", Role::Adopter);
    let conv = w.services.conversations.create_or_get(a, b).await.unwrap().conversation;
    w.services.messages.send(conv.id, a, b, "private").await.unwrap();

    assert!(matches!(
        w.services.messages.list(conv.id, outsider).await.unwrap_err(),
        CoreError::Permission(_)
    ));
    assert!(matches!(
        w.services.messages.mark_all_read(conv.id, outsider).await.unwrap_err(),
        CoreError::Permission(_)
    ));
    assert!(matches!(
        w.services.messages.list(Uuid::new_v4(), a).await.unwrap_err(),
        CoreError::NotFound("conversation")
    ));
}

#[tokio::test]
async fn conversation_list_is_ordered_by_activity() {
    let w = world();
    let me = add_user(&w.db, "me", Role::Staff);
    let older = add_user(&w.db, "older", Role::Adopter);
    let newer = add_user(&w.db, "newer", Role::Adopter);

    let c_old = w.services.conversations.create_or_get(me, older).await.unwrap().conversation;
    let c_new = w.services.conversations.create_or_get(me, newer).await.unwrap().conversation;

    w.services.messages.send(c_new.id, newer, me, "first").await.unwrap();
    w.services.messages.send(c_old.id, older, me, "latest").await.unwrap();

    let list = w.services.conversations.list_for_user(me).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].conversation.id, c_old.id);
    assert_eq!(list[0].last_message.as_deref(), Some("latest"));
    assert_eq!(list[0].unread_count, 1);
    assert_eq!(list[0].counterpart.id, older);
    assert_eq!(list[1].conversation.id, c_new.id);
}
